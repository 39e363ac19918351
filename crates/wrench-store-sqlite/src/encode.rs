//! Encoding and decoding helpers between Rust domain types and the plain
//! text stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; the unit journal as its JSON
//! form; unit types as their lowercase tag.

use chrono::{DateTime, Utc};
use wrench_core::{
  entity::{RepairOrder, RepairUnit, UnitType},
  event::Journal,
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_unit_type(t: UnitType) -> &'static str { t.as_str() }

pub fn decode_unit_type(s: &str) -> Result<UnitType> {
  match s {
    "machine" => Ok(UnitType::Machine),
    "hashboard" => Ok(UnitType::Hashboard),
    other => Err(Error::InvalidEnumValue {
      what:  "unit type",
      value: other.to_string(),
    }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `repair_orders` row.
pub struct RawOrder {
  pub id:        i64,
  pub name:      String,
  pub status_id: i64,
  pub summary:   Option<String>,
  pub created:   String,
  pub received:  Option<String>,
  pub finished:  Option<String>,
}

impl RawOrder {
  pub fn into_order(self) -> Result<RepairOrder> {
    Ok(RepairOrder {
      id:        self.id,
      name:      self.name,
      status_id: self.status_id,
      summary:   self.summary,
      created:   decode_dt(&self.created)?,
      received:  self.received.as_deref().map(decode_dt).transpose()?,
      finished:  self.finished.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `repair_units` row.
pub struct RawUnit {
  pub id:                  i64,
  pub serial:              String,
  pub unit_type:           String,
  pub current_status_id:   i64,
  pub current_assignee_id: Option<i64>,
  pub repair_order_id:     i64,
  pub created:             String,
  pub updated_at:          String,
  pub journal:             String,
}

impl RawUnit {
  pub fn into_unit(self) -> Result<RepairUnit> {
    Ok(RepairUnit {
      id:                  self.id,
      serial:              self.serial,
      unit_type:           decode_unit_type(&self.unit_type)?,
      current_status_id:   self.current_status_id,
      current_assignee_id: self.current_assignee_id,
      repair_order_id:     self.repair_order_id,
      created:             decode_dt(&self.created)?,
      updated_at:          decode_dt(&self.updated_at)?,
      // Lenient by policy: a corrupt journal reads as empty rather than
      // failing the unit fetch it rides on.
      journal:             Journal::decode(&self.journal),
    })
  }
}
