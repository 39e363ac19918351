//! Persisted records: statuses, assignees, repair orders, repair units.
//!
//! These are thin row mirrors. Ids are storage primary keys; the prefixed
//! keys shown to callers are derived via [`EntityKey`], never stored.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::Error,
  event::Journal,
  key::{EntityKey, EntityKind},
};

// ─── UnitType ────────────────────────────────────────────────────────────────

/// What kind of hardware a repair unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
  Machine,
  Hashboard,
}

impl UnitType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Machine => "machine",
      Self::Hashboard => "hashboard",
    }
  }
}

impl FromStr for UnitType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "machine" => Ok(Self::Machine),
      "hashboard" => Ok(Self::Hashboard),
      other => Err(Error::InvalidEnumValue {
        what:  "unit type",
        value: other.to_string(),
      }),
    }
  }
}

// ─── Reference entities ──────────────────────────────────────────────────────

/// A workflow status. Names are globally unique, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
  pub id:   i64,
  pub name: String,
}

impl Status {
  pub fn key(&self) -> EntityKey { EntityKey::new(EntityKind::Status, self.id) }
}

/// A person work can be assigned to. Names are globally unique. Events copy
/// the name as a snapshot, so renames never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
  pub id:   i64,
  pub name: String,
}

impl Assignee {
  pub fn key(&self) -> EntityKey { EntityKey::new(EntityKind::Assignee, self.id) }
}

// ─── RepairOrder ─────────────────────────────────────────────────────────────

/// A batch of units sent for repair together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOrder {
  pub id:        i64,
  pub name:      String,
  pub status_id: i64,
  pub summary:   Option<String>,
  /// Store-assigned; immutable after creation.
  pub created:   DateTime<Utc>,
  pub received:  Option<DateTime<Utc>>,
  pub finished:  Option<DateTime<Utc>>,
}

impl RepairOrder {
  pub fn key(&self) -> EntityKey {
    EntityKey::new(EntityKind::RepairOrder, self.id)
  }
}

/// Input to [`crate::store::RepairStore::add_order`]. `created` is always
/// set by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub name:      String,
  pub status_id: i64,
  pub summary:   Option<String>,
  pub received:  Option<DateTime<Utc>>,
}

/// Partial update for a repair order. `None` leaves a field alone; the
/// doubly-wrapped fields distinguish "set to null" from "leave alone".
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
  pub name:      Option<String>,
  pub status_id: Option<i64>,
  pub summary:   Option<Option<String>>,
  pub received:  Option<Option<DateTime<Utc>>>,
  pub finished:  Option<Option<DateTime<Utc>>>,
}

// ─── RepairUnit ──────────────────────────────────────────────────────────────

/// An individual machine or hashboard tracked within a repair order. Owns
/// its event journal exclusively; the journal has no independent lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairUnit {
  pub id:                  i64,
  pub serial:              String,
  pub unit_type:           UnitType,
  pub current_status_id:   i64,
  pub current_assignee_id: Option<i64>,
  pub repair_order_id:     i64,
  pub created:             DateTime<Utc>,
  /// Store-touched on every mutation.
  pub updated_at:          DateTime<Utc>,
  pub journal:             Journal,
}

impl RepairUnit {
  pub fn key(&self) -> EntityKey {
    EntityKey::new(EntityKind::RepairUnit, self.id)
  }

  pub fn order_key(&self) -> EntityKey {
    EntityKey::new(EntityKind::RepairOrder, self.repair_order_id)
  }
}

/// Input to [`crate::store::RepairStore::add_unit`].
#[derive(Debug, Clone)]
pub struct NewUnit {
  pub serial:              String,
  pub unit_type:           UnitType,
  pub current_status_id:   i64,
  pub current_assignee_id: Option<i64>,
  pub repair_order_id:     i64,
  pub journal:             Journal,
}

/// Partial update for a repair unit. Scalar fields and the journal travel in
/// one patch so a status change and its derived event persist atomically.
#[derive(Debug, Clone, Default)]
pub struct UnitPatch {
  pub serial:              Option<String>,
  pub unit_type:           Option<UnitType>,
  pub current_status_id:   Option<i64>,
  pub current_assignee_id: Option<Option<i64>>,
  pub repair_order_id:     Option<i64>,
  pub journal:             Option<Journal>,
}
