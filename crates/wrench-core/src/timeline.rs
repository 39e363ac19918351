//! Derived per-day status timelines — computed at query time, never stored.
//!
//! The Status-Change Indexer reduces each unit's journal to its chronological
//! status history; the Timeline Builder forward-fills those histories into a
//! day-bucketed occupancy table across all units of one repair order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
  entity::{RepairUnit, UnitType},
  event::EventDetail,
  key::EntityKey,
};

// ─── Status-Change Indexer ───────────────────────────────────────────────────

/// One status observation extracted from a unit's journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPoint {
  pub timestamp:   DateTime<Utc>,
  pub status_name: String,
  pub assignee:    String,
}

/// A unit's chronological status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatusHistory {
  pub serial:        String,
  pub unit_key:      EntityKey,
  pub unit_type:     UnitType,
  pub status_events: Vec<StatusPoint>,
}

/// Extract the status-event subsequence of every unit's journal, sorted by
/// timestamp ascending (stable: ties keep journal order). Units with no
/// status events still appear, with an empty list. The outer list is sorted
/// by serial, lexicographically, for deterministic output.
pub fn status_index(units: &[RepairUnit]) -> Vec<UnitStatusHistory> {
  let mut index: Vec<UnitStatusHistory> = units
    .iter()
    .map(|unit| {
      let mut points: Vec<StatusPoint> = unit
        .journal
        .events()
        .iter()
        .filter_map(|event| match &event.detail {
          EventDetail::Status { status } => Some(StatusPoint {
            timestamp:   event.timestamp,
            status_name: status.clone(),
            assignee:    event.assignee.clone(),
          }),
          _ => None,
        })
        .collect();
      // Journal order is append order, not chronological order.
      points.sort_by_key(|p| p.timestamp);

      UnitStatusHistory {
        serial:        unit.serial.clone(),
        unit_key:      unit.key(),
        unit_type:     unit.unit_type,
        status_events: points,
      }
    })
    .collect();

  index.sort_by(|a, b| a.serial.cmp(&b.serial));
  index
}

// ─── Timeline Builder ────────────────────────────────────────────────────────

/// Aggregate series present in every day bucket.
pub const SERIES_TOTAL_UNITS: &str = "Total Units";
pub const SERIES_TOTAL_MACHINES: &str = "Total Machines";
pub const SERIES_TOTAL_HASHBOARDS: &str = "Total Hashboards";

/// One unit's entry within a day bucket. `assignee` is the name on the
/// unit's most recent event overall at query time — current ownership, not
/// ownership-at-that-day. That asymmetry is intentional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSlot {
  pub serial:    String,
  #[serde(rename = "type")]
  pub unit_type: UnitType,
  pub unit_key:  EntityKey,
  pub assignee:  Option<String>,
}

/// Series name → units occupying that series on one day.
pub type DayBuckets = BTreeMap<String, Vec<UnitSlot>>;

/// UTC calendar date → that day's series. `BTreeMap` keeps both levels in
/// ascending key order, so serialized output is deterministic.
pub type Timeline = BTreeMap<NaiveDate, DayBuckets>;

/// Build the day-bucketed, multi-series occupancy table for one order's
/// units. Empty when no unit has any status event (not an error).
pub fn build_timeline(units: &[RepairUnit]) -> Timeline {
  let index = status_index(units);

  // "Last touched by" snapshot per unit, from the full journal (any event
  // type). Later journal entries win timestamp ties. Empty snapshots (the
  // creation-time bootstrap event) render as no assignee.
  let last_assignee: HashMap<EntityKey, Option<String>> = units
    .iter()
    .map(|unit| {
      let mut latest: Option<(DateTime<Utc>, &str)> = None;
      for event in unit.journal.events() {
        match latest {
          Some((ts, _)) if event.timestamp < ts => {}
          _ => latest = Some((event.timestamp, event.assignee.as_str())),
        }
      }
      let name = latest
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
      (unit.key(), name)
    })
    .collect();

  let dates = index
    .iter()
    .flat_map(|h| h.status_events.iter())
    .map(|p| p.timestamp.date_naive());
  let Some(start) = dates.clone().min() else {
    return Timeline::new();
  };
  let end = dates.max().unwrap_or(start);

  let mut timeline = Timeline::new();
  let mut day = start;
  while day <= end {
    let buckets = timeline.entry(day).or_default();
    for series in [SERIES_TOTAL_UNITS, SERIES_TOTAL_MACHINES, SERIES_TOTAL_HASHBOARDS] {
      buckets.insert(series.to_string(), Vec::new());
    }

    for history in &index {
      // Forward-fill: the latest status event on or before this day. Days
      // before a unit's first status event contribute nothing.
      let Some(active) = history
        .status_events
        .iter()
        .filter(|p| p.timestamp.date_naive() <= day)
        .last()
      else {
        continue;
      };

      let slot = UnitSlot {
        serial:    history.serial.clone(),
        unit_type: history.unit_type,
        unit_key:  history.unit_key,
        assignee:  last_assignee.get(&history.unit_key).cloned().flatten(),
      };

      let type_series = match history.unit_type {
        UnitType::Machine => SERIES_TOTAL_MACHINES,
        UnitType::Hashboard => SERIES_TOTAL_HASHBOARDS,
      };
      buckets
        .entry(active.status_name.clone())
        .or_default()
        .push(slot.clone());
      buckets
        .entry(type_series.to_string())
        .or_default()
        .push(slot.clone());
      buckets.entry(SERIES_TOTAL_UNITS.to_string()).or_default().push(slot);
    }

    let Some(next) = day.succ_opt() else { break };
    day = next;
  }

  timeline
}

// ─── Tests ───────────────────────────────────────────────────────────────────
