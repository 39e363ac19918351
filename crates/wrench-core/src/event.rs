//! The per-unit event journal — an append-only, typed log of status changes,
//! comments, and repair actions.
//!
//! A journal has no identity of its own: it is owned by exactly one repair
//! unit and persists as a single text column on that unit's row. Events are
//! stored in append order, which is NOT guaranteed monotonic in timestamp
//! (clock steps, backfilled corrections). Chronological consumers re-sort —
//! see [`crate::timeline`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ─── Event ───────────────────────────────────────────────────────────────────

/// The variant payload of an event. The serde tag doubles as the `type`
/// discriminator on the wire, so dispatch stays total and serialization
/// exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventDetail {
  /// The unit moved to a new status. `status` is a name snapshot, not a
  /// reference — renaming a status never rewrites history.
  Status { status: String },
  Comment { comment: String },
  Repair {
    comment:    String,
    /// Ordered component codes touched by the repair.
    components: Vec<String>,
  },
}

impl EventDetail {
  /// The `type` tag as stored on the wire.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Status { .. } => "status",
      Self::Comment { .. } => "comment",
      Self::Repair { .. } => "repair",
    }
  }
}

/// One journal entry. `assignee` is a denormalized name snapshot taken when
/// the event is recorded; renaming an assignee does not retroactively update
/// it. `timestamp` is capture time, assigned server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:        Uuid,
  pub assignee:  String,
  pub timestamp: DateTime<Utc>,
  #[serde(flatten)]
  pub detail:    EventDetail,
}

impl Event {
  /// Build an event with a fresh id, stamped now.
  pub fn now(assignee: impl Into<String>, detail: EventDetail) -> Self {
    Self {
      id:        Uuid::new_v4(),
      assignee:  assignee.into(),
      timestamp: Utc::now(),
      detail,
    }
  }
}

// ─── Journal ─────────────────────────────────────────────────────────────────

/// An ordered sequence of events, serialized as `{"events": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Journal {
  events: Vec<Event>,
}

impl Journal {
  pub fn new() -> Self { Self::default() }

  pub fn events(&self) -> &[Event] { &self.events }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  /// Append an event to the end of the journal. No other state is touched.
  pub fn append(&mut self, event: Event) { self.events.push(event); }

  /// Remove the first event whose id matches. Order of the remaining events
  /// is preserved; a failed removal leaves the journal unchanged.
  pub fn remove(&mut self, id: Uuid) -> Result<Event> {
    let pos = self
      .events
      .iter()
      .position(|e| e.id == id)
      .ok_or(Error::EventNotFound(id))?;
    Ok(self.events.remove(pos))
  }

  /// Record a derived status-change event: appended only when an assignee is
  /// present and `new_status` actually differs from `current_status`.
  /// Returns whether an event was appended.
  pub fn record_status_change(
    &mut self,
    current_status: &str,
    new_status: &str,
    assignee: Option<&str>,
  ) -> bool {
    let Some(assignee) = assignee else { return false };
    if new_status == current_status {
      return false;
    }
    self.append(Event::now(assignee, EventDetail::Status {
      status: new_status.to_string(),
    }));
    true
  }

  /// Decode a stored journal leniently: unparseable text yields an empty
  /// journal, and individually malformed entries are skipped. A corrupt
  /// journal must never fail the unit fetch it rides on — this is the
  /// documented read policy, not incidental error suppression.
  pub fn decode(text: &str) -> Self {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
      return Self::new();
    };
    let Some(entries) = value.get("events").and_then(|v| v.as_array()) else {
      return Self::new();
    };

    let events = entries
      .iter()
      .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
      .collect();
    Self { events }
  }

  /// Serialize for the unit row's journal column.
  pub fn encode(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }
}

// Strict counterpart of `decode`, for journals arriving inside already-typed
// structures. Lenient reads of stored text go through `decode`.
impl<'de> Deserialize<'de> for Journal {
  fn deserialize<D: serde::Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    struct Wire {
      events: Vec<Event>,
    }
    Wire::deserialize(deserializer).map(|w| Self { events: w.events })
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn comment(text: &str) -> Event {
    Event::now("Ada", EventDetail::Comment { comment: text.into() })
  }

  #[test]
  fn append_then_decode_preserves_order_and_fields() {
    let mut journal = Journal::new();
    journal.append(Event::now("Ada", EventDetail::Status { status: "Backlog".into() }));
    journal.append(comment("looks water damaged"));
    journal.append(Event::now("Grace", EventDetail::Repair {
      comment:    "reflowed PSU".into(),
      components: vec!["PSU-01".into(), "FAN-03".into()],
    }));

    let text = journal.encode().unwrap();
    let back = Journal::decode(&text);
    assert_eq!(back, journal);
    assert_eq!(back.len(), 3);
  }

  #[test]
  fn wire_shape_is_flat_with_type_tag() {
    let event = Event {
      id:        Uuid::nil(),
      assignee:  "Ada".into(),
      timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
      detail:    EventDetail::Status { status: "Done".into() },
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "status");
    assert_eq!(value["status"], "Done");
    assert_eq!(value["assignee"], "Ada");
    assert!(value["timestamp"].as_str().unwrap().starts_with("2024-03-01T12:00:00"));
  }

  #[test]
  fn remove_missing_id_fails_and_leaves_journal_unchanged() {
    let mut journal = Journal::new();
    journal.append(comment("a"));
    journal.append(comment("b"));
    let before = journal.clone();

    let err = journal.remove(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, Error::EventNotFound(_)));
    assert_eq!(journal, before);
  }

  #[test]
  fn remove_preserves_order_of_remaining_events() {
    let mut journal = Journal::new();
    let a = comment("a");
    let b = comment("b");
    let c = comment("c");
    let b_id = b.id;
    journal.append(a.clone());
    journal.append(b);
    journal.append(c.clone());

    let removed = journal.remove(b_id).unwrap();
    assert_eq!(removed.id, b_id);
    assert_eq!(journal.events(), &[a, c]);
  }

  #[test]
  fn record_status_change_needs_assignee_and_a_real_change() {
    let mut journal = Journal::new();
    assert!(!journal.record_status_change("Backlog", "Done", None));
    assert!(!journal.record_status_change("Backlog", "Backlog", Some("Ada")));
    assert!(journal.is_empty());

    assert!(journal.record_status_change("Backlog", "Done", Some("Ada")));
    assert_eq!(journal.len(), 1);
    assert_eq!(journal.events()[0].detail, EventDetail::Status { status: "Done".into() });
    assert_eq!(journal.events()[0].assignee, "Ada");
  }

  #[test]
  fn corrupt_text_decodes_as_empty_journal() {
    assert!(Journal::decode("not json at all").is_empty());
    assert!(Journal::decode("{\"events\": 42}").is_empty());
    assert!(Journal::decode("").is_empty());
  }

  #[test]
  fn malformed_entries_are_skipped_not_fatal() {
    let text = r#"{"events": [
      {"id": "00000000-0000-0000-0000-000000000001", "type": "comment",
       "assignee": "Ada", "timestamp": "2024-03-01T08:00:00Z", "comment": "ok"},
      {"type": "comment", "comment": "missing id and timestamp"},
      {"id": "not-a-uuid", "type": "status"}
    ]}"#;
    let journal = Journal::decode(text);
    assert_eq!(journal.len(), 1);
    assert_eq!(journal.events()[0].assignee, "Ada");
  }
}
