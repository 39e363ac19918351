//! Prefixed entity keys — the single source of truth for key formatting.
//!
//! Every entity is addressed externally by a `"{prefix}-{id}"` string
//! (`RO-3`, `RU-7`, ...). The numeric part is always a storage primary key;
//! keys are never generated independently of the store.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{Error, Result};

// ─── EntityKind ──────────────────────────────────────────────────────────────

/// The kind of entity a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  RepairOrder,
  RepairUnit,
  Status,
  Assignee,
}

impl EntityKind {
  /// The two-letter key prefix.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::RepairOrder => "RO",
      Self::RepairUnit => "RU",
      Self::Status => "ST",
      Self::Assignee => "AS",
    }
  }

  /// Human-readable noun, used in error messages.
  pub fn label(self) -> &'static str {
    match self {
      Self::RepairOrder => "repair order",
      Self::RepairUnit => "repair unit",
      Self::Status => "status",
      Self::Assignee => "assignee",
    }
  }

  pub fn from_prefix(s: &str) -> Option<Self> {
    match s {
      "RO" => Some(Self::RepairOrder),
      "RU" => Some(Self::RepairUnit),
      "ST" => Some(Self::Status),
      "AS" => Some(Self::Assignee),
      _ => None,
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.prefix())
  }
}

// ─── EntityKey ───────────────────────────────────────────────────────────────

/// A tagged `(kind, numeric id)` pair. String form is `"{prefix}-{id}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
  pub kind: EntityKind,
  pub id:   i64,
}

impl EntityKey {
  pub fn new(kind: EntityKind, id: i64) -> Self { Self { kind, id } }
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.kind.prefix(), self.id)
  }
}

impl FromStr for EntityKey {
  type Err = Error;

  /// Fails with [`Error::InvalidKeyFormat`] unless the string splits into
  /// exactly two parts on `'-'`, the prefix names a known kind, and the id
  /// parses as a non-negative integer.
  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidKeyFormat(s.to_string());

    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 2 {
      return Err(invalid());
    }

    let kind = EntityKind::from_prefix(parts[0]).ok_or_else(invalid)?;
    let id: i64 = parts[1].parse().map_err(|_| invalid())?;
    if id < 0 {
      return Err(invalid());
    }

    Ok(Self { kind, id })
  }
}

/// Parse a key and check its kind. The kind check deliberately lives here,
/// outside the parser, so each call site states which kind it expects.
pub fn expect_kind(key: &str, expected: EntityKind) -> Result<i64> {
  let parsed: EntityKey = key.parse()?;
  if parsed.kind != expected {
    return Err(Error::WrongKeyKind { expected, key: key.to_string() });
  }
  Ok(parsed.id)
}

// Keys travel through JSON in their string form.
impl Serialize for EntityKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for EntityKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_then_parse_round_trips_every_kind() {
    for kind in [
      EntityKind::RepairOrder,
      EntityKind::RepairUnit,
      EntityKind::Status,
      EntityKind::Assignee,
    ] {
      let key = EntityKey::new(kind, 42);
      let parsed: EntityKey = key.to_string().parse().unwrap();
      assert_eq!(parsed, key);
    }
  }

  #[test]
  fn display_matches_prefix_dash_id() {
    assert_eq!(EntityKey::new(EntityKind::RepairOrder, 123).to_string(), "RO-123");
    assert_eq!(EntityKey::new(EntityKind::Assignee, 7).to_string(), "AS-7");
  }

  #[test]
  fn malformed_strings_fail_with_format_error() {
    for bad in ["RO", "RO-", "RO-x", "RO-1-2", "-1", "XX-1", "ro-1", "RO--1", ""] {
      let err = bad.parse::<EntityKey>().unwrap_err();
      assert!(
        matches!(err, Error::InvalidKeyFormat(_)),
        "{bad:?} gave {err:?}"
      );
    }
  }

  #[test]
  fn expect_kind_accepts_matching_key() {
    assert_eq!(expect_kind("RU-9", EntityKind::RepairUnit).unwrap(), 9);
  }

  #[test]
  fn expect_kind_rejects_well_formed_key_of_other_kind() {
    let err = expect_kind("AS-7", EntityKind::RepairOrder).unwrap_err();
    assert!(matches!(
      err,
      Error::WrongKeyKind { expected: EntityKind::RepairOrder, .. }
    ));
  }

  #[test]
  fn serde_round_trips_through_string_form() {
    let key = EntityKey::new(EntityKind::Status, 5);
    let json = serde_json::to_string(&key).unwrap();
    assert_eq!(json, "\"ST-5\"");
    let back: EntityKey = serde_json::from_str(&json).unwrap();
    assert_eq!(back, key);
  }
}
