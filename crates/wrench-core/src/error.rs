//! Error types for `wrench-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::key::{EntityKey, EntityKind};

/// Everything that can go wrong inside the core. All variants are
/// recoverable and reported; none is ever process-fatal.
#[derive(Debug, Error)]
pub enum Error {
  /// The string does not look like a `"RO-123"`-style key at all.
  #[error("invalid key format: {0:?}")]
  InvalidKeyFormat(String),

  /// A well-formed key of the wrong kind, e.g. an `AS-` key where an `RO-`
  /// key was required.
  #[error("expected {expected} key, got: {key:?}")]
  WrongKeyKind { expected: EntityKind, key: String },

  #[error("{} {} not found", .0.kind.label(), .0)]
  NotFound(EntityKey),

  #[error("{} name {name:?} already exists", .kind.label())]
  DuplicateName { kind: EntityKind, name: String },

  /// Delete blocked because other records still reference the target.
  #[error("delete blocked: {0}")]
  ReferentialConflict(String),

  #[error("unknown {what}: {value:?}")]
  InvalidEnumValue { what: &'static str, value: String },

  #[error("event not found: {0}")]
  EventNotFound(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// An opaque failure inside the storage backend.
  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
