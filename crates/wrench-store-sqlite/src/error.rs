//! Error type for `wrench-store-sqlite`.

use thiserror::Error;
use wrench_core::key::{EntityKey, EntityKind};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] wrench_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("{} {} not found", .0.kind.label(), .0)]
  NotFound(EntityKey),

  #[error("{} name {name:?} already exists", .kind.label())]
  DuplicateName { kind: EntityKind, name: String },

  #[error("delete blocked: {0}")]
  ReferentialConflict(String),

  #[error("unknown {what}: {value:?}")]
  InvalidEnumValue { what: &'static str, value: String },
}

/// Collapse into the core taxonomy: domain variants map one-to-one, backend
/// internals become opaque storage errors.
impl From<Error> for wrench_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::NotFound(key) => Self::NotFound(key),
      Error::DuplicateName { kind, name } => Self::DuplicateName { kind, name },
      Error::ReferentialConflict(msg) => Self::ReferentialConflict(msg),
      Error::InvalidEnumValue { what, value } => {
        Self::InvalidEnumValue { what, value }
      }
      other => Self::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
