//! JSON REST API for Wrench.
//!
//! Exposes an axum [`Router`] backed by any [`wrench_core::store::RepairStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! Mutating endpoints answer `200` with the service's `{ok, message, data?}`
//! report regardless of outcome; read endpoints map the error taxonomy onto
//! HTTP status codes (see [`error`]).

pub mod assignees;
pub mod error;
pub mod orders;
pub mod statuses;
pub mod units;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use serde::Deserialize;
use wrench_core::store::RepairStore;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// `WRENCH_`-prefixed environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RepairStore + 'static,
{
  Router::new()
    // Statuses
    .route("/statuses", get(statuses::list::<S>).post(statuses::create::<S>))
    .route(
      "/statuses/{key}",
      put(statuses::rename::<S>).delete(statuses::remove::<S>),
    )
    // Assignees
    .route("/assignees", get(assignees::list::<S>).post(assignees::create::<S>))
    .route(
      "/assignees/{key}",
      put(assignees::rename::<S>).delete(assignees::remove::<S>),
    )
    // Repair orders
    .route("/orders", get(orders::list::<S>).post(orders::create::<S>))
    .route("/orders/{key}", put(orders::update::<S>).delete(orders::remove::<S>))
    .route("/orders/{key}/units", get(orders::units::<S>))
    .route("/orders/{key}/status-events", get(orders::status_events::<S>))
    .route("/orders/{key}/timeline", get(orders::timeline::<S>))
    // Repair units
    .route("/units", post(units::create::<S>))
    .route("/units/{key}", put(units::update::<S>).delete(units::remove::<S>))
    .route("/units/{key}/events", get(units::events::<S>).post(units::add_event::<S>))
    .route("/units/{key}/events/{event_id}", delete(units::remove_event::<S>))
    .with_state(store)
}
