//! Handlers for `/units` endpoints, including the per-unit event journal.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/units` | Body: [`CreateUnit`](wrench_core::service::CreateUnit) |
//! | `PUT`    | `/units/:key` | `"assignee_key": null` clears the assignee |
//! | `DELETE` | `/units/:key` | |
//! | `GET`    | `/units/:key/events` | Journal in append order |
//! | `POST`   | `/units/:key/events` | Body: [`NewEvent`](wrench_core::service::NewEvent) |
//! | `DELETE` | `/units/:key/events/:event_id` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use uuid::Uuid;
use wrench_core::{
  event::Event,
  service::{self, CreateUnit, NewEvent, OpReport, UpdateUnit},
  store::RepairStore,
};

use crate::error::ApiError;

/// `POST /units`
pub async fn create<S: RepairStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateUnit>,
) -> Json<OpReport> {
  Json(service::create_unit(store.as_ref(), body).await)
}

/// `PUT /units/:key`
pub async fn update<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
  Json(body): Json<UpdateUnit>,
) -> Json<OpReport> {
  Json(service::update_unit(store.as_ref(), &key, body).await)
}

/// `DELETE /units/:key`
pub async fn remove<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Json<OpReport> {
  Json(service::delete_unit(store.as_ref(), &key).await)
}

/// `GET /units/:key/events`
pub async fn events<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
  Ok(Json(service::unit_events(store.as_ref(), &key).await?))
}

/// `POST /units/:key/events`
pub async fn add_event<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
  Json(body): Json<NewEvent>,
) -> Json<OpReport> {
  Json(service::add_event(store.as_ref(), &key, body).await)
}

/// `DELETE /units/:key/events/:event_id`
pub async fn remove_event<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path((key, event_id)): Path<(String, Uuid)>,
) -> Json<OpReport> {
  Json(service::remove_event(store.as_ref(), &key, event_id).await)
}
