//! Handlers for `/orders` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/orders` | All orders with status names joined |
//! | `POST`   | `/orders` | Body: [`CreateOrder`](wrench_core::service::CreateOrder) |
//! | `PUT`    | `/orders/:key` | Body: [`UpdateOrder`](wrench_core::service::UpdateOrder) |
//! | `DELETE` | `/orders/:key` | Blocked while units reference it |
//! | `GET`    | `/orders/:key/units` | Units with joined names and events |
//! | `GET`    | `/orders/:key/status-events` | Per-unit chronological status history |
//! | `GET`    | `/orders/:key/timeline` | Day-bucketed occupancy table |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use wrench_core::{
  service::{self, CreateOrder, OpReport, OrderView, UnitView, UpdateOrder},
  store::RepairStore,
  timeline::{Timeline, UnitStatusHistory},
};

use crate::error::ApiError;

/// `GET /orders`
pub async fn list<S: RepairStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
  Ok(Json(service::order_views(store.as_ref()).await?))
}

/// `POST /orders`
pub async fn create<S: RepairStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateOrder>,
) -> Json<OpReport> {
  Json(service::create_order(store.as_ref(), body).await)
}

/// `PUT /orders/:key`
pub async fn update<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
  Json(body): Json<UpdateOrder>,
) -> Json<OpReport> {
  Json(service::update_order(store.as_ref(), &key, body).await)
}

/// `DELETE /orders/:key`
pub async fn remove<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Json<OpReport> {
  Json(service::delete_order(store.as_ref(), &key).await)
}

/// `GET /orders/:key/units`
pub async fn units<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Result<Json<Vec<UnitView>>, ApiError> {
  Ok(Json(service::unit_views(store.as_ref(), &key).await?))
}

/// `GET /orders/:key/status-events`
pub async fn status_events<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Result<Json<Vec<UnitStatusHistory>>, ApiError> {
  Ok(Json(service::order_status_index(store.as_ref(), &key).await?))
}

/// `GET /orders/:key/timeline`
pub async fn timeline<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Result<Json<Timeline>, ApiError> {
  Ok(Json(service::order_timeline(store.as_ref(), &key).await?))
}
