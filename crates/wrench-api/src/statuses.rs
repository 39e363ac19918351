//! Handlers for `/statuses` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/statuses` | All statuses, creation order |
//! | `POST`   | `/statuses` | Body: `{"name":"Backlog"}` |
//! | `PUT`    | `/statuses/:key` | Body: `{"name":"Triage"}` |
//! | `DELETE` | `/statuses/:key` | Blocked while referenced |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use wrench_core::{
  service::{self, OpReport, StatusView},
  store::RepairStore,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /statuses`
pub async fn list<S: RepairStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<StatusView>>, ApiError> {
  Ok(Json(service::status_views(store.as_ref()).await?))
}

/// `POST /statuses`
pub async fn create<S: RepairStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NameBody>,
) -> Json<OpReport> {
  Json(service::add_status(store.as_ref(), &body.name).await)
}

/// `PUT /statuses/:key`
pub async fn rename<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
  Json(body): Json<NameBody>,
) -> Json<OpReport> {
  Json(service::rename_status(store.as_ref(), &key, &body.name).await)
}

/// `DELETE /statuses/:key`
pub async fn remove<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Json<OpReport> {
  Json(service::delete_status(store.as_ref(), &key).await)
}
