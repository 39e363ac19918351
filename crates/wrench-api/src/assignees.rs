//! Handlers for `/assignees` endpoints. Same surface as `/statuses`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use wrench_core::{
  service::{self, AssigneeView, OpReport},
  store::RepairStore,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /assignees`
pub async fn list<S: RepairStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<AssigneeView>>, ApiError> {
  Ok(Json(service::assignee_views(store.as_ref()).await?))
}

/// `POST /assignees`
pub async fn create<S: RepairStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NameBody>,
) -> Json<OpReport> {
  Json(service::add_assignee(store.as_ref(), &body.name).await)
}

/// `PUT /assignees/:key`
pub async fn rename<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
  Json(body): Json<NameBody>,
) -> Json<OpReport> {
  Json(service::rename_assignee(store.as_ref(), &key, &body.name).await)
}

/// `DELETE /assignees/:key`
pub async fn remove<S: RepairStore>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Json<OpReport> {
  Json(service::delete_assignee(store.as_ref(), &key).await)
}
