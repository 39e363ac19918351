//! Business operations over any [`RepairStore`], plus the read models the
//! API serves.
//!
//! Mutations never raise past this boundary: each returns an [`OpReport`]
//! (`{ok, message, data?}`) with failures folded into `message`. Read
//! operations return `Result` so the transport can distinguish a malformed
//! key (client error) from a missing resource.
//!
//! Every key-taking operation parses the key and then checks its kind
//! explicitly, via [`expect_kind`], before touching the store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::{
  entity::{
    Assignee, NewOrder, NewUnit, OrderPatch, RepairOrder, RepairUnit, Status,
    UnitPatch, UnitType,
  },
  error::{Error, Result},
  event::{Event, EventDetail, Journal},
  key::{EntityKey, EntityKind, expect_kind},
  store::RepairStore,
  timeline::{Timeline, UnitStatusHistory, build_timeline, status_index},
};

// ─── OpReport ────────────────────────────────────────────────────────────────

/// The structured result every mutating operation returns. This shape is the
/// API contract: callers inspect `ok`, show `message`, and read the created
/// key out of `data`.
#[derive(Debug, Clone, Serialize)]
pub struct OpReport {
  pub ok:      bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<serde_json::Value>,
}

impl OpReport {
  pub fn done(message: impl Into<String>) -> Self {
    Self { ok: true, message: message.into(), data: None }
  }

  pub fn fail(message: impl ToString) -> Self {
    Self { ok: false, message: message.to_string(), data: None }
  }

  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = Some(data);
    self
  }
}

// ─── Request types ───────────────────────────────────────────────────────────

/// Deserializes a present-but-null field as `Some(None)`. Combined with
/// `#[serde(default)]`, an absent field stays `None` — the patch idiom for
/// nullable columns.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
  pub name:       String,
  /// Defaults to the lowest-id status when absent.
  pub status_key: Option<String>,
  pub summary:    Option<String>,
  pub received:   Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrder {
  pub name:       Option<String>,
  pub status_key: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub summary:    Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub received:   Option<Option<DateTime<Utc>>>,
  #[serde(default, deserialize_with = "double_option")]
  pub finished:   Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnit {
  pub order_key:    String,
  pub serial:       String,
  pub unit_type:    String,
  /// Defaults to the owning order's current status when absent.
  pub status_key:   Option<String>,
  pub assignee_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUnit {
  pub serial:       Option<String>,
  pub unit_type:    Option<String>,
  pub status_key:   Option<String>,
  /// `null` clears the assignee; an absent field leaves it alone.
  #[serde(default, deserialize_with = "double_option")]
  pub assignee_key: Option<Option<String>>,
  pub order_key:    Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
  #[serde(rename = "type")]
  pub event_type:   String,
  pub assignee_key: String,
  pub status:       Option<String>,
  pub comment:      Option<String>,
  pub components:   Option<Vec<String>>,
}

// ─── Read models ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
  pub key:  EntityKey,
  pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssigneeView {
  pub key:  EntityKey,
  pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
  pub key:        EntityKey,
  pub name:       String,
  pub status:     Option<String>,
  pub status_key: EntityKey,
  pub summary:    Option<String>,
  pub created:    DateTime<Utc>,
  pub received:   Option<DateTime<Utc>>,
  pub finished:   Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
  pub key:                  EntityKey,
  pub serial:               String,
  #[serde(rename = "type")]
  pub unit_type:            UnitType,
  pub current_status:       Option<String>,
  pub current_status_key:   EntityKey,
  pub current_assignee:     Option<String>,
  pub current_assignee_key: Option<EntityKey>,
  pub repair_order_key:     EntityKey,
  pub created:              DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub events:               Vec<Event>,
}

// ─── Key resolution ──────────────────────────────────────────────────────────

async fn resolve_status<S: RepairStore>(store: &S, key: &str) -> Result<Status> {
  let id = expect_kind(key, EntityKind::Status)?;
  store
    .get_status(id)
    .await
    .map_err(Into::into)?
    .ok_or(Error::NotFound(EntityKey::new(EntityKind::Status, id)))
}

async fn resolve_assignee<S: RepairStore>(store: &S, key: &str) -> Result<Assignee> {
  let id = expect_kind(key, EntityKind::Assignee)?;
  store
    .get_assignee(id)
    .await
    .map_err(Into::into)?
    .ok_or(Error::NotFound(EntityKey::new(EntityKind::Assignee, id)))
}

async fn resolve_order<S: RepairStore>(store: &S, key: &str) -> Result<RepairOrder> {
  let id = expect_kind(key, EntityKind::RepairOrder)?;
  store
    .get_order(id)
    .await
    .map_err(Into::into)?
    .ok_or(Error::NotFound(EntityKey::new(EntityKind::RepairOrder, id)))
}

async fn resolve_unit<S: RepairStore>(store: &S, key: &str) -> Result<RepairUnit> {
  let id = expect_kind(key, EntityKind::RepairUnit)?;
  store
    .get_unit(id)
    .await
    .map_err(Into::into)?
    .ok_or(Error::NotFound(EntityKey::new(EntityKind::RepairUnit, id)))
}

// ─── Statuses & assignees ────────────────────────────────────────────────────

pub async fn add_status<S: RepairStore>(store: &S, name: &str) -> OpReport {
  let result: Result<OpReport> = async {
    let status = store.add_status(name).await.map_err(Into::into)?;
    Ok(
      OpReport::done(format!("status {:?} added", status.name))
        .with_data(json!({ "key": status.key() })),
    )
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn rename_status<S: RepairStore>(
  store: &S,
  key: &str,
  new_name: &str,
) -> OpReport {
  let result: Result<OpReport> = async {
    let status = resolve_status(store, key).await?;
    let renamed = store
      .rename_status(status.id, new_name)
      .await
      .map_err(Into::into)?;
    Ok(OpReport::done(format!(
      "status renamed from {:?} to {:?}",
      status.name, renamed.name
    )))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn delete_status<S: RepairStore>(store: &S, key: &str) -> OpReport {
  let result: Result<OpReport> = async {
    let id = expect_kind(key, EntityKind::Status)?;
    store.delete_status(id).await.map_err(Into::into)?;
    Ok(OpReport::done(format!("status {key} deleted")))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn add_assignee<S: RepairStore>(store: &S, name: &str) -> OpReport {
  let result: Result<OpReport> = async {
    let assignee = store.add_assignee(name).await.map_err(Into::into)?;
    Ok(
      OpReport::done(format!("assignee {:?} added", assignee.name))
        .with_data(json!({ "key": assignee.key() })),
    )
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn rename_assignee<S: RepairStore>(
  store: &S,
  key: &str,
  new_name: &str,
) -> OpReport {
  let result: Result<OpReport> = async {
    let assignee = resolve_assignee(store, key).await?;
    let renamed = store
      .rename_assignee(assignee.id, new_name)
      .await
      .map_err(Into::into)?;
    Ok(OpReport::done(format!(
      "assignee renamed from {:?} to {:?}",
      assignee.name, renamed.name
    )))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn delete_assignee<S: RepairStore>(store: &S, key: &str) -> OpReport {
  let result: Result<OpReport> = async {
    let id = expect_kind(key, EntityKind::Assignee)?;
    store.delete_assignee(id).await.map_err(Into::into)?;
    Ok(OpReport::done(format!("assignee {key} deleted")))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

// ─── Repair orders ───────────────────────────────────────────────────────────

pub async fn create_order<S: RepairStore>(store: &S, req: CreateOrder) -> OpReport {
  let result: Result<OpReport> = async {
    let status = match &req.status_key {
      Some(key) => resolve_status(store, key).await?,
      None => {
        // The lowest-id status is the workflow default.
        let Some(first) = store
          .list_statuses()
          .await
          .map_err(Into::into)?
          .into_iter()
          .next()
        else {
          return Ok(OpReport::fail(
            "no statuses defined; add one before creating repair orders",
          ));
        };
        first
      }
    };

    let order = store
      .add_order(NewOrder {
        name:      req.name.clone(),
        status_id: status.id,
        summary:   req.summary.clone(),
        received:  req.received,
      })
      .await
      .map_err(Into::into)?;

    Ok(
      OpReport::done(format!("repair order {:?} added", order.name))
        .with_data(json!({ "key": order.key() })),
    )
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn update_order<S: RepairStore>(
  store: &S,
  key: &str,
  req: UpdateOrder,
) -> OpReport {
  let result: Result<OpReport> = async {
    let order = resolve_order(store, key).await?;

    let status_id = match &req.status_key {
      Some(k) => Some(resolve_status(store, k).await?.id),
      None => None,
    };

    let updated = store
      .update_order(order.id, OrderPatch {
        name: req.name.clone(),
        status_id,
        summary: req.summary.clone(),
        received: req.received,
        finished: req.finished,
      })
      .await
      .map_err(Into::into)?;

    Ok(OpReport::done(format!("repair order {} updated", updated.key())))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn delete_order<S: RepairStore>(store: &S, key: &str) -> OpReport {
  let result: Result<OpReport> = async {
    let id = expect_kind(key, EntityKind::RepairOrder)?;
    store.delete_order(id).await.map_err(Into::into)?;
    Ok(OpReport::done(format!("repair order {key} deleted")))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

// ─── Repair units ────────────────────────────────────────────────────────────

pub async fn create_unit<S: RepairStore>(store: &S, req: CreateUnit) -> OpReport {
  let result: Result<OpReport> = async {
    let order = resolve_order(store, &req.order_key).await?;
    let unit_type: UnitType = req.unit_type.parse()?;

    let status = match &req.status_key {
      Some(k) => resolve_status(store, k).await?,
      None => store
        .get_status(order.status_id)
        .await
        .map_err(Into::into)?
        .ok_or(Error::NotFound(EntityKey::new(EntityKind::Status, order.status_id)))?,
    };
    let assignee = match &req.assignee_key {
      Some(k) => Some(resolve_assignee(store, k).await?),
      None => None,
    };

    // Seed the journal with the creation-time status so the unit's timeline
    // spans from day one. The assignee snapshot may be empty here.
    let mut journal = Journal::new();
    journal.append(Event::now(
      assignee.as_ref().map(|a| a.name.as_str()).unwrap_or(""),
      EventDetail::Status { status: status.name.clone() },
    ));

    let unit = store
      .add_unit(NewUnit {
        serial:              req.serial.clone(),
        unit_type,
        current_status_id:   status.id,
        current_assignee_id: assignee.map(|a| a.id),
        repair_order_id:     order.id,
        journal,
      })
      .await
      .map_err(Into::into)?;

    Ok(
      OpReport::done(format!(
        "repair unit {:?} added to {}",
        unit.serial,
        order.key()
      ))
      .with_data(json!({ "key": unit.key() })),
    )
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn update_unit<S: RepairStore>(
  store: &S,
  key: &str,
  req: UpdateUnit,
) -> OpReport {
  let result: Result<OpReport> = async {
    let unit = resolve_unit(store, key).await?;

    // Resolve every referenced key before writing anything, so a bad
    // reference aborts the whole operation.
    let unit_type = match &req.unit_type {
      Some(t) => Some(t.parse::<UnitType>()?),
      None => None,
    };
    let new_status = match &req.status_key {
      Some(k) => Some(resolve_status(store, k).await?),
      None => None,
    };
    let new_assignee = match &req.assignee_key {
      Some(Some(k)) => Some(Some(resolve_assignee(store, k).await?)),
      Some(None) => Some(None),
      None => None,
    };
    let order_id = match &req.order_key {
      Some(k) => Some(resolve_order(store, k).await?.id),
      None => None,
    };

    // Derived status-change event: appended only when the status genuinely
    // changes and an assignee is on record after the patch. The journal
    // rides in the same patch as the scalar change, so both persist in one
    // transaction.
    let mut journal = None;
    if let Some(status) = &new_status {
      if status.id != unit.current_status_id {
        let assignee_name = match &new_assignee {
          Some(Some(a)) => Some(a.name.clone()),
          Some(None) => None,
          None => match unit.current_assignee_id {
            Some(id) => store
              .get_assignee(id)
              .await
              .map_err(Into::into)?
              .map(|a| a.name),
            None => None,
          },
        };
        let current_name = store
          .get_status(unit.current_status_id)
          .await
          .map_err(Into::into)?
          .map(|s| s.name)
          .unwrap_or_default();

        let mut updated = unit.journal.clone();
        if updated.record_status_change(
          &current_name,
          &status.name,
          assignee_name.as_deref(),
        ) {
          journal = Some(updated);
        }
      }
    }

    let updated = store
      .update_unit(unit.id, UnitPatch {
        serial: req.serial.clone(),
        unit_type,
        current_status_id: new_status.as_ref().map(|s| s.id),
        current_assignee_id: new_assignee
          .as_ref()
          .map(|a| a.as_ref().map(|a| a.id)),
        repair_order_id: order_id,
        journal,
      })
      .await
      .map_err(Into::into)?;

    Ok(OpReport::done(format!("repair unit {} updated", updated.key())))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn delete_unit<S: RepairStore>(store: &S, key: &str) -> OpReport {
  let result: Result<OpReport> = async {
    let id = expect_kind(key, EntityKind::RepairUnit)?;
    store.delete_unit(id).await.map_err(Into::into)?;
    Ok(OpReport::done(format!("repair unit {key} deleted")))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

// ─── Journal operations ──────────────────────────────────────────────────────

/// Record an explicitly client-submitted event. A status-typed event here is
/// an annotation or backfilled correction: it never touches the unit's
/// scalar status, which only the update-unit path changes (and auto-logs).
pub async fn add_event<S: RepairStore>(
  store: &S,
  unit_key: &str,
  req: NewEvent,
) -> OpReport {
  let result: Result<OpReport> = async {
    let unit = resolve_unit(store, unit_key).await?;
    let assignee = resolve_assignee(store, &req.assignee_key).await?;

    let detail = match req.event_type.as_str() {
      "status" => {
        let Some(status) = req.status.clone() else {
          return Ok(OpReport::fail("status event requires a status name"));
        };
        EventDetail::Status { status }
      }
      "comment" => {
        let Some(comment) = req.comment.clone() else {
          return Ok(OpReport::fail("comment event requires a comment"));
        };
        EventDetail::Comment { comment }
      }
      "repair" => {
        let Some(comment) = req.comment.clone() else {
          return Ok(OpReport::fail("repair event requires a comment"));
        };
        EventDetail::Repair {
          comment,
          components: req.components.clone().unwrap_or_default(),
        }
      }
      other => {
        return Err(Error::InvalidEnumValue {
          what:  "event type",
          value: other.to_string(),
        });
      }
    };

    // Fresh id, server-side capture time — client clocks are not trusted.
    let event = Event::now(assignee.name, detail);
    let event_id = event.id;

    let mut journal = unit.journal.clone();
    journal.append(event);
    store
      .update_unit(unit.id, UnitPatch { journal: Some(journal), ..Default::default() })
      .await
      .map_err(Into::into)?;

    Ok(
      OpReport::done(format!(
        "{} event recorded for {}",
        req.event_type,
        unit.key()
      ))
      .with_data(json!({ "event_id": event_id })),
    )
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

pub async fn remove_event<S: RepairStore>(
  store: &S,
  unit_key: &str,
  event_id: uuid::Uuid,
) -> OpReport {
  let result: Result<OpReport> = async {
    let unit = resolve_unit(store, unit_key).await?;

    let mut journal = unit.journal.clone();
    journal.remove(event_id)?;
    store
      .update_unit(unit.id, UnitPatch { journal: Some(journal), ..Default::default() })
      .await
      .map_err(Into::into)?;

    Ok(OpReport::done(format!("event {event_id} removed from {}", unit.key())))
  }
  .await;
  result.unwrap_or_else(OpReport::fail)
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub async fn status_views<S: RepairStore>(store: &S) -> Result<Vec<StatusView>> {
  let statuses = store.list_statuses().await.map_err(Into::into)?;
  Ok(
    statuses
      .into_iter()
      .map(|s| StatusView { key: s.key(), name: s.name })
      .collect(),
  )
}

pub async fn assignee_views<S: RepairStore>(store: &S) -> Result<Vec<AssigneeView>> {
  let assignees = store.list_assignees().await.map_err(Into::into)?;
  Ok(
    assignees
      .into_iter()
      .map(|a| AssigneeView { key: a.key(), name: a.name })
      .collect(),
  )
}

async fn status_names<S: RepairStore>(store: &S) -> Result<HashMap<i64, String>> {
  Ok(
    store
      .list_statuses()
      .await
      .map_err(Into::into)?
      .into_iter()
      .map(|s| (s.id, s.name))
      .collect(),
  )
}

pub async fn order_views<S: RepairStore>(store: &S) -> Result<Vec<OrderView>> {
  let names = status_names(store).await?;
  let orders = store.list_orders().await.map_err(Into::into)?;
  Ok(
    orders
      .into_iter()
      .map(|o| OrderView {
        key:        o.key(),
        status:     names.get(&o.status_id).cloned(),
        status_key: EntityKey::new(EntityKind::Status, o.status_id),
        name:       o.name,
        summary:    o.summary,
        created:    o.created,
        received:   o.received,
        finished:   o.finished,
      })
      .collect(),
  )
}

pub async fn unit_views<S: RepairStore>(
  store: &S,
  order_key: &str,
) -> Result<Vec<UnitView>> {
  let order = resolve_order(store, order_key).await?;
  let statuses = status_names(store).await?;
  let assignees: HashMap<i64, String> = store
    .list_assignees()
    .await
    .map_err(Into::into)?
    .into_iter()
    .map(|a| (a.id, a.name))
    .collect();

  let units = store.list_units(order.id).await.map_err(Into::into)?;
  Ok(
    units
      .into_iter()
      .map(|u| UnitView {
        key:                  u.key(),
        serial:               u.serial.clone(),
        unit_type:            u.unit_type,
        current_status:       statuses.get(&u.current_status_id).cloned(),
        current_status_key:   EntityKey::new(EntityKind::Status, u.current_status_id),
        current_assignee:     u
          .current_assignee_id
          .and_then(|id| assignees.get(&id).cloned()),
        current_assignee_key: u
          .current_assignee_id
          .map(|id| EntityKey::new(EntityKind::Assignee, id)),
        repair_order_key:     u.order_key(),
        created:              u.created,
        updated_at:           u.updated_at,
        events:               u.journal.events().to_vec(),
      })
      .collect(),
  )
}

pub async fn unit_events<S: RepairStore>(
  store: &S,
  unit_key: &str,
) -> Result<Vec<Event>> {
  let unit = resolve_unit(store, unit_key).await?;
  Ok(unit.journal.events().to_vec())
}

/// The Status-Change Indexer over one order's units.
pub async fn order_status_index<S: RepairStore>(
  store: &S,
  order_key: &str,
) -> Result<Vec<UnitStatusHistory>> {
  let order = resolve_order(store, order_key).await?;
  let units = store.list_units(order.id).await.map_err(Into::into)?;
  Ok(status_index(&units))
}

/// The Timeline Builder over one order's units. A malformed key fails before
/// any data is read; an order with zero units (or zero status events) is an
/// empty timeline, not an error.
pub async fn order_timeline<S: RepairStore>(
  store: &S,
  order_key: &str,
) -> Result<Timeline> {
  let order = resolve_order(store, order_key).await?;
  let units = store.list_units(order.id).await.map_err(Into::into)?;
  Ok(build_timeline(&units))
}
