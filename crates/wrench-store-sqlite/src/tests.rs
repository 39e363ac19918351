//! Integration tests for `SqliteStore` against an in-memory database, plus
//! the service-level flows that compose store and journal.

use uuid::Uuid;
use wrench_core::{
  Error as CoreError,
  entity::{NewOrder, NewUnit, OrderPatch, UnitPatch, UnitType},
  event::{Event, EventDetail, Journal},
  service::{self, CreateOrder, CreateUnit, NewEvent, UpdateUnit},
  store::RepairStore as _,
  timeline::SERIES_TOTAL_UNITS,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn new_order(name: &str, status_id: i64) -> NewOrder {
  NewOrder {
    name:      name.into(),
    status_id,
    summary:   None,
    received:  None,
  }
}

fn new_unit(serial: &str, status_id: i64, order_id: i64) -> NewUnit {
  NewUnit {
    serial:              serial.into(),
    unit_type:           UnitType::Machine,
    current_status_id:   status_id,
    current_assignee_id: None,
    repair_order_id:     order_id,
    journal:             Journal::new(),
  }
}

// ─── Statuses & assignees ────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_status() {
  let s = store().await;

  let status = s.add_status("Backlog").await.unwrap();
  let fetched = s.get_status(status.id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Backlog");
  assert_eq!(fetched.key().to_string(), format!("ST-{}", status.id));
}

#[tokio::test]
async fn duplicate_status_name_errors() {
  let s = store().await;
  s.add_status("Backlog").await.unwrap();

  let err = s.add_status("Backlog").await.unwrap_err();
  assert!(matches!(err, Error::DuplicateName { .. }));

  // Case-sensitive: a different casing is a different name.
  s.add_status("backlog").await.unwrap();
}

#[tokio::test]
async fn rename_status_checks_existence_and_collisions() {
  let s = store().await;
  let a = s.add_status("Backlog").await.unwrap();
  s.add_status("Done").await.unwrap();

  let err = s.rename_status(a.id, "Done").await.unwrap_err();
  assert!(matches!(err, Error::DuplicateName { .. }));

  let err = s.rename_status(999, "Anything").await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  let renamed = s.rename_status(a.id, "Triage").await.unwrap();
  assert_eq!(renamed.name, "Triage");
  assert_eq!(s.get_status(a.id).await.unwrap().unwrap().name, "Triage");
}

#[tokio::test]
async fn delete_status_blocked_while_referenced() {
  let s = store().await;
  let status = s.add_status("Backlog").await.unwrap();
  let order = s.add_order(new_order("Batch A", status.id)).await.unwrap();

  let err = s.delete_status(status.id).await.unwrap_err();
  assert!(matches!(err, Error::ReferentialConflict(_)));

  // Point the order elsewhere and the delete goes through.
  let other = s.add_status("Done").await.unwrap();
  s.update_order(order.id, OrderPatch {
    status_id: Some(other.id),
    ..Default::default()
  })
  .await
  .unwrap();
  s.delete_status(status.id).await.unwrap();
  assert!(s.get_status(status.id).await.unwrap().is_none());
}

#[tokio::test]
async fn assignee_lifecycle_and_guards() {
  let s = store().await;
  let ada = s.add_assignee("Ada").await.unwrap();

  let err = s.add_assignee("Ada").await.unwrap_err();
  assert!(matches!(err, Error::DuplicateName { .. }));

  let status = s.add_status("Backlog").await.unwrap();
  let order = s.add_order(new_order("Batch A", status.id)).await.unwrap();
  let mut unit = new_unit("SN001", status.id, order.id);
  unit.current_assignee_id = Some(ada.id);
  let unit = s.add_unit(unit).await.unwrap();

  let err = s.delete_assignee(ada.id).await.unwrap_err();
  assert!(matches!(err, Error::ReferentialConflict(_)));

  s.update_unit(unit.id, UnitPatch {
    current_assignee_id: Some(None),
    ..Default::default()
  })
  .await
  .unwrap();
  s.delete_assignee(ada.id).await.unwrap();
}

// ─── Orders ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn order_update_merges_patch_and_keeps_created() {
  let s = store().await;
  let status = s.add_status("Backlog").await.unwrap();
  let order = s.add_order(new_order("Batch A", status.id)).await.unwrap();

  let updated = s
    .update_order(order.id, OrderPatch {
      name: Some("Batch A1".into()),
      summary: Some(Some("water damage batch".into())),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.name, "Batch A1");
  assert_eq!(updated.summary.as_deref(), Some("water damage batch"));
  assert_eq!(updated.status_id, status.id);
  assert_eq!(updated.created, order.created);
}

#[tokio::test]
async fn delete_order_guarded_by_units() {
  let s = store().await;
  let status = s.add_status("Backlog").await.unwrap();
  let order = s.add_order(new_order("Batch A", status.id)).await.unwrap();
  let unit = s.add_unit(new_unit("SN001", status.id, order.id)).await.unwrap();

  let err = s.delete_order(order.id).await.unwrap_err();
  assert!(matches!(err, Error::ReferentialConflict(_)));

  s.delete_unit(unit.id).await.unwrap();
  s.delete_order(order.id).await.unwrap();
  assert!(s.get_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_rows_surface_as_not_found() {
  let s = store().await;
  assert!(s.get_order(42).await.unwrap().is_none());
  assert!(s.get_unit(42).await.unwrap().is_none());

  let err = s.update_order(42, OrderPatch::default()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
  let err = s.delete_unit(42).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── Units & journal persistence ─────────────────────────────────────────────

#[tokio::test]
async fn journal_round_trips_through_the_unit_row() {
  let s = store().await;
  let status = s.add_status("Backlog").await.unwrap();
  let order = s.add_order(new_order("Batch A", status.id)).await.unwrap();

  let mut journal = Journal::new();
  journal.append(Event::now("Ada", EventDetail::Status { status: "Backlog".into() }));
  journal.append(Event::now("Ada", EventDetail::Comment { comment: "fan rattles".into() }));
  journal.append(Event::now("Grace", EventDetail::Repair {
    comment:    "swapped fan".into(),
    components: vec!["FAN-03".into()],
  }));

  let mut input = new_unit("SN001", status.id, order.id);
  input.journal = journal.clone();
  let unit = s.add_unit(input).await.unwrap();

  let fetched = s.get_unit(unit.id).await.unwrap().unwrap();
  assert_eq!(fetched.journal, journal);

  // Appending through update_unit preserves the earlier entries in order.
  let mut grown = fetched.journal.clone();
  grown.append(Event::now("Ada", EventDetail::Comment { comment: "retested".into() }));
  s.update_unit(unit.id, UnitPatch { journal: Some(grown.clone()), ..Default::default() })
    .await
    .unwrap();

  let fetched = s.get_unit(unit.id).await.unwrap().unwrap();
  assert_eq!(fetched.journal, grown);
  assert_eq!(fetched.journal.len(), 4);
}

#[tokio::test]
async fn update_unit_touches_updated_at() {
  let s = store().await;
  let status = s.add_status("Backlog").await.unwrap();
  let order = s.add_order(new_order("Batch A", status.id)).await.unwrap();
  let unit = s.add_unit(new_unit("SN001", status.id, order.id)).await.unwrap();

  let updated = s
    .update_unit(unit.id, UnitPatch {
      serial: Some("SN001-R".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.serial, "SN001-R");
  assert!(updated.updated_at >= unit.updated_at);
  assert_eq!(updated.created, unit.created);
}

#[tokio::test]
async fn list_units_only_returns_the_orders_units() {
  let s = store().await;
  let status = s.add_status("Backlog").await.unwrap();
  let a = s.add_order(new_order("Batch A", status.id)).await.unwrap();
  let b = s.add_order(new_order("Batch B", status.id)).await.unwrap();

  s.add_unit(new_unit("SN001", status.id, a.id)).await.unwrap();
  s.add_unit(new_unit("SN002", status.id, a.id)).await.unwrap();
  s.add_unit(new_unit("SN003", status.id, b.id)).await.unwrap();

  let units = s.list_units(a.id).await.unwrap();
  assert_eq!(units.len(), 2);
  assert!(units.iter().all(|u| u.repair_order_id == a.id));
}

// ─── Service flows ───────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_scenario() {
  let s = store().await;

  let report = service::add_status(&s, "Backlog").await;
  assert!(report.ok, "{}", report.message);

  let report = service::create_order(&s, CreateOrder {
    name:       "Batch A".into(),
    status_key: None,
    summary:    None,
    received:   None,
  })
  .await;
  assert!(report.ok, "{}", report.message);
  let order_key = report.data.unwrap()["key"].as_str().unwrap().to_string();
  assert_eq!(order_key, "RO-1");

  let report = service::create_unit(&s, CreateUnit {
    order_key:    order_key.clone(),
    serial:       "SN001".into(),
    unit_type:    "machine".into(),
    status_key:   None,
    assignee_key: None,
  })
  .await;
  assert!(report.ok, "{}", report.message);
  let unit_key = report.data.unwrap()["key"].as_str().unwrap().to_string();

  // Creation seeded one status event.
  let events = service::unit_events(&s, &unit_key).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].detail, EventDetail::Status { status: "Backlog".into() });

  let done = service::add_status(&s, "Done").await;
  assert!(done.ok);
  let done_key = done.data.unwrap()["key"].as_str().unwrap().to_string();
  let ada = service::add_assignee(&s, "Ada").await;
  assert!(ada.ok);
  let ada_key = ada.data.unwrap()["key"].as_str().unwrap().to_string();

  let report = service::update_unit(&s, &unit_key, UpdateUnit {
    status_key: Some(done_key),
    assignee_key: Some(Some(ada_key)),
    ..Default::default()
  })
  .await;
  assert!(report.ok, "{}", report.message);

  // Journal now holds both status events, in order.
  let events = service::unit_events(&s, &unit_key).await.unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(events[0].detail, EventDetail::Status { status: "Backlog".into() });
  assert_eq!(events[1].detail, EventDetail::Status { status: "Done".into() });
  assert_eq!(events[1].assignee, "Ada");

  // Both events land today, so the timeline is one bucket where the later
  // status wins and the totals count the unit once.
  let timeline = service::order_timeline(&s, &order_key).await.unwrap();
  assert_eq!(timeline.len(), 1);
  let buckets = timeline.values().next().unwrap();
  assert!(!buckets.contains_key("Backlog"));
  assert_eq!(buckets["Done"].len(), 1);
  assert_eq!(buckets[SERIES_TOTAL_UNITS].len(), 1);
  assert_eq!(buckets["Done"][0].assignee.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn status_change_without_assignee_is_not_logged() {
  let s = store().await;
  service::add_status(&s, "Backlog").await;
  let done = service::add_status(&s, "Done").await;
  let done_key = done.data.unwrap()["key"].as_str().unwrap().to_string();

  service::create_order(&s, CreateOrder {
    name:       "Batch A".into(),
    status_key: None,
    summary:    None,
    received:   None,
  })
  .await;
  let unit = service::create_unit(&s, CreateUnit {
    order_key:    "RO-1".into(),
    serial:       "SN001".into(),
    unit_type:    "machine".into(),
    status_key:   None,
    assignee_key: None,
  })
  .await;
  let unit_key = unit.data.unwrap()["key"].as_str().unwrap().to_string();

  let report = service::update_unit(&s, &unit_key, UpdateUnit {
    status_key: Some(done_key),
    ..Default::default()
  })
  .await;
  assert!(report.ok);

  // The scalar status moved, but no assignee was on record, so the derived
  // event was suppressed — only the creation event remains.
  let views = service::unit_views(&s, "RO-1").await.unwrap();
  assert_eq!(views[0].current_status.as_deref(), Some("Done"));
  assert_eq!(views[0].events.len(), 1);
}

#[tokio::test]
async fn explicit_status_event_leaves_scalar_status_alone() {
  let s = store().await;
  service::add_status(&s, "Backlog").await;
  let ada = service::add_assignee(&s, "Ada").await;
  let ada_key = ada.data.unwrap()["key"].as_str().unwrap().to_string();

  service::create_order(&s, CreateOrder {
    name:       "Batch A".into(),
    status_key: None,
    summary:    None,
    received:   None,
  })
  .await;
  let unit = service::create_unit(&s, CreateUnit {
    order_key:    "RO-1".into(),
    serial:       "SN001".into(),
    unit_type:    "hashboard".into(),
    status_key:   None,
    assignee_key: None,
  })
  .await;
  let unit_key = unit.data.unwrap()["key"].as_str().unwrap().to_string();

  let report = service::add_event(&s, &unit_key, NewEvent {
    event_type:   "status".into(),
    assignee_key: ada_key,
    status:       Some("Testing".into()),
    comment:      None,
    components:   None,
  })
  .await;
  assert!(report.ok, "{}", report.message);

  let views = service::unit_views(&s, "RO-1").await.unwrap();
  assert_eq!(views[0].events.len(), 2);
  // Backfilled/explicit status events annotate history only.
  assert_eq!(views[0].current_status.as_deref(), Some("Backlog"));
}

#[tokio::test]
async fn add_and_remove_event_round_trip() {
  let s = store().await;
  service::add_status(&s, "Backlog").await;
  let ada = service::add_assignee(&s, "Ada").await;
  let ada_key = ada.data.unwrap()["key"].as_str().unwrap().to_string();

  service::create_order(&s, CreateOrder {
    name:       "Batch A".into(),
    status_key: None,
    summary:    None,
    received:   None,
  })
  .await;
  let unit = service::create_unit(&s, CreateUnit {
    order_key:    "RO-1".into(),
    serial:       "SN001".into(),
    unit_type:    "machine".into(),
    status_key:   None,
    assignee_key: None,
  })
  .await;
  let unit_key = unit.data.unwrap()["key"].as_str().unwrap().to_string();

  let report = service::add_event(&s, &unit_key, NewEvent {
    event_type:   "repair".into(),
    assignee_key: ada_key,
    status:       None,
    comment:      Some("reflowed PSU".into()),
    components:   Some(vec!["PSU-01".into()]),
  })
  .await;
  assert!(report.ok, "{}", report.message);
  let event_id: Uuid = report.data.unwrap()["event_id"]
    .as_str()
    .unwrap()
    .parse()
    .unwrap();

  let report = service::remove_event(&s, &unit_key, event_id).await;
  assert!(report.ok, "{}", report.message);
  assert_eq!(service::unit_events(&s, &unit_key).await.unwrap().len(), 1);

  // Removing it again fails and changes nothing.
  let report = service::remove_event(&s, &unit_key, event_id).await;
  assert!(!report.ok);
  assert!(report.message.contains("event not found"));
  assert_eq!(service::unit_events(&s, &unit_key).await.unwrap().len(), 1);
}

#[tokio::test]
async fn mutation_failures_fold_into_the_report() {
  let s = store().await;
  service::add_status(&s, "Backlog").await;

  let report = service::add_status(&s, "Backlog").await;
  assert!(!report.ok);
  assert!(report.message.contains("already exists"), "{}", report.message);

  let report = service::delete_order(&s, "AS-1").await;
  assert!(!report.ok);
  assert!(report.message.contains("expected RO key"), "{}", report.message);

  service::create_order(&s, CreateOrder {
    name:       "Batch A".into(),
    status_key: None,
    summary:    None,
    received:   None,
  })
  .await;
  service::create_unit(&s, CreateUnit {
    order_key:    "RO-1".into(),
    serial:       "SN001".into(),
    unit_type:    "machine".into(),
    status_key:   None,
    assignee_key: None,
  })
  .await;

  let report = service::delete_order(&s, "RO-1").await;
  assert!(!report.ok);
  assert!(report.message.contains("still has"), "{}", report.message);

  let report = service::create_unit(&s, CreateUnit {
    order_key:    "RO-1".into(),
    serial:       "SN002".into(),
    unit_type:    "toaster".into(),
    status_key:   None,
    assignee_key: None,
  })
  .await;
  assert!(!report.ok);
  assert!(report.message.contains("unknown unit type"), "{}", report.message);
}

#[tokio::test]
async fn read_errors_stay_typed_for_the_transport() {
  let s = store().await;

  let err = service::order_timeline(&s, "not-a-key-at-all").await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidKeyFormat(_)));

  let err = service::order_timeline(&s, "RO-99").await.unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));

  // An order with zero units is an empty timeline, not an error.
  service::add_status(&s, "Backlog").await;
  service::create_order(&s, CreateOrder {
    name:       "Batch A".into(),
    status_key: None,
    summary:    None,
    received:   None,
  })
  .await;
  let timeline = service::order_timeline(&s, "RO-1").await.unwrap();
  assert!(timeline.is_empty());
}
