//! The `RepairStore` trait — the Entity Store contract.
//!
//! Implemented by storage backends (e.g. `wrench-store-sqlite`). Higher
//! layers (`wrench_core::service`, `wrench-api`) depend on this abstraction,
//! not on any concrete backend. Each mutating method executes as one
//! all-or-nothing transaction: no partial state (say, a unit's scalar status
//! changed but its journal write dropped) may be observably persisted.
//!
//! All methods return `Send` futures so the trait can be used from
//! multi-threaded async runtimes (tokio with `axum`).

use std::future::Future;

use crate::{
  entity::{
    Assignee, NewOrder, NewUnit, OrderPatch, RepairOrder, RepairUnit, Status,
    UnitPatch,
  },
  error::Error,
};

/// Abstraction over a wrench storage backend.
///
/// Uniqueness (status/assignee names) and referential guards (order, status,
/// and assignee deletion while referenced) are enforced here and surface as
/// the corresponding [`Error`](crate::Error) variants after conversion.
pub trait RepairStore: Send + Sync {
  type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

  // ── Statuses ──────────────────────────────────────────────────────────

  fn add_status<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Status, Self::Error>> + Send + 'a;

  fn get_status(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Status>, Self::Error>> + Send + '_;

  /// All statuses, id-ascending (creation order).
  fn list_statuses(
    &self,
  ) -> impl Future<Output = Result<Vec<Status>, Self::Error>> + Send + '_;

  fn rename_status<'a>(
    &'a self,
    id: i64,
    new_name: &'a str,
  ) -> impl Future<Output = Result<Status, Self::Error>> + Send + 'a;

  fn delete_status(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Assignees ─────────────────────────────────────────────────────────

  fn add_assignee<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Assignee, Self::Error>> + Send + 'a;

  fn get_assignee(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Assignee>, Self::Error>> + Send + '_;

  fn list_assignees(
    &self,
  ) -> impl Future<Output = Result<Vec<Assignee>, Self::Error>> + Send + '_;

  fn rename_assignee<'a>(
    &'a self,
    id: i64,
    new_name: &'a str,
  ) -> impl Future<Output = Result<Assignee, Self::Error>> + Send + 'a;

  fn delete_assignee(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Repair orders ─────────────────────────────────────────────────────

  fn add_order(
    &self,
    input: NewOrder,
  ) -> impl Future<Output = Result<RepairOrder, Self::Error>> + Send + '_;

  fn get_order(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<RepairOrder>, Self::Error>> + Send + '_;

  fn list_orders(
    &self,
  ) -> impl Future<Output = Result<Vec<RepairOrder>, Self::Error>> + Send + '_;

  fn update_order(
    &self,
    id: i64,
    patch: OrderPatch,
  ) -> impl Future<Output = Result<RepairOrder, Self::Error>> + Send + '_;

  /// Fails with a referential conflict while any unit references the order.
  /// A guard, not a cascade.
  fn delete_order(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Repair units ──────────────────────────────────────────────────────

  fn add_unit(
    &self,
    input: NewUnit,
  ) -> impl Future<Output = Result<RepairUnit, Self::Error>> + Send + '_;

  fn get_unit(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<RepairUnit>, Self::Error>> + Send + '_;

  /// All units belonging to one order, id-ascending.
  fn list_units(
    &self,
    order_id: i64,
  ) -> impl Future<Output = Result<Vec<RepairUnit>, Self::Error>> + Send + '_;

  /// Applies the patch and touches `updated_at` in one transaction.
  fn update_unit(
    &self,
    id: i64,
    patch: UnitPatch,
  ) -> impl Future<Output = Result<RepairUnit, Self::Error>> + Send + '_;

  fn delete_unit(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
