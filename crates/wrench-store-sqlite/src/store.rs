//! [`SqliteStore`] — the SQLite implementation of [`RepairStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use wrench_core::{
  entity::{
    Assignee, NewOrder, NewUnit, OrderPatch, RepairOrder, RepairUnit, Status,
    UnitPatch,
  },
  key::{EntityKey, EntityKind},
  store::RepairStore,
};

use crate::{
  Error, Result,
  encode::{RawOrder, RawUnit, encode_dt, encode_unit_type},
  schema::SCHEMA,
};

/// Workflow status seeded into a brand-new store file, so orders and units
/// can be created immediately.
const DEFAULT_STATUS: &str = "Backlog";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Wrench repair store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// run serially on the connection's thread, so every method below is one
/// atomic unit of work.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Classified result of a guarded rename, produced inside the write
/// transaction and mapped to a typed error outside it.
enum Renamed {
  Done,
  Missing,
  Duplicate,
}

/// Classified result of a guarded delete.
enum Deleted {
  Done,
  Missing,
  Blocked(String),
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// seed the default status when the table is empty.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    store.seed_default_status().await?;
    Ok(store)
  }

  /// Open a blank in-memory store — useful for testing. Nothing is seeded.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn seed_default_status(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let count: i64 =
          conn.query_row("SELECT COUNT(*) FROM statuses", [], |r| r.get(0))?;
        if count == 0 {
          conn.execute(
            "INSERT INTO statuses (name) VALUES (?1)",
            rusqlite::params![DEFAULT_STATUS],
          )?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Shared helpers for the two name-keyed reference tables ────────────────

  /// Insert into a `(id, name)` table; `None` means the name is taken.
  async fn add_named(
    &self,
    table: &'static str,
    kind: EntityKind,
    name: &str,
  ) -> Result<i64> {
    let name_param = name.to_owned();
    let inserted: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            &format!("SELECT 1 FROM {table} WHERE name = ?1"),
            rusqlite::params![name_param],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(None);
        }
        tx.execute(
          &format!("INSERT INTO {table} (name) VALUES (?1)"),
          rusqlite::params![name_param],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    inserted.ok_or_else(|| Error::DuplicateName { kind, name: name.to_owned() })
  }

  async fn get_named(
    &self,
    table: &'static str,
    id_col: &'static str,
    id: i64,
  ) -> Result<Option<(i64, String)>> {
    let row: Option<(i64, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {id_col}, name FROM {table} WHERE {id_col} = ?1"),
              rusqlite::params![id],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  async fn list_named(
    &self,
    table: &'static str,
    id_col: &'static str,
  ) -> Result<Vec<(i64, String)>> {
    let rows: Vec<(i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {id_col}, name FROM {table} ORDER BY {id_col}"
        ))?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn rename_named(
    &self,
    table: &'static str,
    id_col: &'static str,
    kind: EntityKind,
    id: i64,
    new_name: &str,
  ) -> Result<()> {
    let name_param = new_name.to_owned();
    let outcome: Renamed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists: bool = tx
          .query_row(
            &format!("SELECT 1 FROM {table} WHERE {id_col} = ?1"),
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(Renamed::Missing);
        }
        let taken: bool = tx
          .query_row(
            &format!("SELECT 1 FROM {table} WHERE name = ?1 AND {id_col} != ?2"),
            rusqlite::params![name_param, id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(Renamed::Duplicate);
        }
        tx.execute(
          &format!("UPDATE {table} SET name = ?1 WHERE {id_col} = ?2"),
          rusqlite::params![name_param, id],
        )?;
        tx.commit()?;
        Ok(Renamed::Done)
      })
      .await?;

    match outcome {
      Renamed::Done => Ok(()),
      Renamed::Missing => Err(Error::NotFound(EntityKey::new(kind, id))),
      Renamed::Duplicate => Err(Error::DuplicateName {
        kind,
        name: new_name.to_owned(),
      }),
    }
  }
}

// ─── Row fetch helpers ───────────────────────────────────────────────────────

fn fetch_order(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawOrder>> {
  conn
    .query_row(
      "SELECT order_id, name, status_id, summary, created, received, finished
       FROM repair_orders WHERE order_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawOrder {
          id:        row.get(0)?,
          name:      row.get(1)?,
          status_id: row.get(2)?,
          summary:   row.get(3)?,
          created:   row.get(4)?,
          received:  row.get(5)?,
          finished:  row.get(6)?,
        })
      },
    )
    .optional()
}

fn fetch_unit(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawUnit>> {
  conn
    .query_row(
      "SELECT unit_id, serial, unit_type, current_status_id,
              current_assignee_id, repair_order_id, created, updated_at, journal
       FROM repair_units WHERE unit_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawUnit {
          id:                  row.get(0)?,
          serial:              row.get(1)?,
          unit_type:           row.get(2)?,
          current_status_id:   row.get(3)?,
          current_assignee_id: row.get(4)?,
          repair_order_id:     row.get(5)?,
          created:             row.get(6)?,
          updated_at:          row.get(7)?,
          journal:             row.get(8)?,
        })
      },
    )
    .optional()
}

// ─── RepairStore impl ────────────────────────────────────────────────────────

impl RepairStore for SqliteStore {
  type Error = Error;

  // ── Statuses ──────────────────────────────────────────────────────────────

  async fn add_status(&self, name: &str) -> Result<Status> {
    let id = self.add_named("statuses", EntityKind::Status, name).await?;
    Ok(Status { id, name: name.to_owned() })
  }

  async fn get_status(&self, id: i64) -> Result<Option<Status>> {
    let row = self.get_named("statuses", "status_id", id).await?;
    Ok(row.map(|(id, name)| Status { id, name }))
  }

  async fn list_statuses(&self) -> Result<Vec<Status>> {
    let rows = self.list_named("statuses", "status_id").await?;
    Ok(rows.into_iter().map(|(id, name)| Status { id, name }).collect())
  }

  async fn rename_status(&self, id: i64, new_name: &str) -> Result<Status> {
    self
      .rename_named("statuses", "status_id", EntityKind::Status, id, new_name)
      .await?;
    Ok(Status { id, name: new_name.to_owned() })
  }

  async fn delete_status(&self, id: i64) -> Result<()> {
    let outcome: Deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let name: Option<String> = tx
          .query_row(
            "SELECT name FROM statuses WHERE status_id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(name) = name else { return Ok(Deleted::Missing) };

        let orders: i64 = tx.query_row(
          "SELECT COUNT(*) FROM repair_orders WHERE status_id = ?1",
          rusqlite::params![id],
          |r| r.get(0),
        )?;
        let units: i64 = tx.query_row(
          "SELECT COUNT(*) FROM repair_units WHERE current_status_id = ?1",
          rusqlite::params![id],
          |r| r.get(0),
        )?;
        if orders + units > 0 {
          return Ok(Deleted::Blocked(format!(
            "status {name:?} is still referenced by {} record(s)",
            orders + units
          )));
        }

        tx.execute(
          "DELETE FROM statuses WHERE status_id = ?1",
          rusqlite::params![id],
        )?;
        tx.commit()?;
        Ok(Deleted::Done)
      })
      .await?;

    match outcome {
      Deleted::Done => Ok(()),
      Deleted::Missing => {
        Err(Error::NotFound(EntityKey::new(EntityKind::Status, id)))
      }
      Deleted::Blocked(msg) => Err(Error::ReferentialConflict(msg)),
    }
  }

  // ── Assignees ─────────────────────────────────────────────────────────────

  async fn add_assignee(&self, name: &str) -> Result<Assignee> {
    let id = self.add_named("assignees", EntityKind::Assignee, name).await?;
    Ok(Assignee { id, name: name.to_owned() })
  }

  async fn get_assignee(&self, id: i64) -> Result<Option<Assignee>> {
    let row = self.get_named("assignees", "assignee_id", id).await?;
    Ok(row.map(|(id, name)| Assignee { id, name }))
  }

  async fn list_assignees(&self) -> Result<Vec<Assignee>> {
    let rows = self.list_named("assignees", "assignee_id").await?;
    Ok(rows.into_iter().map(|(id, name)| Assignee { id, name }).collect())
  }

  async fn rename_assignee(&self, id: i64, new_name: &str) -> Result<Assignee> {
    self
      .rename_named("assignees", "assignee_id", EntityKind::Assignee, id, new_name)
      .await?;
    Ok(Assignee { id, name: new_name.to_owned() })
  }

  async fn delete_assignee(&self, id: i64) -> Result<()> {
    let outcome: Deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let name: Option<String> = tx
          .query_row(
            "SELECT name FROM assignees WHERE assignee_id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(name) = name else { return Ok(Deleted::Missing) };

        let units: i64 = tx.query_row(
          "SELECT COUNT(*) FROM repair_units WHERE current_assignee_id = ?1",
          rusqlite::params![id],
          |r| r.get(0),
        )?;
        if units > 0 {
          return Ok(Deleted::Blocked(format!(
            "assignee {name:?} is still assigned to {units} repair unit(s)"
          )));
        }

        tx.execute(
          "DELETE FROM assignees WHERE assignee_id = ?1",
          rusqlite::params![id],
        )?;
        tx.commit()?;
        Ok(Deleted::Done)
      })
      .await?;

    match outcome {
      Deleted::Done => Ok(()),
      Deleted::Missing => {
        Err(Error::NotFound(EntityKey::new(EntityKind::Assignee, id)))
      }
      Deleted::Blocked(msg) => Err(Error::ReferentialConflict(msg)),
    }
  }

  // ── Repair orders ─────────────────────────────────────────────────────────

  async fn add_order(&self, input: NewOrder) -> Result<RepairOrder> {
    let created = Utc::now();

    let name = input.name.clone();
    let status_id = input.status_id;
    let summary = input.summary.clone();
    let created_str = encode_dt(created);
    let received_str = input.received.map(encode_dt);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO repair_orders (name, status_id, summary, created, received, finished)
           VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
          rusqlite::params![name, status_id, summary, created_str, received_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(RepairOrder {
      id,
      name: input.name,
      status_id: input.status_id,
      summary: input.summary,
      created,
      received: input.received,
      finished: None,
    })
  }

  async fn get_order(&self, id: i64) -> Result<Option<RepairOrder>> {
    let raw: Option<RawOrder> =
      self.conn.call(move |conn| Ok(fetch_order(conn, id)?)).await?;
    raw.map(RawOrder::into_order).transpose()
  }

  async fn list_orders(&self) -> Result<Vec<RepairOrder>> {
    let raws: Vec<RawOrder> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT order_id, name, status_id, summary, created, received, finished
           FROM repair_orders ORDER BY order_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawOrder {
              id:        row.get(0)?,
              name:      row.get(1)?,
              status_id: row.get(2)?,
              summary:   row.get(3)?,
              created:   row.get(4)?,
              received:  row.get(5)?,
              finished:  row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOrder::into_order).collect()
  }

  async fn update_order(&self, id: i64, patch: OrderPatch) -> Result<RepairOrder> {
    let name = patch.name;
    let status_id = patch.status_id;
    let summary = patch.summary;
    let received = patch.received.map(|opt| opt.map(encode_dt));
    let finished = patch.finished.map(|opt| opt.map(encode_dt));

    let raw: Option<RawOrder> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut raw) = fetch_order(&tx, id)? else { return Ok(None) };

        if let Some(v) = name {
          raw.name = v;
        }
        if let Some(v) = status_id {
          raw.status_id = v;
        }
        if let Some(v) = summary {
          raw.summary = v;
        }
        if let Some(v) = received {
          raw.received = v;
        }
        if let Some(v) = finished {
          raw.finished = v;
        }

        // `created` is immutable and deliberately absent from the SET list.
        tx.execute(
          "UPDATE repair_orders
           SET name = ?1, status_id = ?2, summary = ?3, received = ?4, finished = ?5
           WHERE order_id = ?6",
          rusqlite::params![
            raw.name,
            raw.status_id,
            raw.summary,
            raw.received,
            raw.finished,
            id
          ],
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw
      .ok_or(Error::NotFound(EntityKey::new(EntityKind::RepairOrder, id)))?
      .into_order()
  }

  async fn delete_order(&self, id: i64) -> Result<()> {
    let outcome: Deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM repair_orders WHERE order_id = ?1",
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(Deleted::Missing);
        }

        let units: i64 = tx.query_row(
          "SELECT COUNT(*) FROM repair_units WHERE repair_order_id = ?1",
          rusqlite::params![id],
          |r| r.get(0),
        )?;
        if units > 0 {
          return Ok(Deleted::Blocked(format!(
            "repair order {} still has {units} repair unit(s)",
            EntityKey::new(EntityKind::RepairOrder, id)
          )));
        }

        tx.execute(
          "DELETE FROM repair_orders WHERE order_id = ?1",
          rusqlite::params![id],
        )?;
        tx.commit()?;
        Ok(Deleted::Done)
      })
      .await?;

    match outcome {
      Deleted::Done => Ok(()),
      Deleted::Missing => {
        Err(Error::NotFound(EntityKey::new(EntityKind::RepairOrder, id)))
      }
      Deleted::Blocked(msg) => Err(Error::ReferentialConflict(msg)),
    }
  }

  // ── Repair units ──────────────────────────────────────────────────────────

  async fn add_unit(&self, input: NewUnit) -> Result<RepairUnit> {
    let now = Utc::now();
    let journal_str = input.journal.encode()?;

    let serial = input.serial.clone();
    let unit_type_str = encode_unit_type(input.unit_type);
    let status_id = input.current_status_id;
    let assignee_id = input.current_assignee_id;
    let order_id = input.repair_order_id;
    let now_str = encode_dt(now);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO repair_units
             (serial, unit_type, current_status_id, current_assignee_id,
              repair_order_id, created, updated_at, journal)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)",
          rusqlite::params![
            serial,
            unit_type_str,
            status_id,
            assignee_id,
            order_id,
            now_str,
            journal_str
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(RepairUnit {
      id,
      serial: input.serial,
      unit_type: input.unit_type,
      current_status_id: input.current_status_id,
      current_assignee_id: input.current_assignee_id,
      repair_order_id: input.repair_order_id,
      created: now,
      updated_at: now,
      journal: input.journal,
    })
  }

  async fn get_unit(&self, id: i64) -> Result<Option<RepairUnit>> {
    let raw: Option<RawUnit> =
      self.conn.call(move |conn| Ok(fetch_unit(conn, id)?)).await?;
    raw.map(RawUnit::into_unit).transpose()
  }

  async fn list_units(&self, order_id: i64) -> Result<Vec<RepairUnit>> {
    let raws: Vec<RawUnit> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT unit_id, serial, unit_type, current_status_id,
                  current_assignee_id, repair_order_id, created, updated_at, journal
           FROM repair_units WHERE repair_order_id = ?1 ORDER BY unit_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![order_id], |row| {
            Ok(RawUnit {
              id:                  row.get(0)?,
              serial:              row.get(1)?,
              unit_type:           row.get(2)?,
              current_status_id:   row.get(3)?,
              current_assignee_id: row.get(4)?,
              repair_order_id:     row.get(5)?,
              created:             row.get(6)?,
              updated_at:          row.get(7)?,
              journal:             row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUnit::into_unit).collect()
  }

  async fn update_unit(&self, id: i64, patch: UnitPatch) -> Result<RepairUnit> {
    let serial = patch.serial;
    let unit_type = patch.unit_type.map(encode_unit_type);
    let status_id = patch.current_status_id;
    let assignee_id = patch.current_assignee_id;
    let order_id = patch.repair_order_id;
    let journal = patch.journal.map(|j| j.encode()).transpose()?;
    let now_str = encode_dt(Utc::now());

    let raw: Option<RawUnit> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut raw) = fetch_unit(&tx, id)? else { return Ok(None) };

        if let Some(v) = serial {
          raw.serial = v;
        }
        if let Some(v) = unit_type {
          raw.unit_type = v.to_owned();
        }
        if let Some(v) = status_id {
          raw.current_status_id = v;
        }
        if let Some(v) = assignee_id {
          raw.current_assignee_id = v;
        }
        if let Some(v) = order_id {
          raw.repair_order_id = v;
        }
        if let Some(v) = journal {
          raw.journal = v;
        }
        raw.updated_at = now_str;

        // One statement carries scalar fields and journal together; a status
        // change and its derived event can never persist separately.
        tx.execute(
          "UPDATE repair_units
           SET serial = ?1, unit_type = ?2, current_status_id = ?3,
               current_assignee_id = ?4, repair_order_id = ?5,
               updated_at = ?6, journal = ?7
           WHERE unit_id = ?8",
          rusqlite::params![
            raw.serial,
            raw.unit_type,
            raw.current_status_id,
            raw.current_assignee_id,
            raw.repair_order_id,
            raw.updated_at,
            raw.journal,
            id
          ],
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw
      .ok_or(Error::NotFound(EntityKey::new(EntityKind::RepairUnit, id)))?
      .into_unit()
  }

  async fn delete_unit(&self, id: i64) -> Result<()> {
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM repair_units WHERE unit_id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::NotFound(EntityKey::new(EntityKind::RepairUnit, id)));
    }
    Ok(())
  }
}
