//! SQL schema for the Wrench SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS statuses (
    status_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS assignees (
    assignee_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS repair_orders (
    order_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT NOT NULL,
    status_id INTEGER NOT NULL REFERENCES statuses(status_id),
    summary   TEXT,
    created   TEXT NOT NULL,    -- ISO 8601 UTC; store-assigned, immutable
    received  TEXT,
    finished  TEXT
);

CREATE TABLE IF NOT EXISTS repair_units (
    unit_id             INTEGER PRIMARY KEY AUTOINCREMENT,
    serial              TEXT NOT NULL,
    unit_type           TEXT NOT NULL,    -- 'machine' | 'hashboard'
    current_status_id   INTEGER NOT NULL REFERENCES statuses(status_id),
    current_assignee_id INTEGER REFERENCES assignees(assignee_id),
    repair_order_id     INTEGER NOT NULL REFERENCES repair_orders(order_id),
    created             TEXT NOT NULL,
    updated_at          TEXT NOT NULL,    -- touched on every mutation
    journal             TEXT NOT NULL DEFAULT '{\"events\":[]}'
);

CREATE INDEX IF NOT EXISTS units_order_idx    ON repair_units(repair_order_id);
CREATE INDEX IF NOT EXISTS units_status_idx   ON repair_units(current_status_id);
CREATE INDEX IF NOT EXISTS orders_status_idx  ON repair_orders(status_id);

PRAGMA user_version = 1;
";
