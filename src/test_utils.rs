#![allow(missing_docs)]

//! Helpers for seeding the test database.
//!
//! Rows are inserted without going through the public API so tests can set up
//! fixtures even for states the API would reject. IDs are assigned by SQLite
//! in insert order starting from 1.

use rusqlite::{Connection, params};

pub(crate) fn insert_test_user(conn: &Connection, email: &str) {
    conn.execute(
        "INSERT INTO user (email, password) VALUES (?1, 'hunter2')",
        params![email],
    )
    .unwrap();
}

pub(crate) fn insert_test_account(conn: &Connection, user_id: i64, name: &str) {
    conn.execute(
        "INSERT INTO account (user_id, name, kind, starting_balance, current_balance, \
         available_balance, currency, is_sync_enabled) \
         VALUES (?1, ?2, 'checking', 0.0, 0.0, 0.0, 'USD', 0)",
        params![user_id, name],
    )
    .unwrap();
}

pub(crate) fn insert_test_category(conn: &Connection, user_id: i64, name: &str) {
    conn.execute(
        "INSERT INTO category (user_id, name, kind) VALUES (?1, ?2, 'expense')",
        params![user_id, name],
    )
    .unwrap();
}
