#![allow(dead_code)]

use restlist_core::db::open_db_in_memory;
use restlist_core::{ListConfig, ListRecord, ListService, ScopeValues, SqliteListStore};
use rusqlite::Connection;

pub fn setup(schema: &str) -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(schema).unwrap();
    conn
}

pub fn service<'conn>(
    conn: &'conn Connection,
    config: &ListConfig,
) -> ListService<SqliteListStore<'conn>> {
    ListService::new(SqliteListStore::try_new(conn, config).unwrap())
}

/// Positions of a scope in list order.
pub fn positions(service: &ListService<SqliteListStore<'_>>, scope: &ScopeValues) -> Vec<i64> {
    service
        .members(scope)
        .unwrap()
        .into_iter()
        .map(|record| record.position.unwrap())
        .collect()
}

/// Record ids of a scope in list order.
pub fn ids(service: &ListService<SqliteListStore<'_>>, scope: &ScopeValues) -> Vec<i64> {
    service
        .members(scope)
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect()
}

pub fn global() -> ScopeValues {
    ScopeValues::new()
}

/// Member of `scope` currently stored at `position`.
pub fn at(
    service: &ListService<SqliteListStore<'_>>,
    scope: &ScopeValues,
    position: i64,
) -> ListRecord {
    service
        .members(scope)
        .unwrap()
        .into_iter()
        .find(|record| record.position == Some(position))
        .unwrap_or_else(|| panic!("no member at position {position}"))
}
