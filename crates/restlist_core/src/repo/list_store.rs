//! Ordered-list storage contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the reads/writes the ordering engine issues against storage.
//! - Keep SQL details (identifier quoting, NULL handling, locking) inside
//!   the repository boundary.
//!
//! # Invariants
//! - Scope predicates are bound as parameters, never interpolated.
//! - A write carrying a `VersionCheck` that matches no row at the expected
//!   version fails with `StoreError::StaleRecord`.
//! - Members are listed as `position ASC` (NULLs last), then `id ASC`.

use crate::db::DbError;
use crate::list::config::{ConfigError, ListConfig, ResolvedListConfig};
use crate::list::scope::ScopePredicate;
use crate::model::record::{ListRecord, RecordId, ScopeValue, ScopeValues};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from list storage operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite error.
    Db(DbError),
    /// Configuration does not match the table.
    Config(ConfigError),
    /// Row exists but no longer carries the expected lock version.
    StaleRecord {
        id: RecordId,
        expected_version: i64,
    },
    /// Row does not exist.
    RecordNotFound(RecordId),
    /// Persisted data cannot be converted to the record model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::StaleRecord {
                id,
                expected_version,
            } => write!(
                f,
                "stale record {id}: expected lock version {expected_version}"
            ),
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid list data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::StaleRecord { .. } => None,
            Self::RecordNotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Optimistic precondition attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCheck {
    pub expected: i64,
    pub next: i64,
}

impl VersionCheck {
    /// Check for `expected`, writing `expected + 1`.
    pub fn bump(expected: i64) -> Self {
        Self {
            expected,
            next: expected + 1,
        }
    }

    /// Check derived from a record snapshot; `None` when locking is off.
    pub fn for_record(record: &ListRecord) -> Option<Self> {
        record.lock_version.map(Self::bump)
    }
}

/// One position update addressed by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionWrite {
    pub id: RecordId,
    pub position: i64,
    pub version: Option<VersionCheck>,
}

/// Aggregate view of one scope's position sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeStats {
    pub members: i64,
    /// Smallest stored position, 0 for an empty or all-NULL scope.
    pub min_position: i64,
    /// Largest stored position, 0 for an empty or all-NULL scope.
    pub max_position: i64,
    pub null_positions: i64,
    pub distinct_positions: i64,
}

impl ScopeStats {
    /// True when positions are exactly `1..=members`.
    pub fn is_dense(&self) -> bool {
        if self.members == 0 {
            return true;
        }
        self.null_positions == 0
            && self.distinct_positions == self.members
            && self.min_position == 1
            && self.max_position == self.members
    }
}

/// Handle for one open unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWork {
    /// Top-level transaction opened by the store.
    Transaction,
    /// Nested savepoint inside a caller-held transaction.
    Savepoint(u32),
}

/// Storage operations consumed by the ordering engine.
pub trait ListStore {
    /// Configuration resolved against the backing table.
    fn list_config(&self) -> &ResolvedListConfig;
    /// Opens a unit of work; nested calls must nest.
    fn begin_unit(&self) -> StoreResult<UnitOfWork>;
    fn commit_unit(&self, unit: UnitOfWork) -> StoreResult<()>;
    fn rollback_unit(&self, unit: UnitOfWork) -> StoreResult<()>;
    /// Loads one record's ordering state.
    fn fetch_record(&self, id: RecordId) -> StoreResult<Option<ListRecord>>;
    fn scope_stats(&self, scope: &ScopePredicate) -> StoreResult<ScopeStats>;
    /// Lists scope members in storage order.
    fn scope_members(&self, scope: &ScopePredicate) -> StoreResult<Vec<ListRecord>>;
    /// Applies position updates in order, stopping at the first failure.
    fn write_positions(&self, writes: &[PositionWrite]) -> StoreResult<()>;
    /// Inserts a record into `scope` at `position`.
    fn insert_record(&self, scope: &ScopePredicate, position: i64) -> StoreResult<RecordId>;
    /// Rewrites one record's scope and position.
    fn update_record(
        &self,
        id: RecordId,
        scope: &ScopePredicate,
        position: i64,
        version: Option<VersionCheck>,
    ) -> StoreResult<()>;
    fn delete_record(&self, id: RecordId, version: Option<VersionCheck>) -> StoreResult<()>;
}

/// SQLite-backed list store over a caller-owned table.
pub struct SqliteListStore<'conn> {
    conn: &'conn Connection,
    config: ResolvedListConfig,
    savepoint_depth: Cell<u32>,
}

impl<'conn> SqliteListStore<'conn> {
    /// Resolves `config` against the table schema and creates the store.
    ///
    /// # Errors
    /// - `StoreError::Config` when the table or any configured column cannot
    ///   be resolved.
    pub fn try_new(conn: &'conn Connection, config: &ListConfig) -> StoreResult<Self> {
        let columns = if table_exists(conn, &config.table)? {
            Some(table_columns(conn, &config.table)?)
        } else {
            None
        };
        let resolved = config.resolve(columns.as_deref())?;
        Ok(Self {
            conn,
            config: resolved,
            savepoint_depth: Cell::new(0),
        })
    }

    fn select_sql(&self) -> String {
        let config = &self.config;
        let mut columns = vec![
            quote(&config.id_column),
            quote(&config.position_column),
        ];
        columns.extend(config.scope.iter().map(|attribute| quote(&attribute.column)));
        if let Some(lock_column) = &config.lock_column {
            columns.push(quote(lock_column));
        }
        format!("SELECT {} FROM {}", columns.join(", "), quote(&config.table))
    }

    fn parse_record(&self, row: &Row<'_>) -> StoreResult<ListRecord> {
        let mut scope = ScopeValues::new();
        for (offset, attribute) in self.config.scope.iter().enumerate() {
            let value = to_scope_value(row.get::<_, Value>(2 + offset)?, &attribute.column)?;
            scope.set(attribute.column.clone(), value);
        }
        let lock_version = match self.config.lock_column {
            Some(_) => Some(
                row.get::<_, Option<i64>>(2 + self.config.scope.len())?
                    .unwrap_or(0),
            ),
            None => None,
        };
        Ok(ListRecord {
            id: row.get(0)?,
            position: row.get(1)?,
            scope,
            lock_version,
        })
    }

    fn exists(&self, id: RecordId) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                quote(&self.config.table),
                quote(&self.config.id_column)
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Maps a zero-row write to stale or not-found.
    fn missed_write(&self, id: RecordId, version: Option<VersionCheck>) -> StoreError {
        match (version, self.exists(id)) {
            (_, Err(err)) => err,
            (Some(check), Ok(true)) => StoreError::StaleRecord {
                id,
                expected_version: check.expected,
            },
            _ => StoreError::RecordNotFound(id),
        }
    }

    /// Executes an update/delete of one row, appending the id and optional
    /// lock predicate to `sql` and `params`.
    fn execute_for_row(
        &self,
        mut sql: String,
        mut params: Vec<Value>,
        id: RecordId,
        version: Option<VersionCheck>,
    ) -> StoreResult<()> {
        sql.push_str(&format!(" WHERE {} = ?", quote(&self.config.id_column)));
        params.push(Value::Integer(id));
        if let (Some(check), Some(lock_column)) = (version, &self.config.lock_column) {
            sql.push_str(&format!(" AND COALESCE({}, 0) = ?", quote(lock_column)));
            params.push(Value::Integer(check.expected));
        }
        let changed = self.conn.execute(&sql, params_from_iter(params))?;
        if changed == 0 {
            return Err(self.missed_write(id, version));
        }
        Ok(())
    }

    /// `SET` fragment for the lock column when a check is present.
    fn lock_assignment(&self, version: Option<VersionCheck>, params: &mut Vec<Value>) -> String {
        match (version, &self.config.lock_column) {
            (Some(check), Some(lock_column)) => {
                params.push(Value::Integer(check.next));
                format!(", {} = ?", quote(lock_column))
            }
            _ => String::new(),
        }
    }
}

impl ListStore for SqliteListStore<'_> {
    fn list_config(&self) -> &ResolvedListConfig {
        &self.config
    }

    fn begin_unit(&self) -> StoreResult<UnitOfWork> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN IMMEDIATE;")?;
            return Ok(UnitOfWork::Transaction);
        }
        let depth = self.savepoint_depth.get() + 1;
        self.conn
            .execute_batch(&format!("SAVEPOINT restlist_unit_{depth};"))?;
        self.savepoint_depth.set(depth);
        Ok(UnitOfWork::Savepoint(depth))
    }

    fn commit_unit(&self, unit: UnitOfWork) -> StoreResult<()> {
        match unit {
            UnitOfWork::Transaction => self.conn.execute_batch("COMMIT;")?,
            UnitOfWork::Savepoint(depth) => {
                self.conn
                    .execute_batch(&format!("RELEASE restlist_unit_{depth};"))?;
                self.savepoint_depth.set(depth - 1);
            }
        }
        Ok(())
    }

    fn rollback_unit(&self, unit: UnitOfWork) -> StoreResult<()> {
        match unit {
            UnitOfWork::Transaction => self.conn.execute_batch("ROLLBACK;")?,
            UnitOfWork::Savepoint(depth) => {
                self.conn.execute_batch(&format!(
                    "ROLLBACK TO restlist_unit_{depth}; RELEASE restlist_unit_{depth};"
                ))?;
                self.savepoint_depth.set(depth - 1);
            }
        }
        Ok(())
    }

    fn fetch_record(&self, id: RecordId) -> StoreResult<Option<ListRecord>> {
        let sql = format!(
            "{} WHERE {} = ?1;",
            self.select_sql(),
            quote(&self.config.id_column)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.parse_record(row)?));
        }
        Ok(None)
    }

    fn scope_stats(&self, scope: &ScopePredicate) -> StoreResult<ScopeStats> {
        let mut params = Vec::new();
        let position = quote(&self.config.position_column);
        let sql = format!(
            "SELECT
                COUNT(*),
                COALESCE(MIN({position}), 0),
                COALESCE(MAX({position}), 0),
                COUNT(*) - COUNT({position}),
                COUNT(DISTINCT {position})
             FROM {}
             WHERE {};",
            quote(&self.config.table),
            scope_clause(scope, &mut params)
        );
        let stats = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| {
                Ok(ScopeStats {
                    members: row.get(0)?,
                    min_position: row.get(1)?,
                    max_position: row.get(2)?,
                    null_positions: row.get(3)?,
                    distinct_positions: row.get(4)?,
                })
            })
            .optional()?;
        Ok(stats.unwrap_or_default())
    }

    fn scope_members(&self, scope: &ScopePredicate) -> StoreResult<Vec<ListRecord>> {
        let mut params = Vec::new();
        let position = quote(&self.config.position_column);
        let sql = format!(
            "{} WHERE {} ORDER BY {position} IS NULL ASC, {position} ASC, {} ASC;",
            self.select_sql(),
            scope_clause(scope, &mut params),
            quote(&self.config.id_column)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(self.parse_record(row)?);
        }
        Ok(members)
    }

    fn write_positions(&self, writes: &[PositionWrite]) -> StoreResult<()> {
        for write in writes {
            let mut params = vec![Value::Integer(write.position)];
            let lock = self.lock_assignment(write.version, &mut params);
            let sql = format!(
                "UPDATE {} SET {} = ?{lock}",
                quote(&self.config.table),
                quote(&self.config.position_column)
            );
            self.execute_for_row(sql, params, write.id, write.version)?;
        }
        Ok(())
    }

    fn insert_record(&self, scope: &ScopePredicate, position: i64) -> StoreResult<RecordId> {
        let mut columns = vec![quote(&self.config.position_column)];
        let mut params = vec![Value::Integer(position)];
        for (column, value) in scope.terms() {
            columns.push(quote(column));
            params.push(to_sql_value(value));
        }
        if let Some(lock_column) = &self.config.lock_column {
            columns.push(quote(lock_column));
            params.push(Value::Integer(0));
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                quote(&self.config.table),
                columns.join(", ")
            ),
            params_from_iter(params),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_record(
        &self,
        id: RecordId,
        scope: &ScopePredicate,
        position: i64,
        version: Option<VersionCheck>,
    ) -> StoreResult<()> {
        let mut assignments = vec![format!("{} = ?", quote(&self.config.position_column))];
        let mut params = vec![Value::Integer(position)];
        for (column, value) in scope.terms() {
            assignments.push(format!("{} = ?", quote(column)));
            params.push(to_sql_value(value));
        }
        let lock = self.lock_assignment(version, &mut params);
        let sql = format!(
            "UPDATE {} SET {}{lock}",
            quote(&self.config.table),
            assignments.join(", ")
        );
        self.execute_for_row(sql, params, id, version)
    }

    fn delete_record(&self, id: RecordId, version: Option<VersionCheck>) -> StoreResult<()> {
        let sql = format!("DELETE FROM {}", quote(&self.config.table));
        self.execute_for_row(sql, Vec::new(), id, version)
    }
}

/// `WHERE` body for `scope`; `1 = 1` for the universal predicate.
fn scope_clause(scope: &ScopePredicate, params: &mut Vec<Value>) -> String {
    if scope.is_universal() {
        return "1 = 1".to_string();
    }
    scope
        .terms()
        .map(|(column, value)| match value {
            ScopeValue::Null => format!("{} IS NULL", quote(column)),
            other => {
                params.push(to_sql_value(other));
                format!("{} = ?", quote(column))
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Quotes an identifier already validated by `ListConfig::resolve`.
fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn to_sql_value(value: &ScopeValue) -> Value {
    match value {
        ScopeValue::Null => Value::Null,
        ScopeValue::Integer(value) => Value::Integer(*value),
        ScopeValue::Text(value) => Value::Text(value.clone()),
    }
}

fn to_scope_value(value: Value, column: &str) -> StoreResult<ScopeValue> {
    match value {
        Value::Null => Ok(ScopeValue::Null),
        Value::Integer(value) => Ok(ScopeValue::Integer(value)),
        Value::Text(value) => Ok(ScopeValue::Text(value)),
        Value::Real(_) | Value::Blob(_) => Err(StoreError::InvalidData(format!(
            "unsupported scope value type in column `{column}`"
        ))),
    }
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let mut rows = stmt.query([table])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(0)?);
    }
    Ok(columns)
}
