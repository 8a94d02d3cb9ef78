//! List configuration and setup-time column resolution.
//!
//! # Responsibility
//! - Hold the caller-facing configuration of one ordered table.
//! - Resolve declared scope names to concrete columns once, at setup.
//!
//! # Invariants
//! - Every identifier that reaches SQL has passed `IDENTIFIER_RE`.
//! - Resolution failures surface as `ConfigError`, never per record.
//! - Scope column order follows declaration order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Suffix appended to a relation name to find its foreign-key column.
pub const REFERENCE_SUFFIX: &str = "_id";

pub const DEFAULT_ID_COLUMN: &str = "id";
pub const DEFAULT_POSITION_COLUMN: &str = "position";
pub const DEFAULT_LOCK_COLUMN: &str = "lock_version";

/// Setup-time configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Name is not a plain SQL identifier.
    InvalidIdentifier(String),
    /// Configured table does not exist.
    MissingTable(String),
    /// Required column is missing from the configured table.
    MissingColumn { table: String, column: String },
    /// Declared scope name resolves to no column.
    UnknownScopeAttribute(String),
    /// Two declared scope names resolve to the same column.
    DuplicateScopeColumn(String),
    /// Scope column collides with the id or position column.
    ReservedScopeColumn(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier `{name}`"),
            Self::MissingTable(table) => write!(f, "list table `{table}` does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "list table `{table}` requires column `{column}`")
            }
            Self::UnknownScopeAttribute(name) => {
                write!(f, "scope attribute `{name}` does not resolve to a column")
            }
            Self::DuplicateScopeColumn(column) => {
                write!(f, "scope column `{column}` is declared more than once")
            }
            Self::ReservedScopeColumn(column) => {
                write!(f, "scope column `{column}` is the id or position column")
            }
        }
    }
}

impl Error for ConfigError {}

/// Ordered-list configuration for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub table: String,
    pub id_column: String,
    pub position_column: String,
    /// Declared scope names, in predicate order. Empty means one global list.
    pub scope: Vec<String>,
    /// Explicit declared-name to column mapping, checked before conventions.
    pub references: BTreeMap<String, String>,
    /// Optimistic locking is active iff the table has this column.
    pub lock_column: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            position_column: DEFAULT_POSITION_COLUMN.to_string(),
            scope: Vec::new(),
            references: BTreeMap::new(),
            lock_column: DEFAULT_LOCK_COLUMN.to_string(),
        }
    }
}

impl ListConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn with_position_column(mut self, column: impl Into<String>) -> Self {
        self.position_column = column.into();
        self
    }

    pub fn with_scope<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.references.insert(name.into(), column.into());
        self
    }

    pub fn with_lock_column(mut self, column: impl Into<String>) -> Self {
        self.lock_column = column.into();
        self
    }

    /// Resolves this configuration against the table's column names.
    ///
    /// `columns` is `None` when the table does not exist.
    ///
    /// # Errors
    /// - Any identifier fails validation.
    /// - The table, id column, or position column is missing.
    /// - A declared scope name has no matching column.
    pub fn resolve(&self, columns: Option<&[String]>) -> Result<ResolvedListConfig, ConfigError> {
        ensure_identifier(&self.table)?;
        ensure_identifier(&self.id_column)?;
        ensure_identifier(&self.position_column)?;
        ensure_identifier(&self.lock_column)?;

        let columns = columns.ok_or_else(|| ConfigError::MissingTable(self.table.clone()))?;
        let has_column = |name: &str| columns.iter().any(|column| column == name);

        for required in [&self.id_column, &self.position_column] {
            if !has_column(required) {
                return Err(ConfigError::MissingColumn {
                    table: self.table.clone(),
                    column: required.clone(),
                });
            }
        }

        let mut scope = Vec::with_capacity(self.scope.len());
        for declared in &self.scope {
            ensure_identifier(declared)?;
            let column = self.resolve_scope_column(declared, &has_column)?;
            if column == self.id_column || column == self.position_column {
                return Err(ConfigError::ReservedScopeColumn(column));
            }
            if scope
                .iter()
                .any(|attribute: &ScopeAttribute| attribute.column == column)
            {
                return Err(ConfigError::DuplicateScopeColumn(column));
            }
            scope.push(ScopeAttribute {
                declared: declared.clone(),
                column,
            });
        }

        let lock_column = has_column(&self.lock_column).then(|| self.lock_column.clone());

        Ok(ResolvedListConfig {
            table: self.table.clone(),
            id_column: self.id_column.clone(),
            position_column: self.position_column.clone(),
            scope,
            lock_column,
        })
    }

    fn resolve_scope_column(
        &self,
        declared: &str,
        has_column: &impl Fn(&str) -> bool,
    ) -> Result<String, ConfigError> {
        if let Some(mapped) = self.references.get(declared) {
            ensure_identifier(mapped)?;
            if !has_column(mapped) {
                return Err(ConfigError::MissingColumn {
                    table: self.table.clone(),
                    column: mapped.clone(),
                });
            }
            return Ok(mapped.clone());
        }
        if has_column(declared) {
            return Ok(declared.to_string());
        }
        let reference_column = format!("{declared}{REFERENCE_SUFFIX}");
        if has_column(&reference_column) {
            return Ok(reference_column);
        }
        Err(ConfigError::UnknownScopeAttribute(declared.to_string()))
    }
}

/// One scope attribute after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeAttribute {
    /// Name as declared in `ListConfig::scope`.
    pub declared: String,
    /// Concrete column holding the value.
    pub column: String,
}

/// Configuration validated against a concrete table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedListConfig {
    pub table: String,
    pub id_column: String,
    pub position_column: String,
    pub scope: Vec<ScopeAttribute>,
    pub lock_column: Option<String>,
}

impl ResolvedListConfig {
    pub fn uses_locking(&self) -> bool {
        self.lock_column.is_some()
    }

    /// Resolved column for a declared scope name or a column name.
    pub fn scope_column(&self, name: &str) -> Option<&str> {
        self.scope
            .iter()
            .find(|attribute| attribute.declared == name || attribute.column == name)
            .map(|attribute| attribute.column.as_str())
    }
}

fn ensure_identifier(name: &str) -> Result<(), ConfigError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}
