//! Ordered record model.
//!
//! # Responsibility
//! - Describe the slice of a persisted row the ordering engine reads and writes.
//! - Carry insert requests and pending updates from callers to the engine.
//!
//! # Invariants
//! - `ScopeValue::Null` equals `ScopeValue::Null`; two records share a scope
//!   iff every scope attribute compares equal.
//! - A scope attribute absent from `ScopeValues` reads as `Null`.

use std::fmt::{Display, Formatter};

/// Storage row identity. Also the stable tie-break when ordering members.
pub type RecordId = i64;

/// Value of one scope attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ScopeValue {
    #[default]
    Null,
    Integer(i64),
    Text(String),
}

impl ScopeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for ScopeValue {
    /// Renders the value as a SQL-style literal (`NULL`, `3`, `'O''Hara'`).
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{}'", value.replace('\'', "''")),
        }
    }
}

impl From<i64> for ScopeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ScopeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<ScopeValue>> From<Option<T>> for ScopeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered attribute-name/value pairs describing a record's scope.
///
/// Names may be resolved column names (`parent_id`) or declared scope names
/// (`parent`); the resolver accepts either.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeValues {
    entries: Vec<(String, ScopeValue)>,
}

impl ScopeValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Inserts or replaces the value for `name`, keeping first-insert order.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ScopeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(current, _)| *current == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScopeValue> {
        self.entries
            .iter()
            .find(|(current, _)| current == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScopeValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<ScopeValue>> FromIterator<(N, V)> for ScopeValues {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.set(name, value);
        }
        values
    }
}

/// Persisted ordering state of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRecord {
    pub id: RecordId,
    /// `None` only when the row was edited out of band; repaired lazily.
    pub position: Option<i64>,
    /// Scope attribute values keyed by resolved column name.
    pub scope: ScopeValues,
    /// Optimistic lock counter; `None` when the table has no lock column.
    /// A caller snapshot with `None` on a locked table skips its own
    /// staleness check.
    pub lock_version: Option<i64>,
}

/// Insert request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewRecord {
    pub scope: ScopeValues,
    /// Requested slot. `None` appends to the end of the scope.
    pub position: Option<i64>,
}

impl NewRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_scope(scope: ScopeValues) -> Self {
        Self {
            scope,
            position: None,
        }
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

/// Pending change to an existing record. `None` fields stay unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordUpdate {
    pub position: Option<i64>,
    /// Replacement scope values. Attributes missing here keep their
    /// persisted value.
    pub scope: Option<ScopeValues>,
}

impl RecordUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn scope(mut self, scope: ScopeValues) -> Self {
        self.scope = Some(scope);
        self
    }
}
