//! Error surface of list operations.

use crate::list::config::ConfigError;
use crate::model::record::RecordId;
use crate::repo::list_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ListResult<T> = Result<T, ListError>;

/// Errors from ordering operations.
#[derive(Debug)]
pub enum ListError {
    /// List configuration does not resolve against storage.
    Config(ConfigError),
    /// The triggering record or a shifted sibling changed since it was read.
    /// The whole operation has been rolled back.
    StaleRecord(RecordId),
    /// The triggering record does not exist.
    RecordNotFound(RecordId),
    /// Storage-level failure.
    Store(StoreError),
}

impl ListError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleRecord(_))
    }
}

impl Display for ListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::StaleRecord(id) => write!(f, "attempted to update a stale record: {id}"),
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ListError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::StaleRecord { id, .. } => Self::StaleRecord(id),
            StoreError::RecordNotFound(id) => Self::RecordNotFound(id),
            StoreError::Config(err) => Self::Config(err),
            other => Self::Store(other),
        }
    }
}

impl From<ConfigError> for ListError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
