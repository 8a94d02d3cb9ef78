//! Dense, gap-free ordering for scoped lists of persisted records.
//!
//! The ordering engine keeps each scope's positions at exactly `1..=N`
//! across inserts, moves, scope changes, and deletes, inside the caller's
//! unit of work and under optimistic locking.

pub mod db;
pub mod list;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use list::config::{ConfigError, ListConfig, ResolvedListConfig, ScopeAttribute};
pub use list::error::{ListError, ListResult};
pub use list::scope::{ScopePredicate, ScopeResolver};
pub use list::{Placement, PositionEngine};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{ListRecord, NewRecord, RecordId, RecordUpdate, ScopeValue, ScopeValues};
pub use repo::list_store::{
    ListStore, PositionWrite, ScopeStats, SqliteListStore, StoreError, StoreResult, UnitOfWork,
    VersionCheck,
};
pub use service::list_service::ListService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
