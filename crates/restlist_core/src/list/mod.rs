//! Position management for ordered, scoped lists.
//!
//! # Responsibility
//! - Keep every scope's positions dense (`1..=N`) across inserts, moves,
//!   scope changes, and deletes.
//! - Expose the three lifecycle entry points a write path calls explicitly:
//!   `before_create`, `before_update`, `after_destroy`.
//!
//! # Invariants
//! - Every entry point runs inside the caller's unit of work and issues only
//!   versioned position writes; it never commits on its own.
//! - Staleness conflicts propagate unchanged; nothing here retries.

pub mod assign;
pub mod config;
pub mod error;
pub mod gap;
pub mod reorder;
pub mod repair;
pub mod scope;

use crate::list::assign::assign_position;
use crate::list::config::ResolvedListConfig;
use crate::list::error::ListResult;
use crate::list::scope::{ScopePredicate, ScopeResolver};
use crate::model::record::{ListRecord, NewRecord, RecordUpdate};
use crate::repo::list_store::ListStore;

/// Final scope and position for the record being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub scope: ScopePredicate,
    pub position: i64,
    /// Sibling rows shifted to make room or close a gap.
    pub shifted: usize,
    /// Rows renumbered by lazy repair.
    pub repaired: usize,
    /// Expected lock version for the record's own write, if it is persisted.
    pub lock_version: Option<i64>,
}

/// Lifecycle hooks of the ordering engine for one list configuration.
#[derive(Debug, Clone)]
pub struct PositionEngine {
    resolver: ScopeResolver,
}

impl PositionEngine {
    pub fn new(config: ResolvedListConfig) -> Self {
        Self {
            resolver: ScopeResolver::new(config),
        }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Runs before a new record is inserted: repairs the target scope when
    /// needed and reserves the record's position.
    pub fn before_create<S: ListStore>(
        &self,
        store: &S,
        record: &NewRecord,
    ) -> ListResult<Placement> {
        let scope = self.resolver.scope_condition(&record.scope);
        let slot = assign_position(store, &scope, record.position)?;
        Ok(Placement {
            scope,
            position: slot.position,
            shifted: slot.shifted,
            repaired: slot.repaired,
            lock_version: None,
        })
    }

    /// Runs before a persisted record's update is written.
    ///
    /// `persisted` must be the row as currently stored (read inside the unit
    /// of work). Returns `None` when neither position nor scope changes; in
    /// that case no row has been touched.
    pub fn before_update<S: ListStore>(
        &self,
        store: &S,
        persisted: &ListRecord,
        update: &RecordUpdate,
    ) -> ListResult<Option<Placement>> {
        let moved = reorder::reorder(store, &self.resolver, persisted, update)?;
        Ok(moved.map(|moved| Placement {
            scope: moved.scope,
            position: moved.position,
            shifted: moved.shifted,
            repaired: moved.repaired,
            lock_version: moved.lock_version,
        }))
    }

    /// Runs after `removed` has been deleted; closes the gap it left.
    /// Returns the number of rows rewritten.
    pub fn after_destroy<S: ListStore>(&self, store: &S, removed: &ListRecord) -> ListResult<usize> {
        let scope = self.resolver.scope_condition_was(removed);
        gap::close_gap(store, &scope, removed.position)
    }

    /// Renumbers `scope` to a dense sequence. Returns the number of rows
    /// rewritten; zero when the scope was already dense.
    pub fn repair<S: ListStore>(&self, store: &S, scope: &ScopePredicate) -> ListResult<usize> {
        repair::repair_scope(store, scope)
    }
}
