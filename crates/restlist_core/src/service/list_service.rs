//! Ordered list use-case service.
//!
//! # Responsibility
//! - Provide the write path (create, update, destroy, repair) that calls the
//!   position engine hooks at the right points.
//! - Wrap each logical operation in exactly one unit of work.
//!
//! # Invariants
//! - Any failure rolls back every shift and the triggering write.
//! - The caller's snapshot `lock_version` must match storage before any
//!   shift is planned; a mismatch is a staleness conflict.

use crate::list::error::{ListError, ListResult};
use crate::list::scope::ScopePredicate;
use crate::list::PositionEngine;
use crate::model::record::{ListRecord, NewRecord, RecordId, RecordUpdate, ScopeValues};
use crate::repo::list_store::{ListStore, UnitOfWork, VersionCheck};
use log::{error, info, warn};
use std::time::Instant;

/// Ordered list facade over one store.
pub struct ListService<S: ListStore> {
    store: S,
    engine: PositionEngine,
}

impl<S: ListStore> ListService<S> {
    /// Creates a service from a store whose configuration is already resolved.
    pub fn new(store: S) -> Self {
        let engine = PositionEngine::new(store.list_config().clone());
        Self { store, engine }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &PositionEngine {
        &self.engine
    }

    /// Predicate for the given scope values.
    pub fn scope_condition(&self, values: &ScopeValues) -> ScopePredicate {
        self.engine.resolver().scope_condition(values)
    }

    /// Predicate for the scope `record` was read in.
    pub fn scope_condition_was(&self, record: &ListRecord) -> ScopePredicate {
        self.engine.resolver().scope_condition_was(record)
    }

    /// Loads one record.
    pub fn get(&self, id: RecordId) -> ListResult<Option<ListRecord>> {
        Ok(self.store.fetch_record(id)?)
    }

    /// Lists the members of the scope described by `values`, in order.
    pub fn members(&self, values: &ScopeValues) -> ListResult<Vec<ListRecord>> {
        let scope = self.scope_condition(values);
        Ok(self.store.scope_members(&scope)?)
    }

    /// Inserts a record, appending it to its scope unless a slot is requested.
    pub fn create(&self, record: NewRecord) -> ListResult<ListRecord> {
        self.in_unit("list_create", || {
            let placement = self.engine.before_create(&self.store, &record)?;
            let id = self
                .store
                .insert_record(&placement.scope, placement.position)?;
            info!(
                "event=list_create module=list status=ok id={} position={} shifted={} repaired={}",
                id, placement.position, placement.shifted, placement.repaired
            );
            self.reload(id)
        })
    }

    /// Applies `update` to the record read as `record`.
    ///
    /// # Errors
    /// - `ListError::StaleRecord` when `record` or a shifted sibling changed
    ///   since it was read. A `record` with `lock_version: None` skips its own
    ///   check.
    /// - `ListError::RecordNotFound` when the record no longer exists.
    pub fn update(&self, record: &ListRecord, update: RecordUpdate) -> ListResult<ListRecord> {
        self.in_unit("list_update", || {
            let persisted = self.load_current(record)?;
            let Some(placement) = self.engine.before_update(&self.store, &persisted, &update)?
            else {
                return Ok(persisted);
            };

            self.store.update_record(
                persisted.id,
                &placement.scope,
                placement.position,
                placement.lock_version.map(VersionCheck::bump),
            )?;
            info!(
                "event=list_update module=list status=ok id={} position={} shifted={} repaired={}",
                persisted.id, placement.position, placement.shifted, placement.repaired
            );
            self.reload(persisted.id)
        })
    }

    /// Deletes the record read as `record` and closes the gap it leaves.
    pub fn destroy(&self, record: &ListRecord) -> ListResult<()> {
        self.in_unit("list_destroy", || {
            let persisted = self.load_current(record)?;
            self.store
                .delete_record(persisted.id, VersionCheck::for_record(&persisted))?;
            let shifted = self.engine.after_destroy(&self.store, &persisted)?;
            info!(
                "event=list_destroy module=list status=ok id={} shifted={}",
                persisted.id, shifted
            );
            Ok(())
        })
    }

    /// Renumbers the scope described by `values` to a dense sequence.
    /// Returns the number of rows rewritten.
    pub fn repair(&self, values: &ScopeValues) -> ListResult<usize> {
        let scope = self.scope_condition(values);
        self.in_unit("list_repair", || {
            let repaired = self.engine.repair(&self.store, &scope)?;
            info!("event=list_repair module=list status=ok repaired={repaired}");
            Ok(repaired)
        })
    }

    /// Reads the stored row for `record` and checks the caller's snapshot
    /// version against it.
    ///
    /// A snapshot without a lock version opts out of the check; sibling
    /// shifts are still version-checked against the rows read here.
    fn load_current(&self, record: &ListRecord) -> ListResult<ListRecord> {
        let persisted = self
            .store
            .fetch_record(record.id)?
            .ok_or(ListError::RecordNotFound(record.id))?;
        match (record.lock_version, persisted.lock_version) {
            (Some(expected), Some(actual)) if expected != actual => {
                Err(ListError::StaleRecord(record.id))
            }
            _ => Ok(persisted),
        }
    }

    fn reload(&self, id: RecordId) -> ListResult<ListRecord> {
        self.store
            .fetch_record(id)?
            .ok_or(ListError::RecordNotFound(id))
    }

    fn in_unit<T>(
        &self,
        event: &'static str,
        operation: impl FnOnce() -> ListResult<T>,
    ) -> ListResult<T> {
        let started_at = Instant::now();
        let unit = UnitGuard::begin(&self.store, event)?;
        let result = operation().and_then(|value| {
            unit.commit()?;
            Ok(value)
        });
        if let Err(err) = &result {
            if err.is_stale() {
                warn!(
                    "event={event} module=list status=error duration_ms={} error_code=stale_record error={err}",
                    started_at.elapsed().as_millis()
                );
            } else {
                error!(
                    "event={event} module=list status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
            }
        }
        result
    }
}

/// Open unit of work; dropping it without a successful commit rolls it back.
struct UnitGuard<'a, S: ListStore> {
    store: &'a S,
    unit: Option<UnitOfWork>,
    event: &'static str,
}

impl<'a, S: ListStore> UnitGuard<'a, S> {
    fn begin(store: &'a S, event: &'static str) -> ListResult<Self> {
        let unit = store.begin_unit()?;
        Ok(Self {
            store,
            unit: Some(unit),
            event,
        })
    }

    /// Commits the unit. On failure the unit stays armed and is rolled back
    /// when the guard drops.
    fn commit(mut self) -> ListResult<()> {
        let Some(unit) = self.unit.take() else {
            return Ok(());
        };
        if let Err(err) = self.store.commit_unit(unit) {
            self.unit = Some(unit);
            return Err(err.into());
        }
        Ok(())
    }
}

impl<S: ListStore> Drop for UnitGuard<'_, S> {
    fn drop(&mut self) {
        let Some(unit) = self.unit.take() else {
            return;
        };
        if let Err(err) = self.store.rollback_unit(unit) {
            error!(
                "event={} module=list status=error error_code=rollback_failed error={err}",
                self.event
            );
        }
    }
}
