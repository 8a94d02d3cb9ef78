//! Reordering of a persisted record whose position and/or scope changes.
//!
//! # Responsibility
//! - Compute and apply the sibling shifts for a move inside one scope.
//! - Treat a scope change as leave-old-scope plus enter-new-scope within the
//!   caller's unit of work.
//!
//! # Invariants
//! - Runs before the moved record's own row is written.
//! - An update that changes neither position nor scope touches no rows.
//! - Inside one scope the target is clamped to `[1, N]`; entering another
//!   scope it is clamped to `[1, N_new + 1]`, defaulting to the end.
//! - Touched scopes that are not dense are repaired before shifting.

use crate::list::assign::{assign_position, Slot};
use crate::list::error::{ListError, ListResult};
use crate::list::gap::plan_close_gap;
use crate::list::repair::repair_scope;
use crate::list::scope::{ScopePredicate, ScopeResolver};
use crate::model::record::{ListRecord, RecordId, RecordUpdate};
use crate::repo::list_store::{ListStore, PositionWrite, StoreError, VersionCheck};
use log::debug;
use std::ops::RangeInclusive;

/// Where a moved record lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub scope: ScopePredicate,
    pub position: i64,
    /// Sibling rows rewritten by the move itself.
    pub shifted: usize,
    /// Rows renumbered by lazy repair of the touched scopes.
    pub repaired: usize,
    /// Lock version the moved record holds once repairs are applied.
    pub lock_version: Option<i64>,
}

/// Shifts for moving `mover` from `from` to `to` inside one scope.
///
/// Moving up the list (`to < from`) pushes `[to, from - 1]` down by one slot
/// (+1); moving down (`to > from`) pulls `[from + 1, to]` up (-1).
pub fn plan_move_within(
    members: &[ListRecord],
    mover: RecordId,
    from: i64,
    to: i64,
) -> Vec<PositionWrite> {
    let (range, delta): (RangeInclusive<i64>, i64) = if to < from {
        (to..=from - 1, 1)
    } else if to > from {
        (from + 1..=to, -1)
    } else {
        return Vec::new();
    };

    members
        .iter()
        .filter(|member| member.id != mover)
        .filter_map(|member| {
            let position = member.position?;
            range.contains(&position).then(|| PositionWrite {
                id: member.id,
                position: position + delta,
                version: VersionCheck::for_record(member),
            })
        })
        .collect()
}

/// Applies sibling shifts for `update` on the `persisted` record.
///
/// Returns `None` when neither position nor scope changes.
pub fn reorder<S: ListStore>(
    store: &S,
    resolver: &ScopeResolver,
    persisted: &ListRecord,
    update: &RecordUpdate,
) -> ListResult<Option<Move>> {
    let old_scope = resolver.scope_condition_was(persisted);
    let new_scope = resolver.scope_condition_with(persisted, update.scope.as_ref());
    let position_changed = update
        .position
        .is_some_and(|requested| Some(requested) != persisted.position);

    if old_scope == new_scope {
        match update.position {
            Some(requested) if position_changed => {
                move_within(store, old_scope, persisted.id, requested).map(Some)
            }
            _ => Ok(None),
        }
    } else {
        move_across(store, old_scope, new_scope, persisted.id, update.position).map(Some)
    }
}

fn move_within<S: ListStore>(
    store: &S,
    scope: ScopePredicate,
    id: RecordId,
    requested: i64,
) -> ListResult<Move> {
    let (members, repaired) = load_dense_members(store, &scope)?;
    let mover = find_member(&members, id)?;
    let from = settled_position(mover)?;
    let to = requested.clamp(1, members.len() as i64);

    let writes = plan_move_within(&members, id, from, to);
    store.write_positions(&writes)?;
    debug!(
        "event=list_reorder module=list mode=within from={} to={} shifted={} repaired={}",
        from,
        to,
        writes.len(),
        repaired
    );

    Ok(Move {
        scope,
        position: to,
        shifted: writes.len(),
        repaired,
        lock_version: mover.lock_version,
    })
}

fn move_across<S: ListStore>(
    store: &S,
    old_scope: ScopePredicate,
    new_scope: ScopePredicate,
    id: RecordId,
    requested: Option<i64>,
) -> ListResult<Move> {
    let (old_members, repaired_old) = load_dense_members(store, &old_scope)?;
    let mover = find_member(&old_members, id)?;
    let from = settled_position(mover)?;

    let closing = plan_close_gap(&old_members, from, Some(id));
    store.write_positions(&closing)?;

    let Slot {
        position,
        shifted: opened,
        repaired: repaired_new,
    } = assign_position(store, &new_scope, requested)?;

    debug!(
        "event=list_reorder module=list mode=across from={} to={} closed={} opened={}",
        from,
        position,
        closing.len(),
        opened
    );

    Ok(Move {
        scope: new_scope,
        position,
        shifted: closing.len() + opened,
        repaired: repaired_old + repaired_new,
        lock_version: mover.lock_version,
    })
}

/// Members of `scope`, repairing the sequence first when it is not dense.
fn load_dense_members<S: ListStore>(
    store: &S,
    scope: &ScopePredicate,
) -> ListResult<(Vec<ListRecord>, usize)> {
    let repaired = if store.scope_stats(scope)?.is_dense() {
        0
    } else {
        repair_scope(store, scope)?
    };
    Ok((store.scope_members(scope)?, repaired))
}

fn find_member(members: &[ListRecord], id: RecordId) -> ListResult<&ListRecord> {
    members
        .iter()
        .find(|member| member.id == id)
        .ok_or(ListError::RecordNotFound(id))
}

fn settled_position(member: &ListRecord) -> ListResult<i64> {
    member.position.ok_or_else(|| {
        ListError::Store(StoreError::InvalidData(format!(
            "record {} has no position after repair",
            member.id
        )))
    })
}
