//! Position assignment for records entering a scope.
//!
//! # Invariants
//! - A non-dense scope is repaired before a slot is computed.
//! - Without a requested slot the record lands at `members + 1`.
//! - A requested slot is clamped to `[1, members + 1]`; members at or after
//!   it shift up by one.

use crate::list::error::ListResult;
use crate::list::repair::repair_scope;
use crate::list::scope::ScopePredicate;
use crate::model::record::{ListRecord, RecordId};
use crate::repo::list_store::{ListStore, PositionWrite, VersionCheck};
use log::debug;

/// Result of making room for a record in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub position: i64,
    /// Members shifted up to open the slot.
    pub shifted: usize,
    /// Members renumbered by the lazy repair.
    pub repaired: usize,
}

/// Shifts every member at or after `slot` up by one, skipping `exclude`.
pub fn plan_open_slot(
    members: &[ListRecord],
    slot: i64,
    exclude: Option<RecordId>,
) -> Vec<PositionWrite> {
    members
        .iter()
        .filter(|member| Some(member.id) != exclude)
        .filter_map(|member| {
            let position = member.position?;
            (position >= slot).then(|| PositionWrite {
                id: member.id,
                position: position + 1,
                version: VersionCheck::for_record(member),
            })
        })
        .collect()
}

/// Reserves a position in `scope` for a record that is not yet a member.
///
/// Must run inside the unit of work that persists the record.
pub fn assign_position<S: ListStore>(
    store: &S,
    scope: &ScopePredicate,
    requested: Option<i64>,
) -> ListResult<Slot> {
    let stats = store.scope_stats(scope)?;
    let repaired = if stats.is_dense() {
        0
    } else {
        debug!(
            "event=list_assign module=list status=repair members={} min_position={} max_position={} null_positions={}",
            stats.members, stats.min_position, stats.max_position, stats.null_positions
        );
        repair_scope(store, scope)?
    };

    let append_at = stats.members + 1;
    let position = requested.map_or(append_at, |value| value.clamp(1, append_at));
    if position == append_at {
        return Ok(Slot {
            position,
            shifted: 0,
            repaired,
        });
    }

    let members = store.scope_members(scope)?;
    let writes = plan_open_slot(&members, position, None);
    store.write_positions(&writes)?;
    Ok(Slot {
        position,
        shifted: writes.len(),
        repaired,
    })
}
