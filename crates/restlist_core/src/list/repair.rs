//! List repair: renumber a scope to a dense `1..=N` sequence.
//!
//! # Invariants
//! - Relative order is kept: members with a position sort by `(position, id)`;
//!   members without one follow, by `id`.
//! - Only members whose position actually changes are written, so a second
//!   run right after the first writes nothing.

use crate::list::error::ListResult;
use crate::list::scope::ScopePredicate;
use crate::model::record::ListRecord;
use crate::repo::list_store::{ListStore, PositionWrite, VersionCheck};
use log::debug;

/// Computes the writes that make `members` dense.
pub fn plan_repair(members: &[ListRecord]) -> Vec<PositionWrite> {
    let mut ordered: Vec<&ListRecord> = members.iter().collect();
    ordered.sort_by_key(|member| (member.position.is_none(), member.position, member.id));

    ordered
        .into_iter()
        .zip(1_i64..)
        .filter(|(member, target)| member.position != Some(*target))
        .map(|(member, target)| PositionWrite {
            id: member.id,
            position: target,
            version: VersionCheck::for_record(member),
        })
        .collect()
}

/// Repairs `scope` in place. Returns the number of rows rewritten.
pub fn repair_scope<S: ListStore>(store: &S, scope: &ScopePredicate) -> ListResult<usize> {
    let members = store.scope_members(scope)?;
    let writes = plan_repair(&members);
    if !writes.is_empty() {
        debug!(
            "event=list_repair_plan module=list members={} writes={}",
            members.len(),
            writes.len()
        );
        store.write_positions(&writes)?;
    }
    Ok(writes.len())
}
