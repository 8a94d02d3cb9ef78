//! Gap closing after a record leaves a scope.

use crate::list::error::ListResult;
use crate::list::repair::repair_scope;
use crate::list::scope::ScopePredicate;
use crate::model::record::{ListRecord, RecordId};
use crate::repo::list_store::{ListStore, PositionWrite, VersionCheck};
use log::debug;

/// Shifts every member after `vacated` down by one, skipping `exclude`.
pub fn plan_close_gap(
    members: &[ListRecord],
    vacated: i64,
    exclude: Option<RecordId>,
) -> Vec<PositionWrite> {
    members
        .iter()
        .filter(|member| Some(member.id) != exclude)
        .filter_map(|member| {
            let position = member.position?;
            (position > vacated).then(|| PositionWrite {
                id: member.id,
                position: position - 1,
                version: VersionCheck::for_record(member),
            })
        })
        .collect()
}

/// Closes the gap left in `scope` by a removed record.
///
/// `vacated` is the removed record's position; `None` (position lost out of
/// band) falls back to a full repair. Returns the number of rows rewritten.
pub fn close_gap<S: ListStore>(
    store: &S,
    scope: &ScopePredicate,
    vacated: Option<i64>,
) -> ListResult<usize> {
    let Some(vacated) = vacated else {
        return repair_scope(store, scope);
    };

    let members = store.scope_members(scope)?;
    let writes = plan_close_gap(&members, vacated, None);
    store.write_positions(&writes)?;
    debug!(
        "event=list_close_gap module=list vacated={} shifted={}",
        vacated,
        writes.len()
    );

    // Only a sequence that was already broken stays broken after the shift.
    let repaired = if store.scope_stats(scope)?.is_dense() {
        0
    } else {
        repair_scope(store, scope)?
    };
    Ok(writes.len() + repaired)
}

#[cfg(test)]
mod tests {
    use super::plan_close_gap;
    use crate::model::record::{ListRecord, ScopeValues};

    fn member(id: i64, position: i64) -> ListRecord {
        ListRecord {
            id,
            position: Some(position),
            scope: ScopeValues::new(),
            lock_version: None,
        }
    }

    #[test]
    fn members_after_vacated_slot_shift_down() {
        let members = vec![member(1, 1), member(3, 3), member(4, 4)];
        let writes: Vec<_> = plan_close_gap(&members, 2, None)
            .into_iter()
            .map(|write| (write.id, write.position, write.version))
            .collect();
        assert_eq!(writes, vec![(3, 2, None), (4, 3, None)]);
    }

    #[test]
    fn excluded_member_is_not_shifted() {
        let members = vec![member(1, 1), member(2, 2), member(3, 3)];
        let writes = plan_close_gap(&members, 2, Some(2));
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].id, 3);
    }

    #[test]
    fn removing_last_member_shifts_nothing() {
        let members = vec![member(1, 1), member(2, 2)];
        assert!(plan_close_gap(&members, 3, None).is_empty());
    }
}
