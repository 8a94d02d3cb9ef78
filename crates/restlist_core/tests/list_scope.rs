mod common;

use common::{at, ids, positions, service, setup};
use restlist_core::{ListConfig, ListService, NewRecord, RecordUpdate, ScopeValue, ScopeValues, SqliteListStore};

const MIXINS: &str = "CREATE TABLE mixins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    position INTEGER,
    parent_id INTEGER,
    created_at TEXT,
    updated_at TEXT
);";

fn parent(id: i64) -> ScopeValues {
    ScopeValues::new().with("parent_id", id)
}

mod single_column_scope {
    use super::*;

    fn config() -> ListConfig {
        ListConfig::new("mixins").with_scope(["parent_id"])
    }

    fn seeded() -> rusqlite::Connection {
        let conn = setup(MIXINS);
        {
            let service = service(&conn, &config());
            for _ in 0..4 {
                service.create(NewRecord::in_scope(parent(1))).unwrap();
            }
            for _ in 0..6 {
                service.create(NewRecord::in_scope(parent(2))).unwrap();
            }
        }
        conn
    }

    #[test]
    fn scope_condition_limits_on_parent_id() {
        let conn = setup(MIXINS);
        let service = service(&conn, &config());

        assert_eq!(service.scope_condition(&parent(3)).to_string(), "parent_id = 3");
        assert_eq!(
            service.scope_condition(&ScopeValues::new()).to_string(),
            "parent_id IS NULL"
        );
    }

    #[test]
    fn positions_are_assigned_per_scope() {
        let conn = setup(MIXINS);
        let service = service(&conn, &config());

        let create = |scope: ScopeValues| service.create(NewRecord::in_scope(scope)).unwrap();
        assert_eq!(create(ScopeValues::new()).position, Some(1));
        assert_eq!(create(parent(1)).position, Some(1));
        assert_eq!(create(parent(1)).position, Some(2));
        assert_eq!(create(parent(2)).position, Some(1));
    }

    #[test]
    fn lower_position_reorders_only_its_scope() {
        let conn = seeded();
        let service = service(&conn, &config());

        let fourth = at(&service, &parent(1), 4);
        let moved = service
            .update(&fourth, RecordUpdate::new().position(2))
            .unwrap();

        assert_eq!(moved.position, Some(2));
        assert_eq!(positions(&service, &parent(1)), vec![1, 2, 3, 4]);
        assert_eq!(ids(&service, &parent(1)), vec![1, 4, 2, 3]);
        assert_eq!(ids(&service, &parent(2)), vec![5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn higher_position_reorders_only_its_scope() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &parent(1), 2);
        let moved = service
            .update(&second, RecordUpdate::new().position(4))
            .unwrap();

        assert_eq!(moved.position, Some(4));
        assert_eq!(ids(&service, &parent(1)), vec![1, 3, 4, 2]);
        assert_eq!(positions(&service, &parent(2)), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn reports_old_and_new_scope() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &parent(1), 2);
        let moved = service
            .update(&second, RecordUpdate::new().scope(parent(2)).position(4))
            .unwrap();

        assert_eq!(service.scope_condition_was(&second).to_string(), "parent_id = 1");
        assert_eq!(service.scope_condition_was(&moved).to_string(), "parent_id = 2");
    }

    #[test]
    fn moving_between_scopes_reorders_both_lists() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &parent(1), 2);
        let moved = service
            .update(&second, RecordUpdate::new().scope(parent(2)).position(4))
            .unwrap();

        assert_eq!(moved.scope.get("parent_id"), Some(&ScopeValue::Integer(2)));
        assert_eq!(moved.position, Some(4));
        assert_eq!(positions(&service, &parent(1)), vec![1, 2, 3]);
        assert_eq!(ids(&service, &parent(1)), vec![1, 3, 4]);
        assert_eq!(positions(&service, &parent(2)), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(ids(&service, &parent(2)), vec![5, 6, 7, 2, 8, 9, 10]);
    }

    #[test]
    fn scope_change_without_position_appends() {
        let conn = seeded();
        let service = service(&conn, &config());

        let first = at(&service, &parent(1), 1);
        let moved = service
            .update(&first, RecordUpdate::new().scope(parent(2)))
            .unwrap();

        assert_eq!(moved.position, Some(7));
        assert_eq!(ids(&service, &parent(1)), vec![2, 3, 4]);
        assert_eq!(ids(&service, &parent(2)), vec![5, 6, 7, 8, 9, 10, 1]);
    }

    #[test]
    fn scope_change_clamps_to_one_past_the_end() {
        let conn = seeded();
        let service = service(&conn, &config());

        let third = at(&service, &parent(2), 3);
        let moved = service
            .update(&third, RecordUpdate::new().scope(parent(1)).position(50))
            .unwrap();

        assert_eq!(moved.position, Some(5));
        assert_eq!(positions(&service, &parent(1)), vec![1, 2, 3, 4, 5]);
        assert_eq!(positions(&service, &parent(2)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn moving_into_an_empty_scope() {
        let conn = seeded();
        let service = service(&conn, &config());

        let first = at(&service, &parent(1), 1);
        let moved = service
            .update(&first, RecordUpdate::new().scope(parent(9)).position(3))
            .unwrap();

        assert_eq!(moved.position, Some(1));
        assert_eq!(ids(&service, &parent(9)), vec![1]);
        assert_eq!(positions(&service, &parent(1)), vec![1, 2, 3]);
    }

    #[test]
    fn deleting_reorders_only_its_scope() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &parent(1), 2);
        service.destroy(&second).unwrap();

        assert_eq!(positions(&service, &parent(1)), vec![1, 2, 3]);
        assert_eq!(positions(&service, &parent(2)), vec![1, 2, 3, 4, 5, 6]);
    }
}

mod reference_scope {
    use super::*;

    #[test]
    fn relation_name_resolves_to_id_column() {
        let conn = setup(MIXINS);
        let service = service(&conn, &ListConfig::new("mixins").with_scope(["parent"]));

        assert_eq!(service.scope_condition(&parent(3)).to_string(), "parent_id = 3");
        let by_relation = ScopeValues::new().with("parent", 3);
        assert_eq!(service.scope_condition(&by_relation).to_string(), "parent_id = 3");

        let created = service.create(NewRecord::in_scope(by_relation)).unwrap();
        assert_eq!(created.position, Some(1));
        assert_eq!(created.scope.get("parent_id"), Some(&ScopeValue::Integer(3)));
    }
}

mod text_scope {
    use super::*;

    const NAMED: &str = "CREATE TABLE mixins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        position INTEGER,
        parent_name TEXT
    );";

    #[test]
    fn scope_condition_quotes_text_values() {
        let conn = setup(NAMED);
        let service = service(&conn, &ListConfig::new("mixins").with_scope(["parent_name"]));

        let brandy = ScopeValues::new().with("parent_name", "Brandy");
        assert_eq!(
            service.scope_condition(&brandy).to_string(),
            "parent_name = 'Brandy'"
        );
    }

    #[test]
    fn text_scopes_are_independent_lists() {
        let conn = setup(NAMED);
        let service = service(&conn, &ListConfig::new("mixins").with_scope(["parent_name"]));
        let brandy = ScopeValues::new().with("parent_name", "Brandy");
        let o_hara = ScopeValues::new().with("parent_name", "O'Hara");

        service.create(NewRecord::in_scope(brandy.clone())).unwrap();
        service.create(NewRecord::in_scope(o_hara.clone())).unwrap();
        let second = service.create(NewRecord::in_scope(brandy.clone())).unwrap();

        assert_eq!(second.position, Some(2));
        assert_eq!(positions(&service, &o_hara), vec![1]);
        assert_eq!(ids(&service, &brandy), vec![1, 3]);
    }
}

mod multi_column_scope {
    use super::*;

    const DUMMIES: &str = "CREATE TABLE dummies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        position INTEGER,
        user_id INTEGER,
        parent_id INTEGER,
        created_at TEXT,
        updated_at TEXT
    );";

    fn config() -> ListConfig {
        ListConfig::new("dummies").with_scope(["parent", "user"])
    }

    fn scope(parent_id: i64, user_id: i64) -> ScopeValues {
        ScopeValues::new()
            .with("parent_id", parent_id)
            .with("user_id", user_id)
    }

    fn seeded() -> rusqlite::Connection {
        let conn = setup(DUMMIES);
        {
            let service = service(&conn, &config());
            for (parent_id, user_id) in [(1, 5), (2, 5), (1, 7), (2, 7)] {
                for _ in 0..4 {
                    service
                        .create(NewRecord::in_scope(scope(parent_id, user_id)))
                        .unwrap();
                }
            }
        }
        conn
    }

    fn assert_untouched_except_first(service: &ListService<SqliteListStore<'_>>) {
        assert_eq!(ids(service, &scope(2, 5)), vec![5, 6, 7, 8]);
        assert_eq!(ids(service, &scope(1, 7)), vec![9, 10, 11, 12]);
        assert_eq!(ids(service, &scope(2, 7)), vec![13, 14, 15, 16]);
        for other in [scope(2, 5), scope(1, 7), scope(2, 7)] {
            assert_eq!(positions(service, &other), vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn scope_condition_uses_declaration_order() {
        let conn = setup(DUMMIES);
        let service = service(&conn, &config());
        let values = ScopeValues::new().with("user_id", 4).with("parent_id", 3);
        assert_eq!(
            service.scope_condition(&values).to_string(),
            "parent_id = 3 AND user_id = 4"
        );
    }

    #[test]
    fn lower_position_reorders_one_combination() {
        let conn = seeded();
        let service = service(&conn, &config());

        let fourth = at(&service, &scope(1, 5), 4);
        let moved = service
            .update(&fourth, RecordUpdate::new().position(2))
            .unwrap();

        assert_eq!(moved.position, Some(2));
        assert_eq!(positions(&service, &scope(1, 5)), vec![1, 2, 3, 4]);
        assert_eq!(ids(&service, &scope(1, 5)), vec![1, 4, 2, 3]);
        assert_untouched_except_first(&service);
    }

    #[test]
    fn higher_position_reorders_one_combination() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &scope(1, 5), 2);
        let moved = service
            .update(&second, RecordUpdate::new().position(4))
            .unwrap();

        assert_eq!(moved.position, Some(4));
        assert_eq!(ids(&service, &scope(1, 5)), vec![1, 3, 4, 2]);
        assert_untouched_except_first(&service);
    }

    #[test]
    fn deleting_reorders_one_combination() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &scope(1, 5), 2);
        service.destroy(&second).unwrap();

        assert_eq!(positions(&service, &scope(1, 5)), vec![1, 2, 3]);
        assert_eq!(ids(&service, &scope(1, 5)), vec![1, 3, 4]);
        assert_untouched_except_first(&service);
    }

    #[test]
    fn changing_one_scope_column_moves_between_combinations() {
        let conn = seeded();
        let service = service(&conn, &config());

        let second = at(&service, &scope(1, 5), 2);
        let moved = service
            .update(
                &second,
                RecordUpdate::new().scope(ScopeValues::new().with("user", 7)),
            )
            .unwrap();

        assert_eq!(moved.position, Some(5));
        assert_eq!(ids(&service, &scope(1, 5)), vec![1, 3, 4]);
        assert_eq!(ids(&service, &scope(1, 7)), vec![9, 10, 11, 12, 2]);
    }
}
