//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `restlist_core` linkage.
//! - Walk one scoped list through create, move, scope change, and delete
//!   with deterministic output.
//!
//! Set `RESTLIST_LOG_DIR` to also write rolling core logs there.

use log::info;
use restlist_core::db::open_db_in_memory;
use restlist_core::{
    default_log_level, init_logging, ListConfig, ListService, NewRecord, RecordUpdate,
    ScopeValues, SqliteListStore,
};
use std::error::Error;

const SCHEMA: &str = "CREATE TABLE todo_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    position INTEGER,
    todo_list_id INTEGER,
    lock_version INTEGER DEFAULT 0
);";

fn main() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("RESTLIST_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }
    println!("restlist_core version={}", restlist_core::core_version());

    let conn = open_db_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    let config = ListConfig::new("todo_items").with_scope(["todo_list"]);
    let service = ListService::new(SqliteListStore::try_new(&conn, &config)?);

    let inbox = ScopeValues::new().with("todo_list_id", 1);
    let archive = ScopeValues::new().with("todo_list_id", 2);
    for _ in 0..4 {
        service.create(NewRecord::in_scope(inbox.clone()))?;
    }
    print_scope(&service, &inbox, "created")?;

    let last = service.members(&inbox)?.pop().ok_or("inbox is empty")?;
    service.update(&last, RecordUpdate::new().position(1))?;
    print_scope(&service, &inbox, "moved last to front")?;

    let second = service.members(&inbox)?.remove(1);
    service.update(&second, RecordUpdate::new().scope(archive.clone()))?;
    print_scope(&service, &inbox, "archived second")?;
    print_scope(&service, &archive, "archive")?;

    let first = service.members(&inbox)?.remove(0);
    service.destroy(&first)?;
    print_scope(&service, &inbox, "deleted first")?;

    info!("event=cli_demo module=cli status=ok");
    Ok(())
}

fn print_scope(
    service: &ListService<SqliteListStore<'_>>,
    values: &ScopeValues,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let rendered: Vec<String> = service
        .members(values)?
        .iter()
        .map(|record| {
            format!(
                "{}@{}",
                record.id,
                record
                    .position
                    .map_or_else(|| "-".to_string(), |p| p.to_string())
            )
        })
        .collect();
    println!(
        "{label} [{}]: {}",
        service.scope_condition(values),
        rendered.join(" ")
    );
    Ok(())
}
