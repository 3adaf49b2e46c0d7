use super::{
    ensure_level, ensure_position, ensure_shelf, get_meta, insert_plant, insert_state,
    list_plant_join_rows, list_states, open_connection, plant_at_location, InsertState,
    CURRENT_SCHEMA_VERSION,
};
use rusqlite::params;
use uuid::Uuid;

fn unique_db_path() -> String {
    std::env::temp_dir()
        .join(format!("kabu-db-{}.sqlite", Uuid::now_v7()))
        .display()
        .to_string()
}

fn cleanup_db_files(path: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let candidate = format!("{path}{suffix}");
        let _ = std::fs::remove_file(candidate);
    }
}

fn table_exists(conn: &rusqlite::Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
            params![table_name],
            |row| row.get(0),
        )
        .expect("table existence query should be readable");
    exists == 1
}

fn seed_slot(conn: &rusqlite::Connection, shelf: &str, level: i64, position: i64) -> i64 {
    let shelf_id = ensure_shelf(conn, shelf).expect("shelf insert should work");
    let level_id = ensure_level(conn, shelf_id, level).expect("level insert should work");
    ensure_position(conn, level_id, position).expect("position insert should work")
}

#[test]
fn configures_connection_pragmas() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("journal_mode pragma should be readable");
    assert_eq!(journal_mode.to_uppercase(), "WAL");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("foreign_keys pragma should be readable");
    assert_eq!(foreign_keys, 1);

    let busy_timeout: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .expect("busy_timeout pragma should be readable");
    assert_eq!(busy_timeout, 5000);

    cleanup_db_files(&path);
}

#[test]
fn initializes_required_tables_and_schema_version() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    for table in [
        "schema_migrations",
        "meta",
        "shelves",
        "levels",
        "positions",
        "plants",
        "plant_states",
        "watering_history",
    ] {
        assert!(table_exists(&conn, table), "missing table {table}");
    }
    let version = get_meta(&conn, "schema_version").expect("meta should be readable");
    assert_eq!(version, Some(CURRENT_SCHEMA_VERSION.to_string()));
    drop(conn);

    let reopened = open_connection(&path).expect("reopen should be idempotent");
    let applied: i64 = reopened
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
        .expect("migration count should be readable");
    assert_eq!(applied, 1);

    cleanup_db_files(&path);
}

#[test]
fn ensure_helpers_are_idempotent() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    let first = seed_slot(&conn, "A", 1, 1);
    let second = seed_slot(&conn, "A", 1, 1);
    assert_eq!(first, second);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))
        .expect("count should be readable");
    assert_eq!(count, 1);

    cleanup_db_files(&path);
}

#[test]
fn one_plant_per_location_is_enforced() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let slot = seed_slot(&conn, "A", 1, 1);

    let plant_id = insert_plant(&conn, slot, "2024-01-01").expect("first plant should insert");
    assert_eq!(plant_at_location(&conn, slot).expect("lookup"), Some(plant_id));
    assert!(insert_plant(&conn, slot, "2024-01-02").is_err());

    cleanup_db_files(&path);
}

#[test]
fn harvest_weight_check_constraint_rejects_mismatches() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let slot = seed_slot(&conn, "A", 1, 1);
    let plant_id = insert_plant(&conn, slot, "2024-01-01").expect("plant should insert");

    let missing_weight = insert_state(
        &conn,
        &InsertState {
            plant_id,
            state_date: "2024-02-01",
            state_type: "harvested",
            harvest_weight: None,
            description: None,
        },
    );
    assert!(missing_weight.is_err());

    let stray_weight = insert_state(
        &conn,
        &InsertState {
            plant_id,
            state_date: "2024-02-01",
            state_type: "growing",
            harvest_weight: Some(3.0),
            description: None,
        },
    );
    assert!(stray_weight.is_err());
    assert!(list_states(&conn, plant_id).expect("list").is_empty());

    cleanup_db_files(&path);
}

#[test]
fn join_rows_repeat_plants_per_state_event() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let first_slot = seed_slot(&conn, "A", 1, 1);
    let second_slot = seed_slot(&conn, "A", 2, 1);
    let first = insert_plant(&conn, first_slot, "2024-01-01").expect("plant should insert");
    insert_plant(&conn, second_slot, "2024-01-02").expect("plant should insert");

    for (date, state) in [("2024-01-01", "planted"), ("2024-02-01", "growing")] {
        insert_state(
            &conn,
            &InsertState {
                plant_id: first,
                state_date: date,
                state_type: state,
                harvest_weight: None,
                description: None,
            },
        )
        .expect("state should insert");
    }

    let rows = list_plant_join_rows(&conn).expect("join should run");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].plant_id, first);
    assert_eq!(rows[1].state_type.as_deref(), Some("growing"));
    assert_eq!(rows[2].state_type, None);
    assert_eq!(rows[2].level, Some(2));
    assert_eq!(rows[2].location_id, second_slot);

    cleanup_db_files(&path);
}
