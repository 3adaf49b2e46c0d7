use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};

use crate::domain::location::{Level, Position, Shelf};
use crate::domain::plant::{now_utc_rfc3339, Plant, WateringEvent};

pub const CURRENT_SCHEMA_VERSION: i64 = 1;
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_inventory_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shelves (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS levels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    shelf_id INTEGER NOT NULL REFERENCES shelves(id),
    level_number INTEGER NOT NULL,
    UNIQUE (shelf_id, level_number)
);

CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    level_id INTEGER NOT NULL REFERENCES levels(id),
    position_number INTEGER NOT NULL,
    UNIQUE (level_id, position_number)
);

CREATE TABLE IF NOT EXISTS plants (
    plant_id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL REFERENCES positions(id),
    entry_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS plant_states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plant_id INTEGER NOT NULL REFERENCES plants(plant_id),
    state_date TEXT NOT NULL,
    state_type TEXT NOT NULL,
    harvest_weight REAL,
    description TEXT,
    CHECK ((state_type = 'harvested') = (harvest_weight IS NOT NULL)),
    CHECK (harvest_weight IS NULL OR harvest_weight > 0)
);

CREATE TABLE IF NOT EXISTS watering_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plant_id INTEGER NOT NULL REFERENCES plants(plant_id),
    watering_date TEXT NOT NULL,
    recipe_name TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL CHECK (amount > 0),
    description TEXT NOT NULL DEFAULT ''
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_plants_location ON plants(location_id);
CREATE INDEX IF NOT EXISTS idx_plant_states_plant ON plant_states(plant_id, id);
CREATE INDEX IF NOT EXISTS idx_watering_history_plant ON watering_history(plant_id, id);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    set_busy_timeout(conn, DEFAULT_BUSY_TIMEOUT)
}

pub fn set_busy_timeout(conn: &Connection, timeout: Duration) -> Result<()> {
    conn.busy_timeout(timeout)
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn ensure_shelf(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO shelves (name) VALUES (?1)",
        params![name],
    )?;
    conn.query_row(
        "SELECT id FROM shelves WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

pub fn ensure_level(conn: &Connection, shelf_id: i64, level_number: i64) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO levels (shelf_id, level_number) VALUES (?1, ?2)",
        params![shelf_id, level_number],
    )?;
    conn.query_row(
        "SELECT id FROM levels WHERE shelf_id = ?1 AND level_number = ?2",
        params![shelf_id, level_number],
        |row| row.get(0),
    )
}

pub fn ensure_position(conn: &Connection, level_id: i64, position_number: i64) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO positions (level_id, position_number) VALUES (?1, ?2)",
        params![level_id, position_number],
    )?;
    conn.query_row(
        "SELECT id FROM positions WHERE level_id = ?1 AND position_number = ?2",
        params![level_id, position_number],
        |row| row.get(0),
    )
}

pub fn list_shelves(conn: &Connection) -> Result<Vec<Shelf>> {
    let mut stmt = conn.prepare("SELECT id, name FROM shelves ORDER BY name, id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Shelf {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn list_levels(conn: &Connection) -> Result<Vec<Level>> {
    let mut stmt = conn.prepare(
        "SELECT id, shelf_id, level_number FROM levels ORDER BY shelf_id, level_number",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Level {
            id: row.get(0)?,
            shelf_id: row.get(1)?,
            level_number: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn list_positions(conn: &Connection) -> Result<Vec<Position>> {
    let mut stmt = conn.prepare(
        "SELECT id, level_id, position_number FROM positions ORDER BY level_id, position_number",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Position {
            id: row.get(0)?,
            level_id: row.get(1)?,
            position_number: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn insert_plant(conn: &Connection, location_id: i64, entry_date: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO plants (location_id, entry_date) VALUES (?1, ?2)",
        params![location_id, entry_date],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn plant_at_location(conn: &Connection, location_id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT plant_id FROM plants WHERE location_id = ?1",
        params![location_id],
        |row| row.get(0),
    )
    .optional()
}

fn plant_from_row(row: &Row<'_>) -> Result<Plant> {
    Ok(Plant {
        plant_id: row.get(0)?,
        location_id: row.get(1)?,
        entry_date: row.get(2)?,
    })
}

pub fn get_plant(conn: &Connection, plant_id: i64) -> Result<Option<Plant>> {
    conn.query_row(
        "SELECT plant_id, location_id, entry_date FROM plants WHERE plant_id = ?1",
        params![plant_id],
        plant_from_row,
    )
    .optional()
}

pub fn list_plants(conn: &Connection) -> Result<Vec<Plant>> {
    let mut stmt =
        conn.prepare("SELECT plant_id, location_id, entry_date FROM plants ORDER BY plant_id")?;
    let rows = stmt.query_map([], plant_from_row)?;
    rows.collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub plant_id: i64,
    pub state_date: String,
    pub state_type: String,
    pub harvest_weight: Option<f64>,
    pub description: Option<String>,
}

pub struct InsertState<'a> {
    pub plant_id: i64,
    pub state_date: &'a str,
    pub state_type: &'a str,
    pub harvest_weight: Option<f64>,
    pub description: Option<&'a str>,
}

pub fn insert_state(conn: &Connection, args: &InsertState<'_>) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO plant_states (plant_id, state_date, state_type, harvest_weight, description)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
        params![
            args.plant_id,
            args.state_date,
            args.state_type,
            args.harvest_weight,
            args.description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn state_from_row(row: &Row<'_>) -> Result<StateRecord> {
    Ok(StateRecord {
        plant_id: row.get(0)?,
        state_date: row.get(1)?,
        state_type: row.get(2)?,
        harvest_weight: row.get(3)?,
        description: row.get(4)?,
    })
}

/// Insertion order (`id` ascending).
pub fn list_states(conn: &Connection, plant_id: i64) -> Result<Vec<StateRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT plant_id, state_date, state_type, harvest_weight, description
FROM plant_states
WHERE plant_id = ?1
ORDER BY id
"#,
    )?;
    let rows = stmt.query_map(params![plant_id], state_from_row)?;
    rows.collect()
}

pub fn list_all_states(conn: &Connection) -> Result<Vec<StateRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT plant_id, state_date, state_type, harvest_weight, description
FROM plant_states
ORDER BY plant_id, id
"#,
    )?;
    let rows = stmt.query_map([], state_from_row)?;
    rows.collect()
}

pub struct InsertWatering<'a> {
    pub plant_id: i64,
    pub watering_date: &'a str,
    pub recipe_name: &'a str,
    pub amount: f64,
    pub description: &'a str,
}

pub fn insert_watering(conn: &Connection, args: &InsertWatering<'_>) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO watering_history (plant_id, watering_date, recipe_name, amount, description)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
        params![
            args.plant_id,
            args.watering_date,
            args.recipe_name,
            args.amount,
            args.description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_watering(conn: &Connection, plant_id: i64) -> Result<Vec<WateringEvent>> {
    let mut stmt = conn.prepare(
        r#"
SELECT plant_id, watering_date, recipe_name, amount, description
FROM watering_history
WHERE plant_id = ?1
ORDER BY id
"#,
    )?;
    let rows = stmt.query_map(params![plant_id], |row| {
        Ok(WateringEvent {
            plant_id: row.get(0)?,
            watering_date: row.get(1)?,
            fertilizer_recipe_name: row.get(2)?,
            amount: row.get(3)?,
            description: row.get(4)?,
        })
    })?;
    rows.collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinRecord {
    pub plant_id: i64,
    pub location_id: i64,
    pub shelf: Option<String>,
    pub level: Option<i64>,
    pub position: Option<i64>,
    pub entry_date: String,
    pub state_type: Option<String>,
    pub state_date: Option<String>,
    pub harvest_weight: Option<f64>,
}

/// Plant ⟕ location ⟕ states: one row per state event, or one row with
/// empty state columns for a plant without events. Location columns are
/// NULL when the plant points at a position that does not exist.
pub fn list_plant_join_rows(conn: &Connection) -> Result<Vec<JoinRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT p.plant_id, p.location_id, s.name, l.level_number, pos.position_number,
       p.entry_date, ps.state_type, ps.state_date, ps.harvest_weight
FROM plants p
LEFT JOIN positions pos ON p.location_id = pos.id
LEFT JOIN levels l ON pos.level_id = l.id
LEFT JOIN shelves s ON l.shelf_id = s.id
LEFT JOIN plant_states ps ON p.plant_id = ps.plant_id
ORDER BY p.plant_id, ps.id
"#,
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(JoinRecord {
            plant_id: row.get(0)?,
            location_id: row.get(1)?,
            shelf: row.get(2)?,
            level: row.get(3)?,
            position: row.get(4)?,
            entry_date: row.get(5)?,
            state_type: row.get(6)?,
            state_date: row.get(7)?,
            harvest_weight: row.get(8)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests;
