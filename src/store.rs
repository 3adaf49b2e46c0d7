use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::db::{self, InsertState, InsertWatering, JoinRecord, StateRecord};
use crate::domain::plant::{
    normalize_date, NewStateEvent, NewWateringEvent, Plant, StateEvent, WateringEvent,
};
use crate::domain::state::StateType;
use crate::history::compare_optional_dates;
use crate::inventory::{DanglingReference, RawJoinRow};
use crate::layout::Layout;
use crate::registry::{LocationRegistry, RegistryError};

#[derive(Debug)]
pub enum StoreError {
    Db(rusqlite::Error),
    Registry(RegistryError),
    NotFound(String),
    Validation(String),
    Conflict(String),
    Timeout(Duration),
    InvalidRecord(String),
    DanglingReferences(Vec<DanglingReference>),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::Registry(err) => write!(f, "{}", err),
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::Validation(message) => write!(f, "{}", message),
            StoreError::Conflict(message) => write!(f, "{}", message),
            StoreError::Timeout(limit) => {
                write!(f, "store write timed out after {} ms", limit.as_millis())
            }
            StoreError::InvalidRecord(message) => write!(f, "invalid stored record: {}", message),
            StoreError::DanglingReferences(refs) => write!(f, "{}", join_references(refs)),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Db(err) => Some(err),
            StoreError::Registry(err) => Some(err),
            _ => None,
        }
    }
}

pub(crate) fn join_references(refs: &[DanglingReference]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<RegistryError> for StoreError {
    fn from(value: RegistryError) -> Self {
        StoreError::Registry(value)
    }
}

/// Input for registering a plant. A missing location is a validation error
/// at the store boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlant {
    pub location_id: Option<i64>,
    pub entry_date: String,
    pub initial_state: NewStateEvent,
}

/// Read/write boundary over plants, their events, and the location hierarchy.
/// Each write is atomic: it either lands completely or leaves nothing behind.
pub trait PlantRecordStore {
    fn load_registry(&self) -> Result<LocationRegistry, StoreError>;

    fn list_plants_with_location_and_latest_state(&self) -> Result<Vec<RawJoinRow>, StoreError>;

    fn list_plants(&self) -> Result<Vec<Plant>, StoreError>;

    fn list_state_events_by_plant(&self) -> Result<HashMap<i64, Vec<StateEvent>>, StoreError>;

    fn get_plant(&self, plant_id: i64) -> Result<Plant, StoreError>;

    fn create_plant(&self, plant: &NewPlant, timeout: Duration) -> Result<Plant, StoreError>;

    fn append_state_event(
        &self,
        plant_id: i64,
        event: &NewStateEvent,
        timeout: Duration,
    ) -> Result<StateEvent, StoreError>;

    fn append_watering_event(
        &self,
        plant_id: i64,
        event: &NewWateringEvent,
        timeout: Duration,
    ) -> Result<WateringEvent, StoreError>;

    /// Newest first.
    fn list_watering_history(&self, plant_id: i64) -> Result<Vec<WateringEvent>, StoreError>;

    /// Insertion order.
    fn list_state_history(&self, plant_id: i64) -> Result<Vec<StateEvent>, StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let conn = db::open_connection(db_path)?;
        debug!(db_path, "opened sqlite store");
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<Option<String>, StoreError> {
        Ok(db::get_meta(&self.conn, "schema_version")?)
    }

    /// Adds every slot of `layout` that is not registered yet. Returns the
    /// number of positions created.
    pub fn seed_layout(&self, layout: &Layout) -> Result<usize, StoreError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let before = db::list_positions(&tx)?.len();
        for shelf in &layout.shelves {
            let shelf_id = db::ensure_shelf(&tx, &shelf.name)?;
            for (level_index, positions) in shelf.positions_per_level.iter().enumerate() {
                let level_id = db::ensure_level(&tx, shelf_id, level_index as i64 + 1)?;
                for position in 1..=*positions {
                    db::ensure_position(&tx, level_id, position)?;
                }
            }
        }
        let after = db::list_positions(&tx)?.len();
        tx.commit()?;
        let created = after.saturating_sub(before);
        info!(created, total = after, "seeded location layout");
        Ok(created)
    }

    /// Runs `work` in an immediate transaction bounded by `timeout`. Lock
    /// waits use the same budget; overrunning rolls everything back.
    fn write_within<T>(
        &self,
        timeout: Duration,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let started = Instant::now();
        db::set_busy_timeout(&self.conn, timeout)?;
        let outcome = self.run_transaction(started, timeout, work);
        let restored = db::set_busy_timeout(&self.conn, db::DEFAULT_BUSY_TIMEOUT);
        settle_write(outcome, restored, timeout)
    }

    fn run_transaction<T>(
        &self,
        started: Instant,
        timeout: Duration,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = work(&tx)?;
        if started.elapsed() > timeout {
            tx.rollback()?;
            return Err(StoreError::Timeout(timeout));
        }
        tx.commit()?;
        Ok(value)
    }
}

/// The transaction outcome decides the result. A failed busy-timeout reset
/// is only logged so a committed write is never reported as failed.
fn settle_write<T>(
    outcome: Result<T, StoreError>,
    restored: rusqlite::Result<()>,
    timeout: Duration,
) -> Result<T, StoreError> {
    if let Err(err) = restored {
        warn!(error = %err, "failed to restore default busy timeout");
    }
    match outcome {
        Err(StoreError::Db(err)) if is_lock_timeout(&err) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "store write lock wait timed out");
            Err(StoreError::Timeout(timeout))
        }
        Err(StoreError::Timeout(limit)) => {
            warn!(timeout_ms = limit.as_millis() as u64, "store write exceeded budget");
            Err(StoreError::Timeout(limit))
        }
        other => other,
    }
}

fn is_lock_timeout(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

impl PlantRecordStore for SqliteStore {
    fn load_registry(&self) -> Result<LocationRegistry, StoreError> {
        let registry = LocationRegistry::new(
            db::list_shelves(&self.conn)?,
            db::list_levels(&self.conn)?,
            db::list_positions(&self.conn)?,
        )?;
        Ok(registry)
    }

    fn list_plants_with_location_and_latest_state(&self) -> Result<Vec<RawJoinRow>, StoreError> {
        let rows = db::list_plant_join_rows(&self.conn)?;
        debug!(rows = rows.len(), "loaded plant join rows");
        let mut dangling: Vec<DanglingReference> = Vec::new();
        let mut joined = Vec::with_capacity(rows.len());
        for row in rows {
            match RawJoinRow::try_from(row) {
                Ok(joined_row) => joined.push(joined_row),
                Err(StoreError::DanglingReferences(refs)) => {
                    for reference in refs {
                        if !dangling.contains(&reference) {
                            warn!(
                                plant_id = reference.plant_id,
                                location_id = reference.location_id,
                                "plant references a missing location"
                            );
                            dangling.push(reference);
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
        if !dangling.is_empty() {
            return Err(StoreError::DanglingReferences(dangling));
        }
        Ok(joined)
    }

    fn list_plants(&self) -> Result<Vec<Plant>, StoreError> {
        Ok(db::list_plants(&self.conn)?)
    }

    fn list_state_events_by_plant(&self) -> Result<HashMap<i64, Vec<StateEvent>>, StoreError> {
        let mut grouped: HashMap<i64, Vec<StateEvent>> = HashMap::new();
        for record in db::list_all_states(&self.conn)? {
            let event = StateEvent::try_from(record)?;
            grouped.entry(event.plant_id).or_default().push(event);
        }
        Ok(grouped)
    }

    fn get_plant(&self, plant_id: i64) -> Result<Plant, StoreError> {
        db::get_plant(&self.conn, plant_id)?
            .ok_or_else(|| StoreError::NotFound(format!("plant {plant_id}")))
    }

    fn create_plant(&self, plant: &NewPlant, timeout: Duration) -> Result<Plant, StoreError> {
        let location_id = plant.location_id.ok_or_else(|| {
            StoreError::Validation("shelf, level, and position are required".to_string())
        })?;
        let entry_date = normalize_date(&plant.entry_date).ok_or_else(|| {
            StoreError::Validation(format!("entry_date '{}' is not a valid date", plant.entry_date))
        })?;

        let created = self.write_within(timeout, |tx| {
            let known = db::list_positions(tx)?
                .iter()
                .any(|position| position.id == location_id);
            if !known {
                return Err(StoreError::NotFound(format!("location {location_id}")));
            }
            if let Some(occupant) = db::plant_at_location(tx, location_id)? {
                return Err(StoreError::Conflict(format!(
                    "location {location_id} is already occupied by plant {occupant}"
                )));
            }
            let plant_id = db::insert_plant(tx, location_id, &entry_date)?;
            let initial = &plant.initial_state;
            db::insert_state(
                tx,
                &InsertState {
                    plant_id,
                    state_date: initial.state_date(),
                    state_type: initial.state_type().as_str(),
                    harvest_weight: initial.harvest_weight(),
                    description: initial.description(),
                },
            )?;
            Ok(Plant {
                plant_id,
                location_id,
                entry_date: entry_date.clone(),
            })
        });

        match &created {
            Ok(plant) => info!(
                plant_id = plant.plant_id,
                location_id, "registered plant"
            ),
            Err(StoreError::Conflict(message)) => warn!(location_id, "{message}"),
            Err(_) => {}
        }
        created
    }

    fn append_state_event(
        &self,
        plant_id: i64,
        event: &NewStateEvent,
        timeout: Duration,
    ) -> Result<StateEvent, StoreError> {
        self.write_within(timeout, |tx| {
            if db::get_plant(tx, plant_id)?.is_none() {
                return Err(StoreError::NotFound(format!("plant {plant_id}")));
            }
            db::insert_state(
                tx,
                &InsertState {
                    plant_id,
                    state_date: event.state_date(),
                    state_type: event.state_type().as_str(),
                    harvest_weight: event.harvest_weight(),
                    description: event.description(),
                },
            )?;
            Ok(())
        })?;
        info!(plant_id, state = %event.state_type(), "appended state event");
        Ok(event.clone().into_event(plant_id))
    }

    fn append_watering_event(
        &self,
        plant_id: i64,
        event: &NewWateringEvent,
        timeout: Duration,
    ) -> Result<WateringEvent, StoreError> {
        self.write_within(timeout, |tx| {
            if db::get_plant(tx, plant_id)?.is_none() {
                return Err(StoreError::NotFound(format!("plant {plant_id}")));
            }
            db::insert_watering(
                tx,
                &InsertWatering {
                    plant_id,
                    watering_date: event.watering_date(),
                    recipe_name: event.fertilizer_recipe_name(),
                    amount: event.amount(),
                    description: event.description(),
                },
            )?;
            Ok(())
        })?;
        info!(plant_id, amount = event.amount(), "appended watering event");
        Ok(WateringEvent {
            plant_id,
            watering_date: event.watering_date().to_string(),
            fertilizer_recipe_name: event.fertilizer_recipe_name().to_string(),
            amount: event.amount(),
            description: event.description().to_string(),
        })
    }

    fn list_watering_history(&self, plant_id: i64) -> Result<Vec<WateringEvent>, StoreError> {
        self.get_plant(plant_id)?;
        let mut events = db::list_watering(&self.conn, plant_id)?;
        events.reverse();
        events.sort_by(|left, right| {
            compare_optional_dates(Some(&right.watering_date), Some(&left.watering_date))
        });
        Ok(events)
    }

    fn list_state_history(&self, plant_id: i64) -> Result<Vec<StateEvent>, StoreError> {
        self.get_plant(plant_id)?;
        db::list_states(&self.conn, plant_id)?
            .into_iter()
            .map(StateEvent::try_from)
            .collect()
    }
}

fn parse_stored_state(raw: &str, plant_id: i64) -> Result<StateType, StoreError> {
    StateType::from_str(raw)
        .map_err(|err| StoreError::InvalidRecord(format!("plant {plant_id}: {err}")))
}

impl TryFrom<StateRecord> for StateEvent {
    type Error = StoreError;

    fn try_from(value: StateRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            plant_id: value.plant_id,
            state_type: parse_stored_state(&value.state_type, value.plant_id)?,
            state_date: value.state_date,
            harvest_weight: value.harvest_weight,
            description: value.description,
        })
    }
}

impl TryFrom<JoinRecord> for RawJoinRow {
    type Error = StoreError;

    fn try_from(value: JoinRecord) -> Result<Self, Self::Error> {
        let state_type = value
            .state_type
            .as_deref()
            .map(|raw| parse_stored_state(raw, value.plant_id))
            .transpose()?;
        let dangling = || {
            StoreError::DanglingReferences(vec![DanglingReference {
                plant_id: value.plant_id,
                location_id: value.location_id,
            }])
        };
        Ok(Self {
            plant_id: value.plant_id,
            shelf: value.shelf.ok_or_else(dangling)?,
            level: value.level.ok_or_else(dangling)?,
            position: value.position.ok_or_else(dangling)?,
            entry_date: value.entry_date,
            state_type,
            state_date: value.state_date,
            harvest_weight: value.harvest_weight,
        })
    }
}
