use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::check::{run_check, CheckReport};
use crate::domain::location::Location;
use crate::domain::plant::{
    today_utc, EventValidationError, NewStateEvent, NewWateringEvent, StateEvent, WateringEvent,
};
use crate::domain::state::{ParseStateTypeError, StateType};
use crate::history;
use crate::inventory::{collapse_join_rows, DanglingReference, InventoryRow};
use crate::layout::{Layout, LayoutError};
use crate::listing::{filter_by_shelf, sort_with_config, SortConfig};
use crate::registration::{RegistrationError, RegistrationForm};
use crate::registry::{LocationRegistry, RegistryError};
use crate::store::{join_references, PlantRecordStore, SqliteStore, StoreError};

pub struct App {
    store: SqliteStore,
    registry: LocationRegistry,
    write_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InitSummary {
    pub schema_version: Option<String>,
    pub layout_slots: i64,
    pub shelves: usize,
    pub positions_created: usize,
    pub positions_total: usize,
}

/// Occupancy of one shelf for the shelf grid.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShelfSummary {
    pub shelf: String,
    pub levels: usize,
    pub slots: usize,
    pub occupied: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LevelSummary {
    pub shelf: String,
    pub level: i64,
    pub slots: usize,
    pub occupied: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotView {
    pub location: Location,
    pub plant_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    pub shelf: Option<String>,
    pub sort: SortConfig,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub shelf: String,
    pub level: i64,
    pub position: i64,
    pub state: String,
    pub harvest_amount: Option<f64>,
    pub entry_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StateRequest<'a> {
    pub plant_id: i64,
    pub state: &'a str,
    pub harvest_weight: Option<f64>,
    pub date: Option<&'a str>,
    pub note: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct WateringRequest<'a> {
    pub plant_id: i64,
    pub recipe: &'a str,
    pub amount: f64,
    pub date: Option<&'a str>,
    pub note: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlantDetail {
    pub plant_id: i64,
    pub location: Location,
    pub entry_date: String,
    pub current_state: &'static str,
    pub current: Option<StateEvent>,
    pub history: Vec<StateEvent>,
    pub watering: Vec<WateringEvent>,
}

impl App {
    pub fn open(db_path: &str, write_timeout: Duration) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let store = SqliteStore::open(db_path)?;
        let registry = store.load_registry()?;
        debug!(
            shelves = registry.list_shelves().len(),
            timeout_ms = write_timeout.as_millis() as u64,
            "app opened"
        );
        Ok(Self {
            store,
            registry,
            write_timeout,
        })
    }

    /// Adds the layout's slots to the registry. Existing slots are kept.
    pub fn init(&mut self, layout: &Layout) -> Result<InitSummary, AppError> {
        let positions_created = self.store.seed_layout(layout)?;
        self.registry = self.store.load_registry()?;
        Ok(InitSummary {
            schema_version: self.store.schema_version()?,
            layout_slots: layout.slot_count(),
            shelves: self.registry.list_shelves().len(),
            positions_created,
            positions_total: self.registry.locations().len(),
        })
    }

    pub fn state_types(&self) -> &'static [StateType] {
        &StateType::ALL
    }

    /// One row per plant with its current state, in store order. A plant whose
    /// location is missing fails the whole listing.
    pub fn inventory(&self) -> Result<Vec<InventoryRow>, AppError> {
        let rows = self.store.list_plants_with_location_and_latest_state()?;
        Ok(collapse_join_rows(rows))
    }

    pub fn list_inventory(&self, query: &InventoryQuery) -> Result<Vec<InventoryRow>, AppError> {
        let rows = self.inventory()?;
        let rows = match query.shelf.as_deref() {
            Some(shelf) => {
                if self.registry.shelf_by_name(shelf).is_none() {
                    return Err(AppError::NotFound(format!("shelf '{}'", shelf.trim())));
                }
                filter_by_shelf(&rows, Some(shelf.trim()))
            }
            None => rows,
        };
        Ok(sort_with_config(rows, &query.sort))
    }

    pub fn shelf_overview(&self) -> Result<Vec<ShelfSummary>, AppError> {
        let occupants = self.occupants()?;
        let mut summaries = Vec::new();
        for shelf in self.registry.list_shelves() {
            let levels = self.registry.list_levels(shelf.id)?;
            let mut slots = 0;
            let mut occupied = 0;
            for level in &levels {
                for position in self.registry.list_positions(level.id)? {
                    slots += 1;
                    if occupants.contains_key(&position.id) {
                        occupied += 1;
                    }
                }
            }
            summaries.push(ShelfSummary {
                shelf: shelf.name.clone(),
                levels: levels.len(),
                slots,
                occupied,
            });
        }
        Ok(summaries)
    }

    pub fn list_levels(&self, shelf: &str) -> Result<Vec<LevelSummary>, AppError> {
        let shelf = self
            .registry
            .shelf_by_name(shelf)
            .ok_or_else(|| AppError::NotFound(format!("shelf '{}'", shelf.trim())))?;
        let occupants = self.occupants()?;
        let mut summaries = Vec::new();
        for level in self.registry.list_levels(shelf.id)? {
            let positions = self.registry.list_positions(level.id)?;
            summaries.push(LevelSummary {
                shelf: shelf.name.clone(),
                level: level.level_number,
                slots: positions.len(),
                occupied: positions
                    .iter()
                    .filter(|position| occupants.contains_key(&position.id))
                    .count(),
            });
        }
        Ok(summaries)
    }

    pub fn list_positions(&self, shelf: &str, level: i64) -> Result<Vec<SlotView>, AppError> {
        let shelf_record = self
            .registry
            .shelf_by_name(shelf)
            .ok_or_else(|| AppError::NotFound(format!("shelf '{}'", shelf.trim())))?;
        let level_record = self
            .registry
            .level_by_number(shelf_record.id, level)
            .ok_or_else(|| {
                AppError::NotFound(format!("level {} on shelf '{}'", level, shelf_record.name))
            })?;
        let occupants = self.occupants()?;
        self.registry
            .list_positions(level_record.id)?
            .into_iter()
            .map(|position| {
                Ok(SlotView {
                    location: self.registry.resolve(position.id)?,
                    plant_id: occupants.get(&position.id).copied(),
                })
            })
            .collect()
    }

    /// Registers a plant by walking the form the way an interactive user
    /// would: shelf, then level, then position, then state.
    pub fn register(&self, request: &RegisterRequest) -> Result<PlantDetail, AppError> {
        let state = StateType::from_str(&request.state)?;
        let mut form = RegistrationForm::new(&self.registry);

        let shelf_id = self
            .registry
            .shelf_by_name(&request.shelf)
            .map(|shelf| shelf.id)
            .ok_or_else(|| AppError::NotFound(format!("shelf '{}'", request.shelf.trim())))?;
        form.select_shelf(&self.registry, shelf_id)?;

        let level_id = self
            .registry
            .level_by_number(shelf_id, request.level)
            .map(|level| level.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "level {} on shelf '{}'",
                    request.level,
                    request.shelf.trim()
                ))
            })?;
        form.select_level(&self.registry, level_id)?;

        let position_id = self
            .registry
            .position_by_number(level_id, request.position)
            .map(|position| position.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "position {}/{}/{}",
                    request.shelf.trim(),
                    request.level,
                    request.position
                ))
            })?;
        form.select_position(position_id)?;

        form.select_state(state);
        form.set_harvest_amount(request.harvest_amount);
        form.set_entry_date(request.entry_date.clone());

        let plant = form.submit(&self.store, self.write_timeout)?;
        self.show_plant(plant.plant_id)
    }

    pub fn record_state(&self, request: &StateRequest<'_>) -> Result<StateEvent, AppError> {
        let state = StateType::from_str(request.state)?;
        let date = request.date.map(str::to_string).unwrap_or_else(today_utc);
        let event = NewStateEvent::new(state, &date, request.harvest_weight, request.note)?;
        let appended = self
            .store
            .append_state_event(request.plant_id, &event, self.write_timeout)?;
        info!(plant_id = request.plant_id, state = %state, "state recorded");
        Ok(appended)
    }

    pub fn record_watering(
        &self,
        request: &WateringRequest<'_>,
    ) -> Result<WateringEvent, AppError> {
        let date = request.date.map(str::to_string).unwrap_or_else(today_utc);
        let event = NewWateringEvent::new(
            &date,
            request.recipe,
            request.amount,
            request.note.unwrap_or_default(),
        )?;
        Ok(self
            .store
            .append_watering_event(request.plant_id, &event, self.write_timeout)?)
    }

    pub fn show_plant(&self, plant_id: i64) -> Result<PlantDetail, AppError> {
        let plant = self.store.get_plant(plant_id)?;
        let location = self.registry.resolve(plant.location_id).map_err(|_| {
            AppError::DanglingReferences(vec![DanglingReference {
                plant_id,
                location_id: plant.location_id,
            }])
        })?;
        let events = self.store.list_state_history(plant_id)?;
        let resolved = history::resolve(&events);
        let watering = self.store.list_watering_history(plant_id)?;
        Ok(PlantDetail {
            plant_id,
            location,
            entry_date: plant.entry_date,
            current_state: resolved.current.label(),
            current: resolved.current.event().cloned(),
            history: resolved.history,
            watering,
        })
    }

    pub fn check(&self) -> Result<CheckReport, AppError> {
        Ok(run_check(&self.store)?)
    }

    fn occupants(&self) -> Result<HashMap<i64, i64>, AppError> {
        Ok(self
            .store
            .list_plants()?
            .into_iter()
            .map(|plant| (plant.location_id, plant.plant_id))
            .collect())
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Layout(LayoutError),
    ParseState(ParseStateTypeError),
    DanglingReferences(Vec<DanglingReference>),
    InvalidRecord(String),
    Validation(String),
    Conflict(String),
    Timeout(Duration),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Layout(err) => write!(f, "{}", err),
            AppError::ParseState(err) => write!(f, "{}", err),
            AppError::DanglingReferences(refs) => write!(f, "{}", join_references(refs)),
            AppError::InvalidRecord(message) => write!(f, "invalid stored record: {}", message),
            AppError::Validation(message) => write!(f, "{}", message),
            AppError::Conflict(message) => write!(f, "{}", message),
            AppError::Timeout(limit) => {
                write!(f, "store write timed out after {} ms", limit.as_millis())
            }
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(what) => write!(f, "{} not found", what),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Layout(err) => Some(err),
            AppError::ParseState(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<LayoutError> for AppError {
    fn from(value: LayoutError) -> Self {
        AppError::Layout(value)
    }
}

impl From<ParseStateTypeError> for AppError {
    fn from(value: ParseStateTypeError) -> Self {
        AppError::ParseState(value)
    }
}

impl From<EventValidationError> for AppError {
    fn from(value: EventValidationError) -> Self {
        AppError::Validation(value.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::ShelfNotFound(id) => AppError::NotFound(format!("shelf {id}")),
            RegistryError::LevelNotFound(id) => AppError::NotFound(format!("level {id}")),
            RegistryError::PositionNotFound(id) => AppError::NotFound(format!("location {id}")),
            RegistryError::DuplicateSlot(_) => AppError::InvalidRecord(value.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Db(err) => AppError::Db(err),
            StoreError::Registry(err) => AppError::from(err),
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Validation(message) => AppError::Validation(message),
            StoreError::Conflict(message) => AppError::Conflict(message),
            StoreError::Timeout(limit) => AppError::Timeout(limit),
            StoreError::InvalidRecord(message) => AppError::InvalidRecord(message),
            StoreError::DanglingReferences(refs) => AppError::DanglingReferences(refs),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(value: RegistrationError) -> Self {
        match value {
            RegistrationError::Store(err) => AppError::from(err),
            RegistrationError::NotFound(err) => AppError::from(err),
            RegistrationError::Event(err) => AppError::from(err),
            RegistrationError::UnknownOption { field, id } => {
                AppError::NotFound(format!("{field} {id}"))
            }
            RegistrationError::Locked(_) | RegistrationError::Incomplete(_) => {
                AppError::Validation(value.to_string())
            }
        }
    }
}
