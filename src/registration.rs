use std::error::Error;
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::location::{Level, Position, Shelf};
use crate::domain::plant::{today_utc, EventValidationError, NewStateEvent, Plant};
use crate::domain::state::StateType;
use crate::registry::{LocationRegistry, RegistryError};
use crate::store::{NewPlant, PlantRecordStore, StoreError};

#[derive(Debug)]
pub enum RegistrationError {
    Locked(&'static str),
    NotFound(RegistryError),
    UnknownOption { field: &'static str, id: i64 },
    Incomplete(String),
    Event(EventValidationError),
    Store(StoreError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::Locked(field) => {
                write!(f, "{field} cannot be selected yet")
            }
            RegistrationError::NotFound(err) => write!(f, "{}", err),
            RegistrationError::UnknownOption { field, id } => {
                write!(f, "{field} {id} is not available for the current selection")
            }
            RegistrationError::Incomplete(message) => write!(f, "{}", message),
            RegistrationError::Event(err) => write!(f, "{}", err),
            RegistrationError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistrationError::NotFound(err) => Some(err),
            RegistrationError::Event(err) => Some(err),
            RegistrationError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for RegistrationError {
    fn from(value: RegistryError) -> Self {
        RegistrationError::NotFound(value)
    }
}

impl From<EventValidationError> for RegistrationError {
    fn from(value: EventValidationError) -> Self {
        RegistrationError::Event(value)
    }
}

impl From<StoreError> for RegistrationError {
    fn from(value: StoreError) -> Self {
        RegistrationError::Store(value)
    }
}

/// New-plant form. Selections cascade shelf -> level -> position: picking a
/// parent clears every child and reloads the child options from the
/// registry. State is independent; harvest amount only counts when the
/// state is harvested.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    shelves: Vec<Shelf>,
    levels: Vec<Level>,
    positions: Vec<Position>,
    shelf: Option<i64>,
    level: Option<i64>,
    position: Option<i64>,
    state: Option<StateType>,
    harvest_amount: Option<f64>,
    entry_date: Option<String>,
    last_error: Option<String>,
}

impl RegistrationForm {
    pub fn new(registry: &LocationRegistry) -> Self {
        Self {
            shelves: registry.list_shelves().to_vec(),
            ..Self::default()
        }
    }

    pub fn is_level_locked(&self) -> bool {
        self.shelf.is_none()
    }

    pub fn is_position_locked(&self) -> bool {
        self.level.is_none()
    }

    pub fn select_shelf(
        &mut self,
        registry: &LocationRegistry,
        shelf_id: i64,
    ) -> Result<(), RegistrationError> {
        let levels = registry.list_levels(shelf_id)?;
        self.shelf = Some(shelf_id);
        self.levels = levels;
        self.level = None;
        self.positions.clear();
        self.position = None;
        debug!(shelf_id, levels = self.levels.len(), "shelf selected");
        Ok(())
    }

    pub fn select_level(
        &mut self,
        registry: &LocationRegistry,
        level_id: i64,
    ) -> Result<(), RegistrationError> {
        if self.is_level_locked() {
            return Err(RegistrationError::Locked("level"));
        }
        if !self.levels.iter().any(|level| level.id == level_id) {
            return Err(RegistrationError::UnknownOption {
                field: "level",
                id: level_id,
            });
        }
        let positions = registry.list_positions(level_id)?;
        self.level = Some(level_id);
        self.positions = positions;
        self.position = None;
        debug!(level_id, positions = self.positions.len(), "level selected");
        Ok(())
    }

    pub fn select_position(&mut self, position_id: i64) -> Result<(), RegistrationError> {
        if self.is_position_locked() {
            return Err(RegistrationError::Locked("position"));
        }
        if !self
            .positions
            .iter()
            .any(|position| position.id == position_id)
        {
            return Err(RegistrationError::UnknownOption {
                field: "position",
                id: position_id,
            });
        }
        self.position = Some(position_id);
        Ok(())
    }

    pub fn select_state(&mut self, state: StateType) {
        self.state = Some(state);
    }

    pub fn set_harvest_amount(&mut self, amount: Option<f64>) {
        self.harvest_amount = amount;
    }

    /// Defaults to today's UTC date at submission.
    pub fn set_entry_date(&mut self, entry_date: Option<String>) {
        self.entry_date = entry_date.filter(|value| !value.trim().is_empty());
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.shelf.is_none() {
            missing.push("shelf");
        }
        if self.level.is_none() {
            missing.push("level");
        }
        if self.position.is_none() {
            missing.push("position");
        }
        match self.state {
            None => missing.push("state"),
            Some(state) if state.requires_harvest_weight() => {
                if !self
                    .harvest_amount
                    .is_some_and(|amount| amount.is_finite() && amount > 0.0)
                {
                    missing.push("harvest amount > 0");
                }
            }
            Some(_) => {}
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// The store request this form would submit. The harvest amount is only
    /// carried for a harvested state.
    pub fn to_submission(&self) -> Result<NewPlant, RegistrationError> {
        let Some(state) = self.state.filter(|_| self.is_valid()) else {
            return Err(RegistrationError::Incomplete(format!(
                "registration is incomplete: missing {}",
                self.missing_fields().join(", ")
            )));
        };
        let entry_date = self.entry_date.clone().unwrap_or_else(today_utc);
        let harvest_weight = if state.requires_harvest_weight() {
            self.harvest_amount
        } else {
            None
        };
        let initial_state = NewStateEvent::new(state, &entry_date, harvest_weight, None)?;
        Ok(NewPlant {
            location_id: self.position,
            entry_date,
            initial_state,
        })
    }

    /// Submits through `store`. Success clears the form; failure keeps every
    /// entered value and records the message for display.
    pub fn submit<S: PlantRecordStore + ?Sized>(
        &mut self,
        store: &S,
        timeout: Duration,
    ) -> Result<Plant, RegistrationError> {
        let outcome = self
            .to_submission()
            .and_then(|request| Ok(store.create_plant(&request, timeout)?));
        match outcome {
            Ok(plant) => {
                self.reset();
                Ok(plant)
            }
            Err(err) => {
                warn!(error = %err, "registration rejected");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Clears all selections; shelf options stay loaded.
    pub fn reset(&mut self) {
        let shelves = std::mem::take(&mut self.shelves);
        *self = Self {
            shelves,
            ..Self::default()
        };
    }
}

/// Read side for form renderers.
#[allow(dead_code)]
impl RegistrationForm {
    pub fn shelf_options(&self) -> &[Shelf] {
        &self.shelves
    }

    pub fn level_options(&self) -> &[Level] {
        &self.levels
    }

    pub fn position_options(&self) -> &[Position] {
        &self.positions
    }

    pub fn shelf(&self) -> Option<i64> {
        self.shelf
    }

    pub fn level(&self) -> Option<i64> {
        self.level
    }

    pub fn position(&self) -> Option<i64> {
        self.position
    }

    pub fn state(&self) -> Option<StateType> {
        self.state
    }

    pub fn harvest_amount(&self) -> Option<f64> {
        self.harvest_amount
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
