use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::domain::location::Location;
use crate::domain::plant::{Plant, StateEvent};
use crate::domain::state::{StateType, UNSET_LABEL};
use crate::history::{compare_optional_dates, current_state};

/// One row per plant: plant + location + current state. Derived, never
/// written back.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InventoryRow {
    pub plant_id: i64,
    pub shelf: String,
    pub level: i64,
    pub position: i64,
    pub entry_date: String,
    #[serde(serialize_with = "serialize_state_label")]
    pub state_type: Option<StateType>,
    pub state_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_weight: Option<f64>,
}

impl InventoryRow {
    pub fn state_label(&self) -> &'static str {
        self.state_type.map(StateType::as_str).unwrap_or(UNSET_LABEL)
    }
}

fn serialize_state_label<S: Serializer>(
    value: &Option<StateType>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.map(StateType::as_str).unwrap_or(UNSET_LABEL))
}

/// A flattened plant ⨝ location ⟕ state row as a store returns it. A plant
/// with several state events appears once per event; a plant with none
/// appears once with empty state columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawJoinRow {
    pub plant_id: i64,
    pub shelf: String,
    pub level: i64,
    pub position: i64,
    pub entry_date: String,
    pub state_type: Option<StateType>,
    pub state_date: Option<String>,
    pub harvest_weight: Option<f64>,
}

impl From<RawJoinRow> for InventoryRow {
    fn from(value: RawJoinRow) -> Self {
        Self {
            plant_id: value.plant_id,
            shelf: value.shelf,
            level: value.level,
            position: value.position,
            entry_date: value.entry_date,
            state_type: value.state_type,
            state_date: value.state_date,
            harvest_weight: value.harvest_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DanglingReference {
    pub plant_id: i64,
    pub location_id: i64,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plant {} references missing location {}",
            self.plant_id, self.location_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    DanglingReferences(Vec<DanglingReference>),
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::DanglingReferences(refs) => {
                let detail = refs
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{} dangling location reference(s): {}", refs.len(), detail)
            }
        }
    }
}

impl Error for InventoryError {}

/// Joins plants with their location and current state. Exactly one row per
/// distinct `plant_id`, in first-seen order. Every plant whose location is
/// missing is reported; none are dropped silently.
pub fn build_inventory(
    plants: &[Plant],
    locations: &[Location],
    state_events_by_plant: &HashMap<i64, Vec<StateEvent>>,
) -> Result<Vec<InventoryRow>, InventoryError> {
    let locations_by_id: HashMap<i64, &Location> = locations
        .iter()
        .map(|location| (location.id, location))
        .collect();

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(plants.len());
    let mut dangling = Vec::new();

    for plant in plants {
        if !seen.insert(plant.plant_id) {
            continue;
        }
        let Some(location) = locations_by_id.get(&plant.location_id) else {
            dangling.push(DanglingReference {
                plant_id: plant.plant_id,
                location_id: plant.location_id,
            });
            continue;
        };

        let events = state_events_by_plant
            .get(&plant.plant_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let current = current_state(events);
        let event = current.event();
        rows.push(InventoryRow {
            plant_id: plant.plant_id,
            shelf: location.shelf.clone(),
            level: location.level,
            position: location.position,
            entry_date: plant.entry_date.clone(),
            state_type: event.map(|event| event.state_type),
            state_date: event.map(|event| event.state_date.clone()),
            harvest_weight: event.and_then(|event| event.harvest_weight),
        });
    }

    if dangling.is_empty() {
        Ok(rows)
    } else {
        Err(InventoryError::DanglingReferences(dangling))
    }
}

/// Reduce-by-key over `plant_id`, keeping the row with the latest
/// `state_date`. Equal dates keep the later row. Row order from the store is
/// not relied on for correctness; output is in first-seen order.
pub fn collapse_join_rows(rows: Vec<RawJoinRow>) -> Vec<InventoryRow> {
    let mut slot_by_plant: HashMap<i64, usize> = HashMap::new();
    let mut collapsed: Vec<RawJoinRow> = Vec::new();

    for row in rows {
        match slot_by_plant.get(&row.plant_id) {
            Some(&slot) => {
                let kept = &collapsed[slot];
                let newer = compare_optional_dates(
                    row.state_date.as_deref(),
                    kept.state_date.as_deref(),
                ) != Ordering::Less;
                if newer {
                    collapsed[slot] = row;
                }
            }
            None => {
                slot_by_plant.insert(row.plant_id, collapsed.len());
                collapsed.push(row);
            }
        }
    }

    collapsed.into_iter().map(InventoryRow::from).collect()
}

#[cfg(test)]
mod tests;
