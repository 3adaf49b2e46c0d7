use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::domain::plant::parse_instant;
use crate::inventory::{build_inventory, InventoryError};
use crate::store::{PlantRecordStore, StoreError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckIssue {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckReport {
    pub plants_scanned: u64,
    pub locations_scanned: u64,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Scans stored plants and their state events without trusting the join
/// path. Every plant must resolve to a registered location and every event
/// must decode, parse its date, and belong to a known plant.
pub fn run_check<S: PlantRecordStore + ?Sized>(store: &S) -> Result<CheckReport, StoreError> {
    let registry = store.load_registry()?;
    let locations = registry.locations();
    let plants = store.list_plants()?;
    let mut issues = Vec::new();
    let mut events_by_plant = HashMap::new();

    for plant in &plants {
        let subject = format!("plant {}", plant.plant_id);
        if parse_instant(&plant.entry_date).is_none() {
            issues.push(issue(
                &subject,
                &format!("entry_date '{}' is not a valid date", plant.entry_date),
            ));
        }
        let events = match store.list_state_history(plant.plant_id) {
            Ok(events) => events,
            Err(StoreError::InvalidRecord(message)) => {
                issues.push(issue(&subject, &message));
                continue;
            }
            Err(err) => return Err(err),
        };
        for event in &events {
            if parse_instant(&event.state_date).is_none() {
                issues.push(issue(
                    &subject,
                    &format!("state_date '{}' is not a valid date", event.state_date),
                ));
            }
        }
        events_by_plant.insert(plant.plant_id, events);
    }

    match store.list_state_events_by_plant() {
        Ok(grouped) => {
            let mut orphans: Vec<(i64, usize)> = grouped
                .iter()
                .filter(|(plant_id, _)| !events_by_plant.contains_key(*plant_id))
                .map(|(plant_id, events)| (*plant_id, events.len()))
                .collect();
            orphans.sort_unstable();
            for (plant_id, count) in orphans {
                issues.push(issue(
                    &format!("plant {plant_id}"),
                    &format!("{count} state event(s) reference a plant that does not exist"),
                ));
            }
        }
        // already reported per plant above
        Err(StoreError::InvalidRecord(_)) => {}
        Err(err) => return Err(err),
    }

    if let Err(InventoryError::DanglingReferences(dangling)) =
        build_inventory(&plants, &locations, &events_by_plant)
    {
        for reference in dangling {
            warn!(
                plant_id = reference.plant_id,
                location_id = reference.location_id,
                "dangling plant location"
            );
            issues.push(issue(
                &format!("plant {}", reference.plant_id),
                &reference.to_string(),
            ));
        }
    }

    Ok(CheckReport {
        plants_scanned: plants.len() as u64,
        locations_scanned: locations.len() as u64,
        issues,
    })
}

fn issue(subject: &str, message: &str) -> CheckIssue {
    CheckIssue {
        subject: subject.to_string(),
        message: message.to_string(),
    }
}
