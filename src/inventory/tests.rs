use std::collections::{HashMap, HashSet};

use super::{build_inventory, collapse_join_rows, DanglingReference, InventoryError, RawJoinRow};
use crate::domain::location::Location;
use crate::domain::plant::{Plant, StateEvent};
use crate::domain::state::StateType;

fn location(id: i64, shelf: &str, level: i64, position: i64) -> Location {
    Location {
        id,
        shelf: shelf.to_string(),
        level,
        position,
    }
}

fn plant(plant_id: i64, location_id: i64, entry_date: &str) -> Plant {
    Plant {
        plant_id,
        location_id,
        entry_date: entry_date.to_string(),
    }
}

fn state(plant_id: i64, date: &str, state_type: StateType) -> StateEvent {
    StateEvent {
        plant_id,
        state_date: date.to_string(),
        state_type,
        harvest_weight: (state_type == StateType::Harvested).then_some(42.0),
        description: None,
    }
}

fn raw(plant_id: i64, state: Option<(StateType, &str)>) -> RawJoinRow {
    RawJoinRow {
        plant_id,
        shelf: "A".to_string(),
        level: 1,
        position: plant_id,
        entry_date: "2024-01-01".to_string(),
        state_type: state.map(|(kind, _)| kind),
        state_date: state.map(|(_, date)| date.to_string()),
        harvest_weight: state
            .filter(|(kind, _)| *kind == StateType::Harvested)
            .map(|_| 42.0),
    }
}

#[test]
fn builds_one_row_per_plant_with_current_state() {
    let locations = vec![location(10, "A", 1, 1), location(11, "A", 1, 2)];
    let plants = vec![plant(1, 10, "2024-01-01"), plant(2, 11, "2024-01-02")];
    let mut events = HashMap::new();
    events.insert(
        1,
        vec![
            state(1, "2024-02-01", StateType::Growing),
            state(1, "2024-01-01", StateType::Planted),
            state(1, "2024-04-01", StateType::Harvested),
        ],
    );

    let rows = build_inventory(&plants, &locations, &events).expect("inventory should build");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].plant_id, 1);
    assert_eq!(rows[0].state_type, Some(StateType::Harvested));
    assert_eq!(rows[0].state_date.as_deref(), Some("2024-04-01"));
    assert_eq!(rows[0].harvest_weight, Some(42.0));
    assert_eq!(rows[1].plant_id, 2);
    assert_eq!(rows[1].state_label(), "unset");
    assert_eq!(rows[1].state_date, None);
    assert_eq!(rows[1].position, 2);
}

#[test]
fn duplicate_plant_records_collapse_to_one_row() {
    let locations = vec![location(10, "A", 1, 1)];
    let plants = vec![plant(1, 10, "2024-01-01"), plant(1, 10, "2024-01-01")];
    let rows =
        build_inventory(&plants, &locations, &HashMap::new()).expect("inventory should build");
    assert_eq!(rows.len(), 1);
}

#[test]
fn reports_every_dangling_location_reference() {
    let locations = vec![location(10, "A", 1, 1)];
    let plants = vec![
        plant(1, 10, "2024-01-01"),
        plant(2, 99, "2024-01-01"),
        plant(3, 98, "2024-01-01"),
    ];
    let result = build_inventory(&plants, &locations, &HashMap::new());
    assert_eq!(
        result,
        Err(InventoryError::DanglingReferences(vec![
            DanglingReference {
                plant_id: 2,
                location_id: 99
            },
            DanglingReference {
                plant_id: 3,
                location_id: 98
            },
        ]))
    );
}

#[test]
fn collapse_keeps_latest_state_per_plant() {
    let rows = vec![
        raw(1, Some((StateType::Planted, "2024-01-01"))),
        raw(2, None),
        raw(1, Some((StateType::Harvested, "2024-03-01"))),
        raw(1, Some((StateType::Growing, "2024-02-01"))),
        raw(3, Some((StateType::Growing, "2024-02-01"))),
        raw(3, Some((StateType::Flowering, "2024-02-01"))),
    ];

    let collapsed = collapse_join_rows(rows);
    let ids: Vec<i64> = collapsed.iter().map(|row| row.plant_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(collapsed[0].state_type, Some(StateType::Harvested));
    assert_eq!(collapsed[0].harvest_weight, Some(42.0));
    assert_eq!(collapsed[1].state_label(), "unset");
    assert_eq!(collapsed[2].state_type, Some(StateType::Flowering));
}

#[test]
fn collapse_yields_exactly_one_row_per_distinct_plant() {
    let mut rows = Vec::new();
    for plant_id in 1..=5 {
        for day in 1..=plant_id {
            let date = format!("2024-01-{day:02}");
            rows.push(RawJoinRow {
                state_date: Some(date),
                ..raw(plant_id, Some((StateType::Growing, "")))
            });
        }
    }
    let distinct: HashSet<i64> = rows.iter().map(|row| row.plant_id).collect();

    let collapsed = collapse_join_rows(rows);
    assert_eq!(collapsed.len(), distinct.len());
    let last = collapsed.last().expect("rows should exist");
    assert_eq!(last.state_date.as_deref(), Some("2024-01-05"));
}

#[test]
fn serializes_unset_state_label() {
    let row = collapse_join_rows(vec![raw(7, None)]).remove(0);
    let json = serde_json::to_value(&row).expect("row should serialize");
    assert_eq!(json["state_type"], "unset");
    assert!(json.get("harvest_weight").is_none());
}
