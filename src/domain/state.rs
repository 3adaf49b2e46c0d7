use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::plant::StateEvent;

pub const UNSET_LABEL: &str = "unset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateType {
    Planted,
    Growing,
    Flowering,
    Fruiting,
    Harvested,
    Withered,
}

impl StateType {
    pub const ALL: [StateType; 6] = [
        StateType::Planted,
        StateType::Growing,
        StateType::Flowering,
        StateType::Fruiting,
        StateType::Harvested,
        StateType::Withered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateType::Planted => "planted",
            StateType::Growing => "growing",
            StateType::Flowering => "flowering",
            StateType::Fruiting => "fruiting",
            StateType::Harvested => "harvested",
            StateType::Withered => "withered",
        }
    }

    /// Only a harvest carries a weight.
    pub fn requires_harvest_weight(self) -> bool {
        matches!(self, StateType::Harvested)
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StateType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for StateType {
    type Err = ParseStateTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let state = match normalized.as_str() {
            "planted" | "plant" | "seedling" => StateType::Planted,
            "growing" | "grow" | "vegetative" => StateType::Growing,
            "flowering" | "bloom" | "blooming" => StateType::Flowering,
            "fruiting" | "fruit" => StateType::Fruiting,
            "harvested" | "harvest" => StateType::Harvested,
            "withered" | "dead" => StateType::Withered,
            _ => {
                return Err(ParseStateTypeError {
                    value: value.to_string(),
                });
            }
        };

        Ok(state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateTypeError {
    value: String,
}

impl fmt::Display for ParseStateTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid state type '{}': expected one of {}",
            self.value,
            StateType::ALL
                .iter()
                .map(|state| state.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseStateTypeError {}

/// The displayed status of a plant: its latest state event, or `Unset` when
/// no event has been recorded yet.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentState {
    Unset,
    Set(StateEvent),
}

impl CurrentState {
    pub fn event(&self) -> Option<&StateEvent> {
        match self {
            CurrentState::Unset => None,
            CurrentState::Set(event) => Some(event),
        }
    }

    pub fn state_type(&self) -> Option<StateType> {
        self.event().map(|event| event.state_type)
    }

    pub fn label(&self) -> &'static str {
        self.state_type()
            .map(StateType::as_str)
            .unwrap_or(UNSET_LABEL)
    }
}
