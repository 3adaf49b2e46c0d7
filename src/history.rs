use std::cmp::Ordering;

use crate::domain::plant::{parse_instant, StateEvent};
use crate::domain::state::CurrentState;

/// Current state plus the full, date-ascending history of one plant.
#[derive(Debug, Clone, PartialEq)]
pub struct StateHistory {
    pub current: CurrentState,
    pub history: Vec<StateEvent>,
}

/// Resolves a plant's events. Input order is insertion order: among events
/// sharing the latest `state_date`, the one appearing last wins.
pub fn resolve(events: &[StateEvent]) -> StateHistory {
    StateHistory {
        current: current_state(events),
        history: ordered_history(events),
    }
}

pub fn current_state(events: &[StateEvent]) -> CurrentState {
    let latest = events
        .iter()
        .reduce(|best, candidate| match compare_state_dates(candidate, best) {
            Ordering::Less => best,
            Ordering::Equal | Ordering::Greater => candidate,
        });
    match latest {
        Some(event) => CurrentState::Set(event.clone()),
        None => CurrentState::Unset,
    }
}

/// Ascending by date; `sort_by` is stable so equal dates keep insertion order.
pub fn ordered_history(events: &[StateEvent]) -> Vec<StateEvent> {
    let mut history = events.to_vec();
    history.sort_by(compare_state_dates);
    history
}

/// Compares two events by parsed `state_date`. Unparseable dates sort before
/// every parseable one so they can never become the current state over a
/// real timestamp.
pub(crate) fn compare_state_dates(left: &StateEvent, right: &StateEvent) -> Ordering {
    compare_optional_dates(Some(&left.state_date), Some(&right.state_date))
}

pub(crate) fn compare_optional_dates(left: Option<&str>, right: Option<&str>) -> Ordering {
    let left = left.and_then(parse_instant);
    let right = right.and_then(parse_instant);
    left.cmp(&right)
}
