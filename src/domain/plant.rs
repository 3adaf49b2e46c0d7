use std::error::Error;
use std::fmt;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use super::state::StateType;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Plant {
    pub plant_id: i64,
    pub location_id: i64,
    pub entry_date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StateEvent {
    pub plant_id: i64,
    pub state_date: String,
    pub state_type: StateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WateringEvent {
    pub plant_id: i64,
    pub watering_date: String,
    pub fertilizer_recipe_name: String,
    pub amount: f64,
    pub description: String,
}

/// A validated state event that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStateEvent {
    state_type: StateType,
    state_date: String,
    harvest_weight: Option<f64>,
    description: Option<String>,
}

impl NewStateEvent {
    pub fn new(
        state_type: StateType,
        state_date: &str,
        harvest_weight: Option<f64>,
        description: Option<&str>,
    ) -> Result<Self, EventValidationError> {
        let state_date =
            normalize_date(state_date).ok_or_else(|| EventValidationError::InvalidDate {
                field: "state_date",
                value: state_date.to_string(),
            })?;

        let harvest_weight = match (state_type.requires_harvest_weight(), harvest_weight) {
            (true, Some(weight)) if weight.is_finite() && weight > 0.0 => Some(weight),
            (true, Some(weight)) => return Err(EventValidationError::NonPositiveWeight(weight)),
            (true, None) => return Err(EventValidationError::MissingHarvestWeight),
            (false, Some(_)) => {
                return Err(EventValidationError::UnexpectedHarvestWeight(state_type))
            }
            (false, None) => None,
        };

        Ok(Self {
            state_type,
            state_date,
            harvest_weight,
            description: description
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }

    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    pub fn state_date(&self) -> &str {
        &self.state_date
    }

    pub fn harvest_weight(&self) -> Option<f64> {
        self.harvest_weight
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn into_event(self, plant_id: i64) -> StateEvent {
        StateEvent {
            plant_id,
            state_date: self.state_date,
            state_type: self.state_type,
            harvest_weight: self.harvest_weight,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWateringEvent {
    watering_date: String,
    fertilizer_recipe_name: String,
    amount: f64,
    description: String,
}

impl NewWateringEvent {
    pub fn new(
        watering_date: &str,
        fertilizer_recipe_name: &str,
        amount: f64,
        description: &str,
    ) -> Result<Self, EventValidationError> {
        let watering_date =
            normalize_date(watering_date).ok_or_else(|| EventValidationError::InvalidDate {
                field: "watering_date",
                value: watering_date.to_string(),
            })?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EventValidationError::NonPositiveAmount(amount));
        }
        Ok(Self {
            watering_date,
            fertilizer_recipe_name: fertilizer_recipe_name.trim().to_string(),
            amount,
            description: description.trim().to_string(),
        })
    }

    pub fn watering_date(&self) -> &str {
        &self.watering_date
    }

    pub fn fertilizer_recipe_name(&self) -> &str {
        &self.fertilizer_recipe_name
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventValidationError {
    InvalidDate { field: &'static str, value: String },
    MissingHarvestWeight,
    NonPositiveWeight(f64),
    UnexpectedHarvestWeight(StateType),
    NonPositiveAmount(f64),
}

impl fmt::Display for EventValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValidationError::InvalidDate { field, value } => write!(
                f,
                "{field} '{value}' must be RFC3339, 'YYYY-MM-DD HH:MM:SS', or 'YYYY-MM-DD'"
            ),
            EventValidationError::MissingHarvestWeight => {
                write!(f, "harvested state requires a harvest weight")
            }
            EventValidationError::NonPositiveWeight(weight) => {
                write!(f, "harvest weight must be greater than 0 (got {weight})")
            }
            EventValidationError::UnexpectedHarvestWeight(state) => {
                write!(f, "harvest weight is only allowed for harvested, not {state}")
            }
            EventValidationError::NonPositiveAmount(amount) => {
                write!(f, "watering amount must be greater than 0 (got {amount})")
            }
        }
    }
}

impl Error for EventValidationError {}

/// Parses the date shapes the store accepts into an instant. Naive values
/// are read as UTC; a bare date is midnight UTC.
pub fn parse_instant(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let naive = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, naive) {
        return Some(ts.assume_utc());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    Date::parse(raw, date_only)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Validates a date and keeps the caller's spelling, trimmed. Bare dates stay
/// bare so that `2024-01-01` round-trips as entered.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_instant(raw).map(|_| raw.trim().to_string())
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today_utc() -> String {
    OffsetDateTime::now_utc().date().to_string()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[cfg(test)]
mod tests {
    use super::{parse_instant, EventValidationError, NewStateEvent, NewWateringEvent};
    use crate::domain::state::StateType;

    #[test]
    fn harvest_requires_positive_weight() {
        assert_eq!(
            NewStateEvent::new(StateType::Harvested, "2024-05-01", None, None),
            Err(EventValidationError::MissingHarvestWeight)
        );
        assert!(matches!(
            NewStateEvent::new(StateType::Harvested, "2024-05-01", Some(0.0), None),
            Err(EventValidationError::NonPositiveWeight(_))
        ));
        assert!(matches!(
            NewStateEvent::new(StateType::Harvested, "2024-05-01", Some(f64::NAN), None),
            Err(EventValidationError::NonPositiveWeight(_))
        ));

        let ok = NewStateEvent::new(StateType::Harvested, "2024-05-01", Some(120.5), None)
            .expect("positive weight should validate");
        assert_eq!(ok.harvest_weight(), Some(120.5));
    }

    #[test]
    fn weight_is_rejected_for_other_states() {
        let result = NewStateEvent::new(StateType::Growing, "2024-05-01", Some(3.0), None);
        assert_eq!(
            result,
            Err(EventValidationError::UnexpectedHarvestWeight(
                StateType::Growing
            ))
        );
    }

    #[test]
    fn blank_description_is_dropped() {
        let event = NewStateEvent::new(StateType::Planted, "2024-05-01", None, Some("   "))
            .expect("event should validate");
        assert_eq!(event.description(), None);
        let event = event.into_event(7);
        assert_eq!(event.plant_id, 7);
        assert_eq!(event.state_date, "2024-05-01");
    }

    #[test]
    fn rejects_unparseable_dates() {
        let result = NewStateEvent::new(StateType::Planted, "yesterday", None, None);
        assert!(matches!(
            result,
            Err(EventValidationError::InvalidDate { field: "state_date", .. })
        ));
    }

    #[test]
    fn watering_amount_must_be_positive() {
        assert!(matches!(
            NewWateringEvent::new("2024-05-01", "liquid-a", 0.0, ""),
            Err(EventValidationError::NonPositiveAmount(_))
        ));
        let ok = NewWateringEvent::new("2024-05-01T08:00:00Z", " liquid-a ", 250.0, " am ")
            .expect("watering should validate");
        assert_eq!(ok.fertilizer_recipe_name(), "liquid-a");
        assert_eq!(ok.description(), "am");
    }

    #[test]
    fn parses_all_supported_date_shapes_to_comparable_instants() {
        let bare = parse_instant("2024-01-05").expect("bare date");
        let naive = parse_instant("2024-01-05 00:00:00").expect("naive datetime");
        let rfc = parse_instant("2024-01-05T09:00:00+09:00").expect("rfc3339");
        assert_eq!(bare, naive);
        assert_eq!(bare, rfc);
        assert!(parse_instant("").is_none());
        assert!(parse_instant("05/01/2024").is_none());
    }
}
