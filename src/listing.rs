use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::plant::parse_instant;
use crate::inventory::InventoryRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    PlantId,
    Shelf,
    Level,
    Position,
    EntryDate,
    StateDate,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::PlantId,
        SortKey::Shelf,
        SortKey::Level,
        SortKey::Position,
        SortKey::EntryDate,
        SortKey::StateDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::PlantId => "plant_id",
            SortKey::Shelf => "shelf",
            SortKey::Level => "level",
            SortKey::Position => "position",
            SortKey::EntryDate => "entry_date",
            SortKey::StateDate => "state_date",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "plant_id" | "id" | "plant" => Ok(SortKey::PlantId),
            "shelf" => Ok(SortKey::Shelf),
            "level" => Ok(SortKey::Level),
            "position" | "pos" => Ok(SortKey::Position),
            "entry_date" | "entry" | "date" => Ok(SortKey::EntryDate),
            "state_date" => Ok(SortKey::StateDate),
            _ => Err(format!(
                "unsupported sort key '{}'; use {}",
                value,
                SortKey::ALL
                    .iter()
                    .map(|key| key.as_str())
                    .collect::<Vec<_>>()
                    .join("|")
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::None => "none",
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            "none" | "" => Ok(SortDirection::None),
            _ => Err(format!(
                "unsupported sort direction '{}'; use asc|desc|none",
                value
            )),
        }
    }
}

/// Column sort selection. `key == None` means the default physical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortConfig {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: Option<SortKey>, direction: SortDirection) -> Self {
        match (key, direction) {
            (Some(key), SortDirection::Asc | SortDirection::Desc) => Self {
                key: Some(key),
                direction,
            },
            _ => Self::default(),
        }
    }

    /// Column click: the same key cycles asc -> desc -> unsorted; a different
    /// key starts at asc.
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key != Some(key) {
            return Self::new(Some(key), SortDirection::Asc);
        }
        match self.direction {
            SortDirection::None => Self::new(Some(key), SortDirection::Asc),
            SortDirection::Asc => Self::new(Some(key), SortDirection::Desc),
            SortDirection::Desc => Self::default(),
        }
    }

    /// Replays header clicks in order. An explicit direction pins the last
    /// clicked key instead.
    pub fn from_clicks(keys: &[SortKey], direction: Option<SortDirection>) -> Self {
        match (keys.last(), direction) {
            (Some(&key), Some(direction)) => Self::new(Some(key), direction),
            _ => keys
                .iter()
                .fold(Self::default(), |config, &key| config.toggle(key)),
        }
    }

    pub fn is_default(&self) -> bool {
        self.key.is_none()
    }
}

/// Stable sort. With no key (or direction `None`) rows fall back to level,
/// position, then entry date, all ascending.
pub fn sort_rows(
    mut rows: Vec<InventoryRow>,
    key: Option<SortKey>,
    direction: SortDirection,
) -> Vec<InventoryRow> {
    let config = SortConfig::new(key, direction);
    match config.key {
        None => rows.sort_by(compare_default),
        Some(key) => {
            let descending = config.direction == SortDirection::Desc;
            rows.sort_by(|left, right| compare_by_key(left, right, key, descending));
        }
    }
    rows
}

pub fn sort_with_config(rows: Vec<InventoryRow>, config: &SortConfig) -> Vec<InventoryRow> {
    sort_rows(rows, config.key, config.direction)
}

/// Rows on the named shelf. No shelf selected yields nothing.
pub fn filter_by_shelf(rows: &[InventoryRow], shelf: Option<&str>) -> Vec<InventoryRow> {
    let Some(shelf) = shelf.map(str::trim).filter(|value| !value.is_empty()) else {
        return Vec::new();
    };
    rows.iter()
        .filter(|row| row.shelf == shelf)
        .cloned()
        .collect()
}

fn compare_default(left: &InventoryRow, right: &InventoryRow) -> Ordering {
    left.level
        .cmp(&right.level)
        .then_with(|| left.position.cmp(&right.position))
        .then_with(|| compare_dates(Some(&left.entry_date), Some(&right.entry_date), false))
}

fn compare_by_key(
    left: &InventoryRow,
    right: &InventoryRow,
    key: SortKey,
    descending: bool,
) -> Ordering {
    let ordering = match key {
        SortKey::PlantId => left.plant_id.cmp(&right.plant_id),
        SortKey::Shelf => left.shelf.cmp(&right.shelf),
        SortKey::Level => left.level.cmp(&right.level),
        SortKey::Position => left.position.cmp(&right.position),
        SortKey::EntryDate => {
            return compare_dates(Some(&left.entry_date), Some(&right.entry_date), descending)
        }
        SortKey::StateDate => {
            return compare_dates(
                left.state_date.as_deref(),
                right.state_date.as_deref(),
                descending,
            )
        }
    };
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

/// Compares by parsed instant. Missing or unparseable dates go last in either
/// direction.
fn compare_dates(left: Option<&str>, right: Option<&str>, descending: bool) -> Ordering {
    match (left.and_then(parse_instant), right.and_then(parse_instant)) {
        (Some(left), Some(right)) if descending => right.cmp(&left),
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{filter_by_shelf, sort_rows, sort_with_config, SortConfig, SortDirection, SortKey};
    use crate::domain::state::StateType;
    use crate::inventory::InventoryRow;
    use std::str::FromStr;

    fn row(plant_id: i64, shelf: &str, level: i64, position: i64, entry: &str) -> InventoryRow {
        InventoryRow {
            plant_id,
            shelf: shelf.to_string(),
            level,
            position,
            entry_date: entry.to_string(),
            state_type: Some(StateType::Growing),
            state_date: None,
            harvest_weight: None,
        }
    }

    fn ids(rows: &[InventoryRow]) -> Vec<i64> {
        rows.iter().map(|row| row.plant_id).collect()
    }

    #[test]
    fn default_order_is_level_position_entry_date() {
        let rows = vec![
            row(1, "A", 2, 3, "2024-01-01"),
            row(2, "A", 1, 1, "2024-01-05"),
            row(3, "A", 1, 1, "2024-01-02"),
            row(4, "A", 1, 2, "2023-12-31"),
        ];
        let sorted = sort_rows(rows, None, SortDirection::None);
        assert_eq!(ids(&sorted), vec![3, 2, 4, 1]);
    }

    #[test]
    fn end_to_end_default_and_entry_date_desc() {
        let mut first = row(1, "A", 2, 3, "2024-01-01");
        first.state_type = Some(StateType::Growing);
        let mut second = row(2, "A", 1, 1, "2024-01-05");
        second.state_type = Some(StateType::Harvested);
        let rows = vec![first, second];

        let default = sort_rows(rows.clone(), None, SortDirection::None);
        assert_eq!(ids(&default), vec![2, 1]);

        let by_entry = sort_rows(rows, Some(SortKey::EntryDate), SortDirection::Desc);
        assert_eq!(ids(&by_entry), vec![2, 1]);
    }

    #[test]
    fn entry_date_compares_instants_not_strings() {
        let rows = vec![
            row(1, "A", 1, 1, "2024-01-10"),
            row(2, "A", 1, 2, "2024-01-09T23:00:00-02:00"),
            row(3, "A", 1, 3, "2024-01-09"),
        ];
        let sorted = sort_rows(rows, Some(SortKey::EntryDate), SortDirection::Asc);
        assert_eq!(ids(&sorted), vec![3, 1, 2]);
    }

    #[test]
    fn sorting_is_stable_for_equal_keys() {
        let rows = vec![
            row(5, "A", 1, 3, "2024-01-01"),
            row(6, "A", 1, 1, "2024-01-01"),
            row(7, "A", 1, 2, "2024-01-01"),
        ];
        let asc = sort_rows(rows.clone(), Some(SortKey::Level), SortDirection::Asc);
        assert_eq!(ids(&asc), vec![5, 6, 7]);
        let desc = sort_rows(rows, Some(SortKey::EntryDate), SortDirection::Desc);
        assert_eq!(ids(&desc), vec![5, 6, 7]);
    }

    #[test]
    fn unparseable_dates_sort_last_both_ways() {
        let rows = vec![
            row(1, "A", 1, 1, "someday"),
            row(2, "A", 1, 2, "2024-01-01"),
            row(3, "A", 1, 3, "2024-02-01"),
        ];
        let asc = sort_rows(rows.clone(), Some(SortKey::EntryDate), SortDirection::Asc);
        assert_eq!(ids(&asc), vec![2, 3, 1]);
        let desc = sort_rows(rows, Some(SortKey::EntryDate), SortDirection::Desc);
        assert_eq!(ids(&desc), vec![3, 2, 1]);
    }

    #[test]
    fn toggle_cycles_asc_desc_then_unsorted() {
        let start = SortConfig::default();
        let first = start.toggle(SortKey::Level);
        assert_eq!(first, SortConfig::new(Some(SortKey::Level), SortDirection::Asc));
        let second = first.toggle(SortKey::Level);
        assert_eq!(second.direction, SortDirection::Desc);
        let third = second.toggle(SortKey::Level);
        assert!(third.is_default());
        assert_eq!(third.direction, SortDirection::None);
    }

    #[test]
    fn toggle_to_new_key_resets_to_asc() {
        let config = SortConfig::default()
            .toggle(SortKey::Level)
            .toggle(SortKey::Level)
            .toggle(SortKey::EntryDate);
        assert_eq!(config.key, Some(SortKey::EntryDate));
        assert_eq!(config.direction, SortDirection::Asc);
    }

    #[test]
    fn from_clicks_replays_toggles_unless_direction_is_pinned() {
        let once = SortConfig::from_clicks(&[SortKey::Level], None);
        assert_eq!(once, SortConfig::new(Some(SortKey::Level), SortDirection::Asc));
        let twice = SortConfig::from_clicks(&[SortKey::Level, SortKey::Level], None);
        assert_eq!(twice.direction, SortDirection::Desc);
        let thrice = SortConfig::from_clicks(&[SortKey::Level; 3], None);
        assert!(thrice.is_default());
        let switched = SortConfig::from_clicks(&[SortKey::Level, SortKey::EntryDate], None);
        assert_eq!(
            switched,
            SortConfig::new(Some(SortKey::EntryDate), SortDirection::Asc)
        );
        let pinned = SortConfig::from_clicks(&[SortKey::Shelf], Some(SortDirection::Desc));
        assert_eq!(pinned, SortConfig::new(Some(SortKey::Shelf), SortDirection::Desc));
        assert!(SortConfig::from_clicks(&[], Some(SortDirection::Desc)).is_default());
    }

    #[test]
    fn three_clicks_restore_default_order() {
        let rows = vec![
            row(1, "A", 2, 1, "2024-01-01"),
            row(2, "A", 1, 2, "2024-01-01"),
            row(3, "A", 1, 1, "2024-01-01"),
        ];
        let mut config = SortConfig::default();
        for _ in 0..3 {
            config = config.toggle(SortKey::PlantId);
        }
        let sorted = sort_with_config(rows.clone(), &config);
        assert_eq!(sorted, sort_rows(rows, None, SortDirection::None));
        assert_eq!(ids(&sorted), vec![3, 2, 1]);
    }

    #[test]
    fn filter_by_shelf_matches_exact_name() {
        let rows = vec![
            row(1, "ShelfX", 1, 1, "2024-01-01"),
            row(2, "ShelfY", 1, 1, "2024-01-01"),
            row(3, "ShelfX", 2, 1, "2024-01-01"),
        ];
        assert_eq!(ids(&filter_by_shelf(&rows, Some("ShelfX"))), vec![1, 3]);
        assert!(filter_by_shelf(&rows, Some("ShelfZ")).is_empty());
        assert!(filter_by_shelf(&rows, None).is_empty());
        assert!(filter_by_shelf(&rows, Some("  ")).is_empty());
    }

    #[test]
    fn parses_keys_and_directions() {
        assert_eq!(SortKey::from_str("entry-date").unwrap(), SortKey::EntryDate);
        assert_eq!(SortKey::from_str("Level").unwrap(), SortKey::Level);
        assert!(SortKey::from_str("state_type").is_err());
        assert_eq!(
            SortDirection::from_str("DESC").unwrap(),
            SortDirection::Desc
        );
        assert!(SortDirection::from_str("sideways").is_err());
    }
}
