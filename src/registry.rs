use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;

use crate::domain::location::{Level, Location, Position, Shelf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    ShelfNotFound(i64),
    LevelNotFound(i64),
    PositionNotFound(i64),
    DuplicateSlot(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::ShelfNotFound(id) => write!(f, "shelf {id} not found"),
            RegistryError::LevelNotFound(id) => write!(f, "level {id} not found"),
            RegistryError::PositionNotFound(id) => write!(f, "location {id} not found"),
            RegistryError::DuplicateSlot(slot) => {
                write!(f, "duplicate location {slot} in registry")
            }
        }
    }
}

impl Error for RegistryError {}

/// Shelf -> level -> position hierarchy. Immutable once built; lookups never
/// touch the store.
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    shelves: Vec<Shelf>,
    levels: Vec<Level>,
    positions: Vec<Position>,
    shelf_index: HashMap<i64, usize>,
    level_index: HashMap<i64, usize>,
    position_index: HashMap<i64, usize>,
}

impl LocationRegistry {
    pub fn new(
        mut shelves: Vec<Shelf>,
        mut levels: Vec<Level>,
        mut positions: Vec<Position>,
    ) -> Result<Self, RegistryError> {
        shelves.sort_by(|left, right| left.name.cmp(&right.name).then(left.id.cmp(&right.id)));
        levels.sort_by_key(|level| (level.shelf_id, level.level_number, level.id));
        positions.sort_by_key(|position| (position.level_id, position.position_number, position.id));

        let shelf_index: HashMap<i64, usize> = shelves
            .iter()
            .enumerate()
            .map(|(slot, shelf)| (shelf.id, slot))
            .collect();
        let level_index: HashMap<i64, usize> = levels
            .iter()
            .enumerate()
            .map(|(slot, level)| (level.id, slot))
            .collect();
        let position_index: HashMap<i64, usize> = positions
            .iter()
            .enumerate()
            .map(|(slot, position)| (position.id, slot))
            .collect();

        for level in &levels {
            if !shelf_index.contains_key(&level.shelf_id) {
                return Err(RegistryError::ShelfNotFound(level.shelf_id));
            }
        }

        let registry = Self {
            shelves,
            levels,
            positions,
            shelf_index,
            level_index,
            position_index,
        };

        let mut seen = HashSet::new();
        for position in &registry.positions {
            let location = registry.resolve(position.id)?;
            if !seen.insert((location.shelf.clone(), location.level, location.position)) {
                return Err(RegistryError::DuplicateSlot(location.to_string()));
            }
        }

        Ok(registry)
    }

    pub fn list_shelves(&self) -> &[Shelf] {
        &self.shelves
    }

    pub fn list_levels(&self, shelf_id: i64) -> Result<Vec<Level>, RegistryError> {
        if !self.shelf_index.contains_key(&shelf_id) {
            return Err(RegistryError::ShelfNotFound(shelf_id));
        }
        Ok(self
            .levels
            .iter()
            .filter(|level| level.shelf_id == shelf_id)
            .cloned()
            .collect())
    }

    pub fn list_positions(&self, level_id: i64) -> Result<Vec<Position>, RegistryError> {
        if !self.level_index.contains_key(&level_id) {
            return Err(RegistryError::LevelNotFound(level_id));
        }
        Ok(self
            .positions
            .iter()
            .filter(|position| position.level_id == level_id)
            .cloned()
            .collect())
    }

    pub fn shelf(&self, shelf_id: i64) -> Option<&Shelf> {
        self.shelf_index
            .get(&shelf_id)
            .map(|slot| &self.shelves[*slot])
    }

    pub fn level(&self, level_id: i64) -> Option<&Level> {
        self.level_index.get(&level_id).map(|slot| &self.levels[*slot])
    }

    pub fn shelf_by_name(&self, name: &str) -> Option<&Shelf> {
        let name = name.trim();
        self.shelves.iter().find(|shelf| shelf.name == name)
    }

    pub fn level_by_number(&self, shelf_id: i64, level_number: i64) -> Option<&Level> {
        self.levels
            .iter()
            .find(|level| level.shelf_id == shelf_id && level.level_number == level_number)
    }

    pub fn position_by_number(&self, level_id: i64, position_number: i64) -> Option<&Position> {
        self.positions.iter().find(|position| {
            position.level_id == level_id && position.position_number == position_number
        })
    }

    /// Full coordinate of a position id.
    pub fn resolve(&self, location_id: i64) -> Result<Location, RegistryError> {
        let position = self
            .position_index
            .get(&location_id)
            .map(|slot| &self.positions[*slot])
            .ok_or(RegistryError::PositionNotFound(location_id))?;
        let level = self
            .level(position.level_id)
            .ok_or(RegistryError::LevelNotFound(position.level_id))?;
        let shelf = self
            .shelf(level.shelf_id)
            .ok_or(RegistryError::ShelfNotFound(level.shelf_id))?;
        Ok(Location {
            id: position.id,
            shelf: shelf.name.clone(),
            level: level.level_number,
            position: position.position_number,
        })
    }

    pub fn locations(&self) -> Vec<Location> {
        self.positions
            .iter()
            .filter_map(|position| self.resolve(position.id).ok())
            .collect()
    }
}
