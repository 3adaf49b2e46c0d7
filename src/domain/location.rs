use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Shelf {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Level {
    pub id: i64,
    pub shelf_id: i64,
    pub level_number: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Position {
    pub id: i64,
    pub level_id: i64,
    pub position_number: i64,
}

/// One physical slot. `id` is the position id; the (shelf, level, position)
/// tuple is unique within a registry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Location {
    pub id: i64,
    pub shelf: String,
    pub level: i64,
    pub position: i64,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.shelf, self.level, self.position)
    }
}
