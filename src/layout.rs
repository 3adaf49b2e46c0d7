use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_LAYOUT_TOML: &str = include_str!("layout.toml");

#[derive(Debug)]
pub enum LayoutError {
    Io { path: PathBuf, err: std::io::Error },
    Toml(toml::de::Error),
    InvalidDefinition(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Io { path, err } => {
                write!(f, "unable to read layout {}: {}", path.display(), err)
            }
            LayoutError::Toml(err) => write!(f, "invalid layout TOML: {}", err),
            LayoutError::InvalidDefinition(message) => {
                write!(f, "invalid layout definition: {}", message)
            }
        }
    }
}

impl Error for LayoutError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LayoutError::Io { err, .. } => Some(err),
            LayoutError::Toml(err) => Some(err),
            LayoutError::InvalidDefinition(_) => None,
        }
    }
}

impl From<toml::de::Error> for LayoutError {
    fn from(value: toml::de::Error) -> Self {
        LayoutError::Toml(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayoutFile {
    #[serde(default)]
    shelves: Vec<RawShelf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShelf {
    name: String,
    levels: Option<i64>,
    positions: Option<i64>,
    level_positions: Option<Vec<i64>>,
}

/// One shelf of the physical layout: `positions_per_level[i]` slots on
/// level `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfLayout {
    pub name: String,
    pub positions_per_level: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub shelves: Vec<ShelfLayout>,
}

impl Layout {
    pub fn builtin() -> Result<Self, LayoutError> {
        Self::from_toml_str(DEFAULT_LAYOUT_TOML)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, LayoutError> {
        match path {
            None => Self::builtin(),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| LayoutError::Io {
                    path: path.to_path_buf(),
                    err,
                })?;
                Self::from_toml_str(&raw)
            }
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, LayoutError> {
        let file: RawLayoutFile = toml::from_str(raw)?;
        if file.shelves.is_empty() {
            return Err(LayoutError::InvalidDefinition(
                "at least one shelf must be defined".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut shelves = Vec::with_capacity(file.shelves.len());
        for shelf in file.shelves {
            let name = shelf.name.trim().to_string();
            if name.is_empty() {
                return Err(LayoutError::InvalidDefinition(
                    "shelf name cannot be empty".to_string(),
                ));
            }
            if !names.insert(name.clone()) {
                return Err(LayoutError::InvalidDefinition(format!(
                    "shelf '{name}' is defined more than once"
                )));
            }
            let positions_per_level = positions_per_level(&name, &shelf)?;
            shelves.push(ShelfLayout {
                name,
                positions_per_level,
            });
        }

        Ok(Self { shelves })
    }

    pub fn slot_count(&self) -> i64 {
        self.shelves
            .iter()
            .flat_map(|shelf| shelf.positions_per_level.iter())
            .sum()
    }
}

/// Upper bounds per shelf; larger layouts are rejected before allocating.
const MAX_LEVELS: i64 = 64;
const MAX_POSITIONS: i64 = 256;

fn positions_per_level(name: &str, shelf: &RawShelf) -> Result<Vec<i64>, LayoutError> {
    let counts = match (&shelf.level_positions, shelf.levels, shelf.positions) {
        (Some(explicit), None, None) => explicit.clone(),
        (None, Some(levels), Some(_)) if levels > MAX_LEVELS => {
            return Err(LayoutError::InvalidDefinition(format!(
                "shelf '{name}' has {levels} levels; at most {MAX_LEVELS} are allowed"
            )));
        }
        (None, Some(levels), Some(positions)) if levels > 0 => {
            vec![positions; levels as usize]
        }
        (None, Some(_), Some(_)) => {
            return Err(LayoutError::InvalidDefinition(format!(
                "shelf '{name}' needs at least one level"
            )));
        }
        _ => {
            return Err(LayoutError::InvalidDefinition(format!(
                "shelf '{name}' needs either levels + positions or level_positions"
            )));
        }
    };
    if counts.is_empty() {
        return Err(LayoutError::InvalidDefinition(format!(
            "shelf '{name}' needs at least one level"
        )));
    }
    if counts.len() as i64 > MAX_LEVELS {
        return Err(LayoutError::InvalidDefinition(format!(
            "shelf '{name}' has {} levels; at most {MAX_LEVELS} are allowed",
            counts.len()
        )));
    }
    if let Some(count) = counts.iter().find(|count| **count > MAX_POSITIONS) {
        return Err(LayoutError::InvalidDefinition(format!(
            "shelf '{name}' allows at most {MAX_POSITIONS} positions per level, got {count}"
        )));
    }
    if counts.iter().any(|count| *count < 1) {
        return Err(LayoutError::InvalidDefinition(format!(
            "shelf '{name}' has a level with no positions"
        )));
    }
    Ok(counts)
}
