//! Canonical tile records and their ingestion from raw map data.
//!
//! Raw cells arrive in several shapes: `null`, a bare biome token or numeric
//! code, or a partially populated record using one of several legacy field
//! names. [`Tile::from_raw`] is the single place where those shapes are told
//! apart; everything after it works on [`Tile`] only.

use crate::biome::{normalize_biome, Biome};
use crate::coord::Coord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Record fields consulted for the biome, in priority order
pub const BIOME_FIELDS: [&str; 5] = ["biome", "type", "terrain", "t", "tile"];

/// Record fields consulted for the elevation, in priority order
pub const ELEVATION_FIELDS: [&str; 2] = ["elevation", "elev"];

/// Tag added to every tile covered by a settlement footprint
pub const SETTLEMENT_AREA_TAG: &str = "settlement_area";

/// Fields with a fixed meaning; anything else is kept in [`Tile::extra`]
const KNOWN_FIELDS: [&str; 13] = [
    "x",
    "y",
    "biome",
    "type",
    "terrain",
    "t",
    "tile",
    "elevation",
    "elev",
    "tags",
    "resources",
    "flags",
    "settlement",
];

/// Raw grid could not be read as a rectangular 2-D grid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("tiles must be an array of rows")]
    NotAGrid,

    #[error("tile grid has no rows")]
    NoRows,

    #[error("row {row} is not an array")]
    RowNotSequence { row: usize },

    #[error("first row of the tile grid is empty")]
    EmptyFirstRow,

    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("declared size {declared_width}x{declared_height} does not match grid {width}x{height}")]
    DimensionMismatch {
        declared_width: u64,
        declared_height: u64,
        width: usize,
        height: usize,
    },

    #[error("world is not a JSON object")]
    NotAnObject,
}

/// Boolean tile flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFlags {
    pub buildable: bool,
    pub blocked: bool,
    pub water: bool,
    pub spawn: bool,
}

impl TileFlags {
    fn from_raw(value: Option<&Value>) -> Self {
        let flag = |name: &str| {
            value
                .and_then(|v| v.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        Self {
            buildable: flag("buildable"),
            blocked: flag("blocked"),
            water: flag("water"),
            spawn: flag("spawn"),
        }
    }
}

/// A single canonical tile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    /// Always a canonical token
    pub biome: Biome,
    pub elevation: i32,
    pub tags: Vec<String>,
    pub resources: Vec<String>,
    pub flags: TileFlags,
    /// Id of the settlement whose footprint covers this tile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<String>,
    /// Unrecognized input fields, kept for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tile {
    /// A tile with the given biome and every other field defaulted
    pub fn new(x: i32, y: i32, biome: Biome) -> Self {
        Self {
            x,
            y,
            biome,
            elevation: 0,
            tags: Vec::new(),
            resources: Vec::new(),
            flags: TileFlags::default(),
            settlement: None,
            extra: Map::new(),
        }
    }

    /// Tile standing in for a missing cell
    pub fn void(x: i32, y: i32) -> Self {
        Self::new(x, y, Biome::void())
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Build the canonical tile for the cell at (`x`, `y`).
    ///
    /// Re-applying it to the serialized output yields the same tile.
    pub fn from_raw(x: i32, y: i32, raw: &Value) -> Self {
        match raw {
            Value::Null => Self::void(x, y),
            Value::String(token) => Self::new(x, y, normalize_biome(token)),
            Value::Number(code) => Self::new(x, y, normalize_biome(&code.to_string())),
            Value::Object(record) => Self::from_record(x, y, record),
            Value::Bool(_) | Value::Array(_) => Self::new(x, y, Biome::unknown()),
        }
    }

    fn from_record(x: i32, y: i32, record: &Map<String, Value>) -> Self {
        let biome = BIOME_FIELDS
            .iter()
            .find_map(|field| match record.get(*field) {
                Some(Value::String(s)) => Some(normalize_biome(s)),
                Some(Value::Number(n)) => Some(normalize_biome(&n.to_string())),
                _ => None,
            })
            .unwrap_or_else(Biome::unknown);

        let elevation = ELEVATION_FIELDS
            .iter()
            .find_map(|field| record.get(*field).and_then(coerce_int))
            .unwrap_or(0);

        let settlement = record
            .get("settlement")
            .and_then(Value::as_str)
            .map(str::to_string);

        let extra = record
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            x,
            y,
            biome,
            elevation,
            tags: coerce_strings(record.get("tags")),
            resources: coerce_strings(record.get("resources")),
            flags: TileFlags::from_raw(record.get("flags")),
            settlement,
            extra,
        }
    }
}

/// Integer, truncated float, or numeric string
fn coerce_int(value: &Value) -> Option<i32> {
    let number = match value {
        Value::Number(n) => n.as_i64().map(|i| i as f64).or_else(|| n.as_f64()),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if !number.is_finite() {
        return None;
    }
    Some(number.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

/// Sequence of strings; a bare string becomes a one-element sequence
fn coerce_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Replace every raw cell of `tiles` with its canonical tile.
///
/// Fails when `tiles` is not a non-empty array of equally long, non-empty rows.
pub fn canonicalize_grid(tiles: &Value) -> Result<Vec<Vec<Tile>>, ShapeError> {
    let rows = tiles.as_array().ok_or(ShapeError::NotAGrid)?;
    if rows.is_empty() {
        return Err(ShapeError::NoRows);
    }

    let mut width = None;
    let mut grid = Vec::with_capacity(rows.len());
    for (y, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or(ShapeError::RowNotSequence { row: y })?;
        let expected = *width.get_or_insert(cells.len());
        if expected == 0 {
            return Err(ShapeError::EmptyFirstRow);
        }
        if cells.len() != expected {
            return Err(ShapeError::Ragged {
                row: y,
                expected,
                found: cells.len(),
            });
        }
        grid.push(
            cells
                .iter()
                .enumerate()
                .map(|(x, cell)| Tile::from_raw(x as i32, y as i32, cell))
                .collect(),
        );
    }
    Ok(grid)
}
