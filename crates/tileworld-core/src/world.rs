//! World model: the canonical tile grid plus its overlay layers.
//!
//! This module contains:
//! - The `World` grid (indexed `[y][x]`) built once from wire JSON
//! - Road/bridge and movement-restriction overlays
//! - The settlement layer
//! - Application of edit operations, the only way tiles change after load

use crate::biome::Biome;
use crate::coord::Coord;
use crate::patch::{EditOp, PatchSide, SettlementPatch, TilePatch};
use crate::settlement::SettlementRecord;
use crate::tile::{canonicalize_grid, ShapeError, Tile};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading or editing a world
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("malformed world: {0}")]
    Shape(#[from] ShapeError),

    #[error("invalid world json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no tile at {0}")]
    OutOfBounds(Coord),
}

/// Road network overlay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoadLayer {
    pub paths: Vec<Vec<Coord>>,
    pub bridges: BTreeSet<Coord>,
}

/// Movement restriction overlay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementLayer {
    /// Closed to land movement
    pub blocked_for_land: BTreeSet<Coord>,
    /// Only enterable with a boat
    pub requires_boat: BTreeSet<Coord>,
}

/// All overlay layers of a world
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layers {
    pub roads: RoadLayer,
    pub movement: MovementLayer,
    pub settlements: Vec<SettlementRecord>,
}

// Wire shapes of the layers object

#[derive(Debug, Default, Serialize, Deserialize)]
struct LayersWire {
    #[serde(default)]
    roads: RoadsWire,
    #[serde(default)]
    movement: MovementWire,
    #[serde(default)]
    settlements: Vec<SettlementRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RoadsWire {
    #[serde(default)]
    paths: Vec<Vec<Coord>>,
    #[serde(default)]
    bridges: Vec<Coord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MovementWire {
    #[serde(default, rename = "blockedFor")]
    blocked_for: LandWire,
    #[serde(default)]
    requires: BoatWire,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LandWire {
    #[serde(default)]
    land: Vec<Coord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BoatWire {
    #[serde(default)]
    boat: Vec<Coord>,
}

impl From<LayersWire> for Layers {
    fn from(wire: LayersWire) -> Self {
        Self {
            roads: RoadLayer {
                paths: wire.roads.paths,
                bridges: wire.roads.bridges.into_iter().collect(),
            },
            movement: MovementLayer {
                blocked_for_land: wire.movement.blocked_for.land.into_iter().collect(),
                requires_boat: wire.movement.requires.boat.into_iter().collect(),
            },
            settlements: wire.settlements,
        }
    }
}

impl From<&Layers> for LayersWire {
    fn from(layers: &Layers) -> Self {
        Self {
            roads: RoadsWire {
                paths: layers.roads.paths.clone(),
                bridges: layers.roads.bridges.iter().copied().collect(),
            },
            movement: MovementWire {
                blocked_for: LandWire {
                    land: layers.movement.blocked_for_land.iter().copied().collect(),
                },
                requires: BoatWire {
                    boat: layers.movement.requires_boat.iter().copied().collect(),
                },
            },
            settlements: layers.settlements.clone(),
        }
    }
}

/// The complete world
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    width: u32,
    height: u32,
    /// Tiles indexed `[y][x]`
    tiles: Vec<Vec<Tile>>,
    layers: Layers,
    /// Every coordinate on some road path
    road_tiles: HashSet<Coord>,
}

impl World {
    /// Build a world from an already canonical grid
    pub fn new(tiles: Vec<Vec<Tile>>, layers: Layers) -> Self {
        let height = tiles.len() as u32;
        let width = tiles.first().map_or(0, |row| row.len()) as u32;
        let mut world = Self {
            width,
            height,
            tiles,
            layers,
            road_tiles: HashSet::new(),
        };
        world.rebuild_road_index();
        world
    }

    /// A `width` x `height` world where every tile has the same biome
    pub fn filled(width: u32, height: u32, biome: &str) -> Self {
        let biome = Biome::new(biome);
        let tiles = (0..height as i32)
            .map(|y| {
                (0..width as i32)
                    .map(|x| Tile::new(x, y, biome.clone()))
                    .collect()
            })
            .collect();
        Self::new(tiles, Layers::default())
    }

    /// Load a world from its wire shape, canonicalizing every tile.
    ///
    /// Declared `width`/`height`, when present, must match the grid.
    pub fn from_value(value: &Value) -> Result<Self, WorldError> {
        let object = value.as_object().ok_or(ShapeError::NotAnObject)?;
        let tiles = canonicalize_grid(object.get("tiles").unwrap_or(&Value::Null))?;

        let height = tiles.len();
        let width = tiles[0].len();
        let declared_width = object.get("width").and_then(Value::as_u64);
        let declared_height = object.get("height").and_then(Value::as_u64);
        if declared_width.is_some_and(|w| w != width as u64)
            || declared_height.is_some_and(|h| h != height as u64)
        {
            return Err(ShapeError::DimensionMismatch {
                declared_width: declared_width.unwrap_or(width as u64),
                declared_height: declared_height.unwrap_or(height as u64),
                width,
                height,
            }
            .into());
        }

        let layers: LayersWire = match object.get("layers") {
            Some(raw) if !raw.is_null() => serde_json::from_value(raw.clone())?,
            _ => LayersWire::default(),
        };

        let world = Self::new(tiles, layers.into());
        info!(
            width = world.width,
            height = world.height,
            settlements = world.layers.settlements.len(),
            "loaded world"
        );
        Ok(world)
    }

    /// Parse and load a world from JSON text
    pub fn from_json(text: &str) -> Result<Self, WorldError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// The world in its wire shape
    pub fn to_value(&self) -> Result<Value, WorldError> {
        Ok(json!({
            "width": self.width,
            "height": self.height,
            "tiles": serde_json::to_value(&self.tiles)?,
            "layers": serde_json::to_value(LayersWire::from(&self.layers))?,
        }))
    }

    fn rebuild_road_index(&mut self) {
        self.road_tiles = self.layers.roads.paths.iter().flatten().copied().collect();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    pub fn tile(&self, coord: Coord) -> Option<&Tile> {
        if !self.in_bounds(coord) {
            return None;
        }
        self.tiles
            .get(coord.y as usize)
            .and_then(|row| row.get(coord.x as usize))
    }

    /// Direct mutable access, for building fixtures. Editing goes through [`World::apply_op`].
    #[doc(hidden)]
    pub fn tile_mut(&mut self, coord: Coord) -> Option<&mut Tile> {
        if !self.in_bounds(coord) {
            return None;
        }
        self.tiles
            .get_mut(coord.y as usize)
            .and_then(|row| row.get_mut(coord.x as usize))
    }

    /// Rows of tiles, `[y][x]`
    pub fn rows(&self) -> &[Vec<Tile>] {
        &self.tiles
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten()
    }

    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    pub fn settlements(&self) -> &[SettlementRecord] {
        &self.layers.settlements
    }

    pub fn settlements_mut(&mut self) -> &mut Vec<SettlementRecord> {
        &mut self.layers.settlements
    }

    pub fn settlement(&self, id: &str) -> Option<&SettlementRecord> {
        self.layers.settlements.iter().find(|s| s.id == id)
    }

    // ==================== Overlay queries ====================

    pub fn is_bridge(&self, coord: Coord) -> bool {
        self.layers.roads.bridges.contains(&coord)
    }

    /// On a road path or a bridge
    pub fn is_road(&self, coord: Coord) -> bool {
        self.road_tiles.contains(&coord) || self.is_bridge(coord)
    }

    /// In the blocked-for-land set, or the tile itself is flagged blocked
    pub fn is_blocked(&self, coord: Coord) -> bool {
        self.layers.movement.blocked_for_land.contains(&coord)
            || self.tile(coord).is_some_and(|t| t.flags.blocked)
    }

    pub fn requires_boat(&self, coord: Coord) -> bool {
        self.layers.movement.requires_boat.contains(&coord)
    }

    // ==================== Overlay edits ====================

    pub fn add_road_path(&mut self, path: Vec<Coord>) {
        self.road_tiles.extend(path.iter().copied());
        self.layers.roads.paths.push(path);
    }

    pub fn add_bridge(&mut self, coord: Coord) {
        self.layers.roads.bridges.insert(coord);
    }

    pub fn block_for_land(&mut self, coord: Coord) {
        self.layers.movement.blocked_for_land.insert(coord);
    }

    pub fn require_boat(&mut self, coord: Coord) {
        self.layers.movement.requires_boat.insert(coord);
    }

    // ==================== Edit operations ====================

    /// Build a tile operation whose inverse restores the current tile
    pub fn tile_op(&self, at: Coord, forward: TilePatch) -> Result<EditOp, WorldError> {
        let tile = self.tile(at).ok_or(WorldError::OutOfBounds(at))?;
        let inverse = forward.inverse_for(tile);
        Ok(EditOp::Tile {
            at,
            forward,
            inverse,
        })
    }

    /// Build a settlement operation whose inverse restores the current record
    pub fn settlement_op(&self, id: &str, forward: SettlementPatch) -> EditOp {
        let inverse = match self.settlement(id) {
            Some(existing) => SettlementPatch::Upsert(existing.clone()),
            None => SettlementPatch::Remove,
        };
        EditOp::Settlement {
            id: id.to_string(),
            forward,
            inverse,
        }
    }

    /// Verify that `op` can be applied without touching anything
    pub fn check_op(&self, op: &EditOp) -> Result<(), WorldError> {
        match op {
            EditOp::Tile { at, .. } if !self.in_bounds(*at) => Err(WorldError::OutOfBounds(*at)),
            _ => Ok(()),
        }
    }

    /// Apply one side of an operation
    pub fn apply_op(&mut self, op: &EditOp, side: PatchSide) -> Result<(), WorldError> {
        match op {
            EditOp::Tile {
                at,
                forward,
                inverse,
            } => {
                let patch = match side {
                    PatchSide::Forward => forward,
                    PatchSide::Inverse => inverse,
                };
                let tile = self.tile_mut(*at).ok_or(WorldError::OutOfBounds(*at))?;
                patch.apply(tile);
                debug!(at = %at, ?side, "applied tile patch");
            }
            EditOp::Settlement {
                id,
                forward,
                inverse,
            } => {
                let patch = match side {
                    PatchSide::Forward => forward,
                    PatchSide::Inverse => inverse,
                };
                self.apply_settlement_patch(id, patch);
                debug!(id = %id, ?side, "applied settlement patch");
            }
        }
        Ok(())
    }

    fn apply_settlement_patch(&mut self, id: &str, patch: &SettlementPatch) {
        let settlements = &mut self.layers.settlements;
        match patch {
            SettlementPatch::Upsert(record) => {
                match settlements.iter().position(|s| s.id == id) {
                    Some(index) => settlements[index] = record.clone(),
                    None => settlements.push(record.clone()),
                }
            }
            SettlementPatch::Remove => settlements.retain(|s| s.id != id),
        }
    }
}
