//! Field-level patches and the edit operations built from them.
//!
//! An edit never replaces a tile wholesale. It carries a forward patch with
//! only the fields it changes and an inverse patch holding the previous values
//! of exactly those fields, so undo and redo are plain patch applications.

use crate::biome::Biome;
use crate::coord::Coord;
use crate::settlement::SettlementRecord;
use crate::tile::Tile;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Which half of an operation to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchSide {
    Forward,
    Inverse,
}

/// Partial update of the boolean tile flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<bool>,
}

impl FlagsPatch {
    fn merge(&mut self, other: &FlagsPatch) {
        self.buildable = other.buildable.or(self.buildable);
        self.blocked = other.blocked.or(self.blocked);
        self.water = other.water.or(self.water);
        self.spawn = other.spawn.or(self.spawn);
    }
}

/// Partial update of a tile. `None` means "leave the field alone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biome: Option<Biome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<FlagsPatch>,
    /// `Some(None)` clears the settlement reference (serialized as `null`)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub settlement: Option<Option<String>>,
    /// Passthrough fields; a `null` value removes the field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl TilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_biome(mut self, token: &str) -> Self {
        self.biome = Some(Biome::new(token));
        self
    }

    pub fn with_elevation(mut self, elevation: i32) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_flags(mut self, flags: FlagsPatch) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_settlement(mut self, settlement: Option<String>) -> Self {
        self.settlement = Some(settlement);
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// True when the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.biome.is_none()
            && self.elevation.is_none()
            && self.tags.is_none()
            && self.resources.is_none()
            && self.flags.is_none()
            && self.settlement.is_none()
            && self.extra.is_empty()
    }

    /// Fold `other` into this patch field by field; `other` wins where both set a field.
    pub fn merge(&mut self, other: &TilePatch) {
        if other.biome.is_some() {
            self.biome = other.biome.clone();
        }
        if other.elevation.is_some() {
            self.elevation = other.elevation;
        }
        if other.tags.is_some() {
            self.tags = other.tags.clone();
        }
        if other.resources.is_some() {
            self.resources = other.resources.clone();
        }
        if let Some(flags) = &other.flags {
            self.flags.get_or_insert_with(FlagsPatch::default).merge(flags);
        }
        if other.settlement.is_some() {
            self.settlement = other.settlement.clone();
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Write the set fields onto `tile`
    pub fn apply(&self, tile: &mut Tile) {
        if let Some(biome) = &self.biome {
            tile.biome = biome.clone();
        }
        if let Some(elevation) = self.elevation {
            tile.elevation = elevation;
        }
        if let Some(tags) = &self.tags {
            tile.tags = tags.clone();
        }
        if let Some(resources) = &self.resources {
            tile.resources = resources.clone();
        }
        if let Some(flags) = &self.flags {
            let current = &mut tile.flags;
            current.buildable = flags.buildable.unwrap_or(current.buildable);
            current.blocked = flags.blocked.unwrap_or(current.blocked);
            current.water = flags.water.unwrap_or(current.water);
            current.spawn = flags.spawn.unwrap_or(current.spawn);
        }
        if let Some(settlement) = &self.settlement {
            tile.settlement = settlement.clone();
        }
        for (key, value) in &self.extra {
            if value.is_null() {
                tile.extra.remove(key);
            } else {
                tile.extra.insert(key.clone(), value.clone());
            }
        }
    }

    /// The patch that restores `tile` after this one is applied to it.
    ///
    /// It touches exactly the fields this patch touches.
    pub fn inverse_for(&self, tile: &Tile) -> TilePatch {
        let flags = self.flags.map(|f| FlagsPatch {
            buildable: f.buildable.map(|_| tile.flags.buildable),
            blocked: f.blocked.map(|_| tile.flags.blocked),
            water: f.water.map(|_| tile.flags.water),
            spawn: f.spawn.map(|_| tile.flags.spawn),
        });
        TilePatch {
            biome: self.biome.as_ref().map(|_| tile.biome.clone()),
            elevation: self.elevation.map(|_| tile.elevation),
            tags: self.tags.as_ref().map(|_| tile.tags.clone()),
            resources: self.resources.as_ref().map(|_| tile.resources.clone()),
            flags,
            settlement: self.settlement.as_ref().map(|_| tile.settlement.clone()),
            extra: self
                .extra
                .keys()
                .map(|key| (key.clone(), tile.extra.get(key).cloned().unwrap_or(Value::Null)))
                .collect(),
        }
    }
}

/// Change to the settlement list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "record", rename_all = "snake_case")]
pub enum SettlementPatch {
    /// Insert the record, replacing any record with the same id
    Upsert(SettlementRecord),
    /// Remove the record with the operation's id
    Remove,
}

/// What an operation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditTarget {
    Tile { at: Coord },
    Settlement { id: String },
}

/// One reversible edit: a target plus forward and inverse patches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditOp {
    Tile {
        at: Coord,
        forward: TilePatch,
        inverse: TilePatch,
    },
    Settlement {
        id: String,
        forward: SettlementPatch,
        inverse: SettlementPatch,
    },
}

impl EditOp {
    pub fn target(&self) -> EditTarget {
        match self {
            EditOp::Tile { at, .. } => EditTarget::Tile { at: *at },
            EditOp::Settlement { id, .. } => EditTarget::Settlement { id: id.clone() },
        }
    }

    /// The same operation with forward and inverse swapped
    pub fn reversed(&self) -> EditOp {
        match self {
            EditOp::Tile {
                at,
                forward,
                inverse,
            } => EditOp::Tile {
                at: *at,
                forward: inverse.clone(),
                inverse: forward.clone(),
            },
            EditOp::Settlement {
                id,
                forward,
                inverse,
            } => EditOp::Settlement {
                id: id.clone(),
                forward: inverse.clone(),
                inverse: forward.clone(),
            },
        }
    }
}
