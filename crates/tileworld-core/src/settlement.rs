//! Settlement tiers, placement validation and placement drafts.
//!
//! This module contains:
//! - The static tier catalog (footprint, population, services, shops, walls)
//! - `can_place`: the ordered feasibility checks for a footprint
//! - `draft_place`: building a `SettlementDraft` plus the tile patches that
//!   mark its footprint

use crate::coord::{Coord, Rect};
use crate::patch::TilePatch;
use crate::tile::SETTLEMENT_AREA_TAG;
use crate::world::World;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Settlement size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementTier {
    Camp,
    Hamlet,
    Village,
    City,
    Kingdom,
}

/// Wall classification of a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallKind {
    Palisade,
    Stone,
    Fortified,
}

/// Inclusive NPC count range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcRange {
    pub min: u32,
    pub max: u32,
}

/// Static description of a tier
#[derive(Debug)]
pub struct TierTemplate {
    pub tier: SettlementTier,
    /// Side length of the square footprint
    pub size: u32,
    pub npcs: NpcRange,
    pub services: &'static [&'static str],
    pub shops: &'static [&'static str],
    pub walls: Option<WallKind>,
}

static CATALOG: [TierTemplate; 5] = [
    TierTemplate {
        tier: SettlementTier::Camp,
        size: 1,
        npcs: NpcRange { min: 1, max: 6 },
        services: &["campfire"],
        shops: &[],
        walls: None,
    },
    TierTemplate {
        tier: SettlementTier::Hamlet,
        size: 2,
        npcs: NpcRange { min: 6, max: 24 },
        services: &["well", "shrine"],
        shops: &["general_store"],
        walls: Some(WallKind::Palisade),
    },
    TierTemplate {
        tier: SettlementTier::Village,
        size: 4,
        npcs: NpcRange { min: 25, max: 120 },
        services: &["well", "shrine", "tavern", "blacksmith"],
        shops: &["general_store", "smith", "farmers_market"],
        walls: Some(WallKind::Palisade),
    },
    TierTemplate {
        tier: SettlementTier::City,
        size: 8,
        npcs: NpcRange { min: 400, max: 2000 },
        services: &["tavern", "inn", "temple", "market", "guard_post", "bank"],
        shops: &["general_store", "smith", "alchemist", "tailor", "jeweler"],
        walls: Some(WallKind::Stone),
    },
    TierTemplate {
        tier: SettlementTier::Kingdom,
        size: 16,
        npcs: NpcRange {
            min: 2000,
            max: 10000,
        },
        services: &[
            "tavern",
            "inn",
            "cathedral",
            "market",
            "barracks",
            "bank",
            "academy",
            "castle",
        ],
        shops: &[
            "general_store",
            "smith",
            "alchemist",
            "tailor",
            "jeweler",
            "armory",
            "bookshop",
        ],
        walls: Some(WallKind::Fortified),
    },
];

impl SettlementTier {
    /// All tiers from smallest to largest
    pub const ALL: [SettlementTier; 5] = [
        SettlementTier::Camp,
        SettlementTier::Hamlet,
        SettlementTier::Village,
        SettlementTier::City,
        SettlementTier::Kingdom,
    ];

    /// The read-only tier catalog
    pub fn catalog() -> &'static [TierTemplate] {
        &CATALOG
    }

    pub fn template(&self) -> &'static TierTemplate {
        &CATALOG[*self as usize]
    }

    /// Footprint side length
    pub fn size(&self) -> u32 {
        self.template().size
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementTier::Camp => "CAMP",
            SettlementTier::Hamlet => "HAMLET",
            SettlementTier::Village => "VILLAGE",
            SettlementTier::City => "CITY",
            SettlementTier::Kingdom => "KINGDOM",
        }
    }

    /// Human readable name used for default settlement names
    pub fn display_name(&self) -> &'static str {
        match self {
            SettlementTier::Camp => "Camp",
            SettlementTier::Hamlet => "Hamlet",
            SettlementTier::Village => "Village",
            SettlementTier::City => "City",
            SettlementTier::Kingdom => "Kingdom",
        }
    }
}

impl fmt::Display for SettlementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementTier {
    type Err = PlacementDenial;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        SettlementTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(token))
            .ok_or(PlacementDenial::UnknownTier)
    }
}

/// Why a footprint may not be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlacementDenial {
    #[error("unknown settlement tier")]
    UnknownTier,

    #[error("footprint leaves the world")]
    OutOfBounds,

    #[error("footprint overlaps an existing settlement")]
    Overlap,

    #[error("footprint is entirely water")]
    Unsuitable,
}

impl PlacementDenial {
    /// Stable reason string for the editor
    pub fn reason(&self) -> &'static str {
        match self {
            PlacementDenial::UnknownTier => "UnknownTier",
            PlacementDenial::OutOfBounds => "OutOfBounds",
            PlacementDenial::Overlap => "Overlap",
            PlacementDenial::Unsuitable => "Unsuitable",
        }
    }
}

/// Serializes `None` as `false`, a wall kind as its name
mod walls_or_false {
    use super::*;

    pub fn serialize<S: Serializer>(walls: &Option<WallKind>, s: S) -> Result<S::Ok, S::Error> {
        match walls {
            Some(kind) => kind.serialize(s),
            None => s.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<WallKind>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Kind(WallKind),
            Flag(bool),
        }
        Ok(match Wire::deserialize(d)? {
            Wire::Kind(kind) => Some(kind),
            Wire::Flag(_) => None,
        })
    }
}

/// Bookkeeping attached to a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMeta {
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

/// A proposed settlement, built only after a successful placement check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDraft {
    pub id: String,
    pub name: String,
    pub tier: SettlementTier,
    pub bounds: Rect,
    pub npcs_estimate: NpcRange,
    pub services: BTreeSet<String>,
    pub shops: BTreeSet<String>,
    #[serde(with = "walls_or_false")]
    pub walls: Option<WallKind>,
    pub meta: DraftMeta,
}

/// Settlement entry of the world's settlement layer.
///
/// Only `id` and `bounds` matter to the rules; everything else rides along.
/// A `tier` that does not name a known tier (in any case) is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordWire")]
pub struct SettlementRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SettlementTier>,
    pub bounds: Rect,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RecordWire {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    tier: Option<Value>,
    bounds: Rect,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RecordWire> for SettlementRecord {
    fn from(wire: RecordWire) -> Self {
        let mut extra = wire.extra;
        let tier = match wire.tier {
            Some(Value::String(token)) => match token.parse() {
                Ok(tier) => Some(tier),
                Err(_) => {
                    extra.insert("tier".to_string(), Value::String(token));
                    None
                }
            },
            Some(Value::Null) | None => None,
            Some(other) => {
                extra.insert("tier".to_string(), other);
                None
            }
        };
        Self {
            id: wire.id,
            name: wire.name,
            tier,
            bounds: wire.bounds,
            extra,
        }
    }
}

impl From<&SettlementDraft> for SettlementRecord {
    fn from(draft: &SettlementDraft) -> Self {
        let mut extra = match serde_json::to_value(draft) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for key in ["id", "name", "tier", "bounds"] {
            extra.remove(key);
        }
        Self {
            id: draft.id.clone(),
            name: draft.name.clone(),
            tier: Some(draft.tier),
            bounds: draft.bounds,
            extra,
        }
    }
}

/// A draft together with the patches that mark its footprint
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDraft {
    pub settlement: SettlementDraft,
    pub tile_patches: Vec<(Coord, TilePatch)>,
}

/// Footprint of `tier` with its top-left corner at the origin
pub fn footprint(start_x: i32, start_y: i32, tier: SettlementTier) -> Rect {
    let size = tier.size();
    Rect::new(start_x, start_y, size, size)
}

/// Check whether a settlement of `tier` may be placed with its top-left
/// corner at (`start_x`, `start_y`).
///
/// Checks run in order: tier, bounds, overlap, suitability.
pub fn can_place(
    world: &World,
    start_x: i32,
    start_y: i32,
    tier: &str,
) -> Result<SettlementTier, PlacementDenial> {
    let tier: SettlementTier = tier.parse()?;
    can_place_tier(world, start_x, start_y, tier)?;
    Ok(tier)
}

/// [`can_place`] for an already parsed tier
pub fn can_place_tier(
    world: &World,
    start_x: i32,
    start_y: i32,
    tier: SettlementTier,
) -> Result<(), PlacementDenial> {
    let rect = footprint(start_x, start_y, tier);

    if start_x < 0
        || start_y < 0
        || rect.right() > world.width() as i64
        || rect.bottom() > world.height() as i64
    {
        return Err(PlacementDenial::OutOfBounds);
    }

    if world
        .settlements()
        .iter()
        .any(|existing| existing.bounds.overlaps(&rect))
    {
        return Err(PlacementDenial::Overlap);
    }

    let all_water = rect
        .coords()
        .all(|c| world.tile(c).is_some_and(|t| t.biome.is_water_family()));
    if all_water {
        return Err(PlacementDenial::Unsuitable);
    }

    Ok(())
}

/// Build a draft for a footprint that already passed [`can_place`].
///
/// Nothing is applied to the world; the returned patches tag each covered
/// tile with the settlement id and the `settlement_area` tag.
pub fn draft_place<R: Rng>(
    world: &World,
    start_x: i32,
    start_y: i32,
    tier: SettlementTier,
    name: Option<&str>,
    rng: &mut R,
) -> PlacementDraft {
    let template = tier.template();
    let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string();
    let seed: u64 = rng.gen();
    let bounds = footprint(start_x, start_y, tier);

    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => format!("{} {}", tier.display_name(), &id[..8]),
    };

    let settlement = SettlementDraft {
        id: id.clone(),
        name,
        tier,
        bounds,
        npcs_estimate: template.npcs,
        services: template.services.iter().map(|s| s.to_string()).collect(),
        shops: template.shops.iter().map(|s| s.to_string()).collect(),
        walls: template.walls,
        meta: DraftMeta {
            seed,
            created_at: Utc::now(),
            notes: String::new(),
        },
    };

    let tile_patches = bounds
        .coords()
        .filter_map(|c| world.tile(c).map(|tile| (c, tile)))
        .map(|(c, tile)| {
            let mut tags = tile.tags.clone();
            if !tile.has_tag(SETTLEMENT_AREA_TAG) {
                tags.push(SETTLEMENT_AREA_TAG.to_string());
            }
            let patch = TilePatch::new()
                .with_tags(tags)
                .with_settlement(Some(id.clone()));
            (c, patch)
        })
        .collect();

    debug!(id = %settlement.id, tier = %tier, "drafted settlement at {},{}", start_x, start_y);

    PlacementDraft {
        settlement,
        tile_patches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn world_of(biome: &str, size: u32) -> World {
        World::filled(size, size, biome)
    }

    #[test]
    fn test_catalog_sizes() {
        let sizes: Vec<u32> = SettlementTier::ALL.iter().map(|t| t.size()).collect();
        assert_eq!(sizes, vec![1, 2, 4, 8, 16]);
        for (i, template) in SettlementTier::catalog().iter().enumerate() {
            assert_eq!(template.tier, SettlementTier::ALL[i]);
            assert!(template.npcs.min <= template.npcs.max);
        }
        assert_eq!(SettlementTier::Camp.template().walls, None);
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("hamlet".parse::<SettlementTier>(), Ok(SettlementTier::Hamlet));
        assert_eq!(" CITY ".parse::<SettlementTier>(), Ok(SettlementTier::City));
        assert_eq!(
            "METROPOLIS".parse::<SettlementTier>(),
            Err(PlacementDenial::UnknownTier)
        );
    }

    #[test]
    fn test_unknown_tier_checked_first() {
        // Out of bounds too, but the tier check wins
        let world = world_of("plains", 2);
        assert_eq!(
            can_place(&world, 50, 50, "CASTLE"),
            Err(PlacementDenial::UnknownTier)
        );
    }

    #[test]
    fn test_out_of_bounds() {
        let world = world_of("plains", 4);
        assert_eq!(can_place(&world, 3, 0, "HAMLET"), Err(PlacementDenial::OutOfBounds));
        assert_eq!(can_place(&world, -1, 0, "CAMP"), Err(PlacementDenial::OutOfBounds));
        assert_eq!(can_place(&world, 0, 0, "CITY"), Err(PlacementDenial::OutOfBounds));
        assert_eq!(can_place(&world, 2, 2, "HAMLET"), Ok(SettlementTier::Hamlet));
    }

    #[test]
    fn test_all_water_is_unsuitable() {
        let world = world_of("ocean", 4);
        assert_eq!(can_place(&world, 0, 0, "HAMLET"), Err(PlacementDenial::Unsuitable));

        // One coastal tile is enough to make it suitable
        let mut world = World::from_value(&json!({
            "tiles": [["sea", "sea"], ["river", "beach"]]
        }))
        .unwrap();
        assert_eq!(can_place(&world, 0, 0, "HAMLET"), Ok(SettlementTier::Hamlet));
        world.tile_mut(Coord::new(1, 1)).unwrap().biome = crate::biome::Biome::new("lake");
        assert_eq!(can_place(&world, 0, 0, "HAMLET"), Err(PlacementDenial::Unsuitable));
    }

    #[test]
    fn test_overlap_for_every_tier() {
        let mut world = world_of("plains", 40);
        world.settlements_mut().push(SettlementRecord {
            id: "existing".to_string(),
            name: "Existing".to_string(),
            tier: None,
            bounds: Rect::new(20, 20, 1, 1),
            extra: Map::new(),
        });
        for tier in SettlementTier::ALL {
            // Bottom-right corner of the footprint lands on the existing tile
            let offset = tier.size() as i32 - 1;
            assert_eq!(
                can_place(&world, 20 - offset, 20 - offset, tier.as_str()),
                Err(PlacementDenial::Overlap),
                "tier {tier}"
            );
        }
        assert!(can_place(&world, 21, 20, "CAMP").is_ok());
    }

    #[test]
    fn test_record_tier_is_lenient() {
        let record: SettlementRecord = serde_json::from_value(json!({
            "id": "a", "tier": "hamlet", "bounds": {"x": 0, "y": 0, "w": 2, "h": 2}
        }))
        .unwrap();
        assert_eq!(record.tier, Some(SettlementTier::Hamlet));
        assert!(!record.extra.contains_key("tier"));

        let record: SettlementRecord = serde_json::from_value(json!({
            "id": "b", "tier": "TOWN", "bounds": {"x": 0, "y": 0, "w": 1, "h": 1}
        }))
        .unwrap();
        assert_eq!(record.tier, None);
        assert_eq!(record.extra["tier"], json!("TOWN"));
        // The unknown label survives a round trip
        assert_eq!(serde_json::to_value(&record).unwrap()["tier"], json!("TOWN"));
    }

    #[test]
    fn test_draft_place_builds_patches() {
        let world = world_of("plains", 6);
        let mut rng = StdRng::seed_from_u64(7);
        let draft = draft_place(&world, 1, 2, SettlementTier::Hamlet, None, &mut rng);

        let s = &draft.settlement;
        assert_eq!(s.bounds, Rect::new(1, 2, 2, 2));
        assert_eq!(s.tier, SettlementTier::Hamlet);
        assert!(s.name.starts_with("Hamlet "));
        assert!(s.services.contains("well"));
        assert_eq!(s.walls, Some(WallKind::Palisade));
        assert_eq!(draft.tile_patches.len(), 4);

        for (coord, patch) in &draft.tile_patches {
            assert!(s.bounds.contains(coord));
            assert_eq!(patch.settlement, Some(Some(s.id.clone())));
            assert_eq!(patch.tags, Some(vec![SETTLEMENT_AREA_TAG.to_string()]));
        }
        // Nothing was applied to the world
        assert!(world.tile(Coord::new(1, 2)).unwrap().settlement.is_none());
    }

    #[test]
    fn test_draft_ids_are_unique_and_named() {
        let world = world_of("plains", 4);
        let mut rng = StdRng::seed_from_u64(1);
        let a = draft_place(&world, 0, 0, SettlementTier::Camp, Some("  Ashford "), &mut rng);
        let b = draft_place(&world, 0, 0, SettlementTier::Camp, Some(""), &mut rng);
        assert_ne!(a.settlement.id, b.settlement.id);
        assert_eq!(a.settlement.name, "Ashford");
        assert!(b.settlement.name.starts_with("Camp "));
    }

    #[test]
    fn test_draft_wire_shape() {
        let world = world_of("plains", 2);
        let mut rng = StdRng::seed_from_u64(3);
        let draft = draft_place(&world, 0, 0, SettlementTier::Camp, None, &mut rng).settlement;
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["tier"], json!("CAMP"));
        assert_eq!(value["walls"], json!(false));
        assert_eq!(value["npcsEstimate"], json!({"min": 1, "max": 6}));
        assert!(value["meta"]["createdAt"].is_string());

        let back: SettlementDraft = serde_json::from_value(value).unwrap();
        assert_eq!(back, draft);

        let record = SettlementRecord::from(&draft);
        assert_eq!(record.bounds, draft.bounds);
        assert!(record.extra.contains_key("npcsEstimate"));
        assert!(!record.extra.contains_key("id"));
    }
}
