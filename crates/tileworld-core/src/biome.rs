//! Biome tokens and the alias table that canonicalizes them.
//!
//! Raw maps name the same terrain many ways ("Grassland", "meadow", "plain").
//! Every tile stores a [`Biome`], which can only be produced by
//! [`normalize_biome`], so downstream rules only ever see canonical tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token for tiles created from a missing cell
pub const VOID: &str = "void";

/// Token for empty or unresolvable input
pub const UNKNOWN: &str = "unknown";

/// Biomes that block walking unless a road, bridge or climbing gear helps
pub const IMPASSABLE: [&str; 2] = ["mountain", "volcano"];

/// Biomes that count as water when judging settlement suitability
pub const WATER_FAMILY: [&str; 3] = ["water", "river", "lake"];

/// Surface synonyms and the canonical token they collapse to.
///
/// Tokens missing from this table pass through unchanged (lower-cased).
const ALIASES: &[(&str, &str)] = &[
    // Open water
    ("water", "water"),
    ("ocean", "water"),
    ("sea", "water"),
    ("deep", "water"),
    ("deep_water", "water"),
    ("deepwater", "water"),
    ("shallow", "water"),
    ("shallows", "water"),
    ("shallow_water", "water"),
    ("river", "river"),
    ("stream", "river"),
    ("creek", "river"),
    ("lake", "lake"),
    ("pond", "lake"),
    ("lagoon", "lake"),
    // Shoreline
    ("coast", "coast"),
    ("beach", "coast"),
    ("shore", "coast"),
    ("shoreline", "coast"),
    ("coastal", "coast"),
    // Lowlands
    ("plains", "plains"),
    ("plain", "plains"),
    ("grass", "plains"),
    ("grassland", "plains"),
    ("grasslands", "plains"),
    ("meadow", "plains"),
    ("prairie", "plains"),
    ("field", "plains"),
    ("fields", "plains"),
    ("savanna", "plains"),
    ("steppe", "plains"),
    ("forest", "forest"),
    ("forests", "forest"),
    ("woods", "forest"),
    ("woodland", "forest"),
    ("jungle", "forest"),
    ("rainforest", "forest"),
    ("taiga", "forest"),
    ("trees", "forest"),
    ("desert", "desert"),
    ("sand", "desert"),
    ("dunes", "desert"),
    ("badlands", "desert"),
    ("arid", "desert"),
    ("wasteland", "desert"),
    ("tundra", "tundra"),
    ("snow", "tundra"),
    ("ice", "tundra"),
    ("glacier", "tundra"),
    ("frozen", "tundra"),
    ("arctic", "tundra"),
    ("swamp", "swamp"),
    ("marsh", "swamp"),
    ("bog", "swamp"),
    ("wetland", "swamp"),
    ("wetlands", "swamp"),
    ("mire", "swamp"),
    ("fen", "swamp"),
    // Highlands
    ("hills", "hills"),
    ("hill", "hills"),
    ("highlands", "hills"),
    ("foothills", "hills"),
    ("upland", "hills"),
    ("mountain", "mountain"),
    ("mountains", "mountain"),
    ("mount", "mountain"),
    ("peak", "mountain"),
    ("peaks", "mountain"),
    ("alpine", "mountain"),
    ("cliff", "mountain"),
    ("cliffs", "mountain"),
    // Settlements and special sites map to themselves
    ("city", "city"),
    ("town", "town"),
    ("village", "village"),
    ("port", "port"),
    ("castle", "castle"),
    ("ruins", "ruins"),
    ("dungeon", "dungeon"),
    ("cave", "cave"),
    ("temple", "temple"),
    ("volcano", "volcano"),
    (VOID, VOID),
    (UNKNOWN, UNKNOWN),
];

/// Canonical biome token.
///
/// The only constructor is normalization, which also runs on deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Biome(String);

impl Biome {
    /// Normalize any token into a canonical biome
    pub fn new(token: &str) -> Self {
        normalize_biome(token)
    }

    /// Biome of a void (missing) tile
    pub fn void() -> Self {
        Biome(VOID.to_string())
    }

    /// Biome used when nothing could be resolved
    pub fn unknown() -> Self {
        Biome(UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mountains and volcanoes
    pub fn is_impassable(&self) -> bool {
        IMPASSABLE.contains(&self.0.as_str())
    }

    /// Open water, rivers and lakes
    pub fn is_water_family(&self) -> bool {
        WATER_FAMILY.contains(&self.0.as_str())
    }
}

impl From<String> for Biome {
    fn from(token: String) -> Self {
        normalize_biome(&token)
    }
}

impl From<Biome> for String {
    fn from(biome: Biome) -> Self {
        biome.0
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Biome {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lower-case, trim and resolve a raw token through the alias table.
///
/// Empty input yields `unknown`; unknown tokens pass through lower-cased.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_biome(token: &str) -> Biome {
    let key = token.trim().to_lowercase();
    if key.is_empty() {
        return Biome::unknown();
    }
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(key);
    Biome(canonical)
}
