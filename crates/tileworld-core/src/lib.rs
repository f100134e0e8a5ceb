//! Tileworld - editing core for grid-based game worlds
//!
//! This crate keeps an in-memory world consistent while an editor proposes
//! changes to it:
//! - Canonical tiles built once from loosely shaped JSON
//! - Movement rules and stamina costs for a single step or a route
//! - Settlement footprint validation and drafting
//! - Batched undo/redo over field-level patches
//! - A draft buffer of pending edits for bulk export
//!
//! # Architecture
//!
//! The core is platform-agnostic and single-threaded. An [`EditorSession`]
//! owns the world, its history and its draft; it compiles to:
//! - Native Rust for tools and tests
//! - WebAssembly for an in-browser editor (`wasm` feature)
//!
//! # Modules
//!
//! - [`biome`], [`tile`]: Biome normalization and tile canonicalization
//! - [`coord`], [`world`]: Grid coordinates and the world model
//! - [`movement`]: Passability and step cost
//! - [`settlement`]: Tier catalog, placement checks and drafts
//! - [`patch`], [`history`]: Reversible edit operations and the transaction log
//! - [`draft`]: Pending edits staged for export
//! - [`session`], [`actions`]: The editing session and its action/event API

pub mod actions;
pub mod biome;
pub mod coord;
pub mod draft;
pub mod history;
pub mod movement;
pub mod patch;
pub mod session;
pub mod settlement;
pub mod tile;
pub mod world;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{EditAction, EditEvent};
pub use biome::{normalize_biome, Biome};
pub use coord::{Coord, Direction, Rect};
pub use draft::{DraftBuffer, DraftPayload};
pub use history::{Batch, HistoryError, TransactionLog};
pub use movement::{
    evaluate_route, evaluate_step, passable, Actor, AllowReason, MoveDenial, MoveOptions, Route,
    Step,
};
pub use patch::{EditOp, EditTarget, PatchSide, SettlementPatch, TilePatch};
pub use session::{EditError, EditorSession, SessionConfig};
pub use settlement::{
    can_place, draft_place, PlacementDenial, PlacementDraft, SettlementDraft, SettlementRecord,
    SettlementTier, TierTemplate,
};
pub use tile::{canonicalize_grid, ShapeError, Tile, TileFlags};
pub use world::{Layers, World, WorldError};
