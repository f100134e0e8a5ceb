//! Editing actions an editor can request and the events they produce.
//!
//! Both enums are serde-tagged so a script file or a wasm caller can drive a
//! session with plain JSON, e.g. `{"action": "undo"}`.

use crate::coord::{Coord, Rect};
use crate::draft::DraftPayload;
use crate::movement::{Actor, MoveOptions, Route, Step};
use crate::patch::TilePatch;
use crate::settlement::SettlementTier;
use serde::{Deserialize, Serialize};

/// Everything an editor can ask of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    // ==================== Movement ====================
    /// Evaluate one step without moving anything
    Step {
        from: Coord,
        direction: String,
        #[serde(default)]
        actor: Actor,
        #[serde(default)]
        options: MoveOptions,
    },
    /// Evaluate a sequence of steps, stopping at the first denial
    Route {
        from: Coord,
        directions: Vec<String>,
        #[serde(default)]
        actor: Actor,
        #[serde(default)]
        options: MoveOptions,
    },

    // ==================== Settlements ====================
    /// Check a footprint without placing anything
    CanPlace { x: i32, y: i32, tier: String },
    /// Validate, draft and record a settlement
    PlaceSettlement {
        x: i32,
        y: i32,
        tier: String,
        #[serde(default)]
        name: Option<String>,
    },

    // ==================== Tile Edits ====================
    /// Apply a field-level patch to one tile
    PaintTile { at: Coord, patch: TilePatch },

    // ==================== History ====================
    BeginBatch { kind: String },
    CommitBatch,
    /// Revert and drop the open batch
    AbortBatch,
    Undo,
    Redo,

    // ==================== Draft ====================
    ExportDraft,
    /// Forget the draft and the history after a successful save
    ClearDraft,
}

/// Outcome of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditEvent {
    /// A step is allowed
    StepEvaluated { step: Step },

    /// A route was walked (possibly stopping early)
    RouteEvaluated { route: Route },

    /// A footprint passed every placement check
    PlacementAllowed { tier: SettlementTier },

    /// A settlement was recorded and queued
    SettlementPlaced {
        id: String,
        name: String,
        tier: SettlementTier,
        bounds: Rect,
    },

    /// A tile patch was applied
    TilePainted { at: Coord },

    BatchOpened { kind: String },

    BatchCommitted { kind: String, ops: usize },

    /// The open batch had no operations and was dropped
    BatchDiscarded { kind: String },

    BatchAborted { kind: String, reverted: usize },

    Undone { kind: String, ops: usize },

    Redone { kind: String, ops: usize },

    NothingToUndo,

    NothingToRedo,

    DraftExported { payload: DraftPayload },

    DraftCleared,
}
