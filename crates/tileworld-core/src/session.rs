//! Editing session: the single owner of a world while it is being edited.
//!
//! The session ties the other components together. Accepted edits become
//! operations that are applied to the world, recorded in the transaction log
//! and mirrored into the draft buffer. Movement and placement queries are
//! read-only.

use crate::actions::{EditAction, EditEvent};
use crate::coord::{Coord, Direction};
use crate::draft::{DraftBuffer, DraftPayload};
use crate::history::{Batch, HistoryError, TransactionLog, DEFAULT_MAX_DEPTH};
use crate::movement::{
    evaluate_direction, evaluate_route, evaluate_step, Actor, MoveDenial, MoveOptions, Route, Step,
};
use crate::patch::{EditOp, PatchSide, SettlementPatch, TilePatch};
use crate::settlement::{
    can_place, draft_place, PlacementDenial, SettlementDraft, SettlementRecord, SettlementTier,
};
use crate::world::{World, WorldError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Batch kind used for settlement placement
pub const PLACE_SETTLEMENT_BATCH: &str = "place_settlement";

/// Session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Undo entries kept before the oldest is evicted
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Fixed RNG seed for reproducible ids; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_history() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_DEPTH,
            seed: None,
        }
    }
}

/// Errors that can occur while editing
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("placement denied: {0}")]
    Placement(#[from] PlacementDenial),

    #[error("move denied: {0}")]
    Move(#[from] MoveDenial),
}

impl EditError {
    /// Stable reason string for reports
    pub fn reason(&self) -> &'static str {
        match self {
            EditError::Placement(denial) => denial.reason(),
            EditError::Move(denial) => denial.reason(),
            EditError::History(HistoryError::BatchAlreadyOpen(_)) => "batch_already_open",
            EditError::History(HistoryError::BatchOpen(_)) => "batch_open",
            EditError::History(HistoryError::World(_)) | EditError::World(_) => "world",
        }
    }
}

/// A world under edit, with its history and pending draft
#[derive(Debug)]
pub struct EditorSession {
    world: World,
    history: TransactionLog,
    draft: DraftBuffer,
    config: SessionConfig,
    rng: StdRng,
}

impl EditorSession {
    pub fn new(world: World, config: SessionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            world,
            history: TransactionLog::new(config.max_history),
            draft: DraftBuffer::new(),
            config,
            rng,
        }
    }

    /// Canonicalize a wire-shape world and start editing it
    pub fn load(value: &Value, config: SessionConfig) -> Result<Self, EditError> {
        let world = World::from_value(value)?;
        Ok(Self::new(world, config))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn history(&self) -> &TransactionLog {
        &self.history
    }

    pub fn draft(&self) -> &DraftBuffer {
        &self.draft
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// End the session, keeping the edited world
    pub fn into_world(self) -> World {
        self.world
    }

    // ==================== Queries ====================

    pub fn evaluate_step(
        &self,
        actor: &Actor,
        from: Coord,
        direction: &str,
        options: &MoveOptions,
    ) -> Result<Step, MoveDenial> {
        evaluate_step(&self.world, actor, from, direction, options)
    }

    pub fn evaluate_route<I, S>(
        &self,
        actor: &Actor,
        from: Coord,
        directions: I,
        options: &MoveOptions,
    ) -> Route
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        evaluate_route(&self.world, actor, from, directions, options)
    }

    /// Directions `actor` may step in from `from`
    pub fn valid_directions(
        &self,
        actor: &Actor,
        from: Coord,
        options: &MoveOptions,
    ) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| evaluate_direction(&self.world, actor, from, *d, options).is_ok())
            .collect()
    }

    pub fn can_place(
        &self,
        start_x: i32,
        start_y: i32,
        tier: &str,
    ) -> Result<SettlementTier, PlacementDenial> {
        can_place(&self.world, start_x, start_y, tier)
    }

    // ==================== Edits ====================

    /// Apply `op`, record it and mirror its forward side into the draft
    fn record(&mut self, op: EditOp) -> Result<(), EditError> {
        self.world.apply_op(&op, PatchSide::Forward)?;
        self.mirror(&op, PatchSide::Forward);
        self.history.push_op(op);
        Ok(())
    }

    /// Queue one side of `op` into the draft buffer
    fn mirror(&mut self, op: &EditOp, side: PatchSide) {
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
                self.draft.queue_tile_patch(*at, patch);
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
                match patch {
                    SettlementPatch::Upsert(record) => {
                        if let Some(draft) = draft_from_record(record) {
                            self.draft.queue_settlement(draft);
                        }
                    }
                    SettlementPatch::Remove => {
                        self.draft.discard_settlement(id);
                    }
                }
            }
        }
    }

    fn mirror_batch(&mut self, batch: &Batch, side: PatchSide) {
        match side {
            PatchSide::Forward => batch.ops.iter().for_each(|op| self.mirror(op, side)),
            PatchSide::Inverse => batch.ops.iter().rev().for_each(|op| self.mirror(op, side)),
        }
    }

    /// Patch one tile. An empty patch records nothing.
    pub fn paint_tile(&mut self, at: Coord, patch: TilePatch) -> Result<(), EditError> {
        if patch.is_empty() {
            debug!(at = %at, "ignored empty tile patch");
            return Ok(());
        }
        let op = self.world.tile_op(at, patch)?;
        self.record(op)?;
        debug!(at = %at, "painted tile");
        Ok(())
    }

    /// Validate, draft and record a settlement.
    ///
    /// The footprint patches and the settlement insert form one batch, or join
    /// the batch that is already open.
    pub fn place_settlement(
        &mut self,
        start_x: i32,
        start_y: i32,
        tier: &str,
        name: Option<&str>,
    ) -> Result<SettlementDraft, EditError> {
        let tier = can_place(&self.world, start_x, start_y, tier).map_err(|denial| {
            debug!(x = start_x, y = start_y, reason = denial.reason(), "placement denied");
            denial
        })?;

        let placement = draft_place(&self.world, start_x, start_y, tier, name, &mut self.rng);
        let settlement = placement.settlement;

        // Build every op before applying any of them
        let mut ops = placement
            .tile_patches
            .into_iter()
            .map(|(at, patch)| self.world.tile_op(at, patch))
            .collect::<Result<Vec<_>, _>>()?;
        ops.push(self.world.settlement_op(
            &settlement.id,
            SettlementPatch::Upsert(SettlementRecord::from(&settlement)),
        ));

        let own_batch = !self.history.is_batch_open();
        if own_batch {
            self.history.begin_batch(PLACE_SETTLEMENT_BATCH)?;
        }
        for op in ops {
            self.record(op)?;
        }
        if own_batch {
            self.history.commit_batch();
        }

        info!(
            id = %settlement.id,
            tier = %settlement.tier,
            name = %settlement.name,
            "placed settlement"
        );
        Ok(settlement)
    }

    // ==================== History ====================

    pub fn begin_batch(&mut self, kind: &str) -> Result<(), EditError> {
        self.history.begin_batch(kind)?;
        debug!(kind, "opened batch");
        Ok(())
    }

    /// Close the open batch; returns the number of operations committed
    pub fn commit_batch(&mut self) -> Option<usize> {
        self.history.commit_batch()
    }

    /// Revert the open batch's operations and drop it
    pub fn abort_batch(&mut self) -> Result<Option<Batch>, EditError> {
        let Some(batch) = self.history.take_open_batch() else {
            return Ok(None);
        };
        batch.undo_on(&mut self.world)?;
        self.mirror_batch(&batch, PatchSide::Inverse);
        info!(kind = %batch.kind, ops = batch.len(), "aborted batch");
        Ok(Some(batch))
    }

    /// Undo the latest batch; `Ok(None)` when there is nothing to undo
    pub fn undo(&mut self) -> Result<Option<Batch>, EditError> {
        let Some(batch) = self.history.undo(&mut self.world)?.cloned() else {
            return Ok(None);
        };
        self.mirror_batch(&batch, PatchSide::Inverse);
        Ok(Some(batch))
    }

    /// Redo the latest undone batch; `Ok(None)` when there is nothing to redo
    pub fn redo(&mut self) -> Result<Option<Batch>, EditError> {
        let Some(batch) = self.history.redo(&mut self.world)?.cloned() else {
            return Ok(None);
        };
        self.mirror_batch(&batch, PatchSide::Forward);
        Ok(Some(batch))
    }

    // ==================== Draft ====================

    /// A copy of everything staged since the last clear
    pub fn export_payload(&self) -> DraftPayload {
        let payload = self.draft.export_payload();
        info!(
            settlements = payload.settlements.len(),
            tiles = payload.tiles.len(),
            "exported draft"
        );
        payload
    }

    /// Forget the draft after it was persisted; the history goes with it
    pub fn clear_draft(&mut self) {
        self.draft.clear();
        self.history.clear();
        info!("cleared draft and history");
    }

    // ==================== Actions ====================

    /// Apply an action, returning the events it produced
    pub fn apply_action(&mut self, action: EditAction) -> Result<Vec<EditEvent>, EditError> {
        let mut events = Vec::new();

        match action {
            EditAction::Step {
                from,
                direction,
                actor,
                options,
            } => {
                let step = self.evaluate_step(&actor, from, &direction, &options)?;
                events.push(EditEvent::StepEvaluated { step });
            }

            EditAction::Route {
                from,
                directions,
                actor,
                options,
            } => {
                let route = self.evaluate_route(&actor, from, &directions, &options);
                events.push(EditEvent::RouteEvaluated { route });
            }

            EditAction::CanPlace { x, y, tier } => {
                let tier = self.can_place(x, y, &tier)?;
                events.push(EditEvent::PlacementAllowed { tier });
            }

            EditAction::PlaceSettlement { x, y, tier, name } => {
                let draft = self.place_settlement(x, y, &tier, name.as_deref())?;
                events.push(EditEvent::SettlementPlaced {
                    id: draft.id,
                    name: draft.name,
                    tier: draft.tier,
                    bounds: draft.bounds,
                });
            }

            EditAction::PaintTile { at, patch } => {
                self.paint_tile(at, patch)?;
                events.push(EditEvent::TilePainted { at });
            }

            EditAction::BeginBatch { kind } => {
                self.begin_batch(&kind)?;
                events.push(EditEvent::BatchOpened { kind });
            }

            EditAction::CommitBatch => {
                let kind = self.history.open_batch().map(|b| b.kind.clone());
                match (kind, self.commit_batch()) {
                    (Some(kind), Some(ops)) => events.push(EditEvent::BatchCommitted { kind, ops }),
                    (Some(kind), None) => events.push(EditEvent::BatchDiscarded { kind }),
                    (None, _) => {}
                }
            }

            EditAction::AbortBatch => {
                if let Some(batch) = self.abort_batch()? {
                    events.push(EditEvent::BatchAborted {
                        reverted: batch.len(),
                        kind: batch.kind,
                    });
                }
            }

            EditAction::Undo => match self.undo()? {
                Some(batch) => events.push(EditEvent::Undone {
                    ops: batch.len(),
                    kind: batch.kind,
                }),
                None => events.push(EditEvent::NothingToUndo),
            },

            EditAction::Redo => match self.redo()? {
                Some(batch) => events.push(EditEvent::Redone {
                    ops: batch.len(),
                    kind: batch.kind,
                }),
                None => events.push(EditEvent::NothingToRedo),
            },

            EditAction::ExportDraft => {
                events.push(EditEvent::DraftExported {
                    payload: self.export_payload(),
                });
            }

            EditAction::ClearDraft => {
                self.clear_draft();
                events.push(EditEvent::DraftCleared);
            }
        }

        Ok(events)
    }
}

/// Recover the full draft from a settlement record built by `SettlementRecord::from`
fn draft_from_record(record: &SettlementRecord) -> Option<SettlementDraft> {
    serde_json::to_value(record)
        .ok()
        .and_then(|value| serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::SETTLEMENT_AREA_TAG;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn session(width: u32, height: u32) -> EditorSession {
        let config = SessionConfig {
            seed: Some(42),
            ..SessionConfig::default()
        };
        EditorSession::new(World::filled(width, height, "plains"), config)
    }

    #[test]
    fn test_config_defaults() {
        let config: SessionConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.max_history, 100);

        let config: SessionConfig =
            serde_json::from_value(json!({"maxHistory": 5, "seed": 9})).unwrap();
        assert_eq!(config.max_history, 5);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_place_settlement_records_one_batch() {
        let mut session = session(6, 6);
        let draft = session.place_settlement(1, 1, "hamlet", Some("Brook")).unwrap();

        assert_eq!(draft.name, "Brook");
        assert_eq!(session.history().undo_len(), 1);
        let batch = session.history().undo_stack().next().unwrap();
        assert_eq!(batch.kind, PLACE_SETTLEMENT_BATCH);
        // Four footprint tiles plus the settlement insert
        assert_eq!(batch.len(), 5);

        let tile = session.world().tile(Coord::new(2, 2)).unwrap();
        assert_eq!(tile.settlement.as_deref(), Some(draft.id.as_str()));
        assert!(tile.has_tag(SETTLEMENT_AREA_TAG));
        assert!(session.world().settlement(&draft.id).is_some());

        assert_eq!(session.draft().settlement_count(), 1);
        assert_eq!(session.draft().tile_count(), 4);
    }

    #[test]
    fn test_placed_settlement_blocks_overlap() {
        let mut session = session(6, 6);
        session.place_settlement(0, 0, "HAMLET", None).unwrap();
        assert!(matches!(
            session.place_settlement(1, 1, "CAMP", None),
            Err(EditError::Placement(PlacementDenial::Overlap))
        ));
        // A denied placement records nothing
        assert_eq!(session.history().undo_len(), 1);
    }

    #[test]
    fn test_undo_placement_drops_draft() {
        let mut session = session(4, 4);
        let draft = session.place_settlement(0, 0, "CAMP", None).unwrap();

        session.undo().unwrap();
        assert!(session.world().settlements().is_empty());
        assert!(session.world().tile(Coord::new(0, 0)).unwrap().settlement.is_none());
        assert_eq!(session.draft().settlement(&draft.id), None);

        session.redo().unwrap();
        assert!(session.world().settlement(&draft.id).is_some());
        assert_eq!(session.draft().settlement(&draft.id), Some(&draft));
    }

    #[test]
    fn test_paint_and_undo_mirror_into_draft() {
        let mut session = session(2, 2);
        let at = Coord::new(1, 0);
        session.paint_tile(at, TilePatch::new().with_biome("forest")).unwrap();
        assert_eq!(session.draft().tile_patch(at).unwrap().biome.as_ref().unwrap(), &"forest");

        session.undo().unwrap();
        assert_eq!(session.world().tile(at).unwrap().biome, "plains");
        assert_eq!(session.draft().tile_patch(at).unwrap().biome.as_ref().unwrap(), &"plains");
    }

    #[test]
    fn test_empty_paint_records_nothing() {
        let mut session = session(1, 1);
        session.paint_tile(Coord::new(0, 0), TilePatch::new()).unwrap();
        assert!(!session.history().can_undo());
        assert!(session.draft().is_empty());
    }

    #[test]
    fn test_paint_out_of_bounds() {
        let mut session = session(1, 1);
        let result = session.paint_tile(Coord::new(3, 3), TilePatch::new().with_elevation(1));
        assert!(matches!(result, Err(EditError::World(WorldError::OutOfBounds(_)))));
    }

    #[test]
    fn test_abort_batch_reverts() {
        let mut session = session(2, 2);
        let before = session.world().clone();
        session.begin_batch("stroke").unwrap();
        session.paint_tile(Coord::new(0, 0), TilePatch::new().with_elevation(3)).unwrap();
        session.paint_tile(Coord::new(0, 0), TilePatch::new().with_elevation(5)).unwrap();

        let aborted = session.abort_batch().unwrap().unwrap();
        assert_eq!(aborted.len(), 2);
        assert_eq!(session.world(), &before);
        assert!(!session.history().can_undo());
        assert_eq!(session.draft().tile_patch(Coord::new(0, 0)).unwrap().elevation, Some(0));
        assert!(session.abort_batch().unwrap().is_none());
    }

    #[test]
    fn test_clear_draft_clears_history() {
        let mut session = session(2, 2);
        session.paint_tile(Coord::new(0, 0), TilePatch::new().with_elevation(1)).unwrap();
        let payload = session.export_payload();
        assert_eq!(payload.tiles.len(), 1);

        session.clear_draft();
        assert!(session.draft().is_empty());
        assert!(!session.history().can_undo());
        // The world keeps the edit
        assert_eq!(session.world().tile(Coord::new(0, 0)).unwrap().elevation, 1);
    }

    #[test]
    fn test_valid_directions() {
        let mut world = World::filled(3, 3, "plains");
        world.block_for_land(Coord::new(1, 0));
        world.tile_mut(Coord::new(2, 1)).unwrap().biome = crate::biome::Biome::new("mountain");
        let session = EditorSession::new(world, SessionConfig::default());

        let dirs = session.valid_directions(&Actor::default(), Coord::new(1, 1), &MoveOptions::default());
        assert_eq!(dirs, vec![Direction::South, Direction::West]);

        let all = session.valid_directions(&Actor::default(), Coord::new(0, 0), &MoveOptions::noclip());
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_apply_action_events() {
        let mut session = session(4, 4);
        let events = session
            .apply_action(EditAction::BeginBatch {
                kind: "paint".to_string(),
            })
            .unwrap();
        assert_eq!(events, vec![EditEvent::BatchOpened { kind: "paint".to_string() }]);

        session
            .apply_action(EditAction::PaintTile {
                at: Coord::new(0, 0),
                patch: TilePatch::new().with_biome("desert"),
            })
            .unwrap();
        let events = session.apply_action(EditAction::CommitBatch).unwrap();
        assert_eq!(
            events,
            vec![EditEvent::BatchCommitted {
                kind: "paint".to_string(),
                ops: 1
            }]
        );

        let events = session.apply_action(EditAction::Undo).unwrap();
        assert_eq!(
            events,
            vec![EditEvent::Undone {
                kind: "paint".to_string(),
                ops: 1
            }]
        );
        let events = session.apply_action(EditAction::Undo).unwrap();
        assert_eq!(events, vec![EditEvent::NothingToUndo]);
    }

    #[test]
    fn test_apply_action_denials_are_errors() {
        let mut session = session(2, 2);
        let err = session
            .apply_action(EditAction::Step {
                from: Coord::new(0, 0),
                direction: "up".to_string(),
                actor: Actor::default(),
                options: MoveOptions::default(),
            })
            .unwrap_err();
        assert_eq!(err.reason(), "bad_direction");

        let err = session
            .apply_action(EditAction::CanPlace {
                x: 0,
                y: 0,
                tier: "CASTLE".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.reason(), "UnknownTier");

        session
            .apply_action(EditAction::BeginBatch { kind: "a".to_string() })
            .unwrap();
        let err = session.apply_action(EditAction::Undo).unwrap_err();
        assert_eq!(err.reason(), "batch_open");
    }

    #[test]
    fn test_step_action_at_coordinate_limit() {
        let mut session = session(2, 2);
        let action: EditAction = serde_json::from_value(json!({
            "action": "step",
            "from": [0, i32::MIN],
            "direction": "N"
        }))
        .unwrap();
        let err = session.apply_action(action).unwrap_err();
        assert_eq!(err.reason(), "bounds");
    }

    #[test]
    fn test_seeded_sessions_are_reproducible() {
        let mut a = session(4, 4);
        let mut b = session(4, 4);
        let da = a.place_settlement(0, 0, "CAMP", None).unwrap();
        let db = b.place_settlement(0, 0, "CAMP", None).unwrap();
        assert_eq!(da.id, db.id);
        assert_eq!(da.meta.seed, db.meta.seed);
    }
}
