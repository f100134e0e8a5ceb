//! Draft buffer: pending edits staged for bulk export.
//!
//! The buffer is an accumulator, not a source of truth. It never reads or
//! writes the world; whoever persists the exported payload reconciles it.

use crate::coord::Coord;
use crate::patch::TilePatch;
use crate::settlement::SettlementDraft;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exported draft: settlements by id and tile patches keyed `"x,y"`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftPayload {
    pub settlements: BTreeMap<String, SettlementDraft>,
    pub tiles: BTreeMap<String, TilePatch>,
}

impl DraftPayload {
    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty() && self.tiles.is_empty()
    }
}

/// Staged settlements and tile patches
#[derive(Debug, Clone, Default)]
pub struct DraftBuffer {
    pending: DraftPayload,
}

impl DraftBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a settlement draft by id
    pub fn queue_settlement(&mut self, draft: SettlementDraft) {
        self.pending.settlements.insert(draft.id.clone(), draft);
    }

    /// Drop a queued settlement, returning it if it was queued
    pub fn discard_settlement(&mut self, id: &str) -> Option<SettlementDraft> {
        self.pending.settlements.remove(id)
    }

    /// Merge `patch` into whatever is already queued at `at`.
    ///
    /// The last writer wins per field, not per coordinate.
    pub fn queue_tile_patch(&mut self, at: Coord, patch: &TilePatch) {
        self.pending
            .tiles
            .entry(at.key())
            .or_default()
            .merge(patch);
    }

    pub fn settlement(&self, id: &str) -> Option<&SettlementDraft> {
        self.pending.settlements.get(id)
    }

    pub fn tile_patch(&self, at: Coord) -> Option<&TilePatch> {
        self.pending.tiles.get(&at.key())
    }

    pub fn settlement_count(&self) -> usize {
        self.pending.settlements.len()
    }

    pub fn tile_count(&self) -> usize {
        self.pending.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// An independent copy of everything queued
    pub fn export_payload(&self) -> DraftPayload {
        self.pending.clone()
    }

    pub fn clear(&mut self) {
        self.pending = DraftPayload::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::{draft_place, SettlementTier};
    use crate::world::World;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn camp_draft(seed: u64) -> SettlementDraft {
        let world = World::filled(2, 2, "plains");
        let mut rng = StdRng::seed_from_u64(seed);
        draft_place(&world, 0, 0, SettlementTier::Camp, None, &mut rng).settlement
    }

    #[test]
    fn test_tile_patches_merge() {
        let mut buffer = DraftBuffer::new();
        let at = Coord::new(2, 3);
        buffer.queue_tile_patch(at, &TilePatch::new().with_extra("a", json!(1)));
        buffer.queue_tile_patch(at, &TilePatch::new().with_extra("b", json!(2)));

        let payload = buffer.export_payload();
        assert_eq!(payload.tiles.len(), 1);
        assert_eq!(
            serde_json::to_value(&payload.tiles["2,3"]).unwrap(),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_last_writer_wins_per_field() {
        let mut buffer = DraftBuffer::new();
        let at = Coord::new(0, 0);
        buffer.queue_tile_patch(at, &TilePatch::new().with_biome("forest").with_elevation(1));
        buffer.queue_tile_patch(at, &TilePatch::new().with_biome("desert"));
        let patch = buffer.tile_patch(at).unwrap();
        assert_eq!(patch.biome.as_ref().unwrap(), &"desert");
        assert_eq!(patch.elevation, Some(1));
    }

    #[test]
    fn test_settlements_upsert_by_id() {
        let mut buffer = DraftBuffer::new();
        let draft = camp_draft(1);
        buffer.queue_settlement(draft.clone());

        let mut renamed = draft.clone();
        renamed.name = "Renamed".to_string();
        buffer.queue_settlement(renamed);

        assert_eq!(buffer.settlement_count(), 1);
        assert_eq!(buffer.settlement(&draft.id).unwrap().name, "Renamed");

        assert!(buffer.discard_settlement(&draft.id).is_some());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_export_is_independent() {
        let mut buffer = DraftBuffer::new();
        buffer.queue_tile_patch(Coord::new(0, 0), &TilePatch::new().with_elevation(5));
        let exported = buffer.export_payload();

        buffer.queue_tile_patch(Coord::new(0, 0), &TilePatch::new().with_elevation(9));
        buffer.queue_settlement(camp_draft(2));

        assert_eq!(exported.tiles["0,0"].elevation, Some(5));
        assert!(exported.settlements.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = DraftBuffer::new();
        buffer.queue_settlement(camp_draft(3));
        buffer.queue_tile_patch(Coord::new(1, 1), &TilePatch::new().with_elevation(1));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.export_payload(), DraftPayload::default());
    }

    #[test]
    fn test_payload_wire_shape() {
        let mut buffer = DraftBuffer::new();
        let draft = camp_draft(4);
        buffer.queue_settlement(draft.clone());
        buffer.queue_tile_patch(Coord::new(1, 0), &TilePatch::new().with_biome("Meadow"));

        let value = serde_json::to_value(buffer.export_payload()).unwrap();
        assert_eq!(value["tiles"]["1,0"], json!({"biome": "plains"}));
        assert_eq!(value["settlements"][&draft.id]["tier"], json!("CAMP"));

        let back: DraftPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, buffer.export_payload());
    }
}
