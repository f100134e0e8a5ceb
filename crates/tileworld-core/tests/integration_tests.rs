//! Integration tests for the tileworld editing core.
//!
//! These tests drive complete editing flows through `EditorSession`, from
//! loading raw JSON to exporting the draft.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tileworld_core::*;

fn seeded() -> SessionConfig {
    SessionConfig {
        seed: Some(7),
        ..SessionConfig::default()
    }
}

/// A 6x4 world mixing every tile shape the loader accepts
fn raw_world() -> Value {
    json!({
        "width": 6,
        "height": 4,
        "tiles": [
            ["plains", "Grassland", {"type": "forest", "elev": "2"}, "ocean", "ocean", "ocean"],
            ["plains", {"biome": "Mountains", "elevation": 9}, "plains", "sea", "ocean", "ocean"],
            [{"terrain": "desert", "tags": "dry"}, "plains", null, "ocean", "ocean", "ocean"],
            [7, "plains", "plains", {"t": "Beach", "notes": "landing"}, "ocean", "ocean"]
        ],
        "layers": {
            "roads": {"paths": [[[0, 1], [1, 1]]], "bridges": []},
            "movement": {"blockedFor": {"land": [[2, 1]]}, "requires": {"boat": [[3, 0], [3, 1]]}}
        }
    })
}

fn load() -> EditorSession {
    EditorSession::load(&raw_world(), seeded()).unwrap()
}

#[test]
fn test_load_canonicalizes_every_shape() {
    let session = load();
    let world = session.world();
    let biome_at = |x, y| world.tile(Coord::new(x, y)).unwrap().biome.as_str().to_string();

    assert_eq!(biome_at(1, 0), "plains");
    assert_eq!(biome_at(2, 0), "forest");
    assert_eq!(world.tile(Coord::new(2, 0)).unwrap().elevation, 2);
    assert_eq!(biome_at(1, 1), "mountain");
    assert_eq!(biome_at(0, 2), "desert");
    assert_eq!(world.tile(Coord::new(0, 2)).unwrap().tags, vec!["dry".to_string()]);
    assert_eq!(biome_at(2, 2), "void");
    assert_eq!(biome_at(0, 3), "7");
    assert_eq!(biome_at(3, 3), "coast");
    assert_eq!(world.tile(Coord::new(3, 3)).unwrap().extra["notes"], json!("landing"));
}

#[test]
fn test_loaded_world_reexports_and_reloads() {
    let session = load();
    let exported = session.world().to_value().unwrap();
    let reloaded = World::from_value(&exported).unwrap();
    assert_eq!(&reloaded, session.world());
}

#[test]
fn test_ragged_world_is_rejected() {
    let raw = json!({"tiles": [["plains", "plains"], ["plains"]]});
    assert!(matches!(
        EditorSession::load(&raw, seeded()),
        Err(EditError::World(WorldError::Shape(ShapeError::Ragged { .. })))
    ));
}

// ==================== Movement ====================

#[test]
fn test_blocked_then_road_scenario() {
    let mut world = World::filled(2, 2, "plains");
    world.tile_mut(Coord::new(1, 0)).unwrap().flags.blocked = true;
    let actor = Actor::default();
    let options = MoveOptions::default();

    assert_eq!(
        evaluate_step(&world, &actor, Coord::new(0, 0), "E", &options),
        Err(MoveDenial::Blocked)
    );

    world.add_road_path(vec![Coord::new(1, 0)]);
    let step = evaluate_step(&world, &actor, Coord::new(0, 0), "E", &options).unwrap();
    assert_eq!((step.to.x, step.to.y), (1, 0));
    assert_eq!(step.to.biome, "plains");
    assert_eq!(step.cost.stamina, 1);
}

#[test]
fn test_route_through_loaded_world() {
    let session = load();
    let walker = Actor::default();

    // Along the road over the mountain, then into a blocked tile
    let route = session.evaluate_route(&walker, Coord::new(0, 0), ["S", "E", "E"], &MoveOptions::default());
    assert_eq!(route.steps.len(), 2);
    assert_eq!(route.end, Coord::new(1, 1));
    assert_eq!(route.stamina, 2);
    let stop = route.stopped.unwrap();
    assert_eq!(stop.index, 2);
    assert_eq!(stop.reason, MoveDenial::Blocked);

    // Boat tiles need a boat
    let denied = session.evaluate_step(&walker, Coord::new(2, 0), "east", &MoveOptions::default());
    assert_eq!(denied, Err(MoveDenial::NeedBoat));
    let sailor = Actor {
        boat: true,
        climb: false,
    };
    assert!(session
        .evaluate_step(&sailor, Coord::new(2, 0), "east", &MoveOptions::default())
        .is_ok());
}

#[test]
fn test_noclip_ignores_every_rule() {
    let session = load();
    let options = MoveOptions::noclip();
    for from in [Coord::new(1, 0), Coord::new(2, 0), Coord::new(0, 0)] {
        for direction in Direction::ALL {
            let step = session
                .evaluate_step(&Actor::default(), from, direction.token(), &options)
                .unwrap();
            assert_eq!(step.why, AllowReason::Noclip);
        }
    }
}

// ==================== Settlements ====================

#[test]
fn test_all_ocean_rejects_hamlet() {
    let session = EditorSession::new(World::filled(4, 4, "ocean"), seeded());
    assert_eq!(session.can_place(0, 0, "HAMLET"), Err(PlacementDenial::Unsuitable));
}

#[test]
fn test_place_edit_undo_export_flow() {
    let mut session = load();

    // Coast tile makes the otherwise watery footprint suitable
    assert_eq!(session.can_place(3, 2, "HAMLET"), Ok(SettlementTier::Hamlet));
    assert_eq!(session.can_place(4, 0, "HAMLET"), Err(PlacementDenial::Unsuitable));

    let hamlet = session.place_settlement(3, 2, "HAMLET", Some("Saltmarsh")).unwrap();
    assert_eq!(hamlet.bounds, Rect::new(3, 2, 2, 2));
    assert_eq!(
        session.place_settlement(4, 3, "CAMP", None).unwrap_err().reason(),
        "Overlap"
    );

    session.begin_batch("terraform").unwrap();
    session
        .paint_tile(Coord::new(0, 0), TilePatch::new().with_biome("swamp"))
        .unwrap();
    session
        .paint_tile(Coord::new(1, 0), TilePatch::new().with_elevation(3))
        .unwrap();
    assert_eq!(session.commit_batch(), Some(2));

    // Undo the terraform batch, then redo it
    session.undo().unwrap();
    assert_eq!(session.world().tile(Coord::new(0, 0)).unwrap().biome, "plains");
    session.redo().unwrap();
    assert_eq!(session.world().tile(Coord::new(0, 0)).unwrap().biome, "swamp");

    let payload = session.export_payload();
    assert_eq!(payload.settlements.len(), 1);
    assert_eq!(payload.settlements[&hamlet.id].name, "Saltmarsh");
    // Four footprint tiles plus the two painted tiles
    assert_eq!(payload.tiles.len(), 6);
    assert_eq!(payload.tiles["0,0"].biome.as_ref().unwrap(), &"swamp");

    let wire = serde_json::to_value(&payload).unwrap();
    assert_eq!(wire["settlements"][&hamlet.id]["tier"], json!("HAMLET"));
    assert_eq!(wire["tiles"]["3,2"]["settlement"], json!(hamlet.id));

    session.clear_draft();
    assert!(session.export_payload().is_empty());
    assert!(!session.history().can_undo());
    assert!(session.world().settlement(&hamlet.id).is_some());
}

#[test]
fn test_new_edit_discards_redo() {
    let mut session = load();
    session
        .paint_tile(Coord::new(0, 0), TilePatch::new().with_elevation(1))
        .unwrap();
    session.undo().unwrap();
    assert!(session.history().can_redo());

    session
        .paint_tile(Coord::new(1, 0), TilePatch::new().with_elevation(1))
        .unwrap();
    assert!(!session.history().can_redo());
    assert!(session.redo().unwrap().is_none());
}

#[test]
fn test_bounded_history_scenario() {
    let config = SessionConfig {
        max_history: 2,
        seed: Some(1),
    };
    let mut session = EditorSession::new(World::filled(1, 1, "plains"), config);
    for (kind, elevation) in [("A", 1), ("B", 2), ("C", 3)] {
        session.begin_batch(kind).unwrap();
        session
            .paint_tile(Coord::new(0, 0), TilePatch::new().with_elevation(elevation))
            .unwrap();
        session.commit_batch();
    }

    let kinds: Vec<String> = session.history().undo_stack().map(|b| b.kind.clone()).collect();
    assert_eq!(kinds, vec!["B".to_string(), "C".to_string()]);

    assert_eq!(session.undo().unwrap().unwrap().kind, "C");
    assert_eq!(session.undo().unwrap().unwrap().kind, "B");
    assert!(session.undo().unwrap().is_none());
    assert_eq!(session.world().tile(Coord::new(0, 0)).unwrap().elevation, 1);
}

// ==================== Actions ====================

#[test]
fn test_script_of_actions() {
    let mut session = load();
    let script = json!([
        {"action": "begin_batch", "kind": "paint"},
        {"action": "paint_tile", "at": [0, 3], "patch": {"biome": "Snow"}},
        {"action": "commit_batch"},
        {"action": "place_settlement", "x": 0, "y": 0, "tier": "camp", "name": "Outpost"},
        {"action": "undo"},
        {"action": "export_draft"}
    ]);
    let actions: Vec<EditAction> = serde_json::from_value(script).unwrap();

    let mut events = Vec::new();
    for action in actions {
        events.extend(session.apply_action(action).unwrap());
    }

    assert_eq!(events.len(), 6);
    assert!(matches!(&events[3], EditEvent::SettlementPlaced { name, .. } if name == "Outpost"));
    assert_eq!(
        events[4],
        EditEvent::Undone {
            kind: "place_settlement".to_string(),
            ops: 2
        }
    );
    let EditEvent::DraftExported { payload } = &events[5] else {
        panic!("expected draft export");
    };
    assert!(payload.settlements.is_empty());
    assert_eq!(payload.tiles["0,3"].biome.as_ref().unwrap(), &"tundra");
    assert!(session.world().settlements().is_empty());
}
