//! WebAssembly bindings for the tileworld editing core.
//!
//! Every value crossing the boundary is a JSON string.

use wasm_bindgen::prelude::*;

use crate::actions::EditAction;
use crate::coord::Coord;
use crate::movement::{Actor, MoveOptions};
use crate::patch::TilePatch;
use crate::session::{EditorSession, SessionConfig};
use crate::settlement::SettlementTier;
use serde::Serialize;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

fn from_json<'a, T: serde::Deserialize<'a>>(text: &'a str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(text).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Editing session exposed to JavaScript
#[wasm_bindgen]
pub struct WasmEditor {
    session: EditorSession,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Load a world from its JSON wire shape. `config_json` may be empty.
    #[wasm_bindgen(constructor)]
    pub fn new(world_json: &str, config_json: &str) -> Result<WasmEditor, JsValue> {
        let world: serde_json::Value = from_json(world_json, "world JSON")?;
        let config = if config_json.trim().is_empty() {
            SessionConfig::default()
        } else {
            from_json(config_json, "config JSON")?
        };
        let session = EditorSession::load(&world, config)
            .map_err(|e| JsValue::from_str(&format!("Load failed: {}", e)))?;
        Ok(WasmEditor { session })
    }

    /// The world in its wire shape
    #[wasm_bindgen(js_name = getWorld)]
    pub fn get_world(&self) -> Result<String, JsValue> {
        let value = self
            .session
            .world()
            .to_value()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_json(&value)
    }

    /// The tier catalog as `[{tier, size, npcs}]`
    #[wasm_bindgen(js_name = getTiers)]
    pub fn get_tiers(&self) -> Result<String, JsValue> {
        let tiers: Vec<_> = SettlementTier::catalog()
            .iter()
            .map(|t| serde_json::json!({"tier": t.tier, "size": t.size, "npcs": t.npcs}))
            .collect();
        to_json(&tiers)
    }

    /// Evaluate a step; returns the step JSON or throws the denial reason
    #[wasm_bindgen(js_name = evaluateStep)]
    pub fn evaluate_step(
        &self,
        x: i32,
        y: i32,
        direction: &str,
        actor_json: &str,
        options_json: &str,
    ) -> Result<String, JsValue> {
        let actor: Actor = from_json(actor_json, "actor JSON")?;
        let options: MoveOptions = from_json(options_json, "options JSON")?;
        let step = self
            .session
            .evaluate_step(&actor, Coord::new(x, y), direction, &options)
            .map_err(|denial| JsValue::from_str(denial.reason()))?;
        to_json(&step)
    }

    /// Check a footprint; returns the canonical tier or throws the denial reason
    #[wasm_bindgen(js_name = canPlace)]
    pub fn can_place(&self, x: i32, y: i32, tier: &str) -> Result<String, JsValue> {
        self.session
            .can_place(x, y, tier)
            .map(|tier| tier.as_str().to_string())
            .map_err(|denial| JsValue::from_str(denial.reason()))
    }

    /// Place a settlement; returns the draft JSON
    #[wasm_bindgen(js_name = placeSettlement)]
    pub fn place_settlement(
        &mut self,
        x: i32,
        y: i32,
        tier: &str,
        name: Option<String>,
    ) -> Result<String, JsValue> {
        let draft = self
            .session
            .place_settlement(x, y, tier, name.as_deref())
            .map_err(|e| JsValue::from_str(e.reason()))?;
        to_json(&draft)
    }

    #[wasm_bindgen(js_name = paintTile)]
    pub fn paint_tile(&mut self, x: i32, y: i32, patch_json: &str) -> Result<(), JsValue> {
        let patch: TilePatch = from_json(patch_json, "tile patch")?;
        self.session
            .paint_tile(Coord::new(x, y), patch)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = beginBatch)]
    pub fn begin_batch(&mut self, kind: &str) -> Result<(), JsValue> {
        self.session
            .begin_batch(kind)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns the number of committed operations (0 when nothing was committed)
    #[wasm_bindgen(js_name = commitBatch)]
    pub fn commit_batch(&mut self) -> usize {
        self.session.commit_batch().unwrap_or(0)
    }

    #[wasm_bindgen(js_name = abortBatch)]
    pub fn abort_batch(&mut self) -> Result<bool, JsValue> {
        self.session
            .abort_batch()
            .map(|batch| batch.is_some())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns false when there was nothing to undo
    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.session
            .undo()
            .map(|batch| batch.is_some())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns false when there was nothing to redo
    pub fn redo(&mut self) -> Result<bool, JsValue> {
        self.session
            .redo()
            .map(|batch| batch.is_some())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.history().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.history().can_redo()
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: EditAction = from_json(action_json, "action JSON")?;
        match self.session.apply_action(action) {
            Ok(events) => to_json(&events),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// The pending draft payload
    #[wasm_bindgen(js_name = exportPayload)]
    pub fn export_payload(&self) -> Result<String, JsValue> {
        to_json(&self.session.export_payload())
    }

    /// Call after the payload was saved
    #[wasm_bindgen(js_name = clearDraft)]
    pub fn clear_draft(&mut self) {
        self.session.clear_draft();
    }
}
