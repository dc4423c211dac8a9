//! `wasm-bindgen` surface. Thin wrappers over `Fight` through the app state.

use wasm_bindgen::prelude::*;

use crate::bone::Rig;
use crate::config::FightConfig;
use crate::error::FightError;
use crate::fight::Fight;
use crate::fighter::FighterIndex;
use crate::intent::Intent;
use crate::phase::{FightPhase, PhaseError};
use crate::state::{initialize_app_state, with_app_state, with_app_state_mut};

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn fighter_index(fighter: u8) -> Result<FighterIndex, JsValue> {
    FighterIndex::from_index(fighter as usize).ok_or_else(|| to_js(FightError::UnknownFighter(fighter)))
}

fn with_fight<R>(f: impl FnOnce(&Fight) -> R) -> Result<R, JsValue> {
    with_app_state(|app| f(&app.fight)).ok_or_else(|| to_js(FightError::NotInitialized))
}

fn with_fight_mut<R>(f: impl FnOnce(&mut Fight) -> R) -> Result<R, JsValue> {
    with_app_state_mut(|app| f(&mut app.fight)).ok_or_else(|| to_js(FightError::NotInitialized))
}

/// Create the fight from a JSON config (empty string for defaults)
#[wasm_bindgen]
pub fn init_core(config_json: &str) -> Result<(), JsValue> {
    crate::init_logging();

    let config = if config_json.trim().is_empty() {
        FightConfig::default()
    } else {
        FightConfig::from_json(config_json).map_err(to_js)?
    };
    initialize_app_state(config).map_err(to_js)
}

/// Load a rig: bone names, parent indices (-1 for roots) and
/// position/rotation/scale per bone (10 floats each)
#[wasm_bindgen]
pub fn load_rig(
    fighter: u8,
    names: Vec<String>,
    parents: Vec<i32>,
    transforms: Vec<f32>,
) -> Result<(), JsValue> {
    let index = fighter_index(fighter)?;
    let rig = Rig::from_flat(names, &parents, &transforms).map_err(to_js)?;
    with_fight_mut(|fight| fight.load_rig(index, rig))
}

#[wasm_bindgen]
pub fn set_ai(fighter: u8, enabled: bool) -> Result<(), JsValue> {
    let index = fighter_index(fighter)?;
    with_fight_mut(|fight| fight.set_ai(index, enabled))
}

/// Advance the phase (0 = Loading .. 7 = GameOver). Returns false if already there.
#[wasm_bindgen]
pub fn set_phase(phase: u8) -> Result<bool, JsValue> {
    let next = FightPhase::from_index(phase).ok_or_else(|| to_js(PhaseError::UnknownIndex(phase)))?;
    with_fight_mut(|fight| fight.advance_phase(next))?.map_err(to_js)
}

#[wasm_bindgen]
pub fn set_paused(paused: bool) -> Result<(), JsValue> {
    with_fight_mut(|fight| fight.set_paused(paused))
}

/// Advance one frame. Intent bits per fighter, delta in milliseconds.
#[wasm_bindgen]
pub fn tick(p1_bits: u32, p2_bits: u32, dt_ms: f32) -> Result<JsValue, JsValue> {
    let inputs = [Intent::from_bits(p1_bits), Intent::from_bits(p2_bits)];
    let report = with_fight_mut(|fight| fight.tick(inputs, dt_ms / 1000.0))?;
    serde_wasm_bindgen::to_value(&report).map_err(to_js)
}

#[wasm_bindgen]
pub fn fighter_view(fighter: u8) -> Result<JsValue, JsValue> {
    let index = fighter_index(fighter)?;
    let view = with_fight(|fight| fight.view(index))?;
    serde_wasm_bindgen::to_value(&view).map_err(to_js)
}

/// Projectile render state, or null
#[wasm_bindgen]
pub fn projectile_view() -> Result<JsValue, JsValue> {
    let view = with_fight(|fight| fight.projectile_view())?;
    serde_wasm_bindgen::to_value(&view).map_err(to_js)
}

/// Local rotations (x, y, z, w) per rig bone, in rig order
#[wasm_bindgen]
pub fn bone_rotations(fighter: u8) -> Result<Vec<f32>, JsValue> {
    let index = fighter_index(fighter)?;
    with_fight(|fight| {
        fight
            .fighter(index)
            .machine
            .rig()
            .map(Rig::rotations_flat)
            .unwrap_or_default()
    })
}

/// JSON of the fighter's current clip (Euler degrees per key), or None
#[wasm_bindgen]
pub fn current_clip_json(fighter: u8) -> Result<Option<String>, JsValue> {
    let index = fighter_index(fighter)?;
    with_fight(|fight| {
        fight
            .fighter(index)
            .machine
            .current_clip()
            .map(|clip| clip.to_json_string())
            .transpose()
    })?
    .map_err(to_js)
}

#[wasm_bindgen]
pub fn fighter_yaw(fighter: u8) -> Result<f32, JsValue> {
    let index = fighter_index(fighter)?;
    with_fight(|fight| fight.fighter(index).machine.yaw())
}

#[wasm_bindgen]
pub fn reset_round() -> Result<(), JsValue> {
    with_fight_mut(Fight::reset_round)
}
