//! Rigfight - Wasm Core
//!
//! Simulation core of a two-character fighting game: procedural clip
//! synthesis, per-character action state machines, physics, combat, AI and
//! the fight phase controller. Rendering and asset loading stay in the host.

pub mod action;
pub mod ai;
pub mod animation;
pub mod bone;
pub mod combat;
pub mod config;
pub mod error;
pub mod fight;
pub mod fighter;
pub mod intent;
pub mod phase;
pub mod physics;
pub mod pose_table;
pub mod state;
pub mod synth;

#[cfg(target_arch = "wasm32")]
mod bindings;

// Re-exports for WASM API
#[cfg(target_arch = "wasm32")]
pub use bindings::{
    bone_rotations, current_clip_json, fighter_view, fighter_yaw, init_core, load_rig, projectile_view, reset_round,
    set_ai, set_paused, set_phase, tick,
};

pub use config::FightConfig;
pub use error::FightError;
pub use fight::{Fight, TickReport};
pub use fighter::{FighterIndex, FighterView};
pub use glam::{Quat, Vec3};
pub use intent::Intent;
pub use phase::FightPhase;

/// Install the panic hook and console logger on wasm; native hosts bring their own logger
pub fn init_logging() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).ok();
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use wasm_bindgen_test::*;
    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_fight_smoke() {
        let mut fight = crate::Fight::new(crate::FightConfig::default()).unwrap();
        fight.load_rig(crate::FighterIndex::P1, crate::bone::Rig::canonical());
        let report = fight.tick([crate::Intent::default(); 2], 0.016);
        assert!(report.hits.is_empty());
    }
}
