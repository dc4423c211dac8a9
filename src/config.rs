//! Fight configuration.
//!
//! Every section defaults, so hosts can pass partial JSON and override only
//! what they tune.

use crate::synth::WalkCycle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {}", value)))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be zero or more, got {}", value)))
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be within [0, 1], got {}", value)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub jump_impulse: f32,
    pub walk_speed: f32,
    /// Horizontal speed of a directional jump
    pub air_speed: f32,
    pub floor_y: f32,
    pub stage_min_x: f32,
    pub stage_max_x: f32,
    pub collision_radius: f32,
    /// Max height difference for two bodies to count as side by side
    pub vertical_tolerance: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 18.0,
            jump_impulse: 6.0,
            walk_speed: 1.5,
            air_speed: 1.8,
            floor_y: 0.0,
            stage_min_x: -3.0,
            stage_max_x: 3.0,
            collision_radius: 0.25,
            vertical_tolerance: 0.1,
        }
    }
}

impl PhysicsConfig {
    /// Minimum horizontal distance between two side-by-side grounded bodies
    pub fn min_separation(&self) -> f32 {
        self.collision_radius * 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub start_scale: f32,
    pub full_scale: f32,
    pub grow_duration: f32,
    pub speed: f32,
    /// Seconds of flight after the growing phase
    pub lifetime: f32,
    pub hit_dx: f32,
    pub hit_dy: f32,
    /// Height above the owner's root where the projectile spawns
    pub spawn_height: f32,
    /// Texture reference per fighter (P1, P2)
    pub textures: [String; 2],
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            start_scale: 0.05,
            full_scale: 1.0,
            grow_duration: 0.6,
            speed: 4.0,
            lifetime: 2.0,
            hit_dx: 0.35,
            hit_dy: 0.8,
            spawn_height: 1.0,
            textures: ["special_p1".to_string(), "special_p2".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub melee_range: f32,
    pub punch_damage: u32,
    pub kick_damage: u32,
    pub special_damage: u32,
    /// Fraction of damage a blocking defender still takes
    pub block_mitigation: f32,
    pub projectile: ProjectileConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            melee_range: 0.9,
            punch_damage: 10,
            kick_damage: 12,
            special_damage: 20,
            block_mitigation: 0.1,
            projectile: ProjectileConfig::default(),
        }
    }
}

/// Clip durations and animation tuning (seconds unless noted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub stance_in: f32,
    pub idle_loop: f32,
    pub idle_intensity: f32,
    pub walk_loop: f32,
    pub walk_cycle: WalkCycle,
    pub crossfade: f32,
    pub block_in: f32,
    pub block_out: f32,
    pub block_settle: f32,
    pub duck_in: f32,
    pub duck_hold: f32,
    pub stand_up: f32,
    pub punch: f32,
    pub kick: f32,
    pub special: f32,
    pub jump_tuck: f32,
    pub intro_in: f32,
    pub intro_loop: f32,
    pub intro_intensity: f32,
    pub victory_delay: f32,
    /// Radians per second
    pub victory_turn_rate: f32,
    pub victory_pose: f32,
    pub fall: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stance_in: 0.3,
            idle_loop: 2.4,
            idle_intensity: 1.0,
            walk_loop: 0.9,
            walk_cycle: WalkCycle::default(),
            crossfade: 0.15,
            block_in: 0.15,
            block_out: 0.15,
            block_settle: 0.15,
            duck_in: 0.2,
            duck_hold: 0.1,
            stand_up: 0.3,
            punch: 0.45,
            kick: 0.55,
            special: 0.7,
            jump_tuck: 0.25,
            intro_in: 0.6,
            intro_loop: 1.6,
            intro_intensity: 4.0,
            victory_delay: 1.0,
            victory_turn_rate: 4.0,
            victory_pose: 1.2,
            fall: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub per_second: f32,
    pub per_hit_dealt: u32,
    pub per_hit_taken: u32,
    pub special_cost: u32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            per_second: 5.0,
            per_hit_dealt: 8,
            per_hit_taken: 4,
            special_cost: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    pub max_health: u32,
    pub max_energy: u32,
    pub initial_energy: u32,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            max_energy: 100,
            initial_energy: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub decision_interval: f32,
    pub move_cooldown: f32,
    pub attack_cooldown: f32,
    /// Health fraction below which the cautious profile is used
    pub low_health_fraction: f32,
    /// Distance the cautious profile tries to keep
    pub safe_distance: f32,
    pub punch_weight: f32,
    pub special_weight: f32,
    pub punch_probability: f32,
    pub special_probability: f32,
    pub block_probability: f32,
    pub cautious_block_probability: f32,
    /// Chance of blocking in the cautious profile with no incoming attack
    pub predictive_block_probability: f32,
    pub circle_probability: f32,
    pub jump_probability: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_interval: 0.25,
            move_cooldown: 0.3,
            attack_cooldown: 0.8,
            low_health_fraction: 0.3,
            safe_distance: 1.8,
            punch_weight: 3.0,
            special_weight: 1.0,
            punch_probability: 0.7,
            special_probability: 0.35,
            block_probability: 0.2,
            cautious_block_probability: 0.55,
            predictive_block_probability: 0.2,
            circle_probability: 0.25,
            jump_probability: 0.05,
        }
    }
}

/// Complete configuration of a fight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FightConfig {
    pub physics: PhysicsConfig,
    pub combat: CombatConfig,
    pub timing: TimingConfig,
    pub energy: EnergyConfig,
    pub vitals: VitalsConfig,
    pub ai: AiConfig,
    /// Largest simulated step per tick (seconds)
    pub max_tick_delta: f32,
    /// Fighters spawn at -spawn_x (P1) and +spawn_x (P2)
    pub spawn_x: f32,
    /// RNG seed for AI and intro variants; random when absent
    pub seed: Option<u64>,
}

impl Default for FightConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            combat: CombatConfig::default(),
            timing: TimingConfig::default(),
            energy: EnergyConfig::default(),
            vitals: VitalsConfig::default(),
            ai: AiConfig::default(),
            max_tick_delta: 0.05,
            spawn_x: 1.0,
            seed: None,
        }
    }
}

impl FightConfig {
    /// Parse and validate a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FightConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        positive("physics.gravity", p.gravity)?;
        positive("physics.jump_impulse", p.jump_impulse)?;
        positive("physics.collision_radius", p.collision_radius)?;
        non_negative("physics.walk_speed", p.walk_speed)?;
        non_negative("physics.air_speed", p.air_speed)?;
        if p.stage_min_x >= p.stage_max_x {
            return Err(invalid(
                "physics.stage_min_x",
                format!("must be below stage_max_x ({})", p.stage_max_x),
            ));
        }
        if p.stage_max_x - p.stage_min_x < p.min_separation() {
            return Err(invalid(
                "physics.stage_max_x",
                "stage is narrower than the minimum separation",
            ));
        }

        let spawn = self.spawn_x;
        if !(spawn > 0.0 && -spawn >= p.stage_min_x && spawn <= p.stage_max_x) {
            return Err(invalid(
                "spawn_x",
                format!("must be positive and inside the stage, got {}", spawn),
            ));
        }
        positive("max_tick_delta", self.max_tick_delta)?;

        let c = &self.combat;
        positive("combat.melee_range", c.melee_range)?;
        unit_interval("combat.block_mitigation", c.block_mitigation)?;
        let pr = &c.projectile;
        positive("combat.projectile.full_scale", pr.full_scale)?;
        positive("combat.projectile.grow_duration", pr.grow_duration)?;
        positive("combat.projectile.speed", pr.speed)?;
        positive("combat.projectile.lifetime", pr.lifetime)?;
        positive("combat.projectile.hit_dx", pr.hit_dx)?;
        positive("combat.projectile.hit_dy", pr.hit_dy)?;

        let t = &self.timing;
        for (field, value) in [
            ("timing.stance_in", t.stance_in),
            ("timing.idle_loop", t.idle_loop),
            ("timing.walk_loop", t.walk_loop),
            ("timing.block_in", t.block_in),
            ("timing.block_out", t.block_out),
            ("timing.duck_in", t.duck_in),
            ("timing.duck_hold", t.duck_hold),
            ("timing.stand_up", t.stand_up),
            ("timing.punch", t.punch),
            ("timing.kick", t.kick),
            ("timing.special", t.special),
            ("timing.jump_tuck", t.jump_tuck),
            ("timing.intro_in", t.intro_in),
            ("timing.intro_loop", t.intro_loop),
            ("timing.victory_pose", t.victory_pose),
            ("timing.victory_turn_rate", t.victory_turn_rate),
            ("timing.fall", t.fall),
        ] {
            positive(field, value)?;
        }
        for (field, value) in [
            ("timing.crossfade", t.crossfade),
            ("timing.block_settle", t.block_settle),
            ("timing.victory_delay", t.victory_delay),
            ("timing.idle_intensity", t.idle_intensity),
        ] {
            non_negative(field, value)?;
        }
        non_negative("energy.per_second", self.energy.per_second)?;

        if self.vitals.max_health == 0 {
            return Err(invalid("vitals.max_health", "must be positive"));
        }
        if self.vitals.initial_energy > self.vitals.max_energy {
            return Err(invalid("vitals.initial_energy", "exceeds max_energy"));
        }

        let a = &self.ai;
        positive("ai.decision_interval", a.decision_interval)?;
        for (field, value) in [
            ("ai.move_cooldown", a.move_cooldown),
            ("ai.attack_cooldown", a.attack_cooldown),
            ("ai.punch_weight", a.punch_weight),
            ("ai.special_weight", a.special_weight),
        ] {
            non_negative(field, value)?;
        }
        if a.punch_weight + a.special_weight <= 0.0 {
            return Err(invalid("ai.punch_weight", "attack weights must not both be zero"));
        }
        for (field, value) in [
            ("ai.low_health_fraction", a.low_health_fraction),
            ("ai.punch_probability", a.punch_probability),
            ("ai.special_probability", a.special_probability),
            ("ai.block_probability", a.block_probability),
            ("ai.cautious_block_probability", a.cautious_block_probability),
            ("ai.predictive_block_probability", a.predictive_block_probability),
            ("ai.circle_probability", a.circle_probability),
            ("ai.jump_probability", a.jump_probability),
        ] {
            unit_interval(field, value)?;
        }

        Ok(())
    }
}
