//! Computer-controlled opponent.
//!
//! Produces an `Intent` per tick from read-only views of both fighters, the
//! same way a human's input would arrive. Decisions are made on a fixed
//! interval; movement and attacks have their own cooldowns.

use crate::config::AiConfig;
use crate::fighter::FighterView;
use crate::intent::Intent;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What the policy may look at
#[derive(Debug, Clone, Copy)]
pub struct AiObservation {
    pub me: FighterView,
    pub opponent: FighterView,
    pub melee_range: f32,
    pub special_cost: u32,
    pub projectile_in_flight: bool,
}

impl AiObservation {
    fn distance(&self) -> f32 {
        (self.opponent.position.x - self.me.position.x).abs()
    }

    /// -1 or 1 toward the opponent
    fn toward(&self) -> f32 {
        if self.opponent.position.x >= self.me.position.x {
            1.0
        } else {
            -1.0
        }
    }

    fn low_health(&self, fraction: f32) -> bool {
        (self.me.health as f32) <= self.me.max_health as f32 * fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attack {
    Punch,
    Special,
}

#[derive(Debug, Clone)]
pub struct AiPolicy {
    rng: StdRng,
    config: AiConfig,
    active: bool,
    decision_timer: f32,
    move_cooldown: f32,
    attack_cooldown: f32,
    /// Intent held between decisions (pulses cleared every tick)
    held: Intent,
}

impl AiPolicy {
    pub fn new(config: AiConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
            active: false,
            decision_timer: 0.0,
            move_cooldown: 0.0,
            attack_cooldown: 0.0,
            held: Intent::default(),
        }
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            log::debug!("AI {}", if active { "activated" } else { "deactivated" });
        }
        self.active = active;
        if !active {
            self.held = Intent::default();
            self.decision_timer = 0.0;
        }
    }

    /// Intent for this tick
    pub fn tick(&mut self, dt: f32, observation: &AiObservation) -> Intent {
        self.held = self.held.without_pulses();
        if !self.active || !observation.me.ready {
            return Intent::default();
        }

        self.move_cooldown = (self.move_cooldown - dt).max(0.0);
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        self.decision_timer -= dt;
        if self.decision_timer > 0.0 {
            return self.held;
        }
        self.decision_timer = self.config.decision_interval;

        self.held = self.decide(observation);
        self.held
    }

    fn chance(&mut self, probability: f32) -> bool {
        probability > 0.0 && self.rng.random::<f32>() < probability
    }

    fn decide(&mut self, obs: &AiObservation) -> Intent {
        let mut intent = Intent::default();
        let distance = obs.distance();
        let toward = obs.toward();
        let threatened = obs.opponent.is_attacking();
        let cautious = threatened || obs.low_health(self.config.low_health_fraction);

        let block_probability = if threatened && distance < obs.melee_range * 1.5 {
            if cautious {
                self.config.cautious_block_probability
            } else {
                self.config.block_probability
            }
        } else if cautious {
            self.config.predictive_block_probability
        } else {
            0.0
        };
        // A block holds still: no movement or attack on the same decision
        if self.chance(block_probability) {
            intent.block = true;
            return intent;
        }

        let direction = if self.move_cooldown > 0.0 {
            self.held.horizontal()
        } else {
            let direction = if cautious && distance < self.config.safe_distance {
                -toward
            } else if distance > obs.melee_range * 0.8 {
                toward
            } else if self.chance(self.config.circle_probability) {
                -toward
            } else {
                0.0
            };
            if direction != 0.0 {
                self.move_cooldown = self.config.move_cooldown;
            }
            direction
        };
        intent.move_left = direction < 0.0;
        intent.move_right = direction > 0.0;

        if self.chance(self.config.jump_probability) {
            intent.jump = true;
        }

        if self.attack_cooldown <= 0.0 {
            match self.pick_attack(obs, distance) {
                Some(Attack::Punch) => intent.punch = true,
                Some(Attack::Special) => intent.special = true,
                None => {}
            }
            if intent.punch || intent.special {
                self.attack_cooldown = self.config.attack_cooldown;
            }
        }

        intent
    }

    /// Weighted choice among the attacks available, then gated by that attack's probability
    fn pick_attack(&mut self, obs: &AiObservation, distance: f32) -> Option<Attack> {
        let mut options = Vec::with_capacity(2);
        if distance < obs.melee_range {
            options.push((Attack::Punch, self.config.punch_weight));
        }
        if obs.me.energy >= obs.special_cost && !obs.projectile_in_flight {
            options.push((Attack::Special, self.config.special_weight));
        }

        let weights = WeightedIndex::new(options.iter().map(|(_, w)| *w)).ok()?;
        let attack = options[weights.sample(&mut self.rng)].0;
        let probability = match attack {
            Attack::Punch => self.config.punch_probability,
            Attack::Special => self.config.special_probability,
        };
        self.chance(probability).then_some(attack)
    }
}
