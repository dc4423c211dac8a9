//! Per-character runtime state.

use crate::action::{ActionMachine, ActionTag};
use crate::config::{FightConfig, VitalsConfig};
use crate::physics::Body;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FighterIndex {
    P1,
    P2,
}

impl FighterIndex {
    pub const ALL: [FighterIndex; 2] = [FighterIndex::P1, FighterIndex::P2];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn opponent(self) -> FighterIndex {
        match self {
            FighterIndex::P1 => FighterIndex::P2,
            FighterIndex::P2 => FighterIndex::P1,
        }
    }

    pub fn from_index(index: usize) -> Option<FighterIndex> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// -1 for left, 1 for right
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    /// Render yaw (radians) of a model authored facing the camera
    pub fn yaw(self) -> f32 {
        self.sign() * FRAC_PI_2
    }

    /// Facing from one x position toward another; `None` when they coincide
    pub fn toward(from: f32, to: f32) -> Option<Facing> {
        if to > from {
            Some(Facing::Right)
        } else if to < from {
            Some(Facing::Left)
        } else {
            None
        }
    }
}

/// Health and special energy, both integers within [0, max]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    health: u32,
    energy: u32,
    max_health: u32,
    max_energy: u32,
    /// Fractional energy accrued by time, not yet credited
    energy_carry: f32,
}

impl Vitals {
    pub fn new(config: &VitalsConfig) -> Self {
        Self {
            health: config.max_health,
            energy: config.initial_energy.min(config.max_energy),
            max_health: config.max_health,
            max_energy: config.max_energy,
            energy_carry: 0.0,
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn energy(&self) -> u32 {
        self.energy
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn max_energy(&self) -> u32 {
        self.max_energy
    }

    pub fn is_knocked_out(&self) -> bool {
        self.health == 0
    }

    /// Apply damage, never going below zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.health);
        self.health -= taken;
        taken
    }

    pub fn gain_energy(&mut self, amount: u32) {
        self.energy = self.energy.saturating_add(amount).min(self.max_energy);
    }

    /// Accrue fractional energy over time
    pub fn accrue_energy(&mut self, per_second: f32, dt: f32) {
        if per_second <= 0.0 || dt <= 0.0 {
            return;
        }
        self.energy_carry += per_second * dt;
        let whole = self.energy_carry.floor();
        if whole >= 1.0 {
            self.energy_carry -= whole;
            self.gain_energy(whole as u32);
        }
        if self.energy >= self.max_energy {
            self.energy_carry = 0.0;
        }
    }

    /// Spend energy if there is enough
    pub fn try_spend_energy(&mut self, cost: u32) -> bool {
        if self.energy >= cost {
            self.energy -= cost;
            true
        } else {
            false
        }
    }

    pub fn set_energy(&mut self, energy: u32) {
        self.energy = energy.min(self.max_energy);
    }
}

/// One fighter: body (owned by physics), action machine (owns the rig) and vitals
#[derive(Debug, Clone)]
pub struct Fighter {
    pub index: FighterIndex,
    pub body: Body,
    pub machine: ActionMachine,
    pub vitals: Vitals,
}

impl Fighter {
    pub fn new(index: FighterIndex, config: &FightConfig) -> Self {
        Self {
            index,
            body: Body::at(spawn_position(index, config), config.physics.floor_y),
            machine: ActionMachine::new(index, config),
            vitals: Vitals::new(&config.vitals),
        }
    }

    /// A fighter is ready once its rig is loaded
    pub fn is_ready(&self) -> bool {
        self.machine.is_ready()
    }

    pub fn view(&self) -> FighterView {
        FighterView {
            index: self.index,
            ready: self.is_ready(),
            position: self.body.position,
            velocity: self.body.velocity,
            grounded: self.body.grounded,
            facing: self.body.facing,
            action: self.machine.action(),
            in_progress: self.machine.is_locked(),
            damage_window: self.machine.damage_window(),
            blocking: self.machine.is_blocking(),
            ducking: self.machine.is_ducking(),
            health: self.vitals.health(),
            max_health: self.vitals.max_health(),
            energy: self.vitals.energy(),
            max_energy: self.vitals.max_energy(),
            yaw: self.machine.yaw(),
        }
    }
}

/// Spawn x of a fighter: P1 on the left, P2 on the right
pub fn spawn_position(index: FighterIndex, config: &FightConfig) -> f32 {
    match index {
        FighterIndex::P1 => -config.spawn_x,
        FighterIndex::P2 => config.spawn_x,
    }
}

/// Read-only snapshot of a fighter, consumed by the AI and the UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FighterView {
    pub index: FighterIndex,
    pub ready: bool,
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    pub facing: Facing,
    pub action: ActionTag,
    pub in_progress: bool,
    pub damage_window: bool,
    pub blocking: bool,
    pub ducking: bool,
    pub health: u32,
    pub max_health: u32,
    pub energy: u32,
    pub max_energy: u32,
    pub yaw: f32,
}

impl FighterView {
    /// True while the fighter is throwing any attack
    pub fn is_attacking(&self) -> bool {
        matches!(
            self.action,
            ActionTag::Punch(_) | ActionTag::Kick | ActionTag::Special
        )
    }
}
