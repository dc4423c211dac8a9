//! Manual physics: gravity, jumping, floor contact, stage bounds and
//! two-body separation. Bodies are cylinders standing on a plane.

use crate::config::PhysicsConfig;
use crate::fighter::Facing;
use glam::Vec3;

/// Root motion state of a fighter. Physics is the only writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    pub facing: Facing,
}

impl Body {
    /// Grounded body at rest, facing the stage centre
    pub fn at(x: f32, floor_y: f32) -> Self {
        Self {
            position: Vec3::new(x, floor_y, 0.0),
            velocity: Vec3::ZERO,
            grounded: true,
            facing: if x > 0.0 { Facing::Left } else { Facing::Right },
        }
    }
}

/// Launch request from the action machine: horizontal direction held at launch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpRequest {
    /// -1, 0 (neutral jump) or 1
    pub direction: f32,
}

/// Advance one body by `dt`.
///
/// `drive` is the horizontal intent (-1..1) when the body may walk this tick,
/// `None` when movement is suppressed (locked, ducking, blocking).
pub fn step(
    body: &mut Body,
    drive: Option<f32>,
    jump: Option<JumpRequest>,
    config: &PhysicsConfig,
    dt: f32,
) {
    match jump {
        Some(request) if body.grounded => {
            body.velocity.y = config.jump_impulse;
            body.velocity.x = request.direction * config.air_speed;
            body.grounded = false;
        }
        _ if body.grounded => {
            body.velocity.x = drive.unwrap_or(0.0) * config.walk_speed;
        }
        _ => {}
    }

    if !body.grounded || body.velocity.y > 0.0 {
        body.velocity.y -= config.gravity * dt;
    }

    body.position += body.velocity * dt;

    // Zero velocity at the bound so the body does not keep pushing into it
    if body.position.x < config.stage_min_x {
        body.position.x = config.stage_min_x;
        body.velocity.x = 0.0;
    } else if body.position.x > config.stage_max_x {
        body.position.x = config.stage_max_x;
        body.velocity.x = 0.0;
    }

    if body.position.y <= config.floor_y && body.velocity.y <= 0.0 {
        body.position.y = config.floor_y;
        body.velocity.y = 0.0;
        body.grounded = true;
    }
}

/// Push two overlapping grounded bodies apart symmetrically around their
/// midpoint. Returns true if they were separated.
pub fn separate(a: &mut Body, b: &mut Body, config: &PhysicsConfig) -> bool {
    if !(a.grounded && b.grounded) {
        return false;
    }
    if (a.position.y - b.position.y).abs() > config.vertical_tolerance {
        return false;
    }

    let min = config.min_separation();
    let dx = b.position.x - a.position.x;
    if dx.abs() >= min {
        return false;
    }

    a.velocity.x = 0.0;
    a.velocity.z = 0.0;
    b.velocity.x = 0.0;
    b.velocity.z = 0.0;

    // Coincident bodies keep their spawn order: a to the left
    let sign = if dx >= 0.0 { 1.0 } else { -1.0 };
    let mid = (a.position.x + b.position.x) * 0.5;
    a.position.x = mid - sign * min * 0.5;
    b.position.x = mid + sign * min * 0.5;

    // Re-clamp by shifting the pair so a body pinned at a bound keeps the gap
    let lo = a.position.x.min(b.position.x);
    let hi = a.position.x.max(b.position.x);
    let shift = if lo < config.stage_min_x {
        config.stage_min_x - lo
    } else if hi > config.stage_max_x {
        config.stage_max_x - hi
    } else {
        0.0
    };
    a.position.x = (a.position.x + shift).clamp(config.stage_min_x, config.stage_max_x);
    b.position.x = (b.position.x + shift).clamp(config.stage_min_x, config.stage_max_x);

    true
}
