//! Hit detection and damage: melee strikes and the special projectile.

use crate::action::ActionTag;
use crate::config::{CombatConfig, ProjectileConfig};
use crate::fighter::{Facing, Fighter, FighterIndex};
use glam::Vec3;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HitKind {
    Punch,
    Kick,
    Special,
}

/// A registered hit, reported back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitEvent {
    pub kind: HitKind,
    pub attacker: FighterIndex,
    pub defender: FighterIndex,
    /// Damage actually applied (after mitigation and the zero clamp)
    pub damage: u32,
    pub blocked: bool,
}

/// Damage after blocking, rounded to the nearest integer
pub fn mitigate(base: u32, blocking: bool, factor: f32) -> u32 {
    if blocking {
        (base as f32 * factor).round().max(0.0) as u32
    } else {
        base
    }
}

/// Apply a hit to the defender. Returns the event with the damage actually taken.
fn apply_hit(
    kind: HitKind,
    attacker: FighterIndex,
    defender: &mut Fighter,
    base: u32,
    config: &CombatConfig,
) -> HitEvent {
    let blocked = defender.machine.is_blocking();
    let damage = mitigate(base, blocked, config.block_mitigation);
    let taken = defender.vitals.take_damage(damage);
    log::debug!(
        "{:?} hits {:?} with {:?} for {} (blocked: {}), health {}",
        attacker,
        defender.index,
        kind,
        taken,
        blocked,
        defender.vitals.health()
    );

    HitEvent {
        kind,
        attacker,
        defender: defender.index,
        damage: taken,
        blocked,
    }
}

/// Check an open melee damage window against the opponent.
///
/// Registers at most one hit per window: the window is closed on contact.
pub fn resolve_melee(
    attacker: &mut Fighter,
    defender: &mut Fighter,
    config: &CombatConfig,
) -> Option<HitEvent> {
    if !(attacker.is_ready() && defender.is_ready()) {
        return None;
    }
    if !attacker.machine.damage_window() || defender.vitals.is_knocked_out() {
        return None;
    }
    if !(attacker.body.grounded && defender.body.grounded) {
        return None;
    }

    let (kind, base) = match attacker.machine.action() {
        ActionTag::Punch(_) => (HitKind::Punch, config.punch_damage),
        ActionTag::Kick => (HitKind::Kick, config.kick_damage),
        _ => return None,
    };

    let dx = (attacker.body.position.x - defender.body.position.x).abs();
    if dx >= config.melee_range {
        return None;
    }

    attacker.machine.close_damage_window();
    Some(apply_hit(kind, attacker.index, defender, base, config))
}

/// Check the projectile against a fighter; the owner is never hit
pub fn resolve_projectile(
    projectile: &Projectile,
    defender: &mut Fighter,
    config: &CombatConfig,
) -> Option<HitEvent> {
    if projectile.owner == defender.index || !defender.is_ready() {
        return None;
    }
    if defender.vitals.is_knocked_out() || !projectile.hits(defender.body.position, &config.projectile) {
        return None;
    }
    Some(apply_hit(
        HitKind::Special,
        projectile.owner,
        defender,
        config.special_damage,
        config,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectilePhase {
    /// Scaling up at the caster's hands, not yet harmful
    Growing,
    /// Flying along the owner's facing
    Throwing,
    Despawned,
}

/// The special attack's projectile. At most one exists per fight.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub owner: FighterIndex,
    pub direction: f32,
    pub position: Vec3,
    pub scale: f32,
    pub phase: ProjectilePhase,
    pub texture: String,
    /// Seconds spent in the current phase
    elapsed: f32,
}

impl Projectile {
    /// Spawn at the owner's chest height, aimed along its facing
    pub fn spawn(owner: FighterIndex, origin: Vec3, facing: Facing, config: &ProjectileConfig) -> Self {
        let texture = config.textures[owner.index()].clone();
        log::debug!("{:?} launches a projectile ({})", owner, texture);
        Self {
            owner,
            direction: facing.sign(),
            position: origin + Vec3::Y * config.spawn_height,
            scale: config.start_scale,
            phase: ProjectilePhase::Growing,
            texture,
            elapsed: 0.0,
        }
    }

    /// Advance growth or flight. Returns true when the projectile expired this step.
    pub fn advance(&mut self, dt: f32, config: &ProjectileConfig) -> bool {
        match self.phase {
            ProjectilePhase::Growing => {
                self.elapsed += dt;
                let t = (self.elapsed / config.grow_duration).min(1.0);
                self.scale = config.start_scale + (config.full_scale - config.start_scale) * t;
                if self.elapsed >= config.grow_duration {
                    self.phase = ProjectilePhase::Throwing;
                    self.elapsed = 0.0;
                }
                false
            }
            ProjectilePhase::Throwing => {
                self.elapsed += dt;
                self.position.x += self.direction * config.speed * dt;
                if self.elapsed >= config.lifetime {
                    self.phase = ProjectilePhase::Despawned;
                    return true;
                }
                false
            }
            ProjectilePhase::Despawned => false,
        }
    }

    /// Overlap test against a fighter's root position. Only a thrown projectile hits.
    pub fn hits(&self, target: Vec3, config: &ProjectileConfig) -> bool {
        if self.phase != ProjectilePhase::Throwing {
            return false;
        }
        let dx = (self.position.x - target.x).abs();
        let dy = (self.position.y - (target.y + config.spawn_height)).abs();
        dx < config.hit_dx && dy < config.hit_dy
    }

    pub fn view(&self) -> ProjectileView {
        ProjectileView {
            owner: self.owner,
            position: self.position,
            scale: self.scale,
            phase: self.phase,
            texture: self.texture.clone(),
        }
    }
}

/// Render state of the projectile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileView {
    pub owner: FighterIndex,
    pub position: Vec3,
    pub scale: f32,
    pub phase: ProjectilePhase,
    pub texture: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::Rig;
    use crate::config::FightConfig;
    use crate::pose_table::PoseLibrary;

    fn ready_pair(x1: f32, x2: f32) -> (Fighter, Fighter, PoseLibrary) {
        let config = FightConfig::default();
        let poses = PoseLibrary::builtin().unwrap();
        let mut a = Fighter::new(FighterIndex::P1, &config);
        let mut b = Fighter::new(FighterIndex::P2, &config);
        a.machine.load_rig(Rig::canonical(), &poses);
        b.machine.load_rig(Rig::canonical(), &poses);
        a.body.position.x = x1;
        b.body.position.x = x2;
        (a, b, poses)
    }

    #[test]
    fn test_mitigation_rounds() {
        assert_eq!(mitigate(20, true, 0.1), 2);
        assert_eq!(mitigate(10, true, 0.1), 1);
        assert_eq!(mitigate(12, true, 0.1), 1);
        assert_eq!(mitigate(12, false, 0.1), 12);
        assert_eq!(mitigate(10, true, 0.0), 0);
    }

    #[test]
    fn test_no_hit_without_damage_window() {
        let config = CombatConfig::default();
        let (mut a, mut b, _) = ready_pair(-0.3, 0.3);
        assert_eq!(resolve_melee(&mut a, &mut b, &config), None);
        assert_eq!(b.vitals.health(), 100);
    }

    #[test]
    fn test_projectile_grows_then_flies() {
        let config = ProjectileConfig::default();
        let mut p = Projectile::spawn(FighterIndex::P1, Vec3::new(-1.0, 0.0, 0.0), Facing::Right, &config);
        assert_eq!(p.position.y, config.spawn_height);
        assert_eq!(p.texture, "special_p1");

        // Harmless while growing, even on top of the target
        assert!(!p.hits(Vec3::new(-1.0, 0.0, 0.0), &config));

        let mut t = 0.0;
        while p.phase == ProjectilePhase::Growing {
            assert!(!p.advance(0.05, &config));
            t += 0.05;
        }
        assert!(t >= config.grow_duration - 1e-4);
        assert!((p.scale - config.full_scale).abs() < 1e-5);
        assert_eq!(p.position.x, -1.0);

        p.advance(0.1, &config);
        assert!(p.position.x > -1.0);
        assert!(p.hits(p.position - Vec3::Y * config.spawn_height, &config));
        assert!(!p.hits(Vec3::new(p.position.x, 5.0, 0.0), &config));
    }

    #[test]
    fn test_projectile_expires() {
        let config = ProjectileConfig::default();
        let mut p = Projectile::spawn(FighterIndex::P2, Vec3::ZERO, Facing::Left, &config);
        let mut expired = false;
        for _ in 0..200 {
            if p.advance(0.05, &config) {
                expired = true;
                break;
            }
        }
        assert!(expired);
        assert_eq!(p.phase, ProjectilePhase::Despawned);
        assert!(p.position.x < 0.0);
    }

    #[test]
    fn test_projectile_ignores_owner() {
        let config = CombatConfig::default();
        let (mut a, _, _) = ready_pair(0.0, 1.0);
        let mut p = Projectile::spawn(FighterIndex::P1, a.body.position, Facing::Right, &config.projectile);
        p.phase = ProjectilePhase::Throwing;
        assert_eq!(resolve_projectile(&p, &mut a, &config), None);
    }
}
