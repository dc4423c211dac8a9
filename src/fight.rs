//! One fight: two fighters, at most one projectile, the phase controller and
//! the per-tick ordering that ties them together.
//!
//! Tick order: intents (input or AI) → each fighter's action machine then
//! physics → separation and facing → combat → energy credits → knockout.
//! Combat stops for the rest of the round once a knockout decides it.

use crate::action::{IntroVariant, MachineContext};
use crate::ai::{AiObservation, AiPolicy};
use crate::bone::Rig;
use crate::combat::{resolve_melee, resolve_projectile, HitEvent, Projectile, ProjectileView};
use crate::config::FightConfig;
use crate::error::FightError;
use crate::fighter::{spawn_position, Facing, Fighter, FighterIndex, FighterView, Vitals};
use crate::intent::Intent;
use crate::phase::{FightPhase, PhaseController, SimulationGate};
use crate::physics::{self, Body};
use crate::pose_table::{PoseId, PoseLibrary};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub hits: Vec<HitEvent>,
    pub projectile_spawned: Option<FighterIndex>,
    pub projectile_expired: bool,
    /// Fighter knocked out this tick
    pub ko: Option<FighterIndex>,
}

#[derive(Debug)]
pub struct Fight {
    config: FightConfig,
    poses: PoseLibrary,
    fighters: [Fighter; 2],
    ai: [Option<AiPolicy>; 2],
    projectile: Option<Projectile>,
    phases: PhaseController,
    paused: bool,
    /// Winner, once decided
    outcome: Option<FighterIndex>,
    rng: StdRng,
}

impl Fight {
    pub fn new(config: FightConfig) -> Result<Self, FightError> {
        config.validate()?;
        let poses = PoseLibrary::builtin()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        log::info!(
            "Fight created ({} pose tables, seed {:?})",
            PoseId::COUNT,
            config.seed
        );

        Ok(Self {
            fighters: [
                Fighter::new(FighterIndex::P1, &config),
                Fighter::new(FighterIndex::P2, &config),
            ],
            ai: [None, None],
            projectile: None,
            phases: PhaseController::new(),
            paused: false,
            outcome: None,
            rng,
            poses,
            config,
        })
    }

    pub fn config(&self) -> &FightConfig {
        &self.config
    }

    pub fn phase(&self) -> FightPhase {
        self.phases.phase()
    }

    pub fn gate(&self) -> SimulationGate {
        SimulationGate {
            phase: self.phases.phase(),
            paused: self.paused,
        }
    }

    pub fn fighter(&self, index: FighterIndex) -> &Fighter {
        &self.fighters[index.index()]
    }

    pub fn fighter_mut(&mut self, index: FighterIndex) -> &mut Fighter {
        &mut self.fighters[index.index()]
    }

    pub fn view(&self, index: FighterIndex) -> FighterView {
        self.fighter(index).view()
    }

    pub fn projectile_view(&self) -> Option<ProjectileView> {
        self.projectile.as_ref().map(Projectile::view)
    }

    pub fn outcome(&self) -> Option<FighterIndex> {
        self.outcome
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!("{}", if paused { "Paused" } else { "Resumed" });
        }
        self.paused = paused;
    }

    /// Hand a rig to a fighter; its current pose becomes the rest pose
    pub fn load_rig(&mut self, index: FighterIndex, rig: Rig) {
        let fighter = &mut self.fighters[index.index()];
        fighter.machine.load_rig(rig, &self.poses);
    }

    /// Put a fighter under AI control (or back to host input)
    pub fn set_ai(&mut self, index: FighterIndex, enabled: bool) {
        let slot = &mut self.ai[index.index()];
        if !enabled {
            *slot = None;
            return;
        }
        if slot.is_none() {
            let mut policy = AiPolicy::new(self.config.ai.clone(), self.rng.random());
            policy.set_active(self.phases.phase() == FightPhase::Fight);
            *slot = Some(policy);
        }
    }

    /// Move the round forward and run the entry effects of the new phase.
    /// Returns Ok(false) if the fight is already in that phase.
    pub fn advance_phase(&mut self, next: FightPhase) -> Result<bool, FightError> {
        if !self.phases.advance_to(next)? {
            return Ok(false);
        }

        match next {
            FightPhase::IntroP1 | FightPhase::IntroP2 => {
                let index = if next == FightPhase::IntroP1 {
                    FighterIndex::P1
                } else {
                    FighterIndex::P2
                };
                let variant = self.random_variant();
                self.fighters[index.index()]
                    .machine
                    .begin_intro(variant, &self.poses);
            }
            FightPhase::Fight => self.set_ai_active(true),
            FightPhase::GameOver => self.enter_game_over(),
            _ => {}
        }

        if next >= FightPhase::PreFight {
            for fighter in &mut self.fighters {
                fighter.machine.end_intro(&self.poses);
            }
        }
        Ok(true)
    }

    /// Restore both fighters and return to `Loading`
    pub fn reset_round(&mut self) {
        for fighter in &mut self.fighters {
            fighter.body = Body::at(
                spawn_position(fighter.index, &self.config),
                self.config.physics.floor_y,
            );
            fighter.vitals = Vitals::new(&self.config.vitals);
            fighter.machine.reset(&self.poses);
        }
        self.projectile = None;
        self.outcome = None;
        self.phases.reset();
        self.set_ai_active(false);
        log::info!("Round reset");
    }

    fn set_ai_active(&mut self, active: bool) {
        for policy in self.ai.iter_mut().flatten() {
            policy.set_active(active);
        }
    }

    fn random_variant(&mut self) -> IntroVariant {
        *IntroVariant::ALL
            .choose(&mut self.rng)
            .unwrap_or(&IntroVariant::Wave)
    }

    fn enter_game_over(&mut self) {
        self.set_ai_active(false);
        self.projectile = None;

        if !self.phases.claim_game_over() {
            return;
        }

        let winner = self.outcome.or_else(|| {
            let h1 = self.fighters[0].vitals.health();
            let h2 = self.fighters[1].vitals.health();
            match h1.cmp(&h2) {
                std::cmp::Ordering::Greater => Some(FighterIndex::P1),
                std::cmp::Ordering::Less => Some(FighterIndex::P2),
                std::cmp::Ordering::Equal => None,
            }
        });

        let Some(winner) = winner else {
            log::info!("Game over: draw");
            return;
        };
        self.outcome = Some(winner);
        log::info!("Game over: {:?} wins", winner);

        let variant = self.random_variant();
        self.fighters[winner.index()]
            .machine
            .celebrate(variant, &self.poses);
        self.fighters[winner.opponent().index()]
            .machine
            .defeat(&self.poses);
    }

    /// Advance the fight by one frame. `dt` is clamped to the configured maximum.
    pub fn tick(&mut self, inputs: [Intent; 2], dt: f32) -> TickReport {
        let mut report = TickReport::default();
        if self.paused {
            return report;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_tick_delta)
        } else {
            0.0
        };
        let gate = self.gate();

        let intents = self.collect_intents(inputs, dt);

        for index in FighterIndex::ALL {
            let projectile_in_flight = self.projectile.is_some();
            let fighter = &mut self.fighters[index.index()];
            let ctx = MachineContext {
                dt,
                grounded: fighter.body.grounded,
                facing: fighter.body.facing,
                accept_input: gate.accepts_input(),
                accrue_energy: gate.combat_enabled(),
                projectile_in_flight,
                poses: &self.poses,
            };
            let output = fighter
                .machine
                .update(intents[index.index()], &ctx, &mut fighter.vitals);

            if gate.allows_physics() {
                physics::step(
                    &mut fighter.body,
                    output.drive,
                    output.jump,
                    &self.config.physics,
                    dt,
                );
            }

            if output.launch_special && !projectile_in_flight {
                self.projectile = Some(Projectile::spawn(
                    index,
                    fighter.body.position,
                    fighter.body.facing,
                    &self.config.combat.projectile,
                ));
                report.projectile_spawned = Some(index);
            }
        }

        let [p1, p2] = &mut self.fighters;
        if gate.allows_physics() {
            physics::separate(&mut p1.body, &mut p2.body, &self.config.physics);
        }
        if let Some(facing) = Facing::toward(p1.body.position.x, p2.body.position.x) {
            p1.body.facing = facing;
            p2.body.facing = match facing {
                Facing::Left => Facing::Right,
                Facing::Right => Facing::Left,
            };
        }

        // Once the round is decided nobody can take more damage
        if gate.combat_enabled() && self.outcome.is_none() {
            self.resolve_combat(dt, &mut report);
        }

        for hit in &report.hits {
            let energy = &self.config.energy;
            self.fighters[hit.attacker.index()]
                .vitals
                .gain_energy(energy.per_hit_dealt);
            self.fighters[hit.defender.index()]
                .vitals
                .gain_energy(energy.per_hit_taken);
        }

        if self.outcome.is_none() {
            if let Some(loser) = FighterIndex::ALL
                .into_iter()
                .find(|i| self.fighters[i.index()].vitals.is_knocked_out())
            {
                log::info!("{:?} knocked out", loser);
                self.outcome = Some(loser.opponent());
                self.projectile = None;
                self.fighters[loser.index()].machine.defeat(&self.poses);
                report.ko = Some(loser);
            }
        }

        report
    }

    fn collect_intents(&mut self, inputs: [Intent; 2], dt: f32) -> [Intent; 2] {
        let views = [self.fighters[0].view(), self.fighters[1].view()];
        let mut intents = inputs;

        for index in FighterIndex::ALL {
            let Some(policy) = self.ai[index.index()].as_mut() else {
                continue;
            };
            let observation = AiObservation {
                me: views[index.index()],
                opponent: views[index.opponent().index()],
                melee_range: self.config.combat.melee_range,
                special_cost: self.config.energy.special_cost,
                projectile_in_flight: self.projectile.is_some(),
            };
            intents[index.index()] = policy.tick(dt, &observation);
        }
        intents
    }

    fn resolve_combat(&mut self, dt: f32, report: &mut TickReport) {
        let combat = &self.config.combat;
        let [p1, p2] = &mut self.fighters;
        report.hits.extend(resolve_melee(p1, p2, combat));
        report.hits.extend(resolve_melee(p2, p1, combat));

        let Some(projectile) = self.projectile.as_mut() else {
            return;
        };
        if projectile.advance(dt, &combat.projectile) {
            log::debug!("Projectile from {:?} expired", projectile.owner);
            report.projectile_expired = true;
            self.projectile = None;
            return;
        }

        let defender = &mut self.fighters[projectile.owner.opponent().index()];
        if let Some(hit) = resolve_projectile(projectile, defender, combat) {
            report.hits.push(hit);
            self.projectile = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionTag, Side, Stage};
    use crate::combat::HitKind;

    const DT: f32 = 1.0 / 60.0;

    fn fight_with(config: FightConfig) -> Fight {
        let mut fight = Fight::new(FightConfig {
            seed: Some(7),
            ..config
        })
        .unwrap();
        fight.load_rig(FighterIndex::P1, Rig::canonical());
        fight.load_rig(FighterIndex::P2, Rig::canonical());
        fight.advance_phase(FightPhase::Fight).unwrap();
        fight
    }

    fn place(fight: &mut Fight, x1: f32, x2: f32) {
        fight.fighter_mut(FighterIndex::P1).body.position.x = x1;
        fight.fighter_mut(FighterIndex::P2).body.position.x = x2;
    }

    fn p1(bits: u32) -> [Intent; 2] {
        [Intent::from_bits(bits), Intent::default()]
    }

    #[test]
    fn test_punch_trade_hits_once() {
        let mut fight = fight_with(FightConfig::default());
        place(&mut fight, -0.3, 0.3);

        let mut hits = fight.tick(p1(Intent::PUNCH), DT).hits;
        assert_eq!(
            fight.view(FighterIndex::P1).action,
            ActionTag::Punch(Side::Right)
        );
        for _ in 0..60 {
            hits.extend(fight.tick(p1(0), DT).hits);
        }

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, HitKind::Punch);
        assert_eq!(hits[0].damage, 10);
        assert_eq!(fight.view(FighterIndex::P2).health, 90);
    }

    #[test]
    fn test_out_of_range_punch_misses() {
        let mut fight = fight_with(FightConfig::default());
        place(&mut fight, -1.0, 1.0);
        fight.tick(p1(Intent::PUNCH), DT);
        for _ in 0..60 {
            assert!(fight.tick(p1(0), DT).hits.is_empty());
        }
        assert_eq!(fight.view(FighterIndex::P2).health, 100);
    }

    #[test]
    fn test_blocked_special_is_mitigated() {
        let mut config = FightConfig::default();
        config.vitals.initial_energy = 100;
        let mut fight = fight_with(config);
        place(&mut fight, -1.0, 1.0);

        let report = fight.tick(
            [Intent::from_bits(Intent::SPECIAL), Intent::from_bits(Intent::BLOCK)],
            DT,
        );
        assert_eq!(report.projectile_spawned, Some(FighterIndex::P1));
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Special);
        assert!(fight.view(FighterIndex::P1).energy < 100);

        // A second special is refused while the first is in flight
        let mut hit = None;
        for _ in 0..240 {
            let report = fight.tick(
                [Intent::from_bits(Intent::SPECIAL), Intent::from_bits(Intent::BLOCK)],
                DT,
            );
            assert_eq!(report.projectile_spawned, None);
            if let Some(h) = report.hits.first() {
                hit = Some(*h);
                break;
            }
        }

        let hit = hit.expect("projectile should reach P2");
        assert_eq!(hit.kind, HitKind::Special);
        assert!(hit.blocked);
        assert_eq!(hit.damage, 2);
        assert_eq!(fight.view(FighterIndex::P2).health, 98);
        assert!(fight.projectile_view().is_none());
    }

    #[test]
    fn test_knockout_and_game_over_once() {
        let mut config = FightConfig::default();
        config.combat.punch_damage = 150;
        let mut fight = fight_with(config);
        place(&mut fight, -0.3, 0.3);

        let report = fight.tick(p1(Intent::PUNCH), DT);
        assert_eq!(report.ko, Some(FighterIndex::P2));
        assert_eq!(fight.view(FighterIndex::P2).health, 0);
        assert_eq!(fight.view(FighterIndex::P2).action, ActionTag::Defeat);
        assert_eq!(fight.outcome(), Some(FighterIndex::P1));

        // Keeps ticking without a second knockout
        assert_eq!(fight.tick(p1(0), DT).ko, None);

        assert!(fight.advance_phase(FightPhase::GameOver).unwrap());
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Victory);
        assert!(!fight.advance_phase(FightPhase::GameOver).unwrap());
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Victory);
        assert!(fight.advance_phase(FightPhase::Fight).is_err());

        // No input and no combat after the game is over
        let before = fight.view(FighterIndex::P2).health;
        for _ in 0..120 {
            assert!(fight.tick([Intent::from_bits(Intent::PUNCH); 2], DT).hits.is_empty());
        }
        assert_eq!(fight.view(FighterIndex::P2).health, before);
    }

    #[test]
    fn test_knocked_out_fighter_projectile_is_discarded() {
        let mut config = FightConfig::default();
        config.vitals.initial_energy = 100;
        let mut fight = fight_with(config);
        place(&mut fight, -1.0, 1.0);

        let report = fight.tick([Intent::default(), Intent::from_bits(Intent::SPECIAL)], DT);
        assert_eq!(report.projectile_spawned, Some(FighterIndex::P2));

        fight.fighter_mut(FighterIndex::P2).vitals.take_damage(1000);
        let report = fight.tick([Intent::default(); 2], DT);
        assert_eq!(report.ko, Some(FighterIndex::P2));
        assert_eq!(fight.outcome(), Some(FighterIndex::P1));
        assert!(fight.projectile_view().is_none());

        for _ in 0..240 {
            assert!(fight.tick([Intent::default(); 2], DT).hits.is_empty());
        }
        assert_eq!(fight.view(FighterIndex::P1).health, 100);
    }

    #[test]
    fn test_no_melee_after_knockout() {
        let mut config = FightConfig::default();
        config.combat.punch_damage = 150;
        let mut fight = fight_with(config);
        place(&mut fight, -0.3, 0.3);

        fight.fighter_mut(FighterIndex::P2).vitals.take_damage(1000);
        assert_eq!(fight.tick([Intent::default(); 2], DT).ko, Some(FighterIndex::P2));

        // The winner's strikes no longer register on the fallen fighter
        // and nothing reaches the winner either
        for _ in 0..60 {
            let report = fight.tick([Intent::from_bits(Intent::PUNCH); 2], DT);
            assert!(report.hits.is_empty());
        }
        assert_eq!(fight.view(FighterIndex::P1).health, 100);
    }

    #[test]
    fn test_kick_from_duck_hits_once() {
        let mut fight = fight_with(FightConfig::default());
        place(&mut fight, -0.3, 0.3);
        let kick_damage = fight.config().combat.kick_damage;

        let mut hits = Vec::new();
        for _ in 0..30 {
            hits.extend(fight.tick(p1(Intent::DUCK), DT).hits);
        }
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Duck);
        assert_eq!(fight.fighter(FighterIndex::P1).machine.stage(), Stage::Holding);

        hits.extend(fight.tick(p1(Intent::DUCK | Intent::PUNCH), DT).hits);
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Kick);
        for _ in 0..90 {
            hits.extend(fight.tick(p1(Intent::DUCK), DT).hits);
        }

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, HitKind::Kick);
        assert_eq!(hits[0].damage, kick_damage);
        assert!(!hits[0].blocked);
        assert_eq!(fight.view(FighterIndex::P2).health, 100 - kick_damage);
    }

    #[test]
    fn test_blocked_punch_is_mitigated() {
        let mut fight = fight_with(FightConfig::default());
        place(&mut fight, -0.3, 0.3);
        let block = [Intent::default(), Intent::from_bits(Intent::BLOCK)];

        for _ in 0..10 {
            fight.tick(block, DT);
        }
        assert_eq!(fight.view(FighterIndex::P2).action, ActionTag::Block);

        let mut hits = fight
            .tick([Intent::from_bits(Intent::PUNCH), Intent::from_bits(Intent::BLOCK)], DT)
            .hits;
        for _ in 0..60 {
            hits.extend(fight.tick(block, DT).hits);
        }

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, HitKind::Punch);
        assert!(hits[0].blocked);
        assert_eq!(hits[0].damage, 1);
        assert_eq!(fight.view(FighterIndex::P2).health, 99);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut fight = fight_with(FightConfig::default());
        fight.set_paused(true);
        let before = fight.view(FighterIndex::P1);
        let report = fight.tick(p1(Intent::MOVE_RIGHT | Intent::PUNCH), DT);
        assert_eq!(report, TickReport::default());
        assert_eq!(fight.view(FighterIndex::P1), before);

        fight.set_paused(false);
        fight.tick(p1(Intent::MOVE_RIGHT), DT);
        assert!(fight.view(FighterIndex::P1).position.x > before.position.x);
    }

    #[test]
    fn test_tick_delta_is_clamped() {
        let mut fight = fight_with(FightConfig::default());
        let x0 = fight.view(FighterIndex::P1).position.x;
        fight.tick(p1(Intent::MOVE_RIGHT), 1.0);
        let moved = fight.view(FighterIndex::P1).position.x - x0;
        let expected = fight.config().physics.walk_speed * fight.config().max_tick_delta;
        assert!((moved - expected).abs() < 1e-5);
    }

    #[test]
    fn test_no_input_before_fight() {
        let mut fight = Fight::new(FightConfig::default()).unwrap();
        fight.load_rig(FighterIndex::P1, Rig::canonical());
        let x0 = fight.view(FighterIndex::P1).position.x;
        for _ in 0..10 {
            fight.tick(p1(Intent::MOVE_RIGHT | Intent::PUNCH), DT);
        }
        assert_eq!(fight.view(FighterIndex::P1).position.x, x0);
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Idle);
    }

    #[test]
    fn test_intro_sequence() {
        let mut fight = Fight::new(FightConfig {
            seed: Some(1),
            ..FightConfig::default()
        })
        .unwrap();
        fight.load_rig(FighterIndex::P1, Rig::canonical());
        fight.load_rig(FighterIndex::P2, Rig::canonical());

        fight.advance_phase(FightPhase::IntroStart).unwrap();
        fight.advance_phase(FightPhase::IntroP1).unwrap();
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Intro);
        fight.advance_phase(FightPhase::IntroP2).unwrap();
        assert_eq!(fight.view(FighterIndex::P2).action, ActionTag::Intro);
        for _ in 0..30 {
            fight.tick([Intent::default(); 2], DT);
        }

        fight.advance_phase(FightPhase::PreFight).unwrap();
        assert_eq!(fight.view(FighterIndex::P1).action, ActionTag::Idle);
        assert_eq!(fight.view(FighterIndex::P2).action, ActionTag::Idle);
        assert!(fight.advance_phase(FightPhase::IntroP1).is_err());
    }

    #[test]
    fn test_reset_round() {
        let mut config = FightConfig::default();
        config.combat.punch_damage = 150;
        let mut fight = fight_with(config);
        place(&mut fight, -0.3, 0.3);
        fight.tick(p1(Intent::PUNCH), DT);
        fight.advance_phase(FightPhase::GameOver).unwrap();

        fight.reset_round();
        assert_eq!(fight.phase(), FightPhase::Loading);
        assert_eq!(fight.outcome(), None);
        let p2 = fight.view(FighterIndex::P2);
        assert_eq!(p2.health, p2.max_health);
        assert_eq!(p2.action, ActionTag::Idle);
        assert_eq!(p2.position.x, fight.config().spawn_x);

        // The next round plays its outcome again
        fight.advance_phase(FightPhase::Fight).unwrap();
        place(&mut fight, -0.3, 0.3);
        assert_eq!(fight.tick(p1(Intent::PUNCH), DT).ko, Some(FighterIndex::P2));
    }

    #[test]
    fn test_ai_fight_keeps_invariants() {
        let mut config = FightConfig::default();
        config.energy.per_second = 40.0;
        let mut fight = fight_with(config);
        fight.set_ai(FighterIndex::P1, true);
        fight.set_ai(FighterIndex::P2, true);
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..3000 {
            let dt = rng.random_range(0.005..0.06);
            fight.tick([Intent::default(); 2], dt);

            let physics = &fight.config().physics;
            let (a, b) = (fight.view(FighterIndex::P1), fight.view(FighterIndex::P2));
            for v in [&a, &b] {
                assert!(v.health <= v.max_health);
                assert!(v.energy <= v.max_energy);
                assert!(v.position.x >= physics.stage_min_x && v.position.x <= physics.stage_max_x);
                if v.damage_window {
                    assert!(matches!(v.action, ActionTag::Punch(_) | ActionTag::Kick));
                }
            }
            if a.grounded && b.grounded && (a.position.y - b.position.y).abs() <= physics.vertical_tolerance {
                assert!((a.position.x - b.position.x).abs() >= physics.min_separation() - 1e-4);
            }
            if fight.outcome().is_some() {
                break;
            }
        }
    }
}
