//! Per-character action state machine.
//!
//! Serializes mutually exclusive actions behind a single lock, requests clips
//! from the synthesizer and is the only writer of the rig's bone orientations.

pub mod timers;
pub mod transitions;

use crate::animation::{ClipFinished, ClipHandle, Mixer, PlayOptions};
use crate::bone::{Clip, PoseSnapshot, RestPose, Rig};
use crate::config::{EnergyConfig, FightConfig, TimingConfig};
use crate::fighter::{Facing, FighterIndex, Vitals};
use crate::intent::Intent;
use crate::physics::JumpRequest;
use crate::pose_table::{PoseId, PoseLibrary};
use crate::synth::{build_clip, ClipRequest, KeyframeShape, SynthError};
use serde::Serialize;

pub use timers::{TimerKind, Timers};
pub use transitions::{on_clip_finished, ClipTag, Resume, Transition};

/// Yaw error below which the victory turn is complete (radians)
const YAW_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn toggled(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionTag {
    Idle,
    Walk,
    Duck,
    Block,
    Punch(Side),
    Kick,
    Special,
    Jump,
    Intro,
    Victory,
    Defeat,
}

/// Progress through an action with enter and exit transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Entering,
    Holding,
    Exiting,
}

/// Pose variant for intros and victories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IntroVariant {
    Wave,
    ArmsCrossed,
    Bow,
}

impl IntroVariant {
    pub const ALL: [IntroVariant; 3] = [
        IntroVariant::Wave,
        IntroVariant::ArmsCrossed,
        IntroVariant::Bow,
    ];

    pub fn pose(self) -> PoseId {
        match self {
            IntroVariant::Wave => PoseId::Greeting,
            IntroVariant::ArmsCrossed => PoseId::ArmsCrossed,
            IntroVariant::Bow => PoseId::Bow,
        }
    }

    /// Whether the intro loops (the bow plays once)
    pub fn loops(self) -> bool {
        !matches!(self, IntroVariant::Bow)
    }
}

/// Per-tick inputs from the fight
#[derive(Debug, Clone, Copy)]
pub struct MachineContext<'a> {
    pub dt: f32,
    pub grounded: bool,
    pub facing: Facing,
    /// False outside the fight phase: intent is ignored
    pub accept_input: bool,
    pub accrue_energy: bool,
    pub projectile_in_flight: bool,
    pub poses: &'a PoseLibrary,
}

/// What physics and the fight should do with this tick's decision
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionOutput {
    /// Horizontal intent when walking is allowed
    pub drive: Option<f32>,
    pub jump: Option<JumpRequest>,
    pub launch_special: bool,
}

#[derive(Debug, Clone)]
struct LoadedRig {
    rig: Rig,
    rest: RestPose,
}

/// Saved lock state, restored when a requested clip cannot be built
type LockState = (ActionTag, Stage, bool, bool);

#[derive(Debug, Clone)]
pub struct ActionMachine {
    index: FighterIndex,
    timing: TimingConfig,
    energy: EnergyConfig,
    action: ActionTag,
    stage: Stage,
    locked: bool,
    damage_window: bool,
    next_punch: Side,
    airborne: bool,
    walk_scale: f32,
    mixer: Mixer<ClipTag>,
    current: Option<ClipHandle>,
    timers: Timers,
    loaded: Option<LoadedRig>,
    yaw: f32,
    turning: bool,
    victory_variant: Option<IntroVariant>,
    /// Set once victory or defeat has been played this round
    outcome_handled: bool,
}

impl ActionMachine {
    pub fn new(index: FighterIndex, config: &FightConfig) -> Self {
        Self {
            index,
            timing: config.timing.clone(),
            energy: config.energy.clone(),
            action: ActionTag::Idle,
            stage: Stage::Holding,
            locked: false,
            damage_window: false,
            next_punch: Side::Right,
            airborne: false,
            walk_scale: 1.0,
            mixer: Mixer::new(),
            current: None,
            timers: Timers::default(),
            loaded: None,
            yaw: 0.0,
            turning: false,
            victory_variant: None,
            outcome_handled: false,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn action(&self) -> ActionTag {
        self.action
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// True while an uninterruptible action or transition is in progress
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn damage_window(&self) -> bool {
        self.damage_window
    }

    pub fn is_blocking(&self) -> bool {
        self.action == ActionTag::Block && self.stage != Stage::Exiting
    }

    pub fn is_ducking(&self) -> bool {
        self.action == ActionTag::Duck && self.stage != Stage::Exiting
    }

    /// Active melee strike (specials excluded)
    pub fn is_striking(&self) -> bool {
        matches!(self.action, ActionTag::Punch(_) | ActionTag::Kick)
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.is_some()
    }

    /// Render yaw (radians)
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn rig(&self) -> Option<&Rig> {
        self.loaded.as_ref().map(|l| &l.rig)
    }

    pub fn pose(&self) -> Option<PoseSnapshot> {
        self.rig().map(Rig::snapshot)
    }

    /// The clip of the current action, while it is still mixed in
    pub fn current_clip(&self) -> Option<&Clip> {
        self.current.and_then(|handle| self.mixer.clip(handle))
    }

    /// Close the damage window after a registered hit
    pub fn close_damage_window(&mut self) {
        self.damage_window = false;
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Take ownership of a rig; its current pose becomes the rest pose
    pub fn load_rig(&mut self, rig: Rig, poses: &PoseLibrary) {
        let rest = rig.capture_rest();
        self.loaded = Some(LoadedRig { rig, rest });
        self.reset(poses);
    }

    /// Restore the rest pose and idle state (round reset)
    pub fn reset(&mut self, poses: &PoseLibrary) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.rig.reset_to(&loaded.rest);
        }
        self.mixer.stop_all();
        self.timers.clear();
        self.current = None;
        self.action = ActionTag::Idle;
        self.stage = Stage::Holding;
        self.locked = false;
        self.damage_window = false;
        self.next_punch = Side::Right;
        self.airborne = false;
        self.walk_scale = 1.0;
        self.turning = false;
        self.victory_variant = None;
        self.outcome_handled = false;

        if self.is_ready() {
            self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Idle, poses);
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance one tick: timers, intent, landing, clip playback, then pose the rig
    pub fn update(
        &mut self,
        intent: Intent,
        ctx: &MachineContext,
        vitals: &mut Vitals,
    ) -> ActionOutput {
        if ctx.accrue_energy {
            vitals.accrue_energy(self.energy.per_second, ctx.dt);
        }

        for timer in self.timers.advance(ctx.dt) {
            self.on_timer(timer, ctx.poses);
        }

        let output = if ctx.accept_input && self.is_ready() {
            self.handle_intent(intent, ctx, vitals)
        } else {
            ActionOutput::default()
        };

        self.track_landing(ctx);

        for finished in self.mixer.advance(ctx.dt) {
            self.on_clip_finished(finished, ctx.poses);
        }

        self.update_yaw(ctx);
        self.pose_rig();
        output
    }

    fn handle_intent(
        &mut self,
        intent: Intent,
        ctx: &MachineContext,
        vitals: &mut Vitals,
    ) -> ActionOutput {
        let poses = ctx.poses;
        let mut output = ActionOutput::default();

        match self.action {
            ActionTag::Idle | ActionTag::Walk if !self.locked && ctx.grounded => {
                if intent.block {
                    self.begin(ActionTag::Block, Stage::Entering, true, false, ClipTag::BlockIn, poses);
                } else if intent.duck {
                    self.begin(ActionTag::Duck, Stage::Entering, true, false, ClipTag::DuckIn, poses);
                } else if intent.special && self.try_special(ctx, vitals) {
                    output.launch_special = true;
                } else if intent.punch {
                    self.punch(poses);
                } else if intent.jump {
                    if self.begin(ActionTag::Jump, Stage::Holding, false, false, ClipTag::JumpTuck, poses) {
                        output.jump = Some(JumpRequest {
                            direction: intent.horizontal(),
                        });
                    }
                } else {
                    self.locomote(intent.horizontal(), ctx.facing, poses);
                }

                if matches!(self.action, ActionTag::Idle | ActionTag::Walk) {
                    output.drive = Some(intent.horizontal());
                }
            }
            ActionTag::Block if self.stage == Stage::Holding && !intent.block => {
                if self.begin(ActionTag::Block, Stage::Exiting, true, false, ClipTag::BlockOut, poses) {
                    let delay = self.timing.block_out.max(self.timing.block_settle);
                    self.timers.start(TimerKind::BlockSettled, delay);
                }
            }
            ActionTag::Duck if self.stage == Stage::Holding => {
                if !intent.duck {
                    if self.begin(ActionTag::Duck, Stage::Exiting, true, false, ClipTag::StandUp, poses) {
                        self.timers.start(TimerKind::DuckRearm, self.timing.stand_up);
                    }
                } else if intent.punch {
                    self.begin(ActionTag::Kick, Stage::Holding, true, true, ClipTag::Kick, poses);
                }
            }
            _ => {}
        }

        output
    }

    fn punch(&mut self, poses: &PoseLibrary) {
        let side = self.next_punch;
        if self.begin(ActionTag::Punch(side), Stage::Holding, true, true, ClipTag::Punch(side), poses) {
            self.next_punch = side.toggled();
        }
    }

    /// Special cast: refused while a projectile is in flight or energy is short,
    /// before any lock or energy is taken
    fn try_special(&mut self, ctx: &MachineContext, vitals: &mut Vitals) -> bool {
        let cost = self.energy.special_cost;
        if ctx.projectile_in_flight {
            log::debug!("{:?}: special rejected, projectile already in flight", self.index);
            return false;
        }
        if vitals.energy() < cost {
            log::debug!(
                "{:?}: special rejected, energy {} < {}",
                self.index,
                vitals.energy(),
                cost
            );
            return false;
        }
        if !self.begin(ActionTag::Special, Stage::Holding, true, false, ClipTag::Special, ctx.poses) {
            return false;
        }
        vitals.try_spend_energy(cost)
    }

    fn locomote(&mut self, horizontal: f32, facing: Facing, poses: &PoseLibrary) {
        if horizontal != 0.0 {
            // Backing away plays the walk cycle in reverse
            let scale = if horizontal * facing.sign() >= 0.0 { 1.0 } else { -1.0 };
            if self.action == ActionTag::Walk {
                if scale != self.walk_scale {
                    self.walk_scale = scale;
                    if let Some(handle) = self.current {
                        self.mixer.set_time_scale(handle, scale);
                    }
                }
            } else {
                self.walk_scale = scale;
                self.begin(ActionTag::Walk, Stage::Holding, false, false, ClipTag::Walk, poses);
            }
        } else if self.action == ActionTag::Walk {
            self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Idle, poses);
        }
    }

    fn track_landing(&mut self, ctx: &MachineContext) {
        if self.action != ActionTag::Jump {
            self.airborne = false;
            return;
        }
        if !ctx.grounded {
            self.airborne = true;
        } else if self.airborne {
            self.airborne = false;
            self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Stance, ctx.poses);
        }
    }

    fn on_timer(&mut self, timer: TimerKind, poses: &PoseLibrary) {
        match timer {
            TimerKind::BlockSettled
                if self.action == ActionTag::Block && self.stage == Stage::Exiting =>
            {
                self.settle_to_idle(poses);
            }
            TimerKind::DuckRearm if self.action == ActionTag::Duck && self.stage == Stage::Exiting => {
                self.settle_to_idle(poses);
            }
            TimerKind::VictoryTurn if self.action == ActionTag::Victory => {
                self.turning = true;
            }
            _ => {}
        }
    }

    fn settle_to_idle(&mut self, poses: &PoseLibrary) {
        self.action = ActionTag::Idle;
        self.stage = Stage::Holding;
        self.locked = false;
        self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Idle, poses);
    }

    fn on_clip_finished(&mut self, finished: ClipFinished<ClipTag>, poses: &PoseLibrary) {
        if self.current != Some(finished.handle) {
            return;
        }

        match on_clip_finished(self.action, finished.tag) {
            Transition::Ignore => {}
            Transition::EndStrike { resume } => {
                self.damage_window = false;
                match resume {
                    Resume::Stance => {
                        self.action = ActionTag::Idle;
                        self.stage = Stage::Holding;
                        self.locked = false;
                        self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Idle, poses);
                    }
                    Resume::DuckHold => {
                        self.action = ActionTag::Duck;
                        self.stage = Stage::Holding;
                        self.locked = false;
                        self.begin(ActionTag::Duck, Stage::Holding, false, false, ClipTag::DuckHold, poses);
                    }
                }
            }
            Transition::Settle => {
                self.stage = Stage::Holding;
                self.locked = false;
            }
            Transition::StartIdleLoop => {
                self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Idle, poses);
            }
            Transition::ChainIntroLoop(variant) => {
                self.begin(
                    ActionTag::Intro,
                    Stage::Holding,
                    true,
                    false,
                    ClipTag::IntroLoop(variant),
                    poses,
                );
            }
        }
    }

    fn update_yaw(&mut self, ctx: &MachineContext) {
        match self.action {
            ActionTag::Victory => {
                if !self.turning {
                    return;
                }
                let step = self.timing.victory_turn_rate * ctx.dt;
                if self.yaw.abs() <= step.max(YAW_EPSILON) {
                    self.yaw = 0.0;
                    self.turning = false;
                    if let Some(variant) = self.victory_variant {
                        self.begin(
                            ActionTag::Victory,
                            Stage::Holding,
                            true,
                            false,
                            ClipTag::VictoryPose(variant),
                            ctx.poses,
                        );
                    }
                } else {
                    self.yaw -= step * self.yaw.signum();
                }
            }
            ActionTag::Defeat => {}
            _ => self.yaw = ctx.facing.yaw(),
        }
    }

    /// Blend the playing clips over the live pose and write the result back
    fn pose_rig(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            let live = loaded.rig.snapshot();
            let pose = self.mixer.sample(&live);
            loaded.rig.apply(&pose);
        }
    }

    // ------------------------------------------------------------------
    // Phase-driven actions
    // ------------------------------------------------------------------

    /// Play the intro transition, then the variant's loop
    pub fn begin_intro(&mut self, variant: IntroVariant, poses: &PoseLibrary) -> bool {
        if self.action == ActionTag::Intro || self.outcome_handled {
            return false;
        }
        self.timers.clear();
        self.begin(ActionTag::Intro, Stage::Entering, true, false, ClipTag::IntroIn(variant), poses)
    }

    /// Leave the intro for the fight stance
    pub fn end_intro(&mut self, poses: &PoseLibrary) {
        if self.action != ActionTag::Intro {
            return;
        }
        self.action = ActionTag::Idle;
        self.stage = Stage::Holding;
        self.locked = false;
        self.begin(ActionTag::Idle, Stage::Holding, false, false, ClipTag::Stance, poses);
    }

    /// Victory: after a delay, turn to the camera and play the pose once.
    /// Returns false if the outcome was already played this round.
    pub fn celebrate(&mut self, variant: IntroVariant, poses: &PoseLibrary) -> bool {
        if self.outcome_handled {
            return false;
        }
        if !self.begin(ActionTag::Victory, Stage::Entering, true, false, ClipTag::Stance, poses) {
            return false;
        }
        self.outcome_handled = true;
        self.timers.clear();
        self.turning = false;
        self.victory_variant = Some(variant);
        self.timers.start(TimerKind::VictoryTurn, self.timing.victory_delay);
        log::info!("{:?} celebrates ({:?})", self.index, variant);
        true
    }

    /// Defeat: a one-shot fall built from the live pose.
    /// Returns false if the outcome was already played this round.
    pub fn defeat(&mut self, poses: &PoseLibrary) -> bool {
        if self.outcome_handled {
            return false;
        }
        if !self.begin(ActionTag::Defeat, Stage::Holding, true, false, ClipTag::Fall, poses) {
            return false;
        }
        self.outcome_handled = true;
        self.timers.clear();
        self.turning = false;
        log::info!("{:?} is defeated", self.index);
        true
    }

    // ------------------------------------------------------------------
    // Clips
    // ------------------------------------------------------------------

    /// Move to an action and start its clip. If the clip cannot be built the
    /// previous action, stage, lock and damage window are restored.
    fn begin(
        &mut self,
        action: ActionTag,
        stage: Stage,
        lock: bool,
        window: bool,
        tag: ClipTag,
        poses: &PoseLibrary,
    ) -> bool {
        let saved: LockState = (self.action, self.stage, self.locked, self.damage_window);
        self.action = action;
        self.stage = stage;
        self.locked = lock;
        self.damage_window = window;

        match self.start_clip(tag, poses) {
            Ok(_) => true,
            Err(e) => {
                log::warn!(
                    "{:?}: {} - staying in {:?}, lock rolled back",
                    self.index,
                    e,
                    saved.0
                );
                (self.action, self.stage, self.locked, self.damage_window) = saved;
                false
            }
        }
    }

    fn start_clip(&mut self, tag: ClipTag, poses: &PoseLibrary) -> Result<ClipHandle, SynthError> {
        let clip = self.build(tag, poses)?;
        let fade = match tag {
            ClipTag::DuckIn => 0.0,
            _ => self.timing.crossfade,
        };
        let options = if self.loops(tag) {
            PlayOptions::looped(fade)
        } else {
            PlayOptions::once(fade)
        };
        let options = match tag {
            ClipTag::Walk => options.with_time_scale(self.walk_scale),
            _ => options,
        };

        let handle = self.mixer.crossfade_to(clip, tag, options);
        self.current = Some(handle);
        Ok(handle)
    }

    fn loops(&self, tag: ClipTag) -> bool {
        match tag {
            ClipTag::Idle | ClipTag::Walk => true,
            ClipTag::IntroLoop(variant) => variant.loops(),
            _ => false,
        }
    }

    /// Synthesize the clip for a tag. Transitions and strikes start from a
    /// snapshot of the live pose, loops from the rest pose.
    fn build(&self, tag: ClipTag, poses: &PoseLibrary) -> Result<Clip, SynthError> {
        let rest = self.loaded.as_ref().map(|l| &l.rest);
        let live = self.pose();
        let t = &self.timing;
        let name = format!("{:?}:{:?}", self.index, tag);

        let linear = |pose: PoseId, duration: f32| ClipRequest {
            name: &name,
            start: live.as_ref(),
            table: Some(poses.get(pose)),
            rest,
            duration,
            shape: KeyframeShape::Linear,
        };
        let strike = |end: PoseId, prep: PoseId, apex: PoseId, duration: f32| ClipRequest {
            name: &name,
            start: live.as_ref(),
            table: Some(poses.get(end)),
            rest,
            duration,
            shape: KeyframeShape::MultiPhase {
                prep: poses.get(prep),
                apex: poses.get(apex),
            },
        };
        let breathing = |pose: PoseId, duration: f32, intensity: f32| ClipRequest {
            name: &name,
            start: None,
            table: Some(poses.get(pose)),
            rest,
            duration,
            shape: KeyframeShape::PingPong { intensity },
        };

        let request = match tag {
            ClipTag::Stance => linear(PoseId::FightStance, t.stance_in),
            ClipTag::Idle => breathing(PoseId::FightStance, t.idle_loop, t.idle_intensity),
            ClipTag::Walk => ClipRequest {
                name: &name,
                start: None,
                table: Some(poses.get(PoseId::FightStance)),
                rest,
                duration: t.walk_loop,
                shape: KeyframeShape::Procedural(t.walk_cycle),
            },
            ClipTag::BlockIn => linear(PoseId::Block, t.block_in),
            ClipTag::BlockOut => linear(PoseId::FightStance, t.block_out),
            ClipTag::DuckIn => linear(PoseId::Duck, t.duck_in),
            ClipTag::DuckHold => linear(PoseId::Duck, t.duck_hold),
            ClipTag::StandUp => linear(PoseId::FightStance, t.stand_up),
            ClipTag::Punch(Side::Left) => strike(
                PoseId::FightStance,
                PoseId::PunchPrep,
                PoseId::PunchApexLeft,
                t.punch,
            ),
            ClipTag::Punch(Side::Right) => strike(
                PoseId::FightStance,
                PoseId::PunchPrep,
                PoseId::PunchApexRight,
                t.punch,
            ),
            ClipTag::Kick => strike(PoseId::Duck, PoseId::KickPrep, PoseId::KickApex, t.kick),
            ClipTag::Special => strike(
                PoseId::FightStance,
                PoseId::SpecialCharge,
                PoseId::SpecialRelease,
                t.special,
            ),
            ClipTag::JumpTuck => linear(PoseId::JumpTuck, t.jump_tuck),
            ClipTag::IntroIn(variant) => linear(variant.pose(), t.intro_in),
            ClipTag::IntroLoop(variant) => {
                breathing(variant.pose(), t.intro_loop, t.intro_intensity)
            }
            ClipTag::VictoryPose(variant) => linear(variant.pose(), t.victory_pose),
            ClipTag::Fall => linear(PoseId::Fall, t.fall),
        };

        build_clip(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::physics::{self, Body};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const DT: f32 = 1.0 / 60.0;

    struct Harness {
        machine: ActionMachine,
        body: Body,
        vitals: Vitals,
        poses: PoseLibrary,
        physics: PhysicsConfig,
        projectile_in_flight: bool,
    }

    impl Harness {
        fn new() -> Self {
            let config = FightConfig::default();
            let poses = PoseLibrary::builtin().unwrap();
            let mut machine = ActionMachine::new(FighterIndex::P1, &config);
            machine.load_rig(Rig::canonical(), &poses);
            Self {
                machine,
                body: Body::at(-1.0, 0.0),
                vitals: Vitals::new(&config.vitals),
                poses,
                physics: config.physics,
                projectile_in_flight: false,
            }
        }

        fn tick(&mut self, intent: Intent) -> ActionOutput {
            let ctx = MachineContext {
                dt: DT,
                grounded: self.body.grounded,
                facing: self.body.facing,
                accept_input: true,
                accrue_energy: false,
                projectile_in_flight: self.projectile_in_flight,
                poses: &self.poses,
            };
            let output = self.machine.update(intent, &ctx, &mut self.vitals);
            physics::step(&mut self.body, output.drive, output.jump, &self.physics, DT);
            output
        }

        /// Tick with the same intent until the predicate holds (or give up)
        fn tick_until(&mut self, intent: Intent, max_ticks: usize, done: impl Fn(&ActionMachine) -> bool) {
            for _ in 0..max_ticks {
                if done(&self.machine) {
                    return;
                }
                self.tick(intent);
            }
            assert!(done(&self.machine), "condition not reached, action {:?}", self.machine.action());
        }
    }

    fn intent(bits: u32) -> Intent {
        Intent::from_bits(bits)
    }

    #[test]
    fn test_alternating_punches() {
        let mut h = Harness::new();
        let mut sides = Vec::new();

        for _ in 0..3 {
            h.tick(intent(Intent::PUNCH));
            match h.machine.action() {
                ActionTag::Punch(side) => sides.push(side),
                other => panic!("expected a punch, got {:?}", other),
            }
            assert!(h.machine.is_locked());
            assert!(h.machine.damage_window());
            h.tick_until(Intent::default(), 120, |m| m.action() == ActionTag::Idle);
            assert!(!h.machine.damage_window());
        }

        assert_eq!(sides, vec![Side::Right, Side::Left, Side::Right]);
    }

    #[test]
    fn test_punch_refused_while_locked_or_blocking() {
        let mut h = Harness::new();
        h.tick(intent(Intent::PUNCH));
        assert_eq!(h.machine.action(), ActionTag::Punch(Side::Right));
        h.tick(intent(Intent::PUNCH));
        assert_eq!(h.machine.action(), ActionTag::Punch(Side::Right));

        let mut h = Harness::new();
        h.tick(intent(Intent::BLOCK));
        h.tick_until(intent(Intent::BLOCK), 60, |m| m.stage() == Stage::Holding);
        h.tick(intent(Intent::BLOCK | Intent::PUNCH));
        assert_eq!(h.machine.action(), ActionTag::Block);
        assert!(h.machine.is_blocking());
    }

    #[test]
    fn test_duck_kick_stand() {
        let mut h = Harness::new();
        let duck = intent(Intent::DUCK);

        h.tick(duck);
        assert_eq!(h.machine.action(), ActionTag::Duck);
        assert!(h.machine.is_locked());
        h.tick_until(duck, 60, |m| m.stage() == Stage::Holding);
        assert!(!h.machine.is_locked());

        h.tick(intent(Intent::DUCK | Intent::PUNCH));
        assert_eq!(h.machine.action(), ActionTag::Kick);
        assert!(h.machine.damage_window());

        h.tick_until(duck, 120, |m| m.action() != ActionTag::Kick);
        assert_eq!(h.machine.action(), ActionTag::Duck);
        assert_eq!(h.machine.stage(), Stage::Holding);
        assert!(!h.machine.damage_window());

        // Stays ducked while held
        for _ in 0..90 {
            h.tick(duck);
            assert!(h.machine.is_ducking());
        }

        // Release: locked through the stand-up, then idle
        h.tick(Intent::default());
        assert_eq!(h.machine.stage(), Stage::Exiting);
        assert!(h.machine.is_locked());
        h.tick_until(Intent::default(), 60, |m| m.action() == ActionTag::Idle);
        assert!(!h.machine.is_locked());
    }

    #[test]
    fn test_block_exit_settles_then_reevaluates() {
        let mut h = Harness::new();
        h.tick_until(intent(Intent::BLOCK), 60, |m| {
            m.action() == ActionTag::Block && m.stage() == Stage::Holding
        });

        h.tick(Intent::default());
        assert_eq!(h.machine.stage(), Stage::Exiting);
        assert!(!h.machine.is_blocking());

        // Duck held through the settle delay is picked up right after it
        h.tick_until(intent(Intent::DUCK), 60, |m| m.action() == ActionTag::Duck);
    }

    #[test]
    fn test_walk_and_jump() {
        let mut h = Harness::new();
        let output = h.tick(intent(Intent::MOVE_RIGHT));
        assert_eq!(h.machine.action(), ActionTag::Walk);
        assert_eq!(output.drive, Some(1.0));

        h.tick(Intent::default());
        assert_eq!(h.machine.action(), ActionTag::Idle);

        let output = h.tick(intent(Intent::JUMP | Intent::MOVE_LEFT));
        assert_eq!(h.machine.action(), ActionTag::Jump);
        assert!(!h.machine.is_locked());
        assert_eq!(output.jump, Some(JumpRequest { direction: -1.0 }));
        assert!(!h.body.grounded);

        // No second jump in the air
        let output = h.tick(intent(Intent::JUMP));
        assert_eq!(output.jump, None);

        h.tick_until(Intent::default(), 120, |m| m.action() == ActionTag::Idle);
    }

    #[test]
    fn test_special_spends_energy_and_respects_projectile() {
        let mut h = Harness::new();
        h.tick(intent(Intent::SPECIAL));
        assert_eq!(h.machine.action(), ActionTag::Idle, "no energy yet");

        h.vitals.set_energy(100);
        h.projectile_in_flight = true;
        h.tick(intent(Intent::SPECIAL));
        assert_eq!(h.machine.action(), ActionTag::Idle);
        assert_eq!(h.vitals.energy(), 100);

        h.projectile_in_flight = false;
        let output = h.tick(intent(Intent::SPECIAL));
        assert!(output.launch_special);
        assert_eq!(h.machine.action(), ActionTag::Special);
        assert!(!h.machine.damage_window());
        assert_eq!(h.vitals.energy(), 50);
    }

    #[test]
    fn test_lock_rolls_back_without_rig() {
        let config = FightConfig::default();
        let poses = PoseLibrary::builtin().unwrap();
        let mut machine = ActionMachine::new(FighterIndex::P2, &config);

        assert!(!machine.defeat(&poses));
        assert_eq!(machine.action(), ActionTag::Idle);
        assert!(!machine.is_locked());
        assert!(!machine.begin_intro(IntroVariant::Wave, &poses));
        assert!(!machine.is_locked());
    }

    #[test]
    fn test_failed_outcome_can_play_later() {
        let config = FightConfig::default();
        let poses = PoseLibrary::builtin().unwrap();
        let mut machine = ActionMachine::new(FighterIndex::P2, &config);

        assert!(!machine.defeat(&poses));
        assert!(!machine.celebrate(IntroVariant::Bow, &poses));

        // Rig arrives without a round reset
        let rig = Rig::canonical();
        let rest = rig.capture_rest();
        machine.loaded = Some(LoadedRig { rig, rest });

        assert!(machine.defeat(&poses));
        assert_eq!(machine.action(), ActionTag::Defeat);
        assert!(!machine.celebrate(IntroVariant::Bow, &poses));
    }

    #[test]
    fn test_outcome_plays_once() {
        let mut h = Harness::new();
        assert!(h.machine.celebrate(IntroVariant::Bow, &h.poses));
        assert!(!h.machine.celebrate(IntroVariant::Wave, &h.poses));
        assert!(!h.machine.defeat(&h.poses));
        assert_eq!(h.machine.action(), ActionTag::Victory);

        // Delay, turn to the camera, then the pose
        h.tick_until(Intent::default(), 300, |m| m.stage() == Stage::Holding);
        assert_eq!(h.machine.yaw(), 0.0);
    }

    #[test]
    fn test_intro_chain_and_exit() {
        let mut h = Harness::new();
        assert!(h.machine.begin_intro(IntroVariant::Wave, &h.poses));
        assert!(!h.machine.begin_intro(IntroVariant::Bow, &h.poses));
        h.tick_until(Intent::default(), 120, |m| m.stage() == Stage::Holding);
        assert_eq!(h.machine.action(), ActionTag::Intro);
        assert!(h.machine.is_locked());

        h.machine.end_intro(&h.poses);
        assert_eq!(h.machine.action(), ActionTag::Idle);
        assert!(!h.machine.is_locked());
    }

    #[test]
    fn test_mutual_exclusion_under_random_input() {
        let mut h = Harness::new();
        h.vitals.set_energy(100);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..4000 {
            let output = h.tick(intent(rng.random_range(0..128)));
            let m = &h.machine;

            let in_progress = [m.is_blocking(), m.is_ducking(), m.is_striking(), output.jump.is_some()];
            assert!(in_progress.iter().filter(|x| **x).count() <= 1);

            if m.damage_window() {
                assert!(m.is_striking());
            }
            if m.is_striking() || m.action() == ActionTag::Special {
                assert!(m.is_locked());
            }
            if m.is_locked() {
                assert!(!matches!(m.action(), ActionTag::Idle | ActionTag::Walk | ActionTag::Jump));
            }
            if output.launch_special {
                h.vitals.set_energy(100);
            }
        }
    }

    #[test]
    fn test_rig_is_posed_and_reset() {
        let mut h = Harness::new();
        for _ in 0..30 {
            h.tick(Intent::default());
        }
        let posed = h.machine.pose().unwrap();
        assert!(!posed.approx_eq(&PoseSnapshot::identity()));

        h.machine.reset(&h.poses);
        assert!(h.machine.pose().unwrap().approx_eq(&PoseSnapshot::identity()));
    }

    #[test]
    fn test_current_clip_follows_action() {
        let mut h = Harness::new();
        let idle = h.machine.current_clip().unwrap().clone();
        assert!(idle.to_json_string().unwrap().contains("tracks"));

        h.tick(intent(Intent::PUNCH));
        let punch = h.machine.current_clip().unwrap();
        assert_ne!(punch.duration, 0.0);
        assert_ne!(punch, &idle);

        let config = FightConfig::default();
        let bare = ActionMachine::new(FighterIndex::P2, &config);
        assert!(bare.current_clip().is_none());
    }
}
