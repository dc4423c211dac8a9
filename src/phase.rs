//! Fight phase controller and the simulation gate derived from it.

use serde::Serialize;
use thiserror::Error;

/// Round lifecycle, strictly forward within a round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FightPhase {
    #[default]
    Loading,
    IntroStart,
    IntroP1,
    IntroP2,
    PreFight,
    Ready,
    Fight,
    GameOver,
}

impl FightPhase {
    pub const ALL: [FightPhase; 8] = [
        FightPhase::Loading,
        FightPhase::IntroStart,
        FightPhase::IntroP1,
        FightPhase::IntroP2,
        FightPhase::PreFight,
        FightPhase::Ready,
        FightPhase::Fight,
        FightPhase::GameOver,
    ];

    pub fn from_index(index: u8) -> Option<FightPhase> {
        Self::ALL.get(index as usize).copied()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PhaseError {
    #[error("cannot move backwards from {from:?} to {to:?}")]
    Backwards { from: FightPhase, to: FightPhase },
    #[error("game over is terminal until the round is reset")]
    Terminal,
    #[error("unknown phase index {0}")]
    UnknownIndex(u8),
}

#[derive(Debug, Clone, Default)]
pub struct PhaseController {
    phase: FightPhase,
    game_over_claimed: bool,
}

impl PhaseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FightPhase {
        self.phase
    }

    /// Move to `next`. Returns Ok(false) when already there, so entry effects
    /// run at most once per phase. Forward skips are allowed.
    pub fn advance_to(&mut self, next: FightPhase) -> Result<bool, PhaseError> {
        if next == self.phase {
            return Ok(false);
        }
        if self.phase == FightPhase::GameOver {
            return Err(PhaseError::Terminal);
        }
        if next < self.phase {
            return Err(PhaseError::Backwards {
                from: self.phase,
                to: next,
            });
        }
        log::info!("Phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        Ok(true)
    }

    /// True exactly once per round: the first caller handles the outcome
    pub fn claim_game_over(&mut self) -> bool {
        if self.game_over_claimed {
            return false;
        }
        self.game_over_claimed = true;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What the current phase permits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationGate {
    pub phase: FightPhase,
    pub paused: bool,
}

impl SimulationGate {
    /// Physics keeps running after the knockout so a falling body lands
    pub fn allows_physics(&self) -> bool {
        !self.paused && matches!(self.phase, FightPhase::Fight | FightPhase::GameOver)
    }

    pub fn accepts_input(&self) -> bool {
        !self.paused && self.phase == FightPhase::Fight
    }

    pub fn combat_enabled(&self) -> bool {
        !self.paused && self.phase == FightPhase::Fight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        let mut phases = PhaseController::new();
        assert_eq!(phases.advance_to(FightPhase::IntroStart), Ok(true));
        assert_eq!(phases.advance_to(FightPhase::IntroStart), Ok(false));
        assert_eq!(phases.advance_to(FightPhase::Fight), Ok(true));
        assert_eq!(
            phases.advance_to(FightPhase::PreFight),
            Err(PhaseError::Backwards {
                from: FightPhase::Fight,
                to: FightPhase::PreFight
            })
        );
        assert_eq!(phases.advance_to(FightPhase::GameOver), Ok(true));
        assert_eq!(phases.advance_to(FightPhase::GameOver), Ok(false));
        assert_eq!(phases.advance_to(FightPhase::Fight), Err(PhaseError::Terminal));

        phases.reset();
        assert_eq!(phases.phase(), FightPhase::Loading);
    }

    #[test]
    fn test_game_over_claimed_once() {
        let mut phases = PhaseController::new();
        assert!(phases.claim_game_over());
        assert!(!phases.claim_game_over());
        phases.reset();
        assert!(phases.claim_game_over());
    }

    #[test]
    fn test_gate() {
        let gate = SimulationGate {
            phase: FightPhase::GameOver,
            paused: false,
        };
        assert!(gate.allows_physics());
        assert!(!gate.accepts_input());
        assert!(!gate.combat_enabled());

        let gate = SimulationGate {
            phase: FightPhase::Fight,
            paused: true,
        };
        assert!(!gate.allows_physics() && !gate.accepts_input());

        let gate = SimulationGate {
            phase: FightPhase::PreFight,
            paused: false,
        };
        assert!(!gate.allows_physics());
        assert_eq!(FightPhase::from_index(6), Some(FightPhase::Fight));
        assert_eq!(FightPhase::from_index(8), None);
    }
}
