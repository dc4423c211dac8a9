//! Clip-finish transition table.
//!
//! The only place that decides what follows a finished clip, keyed by the
//! current action and the identity of the clip that finished.

use super::{ActionTag, IntroVariant, Side};

/// Identity of a clip played by the action machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipTag {
    Stance,
    Idle,
    Walk,
    BlockIn,
    BlockOut,
    DuckIn,
    DuckHold,
    StandUp,
    Punch(Side),
    Kick,
    Special,
    JumpTuck,
    IntroIn(IntroVariant),
    IntroLoop(IntroVariant),
    VictoryPose(IntroVariant),
    Fall,
}

/// Pose to return to when a strike ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Back to idle through the stance
    Stance,
    /// Back to the held duck pose
    DuckHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stale or purely cosmetic finish
    Ignore,
    /// Strike over: close the damage window, release the lock, resume
    EndStrike { resume: Resume },
    /// Enter transition reached its pose: hold it and release the lock
    Settle,
    /// Stance reached from idle: start the idle loop
    StartIdleLoop,
    /// Intro transition done: start the variant's loop (or one-shot)
    ChainIntroLoop(IntroVariant),
}

/// Next step after `clip` finished while in `action`
pub fn on_clip_finished(action: ActionTag, clip: ClipTag) -> Transition {
    match (action, clip) {
        (ActionTag::Punch(side), ClipTag::Punch(finished)) if side == finished => {
            Transition::EndStrike {
                resume: Resume::Stance,
            }
        }
        (ActionTag::Special, ClipTag::Special) => Transition::EndStrike {
            resume: Resume::Stance,
        },
        (ActionTag::Kick, ClipTag::Kick) => Transition::EndStrike {
            resume: Resume::DuckHold,
        },
        (ActionTag::Block, ClipTag::BlockIn) | (ActionTag::Duck, ClipTag::DuckIn) => {
            Transition::Settle
        }
        (ActionTag::Idle, ClipTag::Stance) => Transition::StartIdleLoop,
        (ActionTag::Intro, ClipTag::IntroIn(variant)) => Transition::ChainIntroLoop(variant),
        _ => Transition::Ignore,
    }
}
