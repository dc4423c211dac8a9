use crate::bone::RigError;
use crate::config::ConfigError;
use crate::phase::PhaseError;
use crate::pose_table::PoseLoadError;
use thiserror::Error;

/// Setup and host-facing errors. Nothing inside a tick produces one.
#[derive(Debug, Error)]
pub enum FightError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rig(#[from] RigError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    PoseLoad(#[from] PoseLoadError),
    #[error("unknown fighter index {0}")]
    UnknownFighter(u8),
    #[error("core not initialized, call init_core first")]
    NotInitialized,
}
