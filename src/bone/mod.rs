pub mod names;
pub mod id;
pub mod mask;
pub mod pose;
pub mod clip;
pub mod rig;

pub use id::*;
pub use mask::*;
pub use pose::*;
pub use clip::*;
pub use rig::*;
