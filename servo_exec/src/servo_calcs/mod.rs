//! # Servo calculation core
//!
//! Converts streaming end-effector twist commands or joint jog commands into
//! joint trajectory demands published at a fixed period, honouring kinematic
//! limits, decelerating near singularities, and halting near collisions or
//! joint position limits.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_cartesian;
mod calc_joint;
mod filter;
mod frames;
mod ik;
mod latest_cmd;
mod limits;
mod params;
mod scale;
mod singularity;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use filter::LowPassFilter;
pub use latest_cmd::{CollisionScaleHandle, CommandHandle, JointStateHandle, StopHandle};
pub use params::{CommandInType, CommandOutType, ServoParams};
pub use state::{InputData, OutputData, ServoCalcs, StatusReport};

use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Dimensionality of a Cartesian twist.
pub const NUM_CARTESIAN_DIMS: usize = 6;

/// Time slept between attempts to read a valid joint state.
const JOINT_STATE_RETRY_SLEEP_MS: u64 = 1;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during servo core operation.
#[derive(Debug, Error)]
pub enum ServoError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Stop requested while waiting for a valid joint state")]
    StopRequested,
}

// ---------------------------------------------------------------------------
// TEST SUPPORT
// ---------------------------------------------------------------------------
