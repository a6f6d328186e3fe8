//! # Servo status codes
//!
//! The servo core publishes one of these codes every tick. Warning statuses
//! latch until cleared by the reset telecommand.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The state of the servo core.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ServoStatus {
    /// Nominal operation.
    NoWarning,

    /// The arm is decelerating because it is approaching a kinematic
    /// singularity.
    DecelerateForSingularity,

    /// The arm has been halted because it is too close to a kinematic
    /// singularity.
    HaltForSingularity,

    /// The arm has been halted because the collision monitor demanded a full
    /// stop.
    HaltForCollision,

    /// The arm has been halted because a joint is close to a position limit
    /// and moving towards it.
    JointBound,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoStatus {
    /// The one-byte wire code for this status.
    pub fn as_i8(self) -> i8 {
        match self {
            ServoStatus::NoWarning => 0,
            ServoStatus::DecelerateForSingularity => 1,
            ServoStatus::HaltForSingularity => 2,
            ServoStatus::HaltForCollision => 3,
            ServoStatus::JointBound => 4,
        }
    }

    /// A human readable description of this status.
    pub fn description(self) -> &'static str {
        match self {
            ServoStatus::NoWarning => "No warning",
            ServoStatus::DecelerateForSingularity => "Moving closer to a singularity, decelerating",
            ServoStatus::HaltForSingularity => "Very close to a singularity, halting",
            ServoStatus::HaltForCollision => "Collision detected, halting",
            ServoStatus::JointBound => "Close to a joint position bound, halting",
        }
    }
}

impl Default for ServoStatus {
    fn default() -> Self {
        ServoStatus::NoWarning
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
