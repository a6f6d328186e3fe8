//! # Streaming servo commands
//!
//! Messages streamed into the servo executable: Cartesian twist commands,
//! joint jog commands, and measured joint states.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A stamped Cartesian twist command for the end effector.
///
/// In `unitless` mode each component shall be in [-1, 1]; in `speed_units`
/// mode the components are in meters/second and radians/second.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TwistCmd {
    /// Wall-clock stamp of the command. An unstamped command inherits the
    /// stamp of the previous one on arrival.
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,

    /// Name of the frame the twist is expressed in. An empty string is
    /// interpreted as the configured command frame.
    #[serde(default)]
    pub frame_id: String,

    /// Linear velocity components (x, y, z).
    pub linear: [f64; 3],

    /// Angular velocity components (x, y, z).
    pub angular: [f64; 3],
}

/// A stamped joint jog command: per-joint velocity targets.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JointJogCmd {
    /// Wall-clock stamp of the command. An unstamped command inherits the
    /// stamp of the previous one on arrival.
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,

    /// Names of the jogged joints.
    pub joint_names: Vec<String>,

    /// Velocity target for each named joint.
    ///
    /// Units: radians/second in `speed_units` mode, [-1, 1] in `unitless`
    /// mode.
    pub velocities: Vec<f64>,
}

/// A measured joint state from the robot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JointState {
    /// Wall-clock stamp of the measurement.
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,

    /// Joint names, in the sender's ordering.
    pub names: Vec<String>,

    /// Measured position of each joint.
    ///
    /// Units: radians (or meters for prismatic joints)
    pub positions: Vec<f64>,

    /// Measured velocity of each joint.
    ///
    /// Units: radians/second (or meters/second for prismatic joints)
    pub velocities: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TwistCmd {
    /// True if any component of the twist is non-zero.
    pub fn is_nonzero(&self) -> bool {
        self.linear
            .iter()
            .chain(self.angular.iter())
            .any(|&c| c != 0.0)
    }

    /// True if any component of the twist is NaN.
    pub fn has_nan(&self) -> bool {
        self.linear
            .iter()
            .chain(self.angular.iter())
            .any(|c| c.is_nan())
    }
}

impl JointJogCmd {
    /// True if any velocity target is non-zero.
    pub fn is_nonzero(&self) -> bool {
        self.velocities.iter().any(|&v| v != 0.0)
    }

    /// True if any velocity target is NaN.
    pub fn has_nan(&self) -> bool {
        self.velocities.iter().any(|v| v.is_nan())
    }
}

impl JointState {
    /// Create a zeroed joint state for the given joint names.
    pub fn zeroed(names: Vec<String>) -> Self {
        let num_joints = names.len();
        Self {
            stamp: None,
            names,
            positions: vec![0.0; num_joints],
            velocities: vec![0.0; num_joints],
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
