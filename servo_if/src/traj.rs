//! # Outgoing trajectory messages
//!
//! The servo core emits one of these every tick, shaped according to the
//! configured output type.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single point of an outgoing joint trajectory.
///
/// Fields that the servo is not configured to publish are left empty;
/// populated fields always have one value per joint of the movement group.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Time offset of this point from the start of the trajectory.
    ///
    /// Units: seconds
    pub time_from_start_s: f64,

    /// Demanded joint positions.
    #[serde(default)]
    pub positions: Vec<f64>,

    /// Demanded joint velocities.
    #[serde(default)]
    pub velocities: Vec<f64>,

    /// Demanded joint accelerations.
    #[serde(default)]
    pub accelerations: Vec<f64>,
}

/// An outgoing joint trajectory demand.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JointTrajectory {
    /// Wall-clock stamp at publication.
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,

    /// Joint names, in the servo's internal ordering.
    pub joint_names: Vec<String>,

    /// Trajectory points. A single point per tick in normal operation.
    pub points: Vec<TrajectoryPoint>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A flat per-joint demand array, tagged with the quantity it carries so
/// consumers can route it without knowing the publisher's configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JointArray {
    /// Joint position demands.
    ///
    /// Units: radians (or meters for prismatic joints)
    Positions(Vec<f64>),

    /// Joint velocity demands.
    ///
    /// Units: radians/second
    Velocities(Vec<f64>),
}

/// The outgoing command, shaped by the configured output type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ServoCommand {
    /// A full joint trajectory demand.
    Trajectory(JointTrajectory),

    /// A flat array of joint values: positions if positions are published,
    /// otherwise velocities.
    JointArray(JointArray),
}
