//! Parameters structure for the arm kinematic model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters defining the arm's serial kinematic chain.
#[derive(Debug, Deserialize)]
pub struct Params {
    /// Name of the chain's root link, the frame all kinematics are expressed
    /// in.
    pub root_link: String,

    /// The joints of the chain, ordered from the root outwards.
    pub joints: Vec<JointParams>,

    /// The configuration the arm starts in.
    ///
    /// Units: radians (or meters for prismatic joints). Defaults to all
    /// zeros.
    #[serde(default)]
    pub home_position: Option<Vec<f64>>,
}

/// Parameters of a single joint of the chain.
#[derive(Debug, Deserialize)]
pub struct JointParams {
    /// Joint name, as used in incoming jog and joint-state messages.
    pub name: String,

    /// Name of the link attached to this joint's output.
    pub child_link: String,

    /// Translation of the joint frame in the parent link frame.
    ///
    /// Units: meters
    pub origin_xyz: [f64; 3],

    /// Fixed rotation of the joint frame in the parent link frame.
    ///
    /// Units: radians (roll, pitch, yaw)
    #[serde(default)]
    pub origin_rpy: [f64; 3],

    /// Axis of motion in the joint frame. Does not have to be normalised.
    pub axis: [f64; 3],

    /// Kind of joint motion.
    #[serde(default)]
    pub kind: JointKind,

    /// Position limits (min, max).
    #[serde(default)]
    pub position_limits: Option<[f64; 2]>,

    /// Velocity limits (min, max).
    #[serde(default)]
    pub velocity_limits: Option<[f64; 2]>,

    /// Acceleration limits (min, max).
    #[serde(default)]
    pub acceleration_limits: Option<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The kind of motion a joint performs about/along its axis.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Revolute,
    Prismatic,
}

impl Default for JointKind {
    fn default() -> Self {
        JointKind::Revolute
    }
}
