//! # Kinematic model capability interfaces
//!
//! The servo core never talks to a robot description directly. It consults a
//! `KinematicModel` for Jacobians, joint bounds and frame transforms, and
//! falls back to a `TransformSource` for frames the model does not know.
//! This keeps the core testable with in-memory fakes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Isometry3};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Kinematic bounds of a single joint.
///
/// A bound of `None` means the joint is unbounded in that quantity.
#[derive(Clone, Copy, Debug, Default)]
pub struct JointBounds {
    /// Position bounds (min, max).
    ///
    /// Units: radians (or meters for prismatic joints)
    pub position: Option<(f64, f64)>,

    /// Velocity bounds (min, max).
    ///
    /// Units: radians/second
    pub velocity: Option<(f64, f64)>,

    /// Acceleration bounds (min, max).
    ///
    /// Units: radians/second^2
    pub acceleration: Option<(f64, f64)>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// An error produced by a transform source lookup.
#[derive(Debug)]
pub struct TransformError {
    pub target: String,
    pub source: String,
    pub reason: String,
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no transform from {} to {}: {}",
            self.source, self.target, self.reason
        )
    }
}

impl std::error::Error for TransformError {}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Capability interface onto the kinematic model of the movement group.
///
/// Positions are mutable so that the singularity analyser can probe the
/// Jacobian at a perturbed configuration; implementations only need to hold
/// the configuration, not simulate dynamics.
pub trait KinematicModel {
    /// Number of active joints in the movement group.
    fn num_joints(&self) -> usize;

    /// Names of the active joints, in the model's ordering.
    fn joint_names(&self) -> &[String];

    /// Per-joint kinematic bounds, in the model's joint ordering.
    fn joint_bounds(&self) -> &[JointBounds];

    /// Current joint positions.
    fn positions(&self) -> DVector<f64>;

    /// Set the current joint positions.
    fn set_positions(&mut self, positions: &DVector<f64>);

    /// The 6 x n geometric Jacobian at the current configuration, rows
    /// ordered (vx, vy, vz, wx, wy, wz) and expressed in the root frame.
    fn jacobian(&self) -> DMatrix<f64>;

    /// Name of the model's root frame.
    fn root_frame(&self) -> &str;

    /// True if the model can resolve the named frame.
    fn knows_frame(&self, frame: &str) -> bool;

    /// Pose of the named frame relative to the root frame at the current
    /// configuration, or `None` if the frame is unknown.
    fn frame_transform(&self, frame: &str) -> Option<Isometry3<f64>>;
}

/// Capability interface onto an external transform source, used for frames
/// the kinematic model does not know.
pub trait TransformSource {
    /// Pose of `frame` relative to `reference`.
    fn lookup(&self, frame: &str, reference: &str) -> Result<Isometry3<f64>, TransformError>;
}
