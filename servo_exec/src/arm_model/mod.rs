//! # Arm kinematic model module
//!
//! A serial-chain implementation of the `KinematicModel` capability: forward
//! kinematics by isometry accumulation and the geometric Jacobian built
//! column-by-column from the joint axes.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DMatrix, DVector, Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use thiserror::Error;

// Internal
pub use params::{JointKind, JointParams, Params};

use crate::model::{JointBounds, KinematicModel};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A serial-chain kinematic model of the arm.
pub struct ArmModel {
    root_link: String,
    joints: Vec<Joint>,
    names: Vec<String>,
    bounds: Vec<JointBounds>,
    positions: DVector<f64>,
}

/// Static geometry of a single joint of the chain.
struct Joint {
    child_link: String,
    origin: Isometry3<f64>,
    axis: Unit<Vector3<f64>>,
    kind: JointKind,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised while building the arm model.
#[derive(Debug, Error)]
pub enum ArmModelError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("The chain has no joints")]
    NoJoints,

    #[error("Joint {0} has a zero-length axis")]
    ZeroAxis(String),

    #[error("Home position has {actual} values but the chain has {expected} joints")]
    HomePositionMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmModel {
    /// Initialise the model from a parameter file.
    pub fn init<P: AsRef<std::path::Path>>(params_path: P) -> Result<Self, ArmModelError> {
        let params: Params = util::params::load(params_path)?;
        Self::from_params(params)
    }

    /// Build the model from an already loaded parameter set.
    pub fn from_params(params: Params) -> Result<Self, ArmModelError> {
        if params.joints.is_empty() {
            return Err(ArmModelError::NoJoints);
        }

        let mut joints = Vec::with_capacity(params.joints.len());
        let mut names = Vec::with_capacity(params.joints.len());
        let mut bounds = Vec::with_capacity(params.joints.len());

        for jp in &params.joints {
            let axis = Vector3::new(jp.axis[0], jp.axis[1], jp.axis[2]);
            let axis = Unit::try_new(axis, 1e-9).ok_or_else(|| {
                ArmModelError::ZeroAxis(jp.name.clone())
            })?;

            let origin = Isometry3::from_parts(
                Translation3::new(jp.origin_xyz[0], jp.origin_xyz[1], jp.origin_xyz[2]),
                UnitQuaternion::from_euler_angles(
                    jp.origin_rpy[0],
                    jp.origin_rpy[1],
                    jp.origin_rpy[2],
                ),
            );

            joints.push(Joint {
                child_link: jp.child_link.clone(),
                origin,
                axis,
                kind: jp.kind,
            });
            names.push(jp.name.clone());
            bounds.push(JointBounds {
                position: jp.position_limits.map(|l| (l[0], l[1])),
                velocity: jp.velocity_limits.map(|l| (l[0], l[1])),
                acceleration: jp.acceleration_limits.map(|l| (l[0], l[1])),
            });
        }

        let positions = match params.home_position {
            Some(home) => {
                if home.len() != joints.len() {
                    return Err(ArmModelError::HomePositionMismatch {
                        expected: joints.len(),
                        actual: home.len(),
                    });
                }
                DVector::from_vec(home)
            }
            None => DVector::zeros(joints.len()),
        };

        Ok(Self {
            root_link: params.root_link,
            joints,
            names,
            bounds,
            positions,
        })
    }

    /// The transform a joint applies to its child for a given joint value.
    fn motion(joint: &Joint, q: f64) -> Isometry3<f64> {
        match joint.kind {
            JointKind::Revolute => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&joint.axis, q),
            ),
            JointKind::Prismatic => Isometry3::from_parts(
                Translation3::from(joint.axis.into_inner() * q),
                UnitQuaternion::identity(),
            ),
        }
    }
}

impl KinematicModel for ArmModel {
    fn num_joints(&self) -> usize {
        self.joints.len()
    }

    fn joint_names(&self) -> &[String] {
        &self.names
    }

    fn joint_bounds(&self) -> &[JointBounds] {
        &self.bounds
    }

    fn positions(&self) -> DVector<f64> {
        self.positions.clone()
    }

    fn set_positions(&mut self, positions: &DVector<f64>) {
        self.positions = positions.clone();
    }

    fn jacobian(&self) -> DMatrix<f64> {
        let num_joints = self.joints.len();

        // Walk the chain recording each joint's world axis and origin
        let mut pose = Isometry3::identity();
        let mut world_axes = Vec::with_capacity(num_joints);
        let mut world_origins = Vec::with_capacity(num_joints);

        for (i, joint) in self.joints.iter().enumerate() {
            let frame = pose * joint.origin;
            world_axes.push(frame.rotation * joint.axis.into_inner());
            world_origins.push(frame.translation.vector);
            pose = frame * Self::motion(joint, self.positions[i]);
        }

        let end_effector = pose.translation.vector;

        // Column i maps the i-th joint rate to an end-effector twist
        let mut jacobian = DMatrix::zeros(6, num_joints);
        for i in 0..num_joints {
            let (linear, angular) = match self.joints[i].kind {
                JointKind::Revolute => (
                    world_axes[i].cross(&(end_effector - world_origins[i])),
                    world_axes[i],
                ),
                JointKind::Prismatic => (world_axes[i], Vector3::zeros()),
            };

            for r in 0..3 {
                jacobian[(r, i)] = linear[r];
                jacobian[(r + 3, i)] = angular[r];
            }
        }

        jacobian
    }

    fn root_frame(&self) -> &str {
        &self.root_link
    }

    fn knows_frame(&self, frame: &str) -> bool {
        frame == self.root_link || self.joints.iter().any(|j| j.child_link == frame)
    }

    fn frame_transform(&self, frame: &str) -> Option<Isometry3<f64>> {
        if frame == self.root_link {
            return Some(Isometry3::identity());
        }

        let mut pose = Isometry3::identity();
        for (i, joint) in self.joints.iter().enumerate() {
            pose = pose * joint.origin * Self::motion(joint, self.positions[i]);
            if joint.child_link == frame {
                return Some(pose);
            }
        }

        None
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    /// A two-link planar arm in the XY plane, both joints revolute about Z.
    fn two_link_arm() -> ArmModel {
        let params = Params {
            root_link: "base".into(),
            joints: vec![
                JointParams {
                    name: "shoulder".into(),
                    child_link: "upper_arm".into(),
                    origin_xyz: [0.0, 0.0, 0.0],
                    origin_rpy: [0.0, 0.0, 0.0],
                    axis: [0.0, 0.0, 1.0],
                    kind: JointKind::Revolute,
                    position_limits: None,
                    velocity_limits: None,
                    acceleration_limits: None,
                },
                JointParams {
                    name: "elbow".into(),
                    child_link: "forearm".into(),
                    origin_xyz: [1.0, 0.0, 0.0],
                    origin_rpy: [0.0, 0.0, 0.0],
                    axis: [0.0, 0.0, 1.0],
                    kind: JointKind::Revolute,
                    position_limits: None,
                    velocity_limits: None,
                    acceleration_limits: None,
                },
            ],
            home_position: None,
        };

        ArmModel::from_params(params).unwrap()
    }

    #[test]
    fn test_forward_kinematics() {
        let mut arm = two_link_arm();

        // At home the forearm frame sits at the elbow, 1 m along X
        let tf = arm.frame_transform("forearm").unwrap();
        assert_relative_eq!(tf.translation.vector.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(tf.translation.vector.y, 0.0, epsilon = 1e-12);

        // Rotating the shoulder 90 deg swings the elbow onto the Y axis
        arm.set_positions(&DVector::from_vec(vec![FRAC_PI_2, 0.0]));
        let tf = arm.frame_transform("forearm").unwrap();
        assert_relative_eq!(tf.translation.vector.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tf.translation.vector.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_planar() {
        let arm = two_link_arm();
        let jacobian = arm.jacobian();

        assert_eq!(jacobian.nrows(), 6);
        assert_eq!(jacobian.ncols(), 2);

        // End effector (the forearm frame) is at (1, 0, 0). Shoulder column:
        // z x (p_e - 0) = (0, 0, 1) x (1, 0, 0) = (0, 1, 0)
        assert_relative_eq!(jacobian[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jacobian[(1, 0)], 1.0, epsilon = 1e-12);

        // Elbow column: z x (p_e - p_elbow) = (0, 0, 1) x (0, 0, 0) = 0
        assert_relative_eq!(jacobian[(1, 1)], 0.0, epsilon = 1e-12);

        // Both joints contribute unit angular rate about Z
        assert_relative_eq!(jacobian[(5, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(jacobian[(5, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_knows_frame() {
        let arm = two_link_arm();
        assert!(arm.knows_frame("base"));
        assert!(arm.knows_frame("upper_arm"));
        assert!(arm.knows_frame("forearm"));
        assert!(!arm.knows_frame("gripper"));
    }

    #[test]
    fn test_zero_axis_rejected() {
        let params = Params {
            root_link: "base".into(),
            joints: vec![JointParams {
                name: "bad".into(),
                child_link: "link".into(),
                origin_xyz: [0.0; 3],
                origin_rpy: [0.0; 3],
                axis: [0.0; 3],
                kind: JointKind::Revolute,
                position_limits: None,
                velocity_limits: None,
                acceleration_limits: None,
            }],
            home_position: None,
        };

        assert!(matches!(
            ArmModel::from_params(params),
            Err(ArmModelError::ZeroAxis(_))
        ));
    }
}
