//! # Command scaler module
//!
//! Converts incoming command values into per-tick deltas. Unitless commands
//! are multiplied by their configured scale and the publish period;
//! speed-unit commands by the publish period only.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::DVector;
use std::collections::HashMap;

// Internal
use super::params::{CommandInType, ServoParams};
use super::NUM_CARTESIAN_DIMS;
use servo_if::cmd::{JointJogCmd, TwistCmd};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale an incoming Cartesian command into a per-tick Cartesian delta.
pub(crate) fn scale_cartesian_command(params: &ServoParams, cmd: &TwistCmd) -> DVector<f64> {
    let mut delta_x = DVector::zeros(NUM_CARTESIAN_DIMS);

    match params.command_in_type {
        CommandInType::Unitless => {
            for i in 0..3 {
                delta_x[i] = params.linear_scale * params.publish_period_s * cmd.linear[i];
                delta_x[i + 3] =
                    params.rotational_scale * params.publish_period_s * cmd.angular[i];
            }
        }
        CommandInType::SpeedUnits => {
            for i in 0..3 {
                delta_x[i] = cmd.linear[i] * params.publish_period_s;
                delta_x[i + 3] = cmd.angular[i] * params.publish_period_s;
            }
        }
    }

    delta_x
}

/// Scale an incoming jog command into a per-tick joint delta, aligned to the
/// internal joint ordering. Unknown joint names are ignored.
pub(crate) fn scale_joint_command(
    params: &ServoParams,
    joint_name_index: &HashMap<String, usize>,
    num_joints: usize,
    cmd: &JointJogCmd,
) -> DVector<f64> {
    let mut delta_theta = DVector::zeros(num_joints);

    for (name, &velocity) in cmd.joint_names.iter().zip(cmd.velocities.iter()) {
        let index = match joint_name_index.get(name) {
            Some(&c) => c,
            None => {
                warn!("Ignoring jog for unknown joint {}", name);
                continue;
            }
        };

        delta_theta[index] = match params.command_in_type {
            CommandInType::Unitless => velocity * params.joint_scale * params.publish_period_s,
            CommandInType::SpeedUnits => velocity * params.publish_period_s,
        };
    }

    delta_theta
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::servo_calcs::test_util::nominal_params;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_cartesian_unitless() {
        let params = nominal_params();
        let cmd = TwistCmd {
            linear: [1.0, 0.0, 0.0],
            angular: [0.0, 0.0, -1.0],
            ..Default::default()
        };

        let delta_x = scale_cartesian_command(&params, &cmd);

        // linear_scale (0.5) * period (0.01) * command
        assert_relative_eq!(delta_x[0], 0.005, epsilon = 1e-12);
        assert_relative_eq!(delta_x[5], -0.005, epsilon = 1e-12);
        assert_eq!(delta_x.iter().filter(|&&v| v != 0.0).count(), 2);
    }

    #[test]
    fn test_scale_cartesian_speed_units() {
        let mut params = nominal_params();
        params.command_in_type = CommandInType::SpeedUnits;
        let cmd = TwistCmd {
            linear: [0.2, 0.0, 0.0],
            angular: [0.0, 0.0, 0.0],
            ..Default::default()
        };

        let delta_x = scale_cartesian_command(&params, &cmd);

        // Scales do not apply in speed units mode
        assert_relative_eq!(delta_x[0], 0.002, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_joint_alignment() {
        let params = nominal_params();
        let mut index = HashMap::new();
        index.insert("joint_0".to_string(), 0);
        index.insert("joint_1".to_string(), 1);
        index.insert("joint_2".to_string(), 2);

        // Jog names arrive reordered and contain an unknown joint
        let cmd = JointJogCmd {
            stamp: None,
            joint_names: vec![
                "joint_2".into(),
                "mystery_joint".into(),
                "joint_0".into(),
            ],
            velocities: vec![1.0, 1.0, -1.0],
        };

        let delta_theta = scale_joint_command(&params, &index, 3, &cmd);

        assert_eq!(delta_theta.len(), 3);
        // joint_scale (0.5) * period (0.01) * command
        assert_relative_eq!(delta_theta[0], -0.005, epsilon = 1e-12);
        assert_relative_eq!(delta_theta[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(delta_theta[2], 0.005, epsilon = 1e-12);
    }
}
