//! Cartesian control path calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{debug, warn};
use nalgebra::Vector3;

// Internal
use super::params::CommandInType;
use super::state::ServoCalcs;
use super::{frames, ik, limits, scale, singularity};
use servo_if::cmd::TwistCmd;
use servo_if::traj::JointTrajectory;
use util::convert::Convert;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ServoCalcs {
    /// Perform the Cartesian control path for one tick.
    ///
    /// Returns `None` if the command is malformed, in which case the tick
    /// publishes no motion.
    pub(crate) fn calc_cartesian(
        &mut self,
        mut cmd: TwistCmd,
        planning_frame: &str,
        command_frame: &str,
        now: DateTime<Utc>,
    ) -> Option<JointTrajectory> {
        if cmd.has_nan() {
            warn!("NaN in incoming twist command, dropping this tick");
            return None;
        }

        // Incoming unitless commands are contractually normalised to [-1, 1]
        if self.params.command_in_type == CommandInType::Unitless
            && cmd
                .linear
                .iter()
                .chain(cmd.angular.iter())
                .any(|c| c.abs() > 1.0)
        {
            warn!("Unitless command has a component above 1, dropping this tick");
            return None;
        }

        // Set uncontrolled dimensions to 0 in the command frame
        for i in 0..3 {
            if !self.control_dimensions[i] {
                cmd.linear[i] = 0.0;
            }
            if !self.control_dimensions[i + 3] {
                cmd.angular[i] = 0.0;
            }
        }

        // Rotate the command into the planning frame
        if cmd.frame_id != planning_frame {
            self.transform_twist(&mut cmd, planning_frame, command_frame);
        }

        let mut delta_x = scale::scale_cartesian_command(&self.params, &cmd);

        // Remove the Jacobian rows the operator allows to drift, taking
        // advantage of task redundancy
        let mut jacobian = self.model.jacobian();
        ik::remove_drift_dimensions(&mut jacobian, &mut delta_x, &self.drift_dimensions);

        let svd = jacobian.clone().svd(true, true);
        let pseudo_inverse = ik::pseudo_inverse(&svd)?;

        let mut delta_theta = &pseudo_inverse * &delta_x;

        limits::enforce_accel_vel_limits(
            &self.params,
            self.model.joint_bounds(),
            &self.prev_joint_velocity,
            &mut delta_theta,
        );

        // If close to a collision or a singularity, decelerate
        let singularity_scale = singularity::velocity_scale_for_singularity(
            self.model.as_mut(),
            &delta_x,
            &svd,
            &pseudo_inverse,
            &self.params,
            &mut self.status,
        );
        self.apply_velocity_scaling(&mut delta_theta, singularity_scale);

        self.prev_joint_velocity = &delta_theta / self.params.publish_period_s;

        self.convert_deltas_to_outgoing(&delta_theta, now)
    }

    /// Rotate the twist's linear and angular parts into the planning frame.
    ///
    /// An incoming frame that is empty or equal to the command frame uses
    /// the transform cached at the start of the tick; any other frame is
    /// resolved on the spot. An unresolvable frame zeroes the command.
    fn transform_twist(&self, cmd: &mut TwistCmd, planning_frame: &str, command_frame: &str) {
        let rotation = if cmd.frame_id.is_empty() || cmd.frame_id == command_frame {
            self.command_frame_transform().map(|tf| tf.rotation)
        } else {
            frames::command_frame_transform(
                self.model.as_ref(),
                self.transform_source.as_deref(),
                planning_frame,
                &cmd.frame_id,
            )
            .map(|tf| tf.rotation)
        };

        match rotation {
            Some(rotation) => {
                let linear: Vector3<f64> = cmd.linear.convert();
                let angular: Vector3<f64> = cmd.angular.convert();

                cmd.linear = (rotation * linear).convert();
                cmd.angular = (rotation * angular).convert();
                cmd.frame_id = planning_frame.to_string();
            }
            None => {
                debug!(
                    "No transform from {} to {} yet, treating the command as zero",
                    planning_frame, cmd.frame_id
                );
                cmd.linear = [0.0; 3];
                cmd.angular = [0.0; 3];
            }
        }
    }
}
