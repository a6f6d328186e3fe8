//! Joint jog control path calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::warn;

// Internal
use super::state::ServoCalcs;
use super::{limits, scale};
use servo_if::cmd::JointJogCmd;
use servo_if::traj::JointTrajectory;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ServoCalcs {
    /// Perform the joint jog control path for one tick.
    ///
    /// Returns `None` if the command is malformed, in which case the tick
    /// publishes no motion.
    pub(crate) fn calc_joint(
        &mut self,
        cmd: &JointJogCmd,
        now: DateTime<Utc>,
    ) -> Option<JointTrajectory> {
        if cmd.has_nan() {
            warn!("NaN in incoming jog command, dropping this tick");
            return None;
        }

        let mut delta_theta = scale::scale_joint_command(
            &self.params,
            &self.joint_name_index,
            self.num_joints,
            cmd,
        );

        limits::enforce_accel_vel_limits(
            &self.params,
            self.model.joint_bounds(),
            &self.prev_joint_velocity,
            &mut delta_theta,
        );

        // Singularity scaling does not apply to joint motions
        self.apply_velocity_scaling(&mut delta_theta, 1.0);

        self.prev_joint_velocity = &delta_theta / self.params.publish_period_s;

        self.convert_deltas_to_outgoing(&delta_theta, now)
    }
}
