//! # Telecommand processor module
//!
//! The telecommand processor routes incoming TCs to the servo core: streamed
//! commands go into the latest-command cache, the collision scale into its
//! lock-free slot, and control-plane requests to the core's mutators.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::debug;

// Internal
use crate::servo_calcs::ServoCalcs;
use servo_if::tc::ServoTc;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand against the servo core.
///
/// Streamed commands without a stamp are stamped with `now`, the arrival
/// time.
pub fn exec(servo: &mut ServoCalcs, tc: &ServoTc, now: DateTime<Utc>) {
    match tc {
        ServoTc::None => (),

        ServoTc::Twist(cmd) => {
            let mut cmd = cmd.clone();
            if cmd.stamp.is_none() {
                cmd.stamp = Some(now);
            }
            servo.command_handle().set_twist(cmd);
        }

        ServoTc::JointJog(cmd) => {
            let mut cmd = cmd.clone();
            if cmd.stamp.is_none() {
                cmd.stamp = Some(now);
            }
            servo.command_handle().set_joint_jog(cmd);
        }

        ServoTc::PlanningFrame(frame) => {
            debug!("Planning frame updated to {}", frame);
            servo.command_handle().set_planning_frame(frame.clone());
        }

        ServoTc::CommandFrame(frame) => {
            debug!("Command frame updated to {}", frame);
            servo.command_handle().set_command_frame(frame.clone());
        }

        ServoTc::CollisionVelocityScale(scale) => {
            servo.collision_scale_handle().set(*scale);
        }

        ServoTc::DriftDimensions(mask) => {
            debug!("Drift dimensions changed to {:?}", mask.as_array());
            servo.set_drift_dimensions(mask);
        }

        ServoTc::ControlDimensions(mask) => {
            debug!("Control dimensions changed to {:?}", mask.as_array());
            servo.set_control_dimensions(mask);
        }

        ServoTc::ResetStatus => {
            debug!("Servo status reset");
            servo.reset_status();
        }

        ServoTc::Pause(paused) => {
            debug!("Servo paused: {}", paused);
            servo.set_paused(*paused);
        }
    }
}
