//! # Limit enforcer module
//!
//! Clips the per-tick joint delta against acceleration and velocity bounds,
//! halts motion that would push a joint past a position bound, and computes
//! the worst-case stop time consumed by the collision monitor.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::DVector;
use std::collections::HashMap;

// Internal
use super::params::ServoParams;
use crate::model::JointBounds;
use servo_if::cmd::JointState;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clip the joint delta so that no joint exceeds its acceleration or
/// velocity bounds.
///
/// Each clip rescales the delta by a factor of magnitude below one; a factor
/// that would amplify the delta is discarded to avoid sign flips and NaNs
/// from a zero delta.
pub(crate) fn enforce_accel_vel_limits(
    params: &ServoParams,
    bounds: &[JointBounds],
    prev_joint_velocity: &DVector<f64>,
    delta_theta: &mut DVector<f64>,
) {
    let period = params.publish_period_s;

    for (i, joint_bounds) in bounds.iter().enumerate() {
        // Acceleration bound first, so the velocity bound sees the clipped
        // delta
        if let Some((min_accel, max_accel)) = joint_bounds.acceleration {
            let velocity = delta_theta[i] / period;
            let acceleration = (velocity - prev_joint_velocity[i]) / period;

            if acceleration < min_accel || acceleration > max_accel {
                let acceleration_limit = clamp(&acceleration, &min_accel, &max_accel);

                // accel = ((delta_theta / dt) - prev_vel) / dt
                // --> delta_theta = (accel * dt + prev_vel) * dt
                let relative_change = ((acceleration_limit * period + prev_joint_velocity[i])
                    * period)
                    / delta_theta[i];
                if relative_change.abs() < 1.0 {
                    delta_theta[i] *= relative_change;
                }
            }
        }

        if let Some((min_vel, max_vel)) = joint_bounds.velocity {
            let velocity = delta_theta[i] / period;

            if velocity < min_vel || velocity > max_vel {
                let velocity_limit = clamp(&velocity, &min_vel, &max_vel);

                // delta_theta = joint_velocity * dt
                let relative_change = (velocity_limit * period) / delta_theta[i];
                if relative_change.abs() < 1.0 {
                    delta_theta[i] *= relative_change;
                }
            }
        }
    }
}

/// True if any joint of the post-delta state is inside its position-bound
/// margin while its velocity pushes it further out, requiring a sudden halt.
pub(crate) fn position_limit_halt(
    params: &ServoParams,
    bounds: &[JointBounds],
    joint_state: &JointState,
) -> bool {
    let mut halting = false;

    for (i, joint_bounds) in bounds.iter().enumerate() {
        let (min_position, max_position) = match joint_bounds.position {
            Some(limits) => limits,
            None => continue,
        };

        let position = joint_state.positions[i];
        let velocity = joint_state.velocities[i];

        if (velocity < 0.0 && position < min_position + params.joint_limit_margin)
            || (velocity > 0.0 && position > max_position - params.joint_limit_margin)
        {
            warn!(
                "Joint {} close to a position limit. Halting.",
                joint_state.names[i]
            );
            halting = true;
        }
    }

    halting
}

/// Worst-case time to bring every joint to rest, `max |v| / a_lim` over the
/// acceleration-bounded joints of the movement group.
pub(crate) fn worst_case_stop_time(
    bounds: &[JointBounds],
    joint_name_index: &HashMap<String, usize>,
    latest_joint_state: &JointState,
) -> f64 {
    let mut stop_time = 0.0f64;

    for (name, &velocity) in latest_joint_state
        .names
        .iter()
        .zip(latest_joint_state.velocities.iter())
    {
        let index = match joint_name_index.get(name) {
            Some(&c) => c,
            None => continue,
        };

        match bounds[index].acceleration {
            Some((min_accel, max_accel)) => {
                // Be conservative: use the weaker of the two limits
                let accel_limit = min_accel.abs().min(max_accel.abs());
                stop_time = stop_time.max((velocity / accel_limit).abs());
            }
            None => {
                warn!(
                    "No acceleration limit defined for joint {}; minimum stop \
                     distance should not be used for collision checking",
                    name
                );
            }
        }
    }

    stop_time
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
