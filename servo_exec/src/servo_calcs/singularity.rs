//! # Singularity analyser module
//!
//! Computes the velocity scaling factor applied when the commanded motion
//! approaches a kinematic singularity, based on the condition number of the
//! Jacobian.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::{DMatrix, DVector, Dyn, SVD};

// Internal
use super::ik;
use super::params::ServoParams;
use crate::model::KinematicModel;
use servo_if::status::ServoStatus;
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Divisor applied to the singular vector when probing the condition number
/// ahead of the current configuration.
const PROBE_STEP_DIVISOR: f64 = 100.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Velocity scaling factor for proximity to a singularity, in [0, 1].
///
/// The last column of U from the SVD of the Jacobian points towards or away
/// from the nearest singularity, with unpredictable sign. The sign is
/// resolved by probing: take a small step along the vector, recompute the
/// Jacobian condition number at the perturbed configuration, and flip the
/// vector if the condition did not grow. The model state is restored after
/// the probe.
///
/// Deceleration only applies when the commanded motion has a positive
/// component along the resolved vector, i.e. when it moves the arm towards
/// the singularity.
pub(crate) fn velocity_scale_for_singularity(
    model: &mut dyn KinematicModel,
    commanded_delta: &DVector<f64>,
    svd: &SVD<f64, Dyn, Dyn>,
    pseudo_inverse: &DMatrix<f64>,
    params: &ServoParams,
    status: &mut ServoStatus,
) -> f64 {
    let num_dimensions = commanded_delta.len();

    let u = match svd.u.as_ref() {
        Some(u) => u,
        None => return 1.0,
    };
    let mut vector_toward_singularity = u.column(num_dimensions - 1).clone_owned();

    let ini_condition = ik::condition_number(svd);

    // Probe ahead: a small Cartesian step along the singular vector, mapped
    // into joint space
    let probe_delta_x = &vector_toward_singularity / PROBE_STEP_DIVISOR;
    let current_positions = model.positions();
    let probed_positions = &current_positions + pseudo_inverse * probe_delta_x;

    model.set_positions(&probed_positions);
    let probed_jacobian = model.jacobian();
    model.set_positions(&current_positions);

    let probed_svd = probed_jacobian.svd(false, false);
    let new_condition = ik::condition_number(&probed_svd);

    // If the condition grew the vector does point towards the singularity,
    // otherwise flip it
    if ini_condition >= new_condition {
        vector_toward_singularity = -vector_toward_singularity;
    }

    // Only decelerate when moving towards the singularity
    let dot = vector_toward_singularity.dot(commanded_delta);
    if dot <= 0.0 {
        return 1.0;
    }

    if ini_condition > params.lower_singularity_threshold
        && ini_condition < params.hard_stop_singularity_threshold
    {
        let scale = lin_map(
            (
                params.lower_singularity_threshold,
                params.hard_stop_singularity_threshold,
            ),
            (1.0, 0.0),
            ini_condition,
        );
        *status = ServoStatus::DecelerateForSingularity;
        warn!("{}", status.description());
        scale
    } else if ini_condition > params.hard_stop_singularity_threshold {
        *status = ServoStatus::HaltForSingularity;
        warn!("{}", status.description());
        0.0
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
