//! # Frame resolver module
//!
//! Composes the rigid transform between the planning frame and a command
//! frame. Frames known to the kinematic model are resolved through it;
//! unknown frames fall back to the external transform source via the model's
//! root link.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::error;
use nalgebra::Isometry3;

// Internal
use crate::model::{KinematicModel, TransformSource};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the transform from `planning_frame` to `command_frame`, such that
/// a vector expressed in the command frame can be rotated into planning
/// frame coordinates.
///
/// Returns `None` if either frame cannot be resolved; callers must treat
/// `None` as "not yet initialised".
pub(crate) fn command_frame_transform(
    model: &dyn KinematicModel,
    transform_source: Option<&dyn TransformSource>,
    planning_frame: &str,
    command_frame: &str,
) -> Option<Isometry3<f64>> {
    // Solve (planning_frame -> root -> command_frame) as
    // (root -> planning_frame)^-1 * (root -> command_frame)
    let planning_tf = frame_in_root(model, transform_source, planning_frame)?;
    let command_tf = frame_in_root(model, transform_source, command_frame)?;

    Some(planning_tf.inverse() * command_tf)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Resolve the pose of `frame` in the model's root frame, preferring the
/// model over the external source.
fn frame_in_root(
    model: &dyn KinematicModel,
    transform_source: Option<&dyn TransformSource>,
    frame: &str,
) -> Option<Isometry3<f64>> {
    if model.knows_frame(frame) {
        return model.frame_transform(frame);
    }

    match transform_source {
        Some(source) => match source.lookup(frame, model.root_frame()) {
            Ok(tf) => Some(tf),
            Err(e) => {
                error!("Transform lookup failed: {}", e);
                None
            }
        },
        None => {
            error!(
                "Frame {} is unknown to the model and no transform source is available",
                frame
            );
            None
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
