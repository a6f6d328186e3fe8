//! # Differential IK module
//!
//! Maps a Cartesian delta to a joint delta through the pseudoinverse of the
//! Jacobian. Drift axes are removed from both the Jacobian and the delta
//! before inversion to exploit task-space redundancy.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Dyn, SVD};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Remove the rows flagged for drift from the Jacobian and the Cartesian
/// delta.
///
/// Rows are removed from the highest index downwards so earlier removals do
/// not shift the indices of later ones, and at least one row is always kept.
pub(crate) fn remove_drift_dimensions(
    jacobian: &mut DMatrix<f64>,
    delta_x: &mut DVector<f64>,
    drift_dimensions: &[bool; 6],
) {
    for dimension in (0..jacobian.nrows()).rev() {
        if drift_dimensions[dimension] && jacobian.nrows() > 1 {
            *jacobian = jacobian.clone().remove_row(dimension);
            *delta_x = delta_x.clone().remove_row(dimension);
        }
    }
}

/// Form the pseudoinverse `V * S^-1 * U^T` from a thin SVD.
///
/// No damping is applied: degenerate singular values are inverted as-is, and
/// the singularity scaler is the only guard against the resulting blow-up.
pub(crate) fn pseudo_inverse(svd: &SVD<f64, Dyn, Dyn>) -> Option<DMatrix<f64>> {
    let u = svd.u.as_ref()?;
    let v_t = svd.v_t.as_ref()?;
    let sigma_inverse = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / s));

    Some(v_t.transpose() * sigma_inverse * u.transpose())
}

/// The Jacobian condition number, `sigma_max / sigma_min`.
///
/// Singular values from nalgebra's `svd` are sorted in descending order.
pub(crate) fn condition_number(svd: &SVD<f64, Dyn, Dyn>) -> f64 {
    svd.singular_values[0] / svd.singular_values[svd.singular_values.len() - 1]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
