//! Implements `Convert` functions between plain arrays and nalgebra types.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{DVector, Vector3};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Convert<O> {
    fn convert(&self) -> O;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Convert<Vector3<f64>> for [f64; 3] {
    fn convert(&self) -> Vector3<f64> {
        Vector3::new(self[0], self[1], self[2])
    }
}

impl Convert<[f64; 3]> for Vector3<f64> {
    fn convert(&self) -> [f64; 3] {
        [self[0], self[1], self[2]]
    }
}

impl Convert<DVector<f64>> for Vec<f64> {
    fn convert(&self) -> DVector<f64> {
        DVector::from_column_slice(self)
    }
}

impl Convert<Vec<f64>> for DVector<f64> {
    fn convert(&self) -> Vec<f64> {
        self.iter().copied().collect()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let arr = [1.0, -2.0, 3.0];
        let vec: Vector3<f64> = arr.convert();
        let back: [f64; 3] = vec.convert();
        assert_eq!(arr, back);

        let v = vec![0.1, 0.2, 0.3, 0.4];
        let dv: DVector<f64> = v.convert();
        let back: Vec<f64> = dv.convert();
        assert_eq!(v, back);
    }
}
