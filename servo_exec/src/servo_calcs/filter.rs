//! # Low-pass filter module
//!
//! One independent first-order filter per joint smooths the outgoing
//! positions. The orchestrator resets the filters to the measured position
//! whenever it exits without publishing motion, so resumption never causes a
//! position jump.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A first-order low-pass filter over a scalar signal.
#[derive(Clone, Debug)]
pub struct LowPassFilter {
    /// The two most recent measurements, newest first.
    previous_measurements: [f64; 2],

    /// The previous filtered output.
    previous_filtered: f64,

    /// Output scale, `1 / (1 + coeff)`.
    scale_term: f64,

    /// Feedback gain, `1 - coeff`.
    feedback_term: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LowPassFilter {
    /// Create a new filter with the given smoothing constant. Larger
    /// coefficients filter more.
    pub fn new(coeff: f64) -> Self {
        Self {
            previous_measurements: [0.0; 2],
            previous_filtered: 0.0,
            scale_term: 1.0 / (1.0 + coeff),
            feedback_term: 1.0 - coeff,
        }
    }

    /// Advance the filter by one measurement and return the new output.
    pub fn filter(&mut self, measurement: f64) -> f64 {
        self.previous_measurements[1] = self.previous_measurements[0];
        self.previous_measurements[0] = measurement;

        self.previous_filtered = self.scale_term
            * (self.previous_measurements[1] + self.previous_measurements[0]
                - self.feedback_term * self.previous_filtered);

        self.previous_filtered
    }

    /// Flush the filter state to `value` so that the next call to `filter`
    /// with the same value returns it with no transient.
    pub fn reset(&mut self, value: f64) {
        self.previous_measurements = [value; 2];
        self.previous_filtered = value;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reset_removes_transient() {
        let mut filter = LowPassFilter::new(2.0);

        filter.filter(123.0);
        filter.reset(1.5);

        // After a reset the filter output equals the reset value exactly for
        // an unchanged input
        assert_eq!(filter.filter(1.5), 1.5);
        assert_eq!(filter.filter(1.5), 1.5);
    }

    #[test]
    fn test_unit_dc_gain() {
        let mut filter = LowPassFilter::new(4.0);
        filter.reset(0.0);

        // A constant input converges to itself
        let mut output = 0.0;
        for _ in 0..500 {
            output = filter.filter(2.0);
        }
        assert_relative_eq!(output, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_first_step_is_attenuated() {
        let coeff = 2.0;
        let mut filter = LowPassFilter::new(coeff);
        filter.reset(0.0);

        // First output after a step from rest: (0 + x - (1 - c) * 0) / (1 + c)
        let output = filter.filter(0.9);
        assert_relative_eq!(output, 0.9 / (1.0 + coeff), epsilon = 1e-12);
        assert!(output.abs() < 0.9);
    }
}
