//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into fractional seconds, or `None` on overflow.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let dur = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(dur), Some(1.5));

        let dur = chrono::Duration::milliseconds(-100);
        assert_eq!(duration_to_seconds(dur), Some(-0.1));
    }
}
