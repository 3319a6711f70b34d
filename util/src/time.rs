//! General time utility functions

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a number of seconds into a duration, rounding to the nearest
/// nanosecond.
///
/// Negative or non-finite inputs give a zero duration.
pub fn seconds_to_duration(seconds: f64) -> chrono::Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return chrono::Duration::zero();
    }

    chrono::Duration::nanoseconds((seconds * NANOS_PER_SECOND as f64).round() as i64)
}
