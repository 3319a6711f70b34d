//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Vector2, Vector3};
use num_traits::Float;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used by the float comparison helpers.
///
/// This is single precision machine epsilon, the motion profiles are
/// computed in `f64` but the limits they are given are rarely more precise
/// than this.
pub const FLOAT_EPSILON: f64 = f32::EPSILON as f64;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Returns true if the value is within `FLOAT_EPSILON` of zero.
pub fn is_zero<T>(value: T) -> bool
where
    T: Float,
{
    value.abs() < eps()
}

/// Returns true if the value is greater than or equal to `FLOAT_EPSILON`.
pub fn is_positive<T>(value: T) -> bool
where
    T: Float,
{
    value >= eps()
}

/// Returns true if the value is less than or equal to `-FLOAT_EPSILON`.
pub fn is_negative<T>(value: T) -> bool
where
    T: Float,
{
    value <= -eps::<T>()
}

/// Returns true if the two values are within `FLOAT_EPSILON` of each other.
pub fn is_equal<T>(a: T, b: T) -> bool
where
    T: Float,
{
    (a - b).abs() < eps()
}

/// Square root which returns zero instead of NaN for negative inputs.
pub fn safe_sqrt<T>(value: T) -> T
where
    T: Float,
{
    let root = value.sqrt();
    if root.is_nan() {
        T::zero()
    } else {
        root
    }
}

/// Return the largest magnitude along `direction` which respects the given
/// horizontal and vertical limits.
///
/// The limits are treated as magnitudes (signs are ignored). `max_z_pos` is
/// applied when the direction climbs (positive z) and `max_z_neg` when it
/// descends. A zero direction returns zero.
pub fn kinematic_limit(
    direction: &Vector3<f64>,
    max_xy: f64,
    max_z_pos: f64,
    max_z_neg: f64,
) -> f64 {
    if is_zero(direction.norm_squared()) {
        return 0.0;
    }

    let max_xy = max_xy.abs();
    let max_z_pos = max_z_pos.abs();
    let max_z_neg = max_z_neg.abs();

    let unit = direction.normalize();
    let xy_length = Vector2::new(unit.x, unit.y).norm();

    // Purely vertical
    if is_zero(xy_length) {
        return match is_positive(unit.z) {
            true => max_z_pos,
            false => max_z_neg,
        };
    }

    // Purely horizontal
    if is_zero(unit.z) {
        return max_xy;
    }

    // Pick whichever of the horizontal or vertical limits binds first
    let slope = unit.z / xy_length;
    let max_z = match is_negative(slope) {
        true => max_z_neg,
        false => max_z_pos,
    };

    if slope.abs() < max_z / max_xy {
        max_xy / xy_length
    } else {
        (max_z / unit.z).abs()
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn eps<T: Float>() -> T {
    T::from(FLOAT_EPSILON).unwrap_or_else(T::epsilon)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_float_compare() {
        assert!(is_zero(0f64));
        assert!(is_zero(1e-9f64));
        assert!(!is_zero(1e-3f64));
        assert!(is_positive(1e-3f64));
        assert!(!is_positive(1e-9f64));
        assert!(is_negative(-1e-3f64));
        assert!(!is_negative(-1e-9f64));
        assert!(is_equal(1.0f64, 1.0 + 1e-9));
        assert!(!is_equal(1.0f64, 1.001));
    }

    #[test]
    fn test_safe_sqrt() {
        assert_eq!(safe_sqrt(4f64), 2f64);
        assert_eq!(safe_sqrt(-4f64), 0f64);
        assert_eq!(safe_sqrt(0f64), 0f64);
    }

    #[test]
    fn test_kinematic_limit() {
        // Zero direction has no limit
        assert_eq!(kinematic_limit(&Vector3::zeros(), 5.0, 2.5, 1.5), 0.0);

        // Horizontal uses the xy limit
        assert_eq!(kinematic_limit(&Vector3::new(3.0, 4.0, 0.0), 5.0, 2.5, 1.5), 5.0);

        // Vertical uses the up or down limit, ignoring sign of the limits
        assert_eq!(kinematic_limit(&Vector3::new(0.0, 0.0, 10.0), 5.0, 2.5, 1.5), 2.5);
        assert_eq!(kinematic_limit(&Vector3::new(0.0, 0.0, -10.0), 5.0, 2.5, -1.5), 1.5);

        // Shallow climb, the horizontal limit binds
        let dir = Vector3::new(1.0, 0.0, 0.1);
        let xy = 1.0 / dir.norm();
        assert!((kinematic_limit(&dir, 5.0, 2.5, 1.5) - 5.0 / xy).abs() < 1e-9);

        // 45 degree climb, the vertical limit binds
        let dir = Vector3::new(1.0, 0.0, 1.0);
        let z = 1.0 / dir.norm();
        assert!((kinematic_limit(&dir, 5.0, 2.5, 1.5) - 2.5 / z).abs() < 1e-9);

        // 45 degree descent uses the down limit
        let dir = Vector3::new(1.0, 0.0, -1.0);
        assert!((kinematic_limit(&dir, 5.0, 2.5, 1.5) - 1.5 / z).abs() < 1e-9);
    }
}
