//! # Path solver
//!
//! Closed form calculation of the jerk ramp and constant acceleration
//! durations needed to change speed over a limited distance.
//!
//! A speed change is made of three phases: a jerk up ramp (two raised cosine
//! segments of duration `tj` separated by a constant jerk hold of `t2`), a
//! constant acceleration plateau `t4` and a jerk down ramp (hold `t6`). The
//! solver picks the largest acceleration allowed by the limits and then
//! inverts the integrated velocity and position equations directly, there is
//! no iterative search.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::Serialize;
use thiserror::Error;

// Internal
use util::maths::{is_positive, safe_sqrt};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The result of solving one speed change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PathSolution {
    /// Peak jerk of the raised cosine ramps. May be lower than the requested
    /// maximum if the acceleration limit is reached within one ramp.
    ///
    /// Units: meters/second^3
    pub jerk_max: f64,

    /// Duration of the constant jerk hold within the jerk up ramp.
    ///
    /// Units: seconds
    pub t2: f64,

    /// Duration of the constant acceleration plateau.
    ///
    /// Units: seconds
    pub t4: f64,

    /// Duration of the constant jerk hold within the jerk down ramp.
    ///
    /// Units: seconds
    pub t6: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors reported by the path solver.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolverError {
    #[error(
        "Path solver requires positive limits, found jerk time {jerk_time}, jerk max \
         {jerk_max}, accel max {accel_max}, vel max {vel_max}, length {length}"
    )]
    InvalidArgument {
        jerk_time: f64,
        jerk_max: f64,
        accel_max: f64,
        vel_max: f64,
        length: f64,
    },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the durations of a speed change.
///
/// # Inputs
/// - `tj`: duration of each raised cosine jerk segment
/// - `jm`: maximum jerk
/// - `v0`: initial speed
/// - `am`: maximum acceleration
/// - `vm`: target speed
/// - `l`: distance available for the speed change
///
/// # Outputs
/// - The solution, with all durations non-negative. If the target speed
///   cannot be reached within `l` the fastest reachable profile is returned.
/// - `SolverError::InvalidArgument` if any limit is not positive.
pub fn solve_path(
    tj: f64,
    jm: f64,
    v0: f64,
    am: f64,
    vm: f64,
    l: f64,
) -> Result<PathSolution, SolverError> {
    if !is_positive(tj) || !is_positive(jm) || !is_positive(am) || !is_positive(vm) || !is_positive(l)
    {
        return Err(SolverError::InvalidArgument {
            jerk_time: tj,
            jerk_max: jm,
            accel_max: am,
            vel_max: vm,
            length: l,
        });
    }

    // Already at or above the target speed
    if v0 >= vm {
        return Ok(PathSolution::default());
    }

    // Acceleration can't be more than is needed to reach the target speed in
    // two jerk segments, or to fit within the distance
    let mut am = am
        .min((vm - v0) / (2.0 * tj))
        .min((l + 4.0 * v0 * tj) / (4.0 * tj * tj));
    let mut jm = jm;

    let mut sol = PathSolution::default();

    if am.abs() < jm * tj {
        // The acceleration limit is reached within the raised cosine segments,
        // lower the jerk so the ramps peak exactly at the limit
        jm = am / tj;

        if vm <= v0 + 2.0 * am * tj || l <= 4.0 * v0 * tj + 4.0 * am * tj * tj {
            // The ramps alone reach the target, no holds needed
        } else {
            sol.t4 = plateau_time(tj, jm, v0, am, vm, l);
        }
    } else if vm < v0 + am * tj + am * am / jm
        || l < (am * am * am + am * jm * (2.0 * v0 + 2.0 * am * tj)) / (jm * jm)
            + 2.0 * v0 * tj
            + am * tj * tj
    {
        // Not enough speed change or distance for a plateau, find the largest
        // acceleration the ramps can reach
        am = am.min(ramp_accel_vel_limit(tj, jm, v0, vm)).min(ramp_accel_pos_limit(tj, jm, v0, l));
        sol.t2 = am / jm - tj;
        sol.t6 = sol.t2;
    } else {
        // Full profile
        sol.t2 = am / jm - tj;
        sol.t4 = plateau_time(tj, jm, v0, am, vm, l);
        sol.t6 = sol.t2;
    }

    sol.jerk_max = jm;
    sol.t2 = non_negative(sol.t2);
    sol.t4 = non_negative(sol.t4);
    sol.t6 = non_negative(sol.t6);

    Ok(sol)
}

/// Solve the durations of a speed change, reporting invalid arguments on the
/// log and falling back to an empty (zero length) solution.
///
/// This never fails so that the calling control cycle is never interrupted.
pub fn solve_path_or_default(tj: f64, jm: f64, v0: f64, am: f64, vm: f64, l: f64) -> PathSolution {
    match solve_path(tj, jm, v0, am, vm, l) {
        Ok(s) => s,
        Err(e) => {
            warn!("{}", e);
            PathSolution::default()
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Duration of the constant acceleration plateau, limited by both the target
/// speed and the available distance.
fn plateau_time(tj: f64, jm: f64, v0: f64, am: f64, vm: f64, l: f64) -> f64 {
    let am2 = am * am;
    let jm2 = jm * jm;

    // Plateau needed to reach the target speed
    let t4_vel = -(v0 - vm + am * tj + am2 / jm) / am;

    // Plateau which uses exactly the available distance, the larger root of
    // the quadratic in t4
    let root = safe_sqrt(
        am2 * am2 / 4.0 + jm2 * v0 * v0 + am2 * jm2 * tj * tj / 4.0 + 2.0 * am * jm2 * l
            - am2 * jm * v0
            + am2 * am * jm * tj / 2.0
            - am * jm2 * v0 * tj,
    );
    let base = -1.5 * am2 - jm * v0 - 1.5 * am * jm * tj;
    let t4_pos = ((base + root) / (am * jm)).max((base - root) / (am * jm));

    t4_vel.min(t4_pos)
}

/// The largest acceleration the jerk ramps can reach without exceeding the
/// target speed.
fn ramp_accel_vel_limit(tj: f64, jm: f64, v0: f64, vm: f64) -> f64 {
    let root = safe_sqrt((4.0 * (vm - v0) + jm * tj * tj) / jm);

    (-0.5 * jm * (tj + root)).max(-0.5 * jm * (tj - root))
}

/// The largest acceleration the jerk ramps can reach within the distance.
///
/// This is the real root of the cubic relating the ramp acceleration to the
/// distance travelled, found with Cardano's formula.
fn ramp_accel_pos_limit(tj: f64, jm: f64, v0: f64, l: f64) -> f64 {
    let jm2 = jm * jm;
    let tj2 = tj * tj;

    let p = jm2 * tj2 / 9.0 - 2.0 / 3.0 * jm * v0;
    let r = -jm2 * l / 2.0 + 8.0 / 27.0 * jm2 * jm * tj2 * tj
        - jm * tj * (jm2 * tj2 + 2.0 * jm * v0) / 3.0
        + jm2 * v0 * tj;

    let s = (safe_sqrt(r * r - p * p * p) - r).cbrt();

    // A zero `s` gives a non-finite result, which the caller's `min` ignores
    -2.0 / 3.0 * jm * tj + p / s + s
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}
