//! Closed form evaluation of a segment table at a given time

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::f64::consts::PI;
use util::maths::is_positive;

// Internal
use super::{Segment, SegmentTable, SegmentType, NUM_SEGS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Instantaneous motion along a leg.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct MotionState {
    /// Units: meters/second^3
    pub jerk: f64,

    /// Units: meters/second^2
    pub accel: f64,

    /// Units: meters/second
    pub vel: f64,

    /// Units: meters
    pub pos: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionState {
    /// The state at the end of a segment, with no jerk.
    pub fn at_end_of(seg: &Segment) -> Self {
        Self {
            jerk: 0.0,
            accel: seg.end_accel,
            vel: seg.end_vel,
            pos: seg.end_pos,
        }
    }
}

impl SegmentTable {
    /// Evaluate the jerk, acceleration, velocity and position at `time`.
    ///
    /// The active segment is the first one which ends after `time`, so a time
    /// exactly on a boundary belongs to the following segment and zero length
    /// segments are never active. Times before the start or after the end of
    /// the built segments hold the first or last state.
    pub fn evaluate(&self, time: f64) -> MotionState {
        let built = &self.segments()[..self.num_segs().clamp(1, NUM_SEGS)];

        let active = match built.iter().position(|s| time < s.end_time) {
            Some(i) => i,
            None => return MotionState::at_end_of(&built[built.len() - 1]),
        };

        if active == 0 {
            return MotionState::at_end_of(&built[0]);
        }

        let seg = &built[active];
        let start = MotionState::at_end_of(&built[active - 1]);
        let dt = time - built[active - 1].end_time;
        let duration = seg.end_time - built[active - 1].end_time;

        match seg.seg_type {
            SegmentType::ConstantJerk => const_jerk_state(dt, seg.jerk_ref, &start),
            SegmentType::PositiveJerk => incr_jerk_state(dt, duration, seg.jerk_ref, &start),
            SegmentType::NegativeJerk => decr_jerk_state(dt, duration, seg.jerk_ref, &start),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// State after `t` seconds of constant jerk `j0`.
pub fn const_jerk_state(t: f64, j0: f64, start: &MotionState) -> MotionState {
    let t2 = t * t;
    let t3 = t2 * t;

    MotionState {
        jerk: j0,
        accel: start.accel + j0 * t,
        vel: start.vel + start.accel * t + 0.5 * j0 * t2,
        pos: start.pos + start.vel * t + 0.5 * start.accel * t2 + j0 * t3 / 6.0,
    }
}

/// State after `t` seconds of a raised cosine jerk rising from zero to `jm`
/// over `tj` seconds.
///
/// A non-positive `tj` leaves the state unchanged.
pub fn incr_jerk_state(t: f64, tj: f64, jm: f64, start: &MotionState) -> MotionState {
    if !is_positive(tj) {
        return hold_state(start);
    }

    let alpha = jm / 2.0;
    let beta = PI / tj;
    let beta2 = beta * beta;
    let t2 = t * t;
    let (sin_bt, cos_bt) = (beta * t).sin_cos();

    MotionState {
        jerk: alpha * (1.0 - cos_bt),
        accel: start.accel + alpha * t - (alpha / beta) * sin_bt,
        vel: start.vel + start.accel * t + (alpha / 2.0) * t2 + (alpha / beta2) * cos_bt
            - alpha / beta2,
        pos: start.pos + start.vel * t + 0.5 * start.accel * t2 - (alpha / beta2) * t
            + alpha * t2 * t / 6.0
            + (alpha / (beta2 * beta)) * sin_bt,
    }
}

/// State after `t` seconds of a raised cosine jerk falling from `jm` to zero
/// over `tj` seconds.
///
/// This is the second half of a full raised cosine period, offset so that the
/// state at `t = 0` matches `start`.
pub fn decr_jerk_state(t: f64, tj: f64, jm: f64, start: &MotionState) -> MotionState {
    if !is_positive(tj) {
        return hold_state(start);
    }

    let alpha = jm / 2.0;
    let beta = PI / tj;
    let beta2 = beta * beta;

    // State accumulated over the first half period, removed so the profile
    // joins on to `start`
    let at = alpha * tj;
    let vt = alpha * (tj * tj / 2.0 - 2.0 / beta2);
    let pt = alpha * (-tj / beta2 + tj * tj * tj / 6.0);

    let a0 = start.accel - at;
    let v0 = start.vel - vt;
    let p0 = start.pos - pt;

    let tt = t + tj;
    let (sin_bt, cos_bt) = (beta * tt).sin_cos();

    MotionState {
        jerk: alpha * (1.0 - cos_bt),
        accel: a0 + alpha * tt - (alpha / beta) * sin_bt,
        vel: v0 + a0 * t + 0.5 * alpha * tt * tt + (alpha / beta2) * cos_bt - alpha / beta2,
        pos: p0 + v0 * t + 0.5 * a0 * t * t - (alpha / beta2) * tt
            + alpha * tt * tt * tt / 6.0
            + (alpha / (beta2 * beta)) * sin_bt,
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn hold_state(start: &MotionState) -> MotionState {
    MotionState {
        jerk: 0.0,
        ..*start
    }
}
