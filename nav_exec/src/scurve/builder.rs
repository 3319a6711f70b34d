//! Construction of segment tables
//!
//! Every append takes the index to write and returns the index of the next
//! segment. The build counter on the table is only updated once a full build
//! has completed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use std::ops::RangeInclusive;
use util::maths::{is_positive, is_zero};

// Internal
use super::{
    eval::{const_jerk_state, decr_jerk_state, incr_jerk_state, MotionState},
    solve_path_or_default, PathSolution, Segment, SegmentTable, SegmentType, SEG_ACCEL_END,
    SEG_CHANGE_END, SEG_CONST, SEG_DECEL_END, SEG_INIT,
};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SegmentTable {
    /// Append a segment of constant jerk `jerk` lasting `duration` seconds.
    pub fn append_const_jerk(&mut self, index: usize, duration: f64, jerk: f64) -> usize {
        let (end_time, start) = self.start_of(index);
        let end = const_jerk_state(duration, jerk, &start);

        self.append(
            index,
            new_segment(end_time + duration, SegmentType::ConstantJerk, jerk, &end),
        )
    }

    /// Append a raised cosine segment in which the jerk rises from zero to
    /// `jerk` over `tj` seconds.
    pub fn append_incr_jerk(&mut self, index: usize, tj: f64, jerk: f64) -> usize {
        let (end_time, start) = self.start_of(index);
        let end = incr_jerk_state(tj, tj, jerk, &start);

        self.append(
            index,
            new_segment(end_time + tj, SegmentType::PositiveJerk, jerk, &end),
        )
    }

    /// Append a raised cosine segment in which the jerk falls from `jerk` to
    /// zero over `tj` seconds.
    pub fn append_decr_jerk(&mut self, index: usize, tj: f64, jerk: f64) -> usize {
        let (end_time, start) = self.start_of(index);
        let end = decr_jerk_state(tj, tj, jerk, &start);

        self.append(
            index,
            new_segment(end_time + tj, SegmentType::NegativeJerk, jerk, &end),
        )
    }

    /// Append a rising ramp, a hold at peak jerk for `hold` seconds, then a
    /// falling ramp.
    pub fn append_jerk_triplet(&mut self, index: usize, tj: f64, jerk: f64, hold: f64) -> usize {
        let index = self.append_incr_jerk(index, tj, jerk);
        let index = self.append_const_jerk(index, hold, jerk);
        self.append_decr_jerk(index, tj, jerk)
    }

    /// Append the seven segments of a speed increase described by `sol`.
    pub fn append_speed_increase(&mut self, index: usize, tj: f64, sol: &PathSolution) -> usize {
        let index = self.append_jerk_triplet(index, tj, sol.jerk_max, sol.t2);
        let index = self.append_const_jerk(index, sol.t4, 0.0);
        self.append_jerk_triplet(index, tj, -sol.jerk_max, sol.t6)
    }

    /// Append the seven segments of a speed decrease described by `sol`.
    pub fn append_speed_decrease(&mut self, index: usize, tj: f64, sol: &PathSolution) -> usize {
        let index = self.append_jerk_triplet(index, tj, -sol.jerk_max, sol.t6);
        let index = self.append_const_jerk(index, sol.t4, 0.0);
        self.append_jerk_triplet(index, tj, sol.jerk_max, sol.t2)
    }

    /// Overwrite the segments in `range` with zero duration holds at the end
    /// state of segment `source`.
    pub fn hold_segments(&mut self, range: RangeInclusive<usize>, source: usize) {
        let src = *self.get(source);

        for i in range {
            *self.get_mut(i) = Segment::hold(src.end_time, src.end_vel, src.end_pos);
        }
    }

    /// Build the complete profile of a rest to rest leg of `length` meters.
    ///
    /// The acceleration phase is solved for half of the leg and mirrored into
    /// the deceleration phase, with the cruise stretched to cover the middle.
    /// The velocity change phase is left as zero duration holds. A zero length
    /// leg leaves the table reset.
    pub fn build_full_path(&mut self, tj: f64, jm: f64, am: f64, vm: f64, length: f64) {
        self.reset();

        if is_zero(length) {
            return;
        }

        let sol = solve_path_or_default(tj, jm, 0.0, am, vm, length / 2.0);

        self.append_speed_increase(SEG_INIT + 1, tj, &sol);
        self.hold_segments(SEG_ACCEL_END + 1..=SEG_CHANGE_END, SEG_ACCEL_END);

        // Cruise long enough to put the end of the cruise at the midpoint
        let change_end = *self.get(SEG_CHANGE_END);
        let cruise_time = if is_positive(change_end.end_vel) {
            2.0 * (length / 2.0 - change_end.end_pos) / change_end.end_vel
        } else {
            0.0
        };
        let index = self.append_const_jerk(SEG_CONST, cruise_time, 0.0);

        let index = self.append_speed_decrease(index, tj, &sol);
        self.set_num_segs(index);
    }

    /// Stretch or shrink the cruise so that the leg finishes at
    /// `total_length`, shifting the deceleration phase to match.
    ///
    /// Does nothing if the cruise speed is not positive.
    pub fn extend_cruise(&mut self, total_length: f64) {
        let cruise_vel = self.get(SEG_CONST).end_vel;
        if !is_positive(cruise_vel) {
            warn!(
                "Cannot extend a cruise with speed {} m/s, leg length left unchanged",
                cruise_vel
            );
            return;
        }

        let delta_pos = total_length - self.get(SEG_DECEL_END).end_pos;
        let delta_time = delta_pos / cruise_vel;

        for i in SEG_CONST..=SEG_DECEL_END {
            let seg = self.get_mut(i);
            seg.end_time += delta_time;
            seg.end_pos += delta_pos;
        }
    }

    /// End time and end state of the segment before `index`.
    fn start_of(&self, index: usize) -> (f64, MotionState) {
        let prev = self.get(index.saturating_sub(1));
        (prev.end_time, MotionState::at_end_of(prev))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn new_segment(end_time: f64, seg_type: SegmentType, jerk_ref: f64, end: &MotionState) -> Segment {
    Segment {
        end_time,
        seg_type,
        jerk_ref,
        end_accel: end.accel,
        end_vel: end.vel,
        end_pos: end.pos,
    }
}
