//! S-curve leg state
//!
//! A leg is a straight line from an origin to a destination, with the scalar
//! motion along it described by a [`SegmentTable`]. Positions reported by a
//! leg are relative to its origin (or destination for
//! [`SCurve::move_to_pos_vel_accel`]), callers add the absolute origin.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use util::maths::{is_equal, is_positive, is_zero, kinematic_limit};

// Internal
use super::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum duration of a velocity change, in multiples of the jerk time, for
/// the change to be attempted mid leg.
const MIN_CHANGE_JERK_TIMES: f64 = 12.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic limits of the vehicle used to build a leg.
///
/// All values are magnitudes, signs are ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackLimits {
    /// Units: meters/second
    pub speed_xy: f64,

    /// Units: meters/second
    pub speed_up: f64,

    /// Units: meters/second
    pub speed_down: f64,

    /// Units: meters/second^2
    pub accel_xy: f64,

    /// Units: meters/second^2
    pub accel_z: f64,

    /// Duration of a raised cosine jerk segment.
    ///
    /// Units: seconds
    pub jerk_time: f64,

    /// Units: meters/second^3
    pub jerk_max: f64,
}

/// Position, velocity and acceleration target.
///
/// Legs add their contribution to a target, so it must be initialised by the
/// caller (usually to the leg origin, with zero velocity and acceleration).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct TrackTarget {
    /// Units: meters
    pub pos: Vector3<f64>,

    /// Units: meters/second
    pub vel: Vector3<f64>,

    /// Units: meters/second^2
    pub accel: Vector3<f64>,
}

/// A single jerk limited leg.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SCurve {
    /// Vector from the origin to the destination
    track: Vector3<f64>,

    /// Unit vector along the track, zero for a degenerate leg
    delta_unit: Vector3<f64>,

    jerk_time: f64,
    jerk_max: f64,

    /// Acceleration limit along the track
    accel_max: f64,

    /// Speed limit along the track
    vel_max: f64,

    /// Time elapsed along the leg
    time: f64,

    table: SegmentTable,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackTarget {
    /// A stationary target at `pos`.
    pub fn at(pos: Vector3<f64>) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }
}

impl SCurve {
    /// Clear the leg back to an empty, unbuilt state.
    pub fn init(&mut self) {
        *self = Self::default();
    }

    /// Build the leg from `origin` to `destination`, starting and finishing
    /// at rest.
    ///
    /// If any of the resolved limits are not positive, or the origin and
    /// destination coincide, the leg is left unbuilt and is finished
    /// immediately.
    pub fn calculate_track(
        &mut self,
        origin: &Vector3<f64>,
        destination: &Vector3<f64>,
        limits: &TrackLimits,
    ) {
        self.init();

        self.jerk_time = limits.jerk_time;
        self.jerk_max = limits.jerk_max;
        self.set_kinematic_limits(origin, destination, limits);

        if !is_positive(self.jerk_time)
            || !is_positive(self.jerk_max)
            || !is_positive(self.accel_max)
            || !is_positive(self.vel_max)
        {
            debug!(
                "Leg not built, limits not positive (jerk time {}, jerk max {}, accel {}, vel {})",
                self.jerk_time, self.jerk_max, self.accel_max, self.vel_max
            );
            return;
        }

        self.track = destination - origin;
        let track_length = self.track.norm();

        if is_zero(track_length) {
            self.delta_unit = Vector3::zeros();
        } else {
            self.delta_unit = self.track / track_length;
            self.table.build_full_path(
                self.jerk_time,
                self.jerk_max,
                self.accel_max,
                self.vel_max,
                track_length,
            );

            debug!(
                "Built {:.3} m leg, {:.3} m/s, {:.3} m/s^2, {:.3} s",
                track_length,
                self.vel_max,
                self.accel_max,
                self.time_end()
            );
        }
    }

    /// Change the speed limit and rebuild the part of the leg which has not
    /// yet been travelled.
    ///
    /// The length of the leg is preserved. Does nothing if the new limit
    /// resolves to the current one, if either is zero, if the leg is not built
    /// or if the leg has started braking.
    pub fn set_speed_max(&mut self, speed_xy: f64, speed_up: f64, speed_down: f64) {
        let track_speed_max = kinematic_limit(&self.delta_unit, speed_xy, speed_up, speed_down);

        if is_equal(self.vel_max, track_speed_max) {
            return;
        }

        if is_zero(self.vel_max) || is_zero(track_speed_max) {
            return;
        }

        self.vel_max = track_speed_max;

        if !self.table.is_full() || self.time >= self.table.get(SEG_CONST).end_time {
            return;
        }

        debug!(
            "Leg speed changed to {:.3} m/s at {:.3} s",
            self.vel_max, self.time
        );

        let pos_end = self.table.get(SEG_DECEL_END).end_pos;
        let vel_end = self.vel_max.min(self.table.get(SEG_DECEL_END).end_vel);

        // Not started yet, rebuild from scratch keeping the end speeds
        if is_zero(self.time) {
            let vel_start = self.vel_max.min(self.table.get(SEG_INIT).end_vel);
            self.table.build_full_path(
                self.jerk_time,
                self.jerk_max,
                self.accel_max,
                self.vel_max,
                pos_end,
            );
            self.set_origin_speed_max(vel_start);
            self.set_destination_speed_max(vel_end);
            return;
        }

        // Freeze whatever has already been travelled into the acceleration
        // segments so that the change segments are free
        let accel_end_time = self.table.get(SEG_ACCEL_END).end_time;
        let change_end_time = self.table.get(SEG_CHANGE_END).end_time;
        let cruise_end_time = self.table.get(SEG_CONST).end_time;

        if self.time >= accel_end_time && self.time <= change_end_time {
            self.freeze_change_phase();
        } else if self.time >= change_end_time && self.time <= cruise_end_time {
            self.freeze_cruise_phase();
        }

        self.shorten_accel_phase(pos_end);
        self.rebuild_change_phase();
        self.rebuild_decel_phase(vel_end, pos_end);
    }

    /// Set the speed at the start of the leg and rebuild the acceleration and
    /// deceleration phases to match.
    ///
    /// Only applies before the leg has started. Returns the speed actually
    /// used, which is limited to the cruise speed, the unchanged start speed
    /// once the leg has started, or zero if the leg is not built.
    pub fn set_origin_speed_max(&mut self, speed: f64) -> f64 {
        if !self.table.is_full() {
            return 0.0;
        }

        if !is_zero(self.time) {
            return self.table.get(SEG_INIT).end_vel;
        }

        if is_equal(self.table.get(SEG_INIT).end_vel, speed) {
            return speed;
        }

        let vel_max = self.table.get(SEG_ACCEL_END).end_vel;
        let length = self.table.get(SEG_DECEL_END).end_pos;
        let speed = speed.min(vel_max);

        let sol = self.solve(speed, vel_max, length / 2.0);
        *self.table.get_mut(SEG_INIT) = Segment::hold(0.0, speed, 0.0);
        self.table.append_speed_increase(SEG_INIT + 1, self.jerk_time, &sol);
        self.table
            .hold_segments(SEG_ACCEL_END + 1..=SEG_CHANGE_END, SEG_ACCEL_END);

        let sol = self.solve(0.0, vel_max, length - self.table.get(SEG_CONST).end_pos);
        let index = self.table.append_const_jerk(SEG_CONST, 0.0, 0.0);
        self.table.append_speed_decrease(index, self.jerk_time, &sol);
        self.table.extend_cruise(length);

        speed
    }

    /// Set the speed at the end of the leg, limited to the cruise speed, and
    /// rebuild the deceleration phase to match.
    ///
    /// Has no effect once braking has started.
    pub fn set_destination_speed_max(&mut self, speed: f64) {
        if self.braking() {
            return;
        }

        if is_equal(self.table.get(SEG_DECEL_END).end_vel, speed) {
            return;
        }

        let vel_max = self.table.get(SEG_CONST).end_vel;
        let length = self.table.get(SEG_DECEL_END).end_pos;
        let speed = speed.min(vel_max);

        let sol = self.solve(speed, vel_max, length / 2.0);
        let index = self.table.append_const_jerk(SEG_CONST, 0.0, 0.0);
        self.table.append_speed_decrease(index, self.jerk_time, &sol);
        self.table.extend_cruise(length);
    }

    /// Advance the target along this leg by `dt`, blending in the previous
    /// and next legs.
    ///
    /// `target` must be initialised to the origin of this leg. The previous
    /// leg contributes relative to its destination (which is this leg's
    /// origin) and this leg relative to its origin. If `fast_waypoint` is set
    /// the next leg is started before this one finishes, as long as the
    /// predicted corner lies within `wp_radius` of the waypoint and the blend
    /// does not exceed the speed or acceleration limits of either leg.
    ///
    /// Returns true once this leg has been consumed, either because it has
    /// finished or because the next leg has taken over.
    pub fn advance_target_along_track(
        &mut self,
        prev_leg: &mut SCurve,
        next_leg: &mut SCurve,
        wp_radius: f64,
        fast_waypoint: bool,
        dt: f64,
        target: &mut TrackTarget,
    ) -> bool {
        prev_leg.move_to_pos_vel_accel(dt, target);
        self.move_from_pos_vel_accel(dt, target);
        let mut finished = self.finished();

        let time_to_destination = self.get_time_remaining();

        if fast_waypoint
            && self.braking()
            && is_zero(next_leg.get_time_elapsed())
            && time_to_destination <= next_leg.get_accel_finished_time()
        {
            // Predict the corner halfway through the remaining time
            let mut turn = TrackTarget::at(-self.get_track());
            self.move_from_time_pos_vel_accel(
                self.get_time_elapsed() + time_to_destination / 2.0,
                &mut turn,
            );
            next_leg.move_from_time_pos_vel_accel(time_to_destination / 2.0, &mut turn);

            let speed_min = self
                .get_speed_along_track()
                .min(next_leg.get_speed_along_track());
            let accel_min = self
                .get_accel_along_track()
                .min(next_leg.get_accel_along_track());

            if self.get_time_remaining() < next_leg.time_end() / 2.0
                && turn.pos.norm() < wp_radius
                && turn.vel.x.hypot(turn.vel.y) < speed_min
                && turn.accel.x.hypot(turn.accel.y) < 2.0 * accel_min
            {
                trace!(
                    "Starting next leg with {:.3} s remaining, corner {:.3} m from waypoint",
                    time_to_destination,
                    turn.pos.norm()
                );
                next_leg.move_from_pos_vel_accel(dt, target);
            }
        } else if !is_zero(next_leg.get_time_elapsed()) {
            next_leg.move_from_pos_vel_accel(dt, target);

            if next_leg.get_time_elapsed() >= self.get_time_remaining() {
                finished = true;
            }
        }

        finished
    }

    /// Advance time by `dt` and add the motion relative to the origin to
    /// `target`.
    pub fn move_from_pos_vel_accel(&mut self, dt: f64, target: &mut TrackTarget) {
        self.advance_time(dt);
        self.move_from_time_pos_vel_accel(self.time, target);
    }

    /// Advance time by `dt` and add the motion relative to the destination to
    /// `target`.
    pub fn move_to_pos_vel_accel(&mut self, dt: f64, target: &mut TrackTarget) {
        self.advance_time(dt);
        self.move_from_time_pos_vel_accel(self.time, target);
        target.pos -= self.track;
    }

    /// Add the motion relative to the origin at `time` to `target`.
    pub fn move_from_time_pos_vel_accel(&self, time: f64, target: &mut TrackTarget) {
        let state = self.table.evaluate(time);

        target.pos += self.delta_unit * state.pos;
        target.vel += self.delta_unit * state.vel;
        target.accel += self.delta_unit * state.accel;
    }

    pub fn advance_time(&mut self, dt: f64) {
        self.time += dt;
    }

    pub fn get_time_elapsed(&self) -> f64 {
        self.time
    }

    /// Vector from the origin to the destination.
    pub fn get_track(&self) -> Vector3<f64> {
        self.track
    }

    pub fn get_speed_along_track(&self) -> f64 {
        self.vel_max
    }

    pub fn get_accel_along_track(&self) -> f64 {
        self.accel_max
    }

    /// Distance travelled by the end of the leg, zero if not built.
    pub fn pos_end(&self) -> f64 {
        match self.table.is_full() {
            true => self.table.get(SEG_DECEL_END).end_pos,
            false => 0.0,
        }
    }

    /// Time at which the leg ends, zero if not built.
    pub fn time_end(&self) -> f64 {
        match self.table.is_full() {
            true => self.table.get(SEG_DECEL_END).end_time,
            false => 0.0,
        }
    }

    /// Time until the leg ends, zero if not built.
    pub fn get_time_remaining(&self) -> f64 {
        match self.table.is_full() {
            true => self.table.get(SEG_DECEL_END).end_time - self.time,
            false => 0.0,
        }
    }

    /// Time at which the acceleration phase ends, zero if not built.
    pub fn get_accel_finished_time(&self) -> f64 {
        match self.table.is_full() {
            true => self.table.get(SEG_ACCEL_END).end_time,
            false => 0.0,
        }
    }

    /// True if the cruise has ended, or the leg is not built.
    pub fn braking(&self) -> bool {
        match self.table.is_full() {
            true => self.time >= self.table.get(SEG_CONST).end_time,
            false => true,
        }
    }

    /// True if the end of the leg has been passed, or the leg is not built.
    pub fn finished(&self) -> bool {
        match self.table.is_full() {
            true => self.time > self.time_end(),
            false => true,
        }
    }

    pub fn is_built(&self) -> bool {
        self.table.is_full()
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.table
    }

    fn set_kinematic_limits(
        &mut self,
        origin: &Vector3<f64>,
        destination: &Vector3<f64>,
        limits: &TrackLimits,
    ) {
        let direction = destination - origin;

        self.vel_max = kinematic_limit(
            &direction,
            limits.speed_xy,
            limits.speed_up,
            limits.speed_down,
        );
        self.accel_max = kinematic_limit(&direction, limits.accel_xy, limits.accel_z, limits.accel_z);
    }

    fn solve(&self, v0: f64, vm: f64, length: f64) -> PathSolution {
        solve_path_or_default(
            self.jerk_time,
            self.jerk_max,
            v0,
            self.accel_max,
            vm,
            length,
        )
    }

    /// Move the velocity change segments into the acceleration slots, with
    /// the end of the old acceleration phase as the new initial state.
    fn freeze_change_phase(&mut self) {
        let accel_end = *self.table.get(SEG_ACCEL_END);
        *self.table.get_mut(SEG_INIT) = Segment {
            end_accel: accel_end.end_accel,
            ..Segment::hold(accel_end.end_time, accel_end.end_vel, accel_end.end_pos)
        };

        for i in SEG_INIT + 1..=SEG_ACCEL_END {
            let change = *self.table.get(i + SEG_ACCEL_END);
            *self.table.get_mut(i) = change;
        }

        self.table
            .hold_segments(SEG_ACCEL_END + 1..=SEG_CHANGE_END, SEG_ACCEL_END);
    }

    /// Collapse the acceleration and change phases into holds ending now, at
    /// the current point of the cruise.
    fn freeze_cruise_phase(&mut self) {
        let now = self.table.evaluate(self.time);
        let change_end = *self.table.get(SEG_CHANGE_END);

        *self.table.get_mut(SEG_INIT) =
            Segment::hold(change_end.end_time, change_end.end_vel, change_end.end_pos);

        for i in SEG_INIT + 1..=SEG_CHANGE_END {
            *self.table.get_mut(i) = Segment::hold(self.time, now.vel, now.pos);
        }
    }

    /// If the constant acceleration segment is still running and the new
    /// speed is lower, end it early to get as close to the new speed as
    /// possible.
    fn shorten_accel_phase(&mut self, pos_end: f64) {
        let ramp_end = *self.table.get(SEG_ACCEL_MAX - 1);
        let accel_max = *self.table.get(SEG_ACCEL_MAX);
        let accel_end = *self.table.get(SEG_ACCEL_END);

        if self.time > accel_max.end_time
            || !is_positive(accel_max.end_time - ramp_end.end_time)
            || self.vel_max >= accel_end.end_vel
            || !is_positive(accel_max.end_accel)
        {
            return;
        }

        let vel_start = self.table.get(SEG_INIT).end_vel;

        // Lowest speed reachable by ending the constant acceleration now
        let vel_min = accel_end.end_vel
            - accel_max.end_accel * (accel_max.end_time - self.time.max(ramp_end.end_time));
        let vel_target = vel_min.max(self.vel_max);

        let sol = self.solve(vel_start, vel_target, pos_end / 2.0);
        self.table
            .append_speed_increase(SEG_INIT + 1, self.jerk_time, &sol);
        self.table
            .hold_segments(SEG_ACCEL_END + 1..=SEG_CONST, SEG_ACCEL_END);

        let sol = self.solve(0.0, vel_target, pos_end / 2.0);
        self.table
            .append_speed_decrease(SEG_CONST + 1, self.jerk_time, &sol);
        self.table.extend_cruise(pos_end);
    }

    /// Rebuild the velocity change segments to move from the end of the
    /// acceleration phase to the new speed limit, if there is room.
    fn rebuild_change_phase(&mut self) {
        self.table
            .hold_segments(SEG_ACCEL_END + 1..=SEG_CHANGE_END, SEG_ACCEL_END);

        let accel_end = *self.table.get(SEG_ACCEL_END);
        if is_equal(self.vel_max, accel_end.end_vel) {
            return;
        }

        // The change is approximated as taking length / speed with 12 jerk
        // times of margin
        let length = self.table.get(SEG_CONST).end_pos - accel_end.end_pos;
        let min_change_time = MIN_CHANGE_JERK_TIMES * self.jerk_time;

        if self.vel_max < accel_end.end_vel && min_change_time < length / accel_end.end_vel {
            let sol = self.solve(self.vel_max, accel_end.end_vel, length / 2.0);
            if is_positive(sol.jerk_max) {
                self.table
                    .append_speed_decrease(SEG_ACCEL_END + 1, self.jerk_time, &sol);
            }
        } else if self.vel_max > accel_end.end_vel && length / min_change_time > accel_end.end_vel {
            let vel_target = self.vel_max.min(length / min_change_time);
            let sol = self.solve(accel_end.end_vel, vel_target, length / 2.0);
            if is_positive(sol.jerk_max) {
                self.table
                    .append_speed_increase(SEG_ACCEL_END + 1, self.jerk_time, &sol);
            }
        }
    }

    /// Rebuild the cruise and deceleration so the leg ends at `pos_end` with
    /// speed no greater than `vel_end`.
    fn rebuild_decel_phase(&mut self, vel_end: f64, pos_end: f64) {
        let vel_end = vel_end.min(self.table.get(SEG_CHANGE_END).end_vel);

        let index = self.table.append_const_jerk(SEG_CONST, 0.0, 0.0);
        let cruise = *self.table.get(SEG_CONST);

        if vel_end < cruise.end_vel {
            let sol = self.solve(vel_end, cruise.end_vel, pos_end - cruise.end_pos);
            self.table.append_speed_decrease(index, self.jerk_time, &sol);
        } else {
            self.table
                .hold_segments(SEG_CONST + 1..=SEG_DECEL_END, SEG_CONST);
        }

        self.table.extend_cruise(pos_end);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn limits() -> TrackLimits {
        TrackLimits {
            speed_xy: 5.0,
            speed_up: 2.5,
            speed_down: 2.5,
            accel_xy: 2.0,
            accel_z: 1.0,
            jerk_time: 0.5,
            jerk_max: 5.0,
        }
    }

    fn leg(origin: [f64; 3], destination: [f64; 3]) -> SCurve {
        let mut leg = SCurve::default();
        leg.calculate_track(
            &Vector3::from(origin),
            &Vector3::from(destination),
            &limits(),
        );
        leg
    }

    fn assert_segments_monotonic(leg: &SCurve) {
        let segs = leg.segments().segments();
        for i in 1..NUM_SEGS {
            assert!(segs[i].end_time >= segs[i - 1].end_time);
            assert!(segs[i].end_pos >= segs[i - 1].end_pos - 1e-9);
        }
    }

    #[test]
    fn test_straight_leg() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);

        assert!(leg.is_built());
        assert_eq!(leg.get_speed_along_track(), 5.0);
        assert_eq!(leg.get_accel_along_track(), 2.0);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert!((leg.time_end() - 23.5).abs() < 1e-9);
        assert!((leg.get_accel_finished_time() - 3.5).abs() < 1e-9);

        // Starts at rest
        let mut target = TrackTarget::default();
        leg.move_from_time_pos_vel_accel(0.0, &mut target);
        assert_eq!(target, TrackTarget::default());

        // Step through the whole leg
        let mut prev = SCurve::default();
        let mut next = SCurve::default();
        let mut finished = false;
        let mut steps = 0;
        while !finished && steps < 10_000 {
            target = TrackTarget::default();
            finished =
                leg.advance_target_along_track(&mut prev, &mut next, 5.0, false, 0.1, &mut target);
            steps += 1;

            assert!(target.vel.x >= -1e-9 && target.vel.x <= 5.0 + 1e-9);
            assert!(target.accel.x.abs() <= 2.0 + 1e-9);
        }

        assert!(finished);
        assert!(leg.get_time_elapsed() > 23.5);
        assert!((target.pos - Vector3::new(100.0, 0.0, 0.0)).norm() < 1e-6);
        assert!(target.vel.norm() < 1e-6);
    }

    #[test]
    fn test_climbing_leg() {
        let leg = leg([0.0, 0.0, 0.0], [0.0, 0.0, 20.0]);

        // Vertical legs use the vertical limits
        assert_eq!(leg.get_speed_along_track(), 2.5);
        assert_eq!(leg.get_accel_along_track(), 1.0);
        assert!((leg.pos_end() - 20.0).abs() < 1e-9);

        let mut target = TrackTarget::default();
        leg.move_from_time_pos_vel_accel(leg.time_end(), &mut target);
        assert!((target.pos - Vector3::new(0.0, 0.0, 20.0)).norm() < 1e-9);
    }

    #[test]
    fn test_zero_length_leg() {
        let leg = leg([1.0, 2.0, 3.0], [1.0, 2.0, 3.0]);

        assert!(!leg.is_built());
        assert!(leg.finished());
        assert!(leg.braking());
        assert_eq!(leg.pos_end(), 0.0);
        assert_eq!(leg.time_end(), 0.0);
    }

    #[test]
    fn test_invalid_limits() {
        let mut leg = SCurve::default();
        leg.calculate_track(
            &Vector3::zeros(),
            &Vector3::new(10.0, 0.0, 0.0),
            &TrackLimits {
                jerk_time: 0.0,
                ..limits()
            },
        );

        assert!(!leg.is_built());
        assert!(leg.finished());
        assert_eq!(leg.get_track(), Vector3::zeros());
    }

    #[test]
    fn test_unbuilt_defaults() {
        let mut leg = SCurve::default();

        assert!(leg.finished());
        assert!(leg.braking());
        assert_eq!(leg.pos_end(), 0.0);
        assert_eq!(leg.time_end(), 0.0);
        assert_eq!(leg.get_time_remaining(), 0.0);
        assert_eq!(leg.get_accel_finished_time(), 0.0);
        assert_eq!(leg.set_origin_speed_max(3.0), 0.0);

        let mut target = TrackTarget::at(Vector3::new(1.0, 2.0, 3.0));
        leg.move_to_pos_vel_accel(0.1, &mut target);
        assert_eq!(target, TrackTarget::at(Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_same_speed_unchanged() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(6.0);
        let before = *leg.segments();

        leg.set_speed_max(5.0, 2.5, 2.5);

        assert_eq!(*leg.segments(), before);
    }

    #[test]
    fn test_speed_change_before_start() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.set_speed_max(3.0, 2.5, 2.5);

        assert!(leg.is_built());
        assert_eq!(leg.get_speed_along_track(), 3.0);
        assert!((leg.segments().get(SEG_ACCEL_END).end_vel - 3.0).abs() < 1e-9);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert!((leg.time_end() - 35.833_333).abs() < 1e-5);
        assert_segments_monotonic(&leg);
    }

    #[test]
    fn test_speed_change_in_cruise() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(6.0);
        let before = leg.segments().evaluate(6.0);

        leg.set_speed_max(3.0, 2.5, 2.5);

        // The current state is unchanged
        let after = leg.segments().evaluate(6.0);
        assert!((after.pos - before.pos).abs() < 1e-9);
        assert!((after.vel - before.vel).abs() < 1e-9);

        // Slows to the new speed and still finishes at the destination
        assert!((leg.segments().get(SEG_CHANGE_END).end_vel - 3.0).abs() < 1e-6);
        assert!((leg.segments().get(SEG_CONST).end_vel - 3.0).abs() < 1e-6);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert!(leg.segments().get(SEG_DECEL_END).end_vel.abs() < 1e-6);
        assert!((leg.time_end() - 32.833_333).abs() < 1e-5);
        assert_segments_monotonic(&leg);

        // Speeding up again
        leg.set_speed_max(5.0, 2.5, 2.5);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert_segments_monotonic(&leg);
    }

    #[test]
    fn test_speed_increase_in_cruise() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(6.0);
        leg.set_speed_max(7.0, 2.5, 2.5);

        assert!((leg.segments().get(SEG_CHANGE_END).end_vel - 7.0).abs() < 1e-6);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert!(leg.time_end() < 23.5);
        assert_segments_monotonic(&leg);
    }

    #[test]
    fn test_speed_change_while_accelerating() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        let ramp = *leg.segments().get(SEG_ACCEL_MAX - 1);
        leg.advance_time(1.2);
        let before = leg.segments().evaluate(1.2);

        leg.set_speed_max(3.0, 2.5, 2.5);

        // The elapsed part of the profile is unchanged, the constant
        // acceleration is cut short
        assert_eq!(*leg.segments().get(SEG_ACCEL_MAX - 1), ramp);
        let after = leg.segments().evaluate(1.2);
        assert!((after.pos - before.pos).abs() < 1e-9);
        assert!((after.vel - before.vel).abs() < 1e-9);
        assert!((leg.segments().get(SEG_ACCEL_MAX).end_time - 1.5).abs() < 1e-9);
        assert!((leg.segments().get(SEG_ACCEL_END).end_vel - 3.0).abs() < 1e-9);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert_segments_monotonic(&leg);
    }

    #[test]
    fn test_speed_change_while_braking() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(21.0);
        let before = *leg.segments();

        leg.set_speed_max(3.0, 2.5, 2.5);

        assert_eq!(*leg.segments(), before);
    }

    #[test]
    fn test_origin_speed() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);

        assert_eq!(leg.set_origin_speed_max(2.0), 2.0);
        assert!((leg.segments().evaluate(0.0).vel - 2.0).abs() < 1e-9);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert!((leg.time_end() - 22.5).abs() < 1e-9);
        assert_segments_monotonic(&leg);

        // Limited to the cruise speed
        let mut leg = self::leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        assert_eq!(leg.set_origin_speed_max(10.0), 5.0);
    }

    #[test]
    fn test_destination_speed() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.set_destination_speed_max(1.5);

        assert!((leg.segments().get(SEG_DECEL_END).end_vel - 1.5).abs() < 1e-9);
        assert!((leg.pos_end() - 100.0).abs() < 1e-9);
        assert!((leg.time_end() - 22.7125).abs() < 1e-9);
        assert_segments_monotonic(&leg);
    }

    #[test]
    fn test_origin_speed_after_start() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(10.0);
        let before = *leg.segments();

        // The acceleration phase has already been travelled
        assert_eq!(leg.set_origin_speed_max(2.0), 0.0);
        assert_eq!(*leg.segments(), before);
        assert!((leg.segments().evaluate(10.0).pos - 41.25).abs() < 1e-9);
    }

    #[test]
    fn test_destination_speed_in_cruise() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(10.0);
        let pos = leg.segments().evaluate(10.0).pos;

        leg.set_destination_speed_max(1.5);

        assert!((leg.segments().get(SEG_DECEL_END).end_vel - 1.5).abs() < 1e-9);
        assert!((leg.time_end() - 22.7125).abs() < 1e-9);
        assert!((leg.segments().evaluate(10.0).pos - pos).abs() < 1e-9);
    }

    #[test]
    fn test_destination_speed_while_braking() {
        let mut leg = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        leg.advance_time(22.0);
        assert!(leg.braking());
        let before = *leg.segments();

        leg.set_destination_speed_max(2.0);

        assert_eq!(*leg.segments(), before);
        assert!((leg.segments().evaluate(22.0).vel - 2.0).abs() < 1e-9);
    }

    /// Step `this` until it is consumed, returning the final target.
    fn run_corner(this: &mut SCurve, next: &mut SCurve, wp_radius: f64, fast: bool) -> TrackTarget {
        let mut prev = SCurve::default();
        let mut target = TrackTarget::default();

        for _ in 0..100_000 {
            target = TrackTarget::default();
            if this.advance_target_along_track(&mut prev, next, wp_radius, fast, 0.01, &mut target) {
                break;
            }
        }

        target
    }

    #[test]
    fn test_corner_cutting() {
        let mut this = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        let mut next = leg([100.0, 0.0, 0.0], [100.0, 100.0, 0.0]);

        let target = run_corner(&mut this, &mut next, 5.0, true);

        // The next leg starts when braking begins, with 3.5 s to go, and
        // takes over halfway through the remaining time
        assert!((this.get_time_elapsed() - 21.75).abs() < 0.02);
        assert!((next.get_time_elapsed() - 1.75).abs() < 0.05);
        assert!(next.get_time_elapsed() >= this.get_time_remaining());

        // Handover happens close to the corner while still moving
        assert!((target.pos - Vector3::new(100.0, 0.0, 0.0)).norm() < 5.0);
        assert!(target.vel.y > 0.0);
        assert!(target.vel.x > 0.0);
    }

    #[test]
    fn test_corner_outside_radius() {
        // The predicted corner is never strictly inside a zero radius
        let mut this = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        let mut next = leg([100.0, 0.0, 0.0], [100.0, 100.0, 0.0]);

        let target = run_corner(&mut this, &mut next, 0.0, true);

        assert!(this.get_time_elapsed() > 23.5);
        assert_eq!(next.get_time_elapsed(), 0.0);
        assert!((target.pos - Vector3::new(100.0, 0.0, 0.0)).norm() < 1e-6);
        assert!(target.vel.norm() < 1e-6);
    }

    #[test]
    fn test_corner_small_radius() {
        // A tight radius delays the blend until the corner is close to the
        // waypoint
        let mut this = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        let mut next = leg([100.0, 0.0, 0.0], [100.0, 100.0, 0.0]);

        let target = run_corner(&mut this, &mut next, 0.01, true);

        assert!((this.get_time_elapsed() - 23.08).abs() < 0.02);
        assert!((next.get_time_elapsed() - 0.42).abs() < 0.02);
        assert!((target.pos - Vector3::new(100.0, 0.0, 0.0)).norm() < 0.02);
    }

    #[test]
    fn test_corner_accel_limited() {
        // Reversing at the waypoint: the predicted corner speed is zero and
        // the radius is not binding, but both legs braking and accelerating
        // along -x reach twice the acceleration limit. The blend waits until
        // the combined acceleration drops below it.
        let mut this = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        let mut next = leg([100.0, 0.0, 0.0], [0.0, 0.0, 0.0]);

        let target = run_corner(&mut this, &mut next, 1000.0, true);

        // Blend starts with about 2 s to go instead of 3.5 s
        assert!((this.get_time_elapsed() - 22.5).abs() < 0.02);
        assert!((next.get_time_elapsed() - 1.0).abs() < 0.02);
        assert!(target.pos.x < 100.0);
        assert!(target.vel.norm() < 1e-6);
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut this = leg([0.0, 0.0, 0.0], [100.0, 0.0, 0.0]);
        let mut next = leg([100.0, 0.0, 0.0], [100.0, 100.0, 0.0]);

        let target = run_corner(&mut this, &mut next, 5.0, false);

        // Stops at the waypoint without starting the next leg
        assert!(this.get_time_elapsed() > 23.5);
        assert_eq!(next.get_time_elapsed(), 0.0);
        assert!((target.pos - Vector3::new(100.0, 0.0, 0.0)).norm() < 1e-6);
    }
}
