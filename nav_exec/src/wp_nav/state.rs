//! Waypoint navigation module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector3;
use serde::Serialize;
use std::collections::VecDeque;
use util::{maths::is_positive, params};

// Internal
use super::*;
use crate::scurve::{SCurve, TrackLimits, TrackTarget};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct WpNav {
    params: Params,

    /// Executing mode
    mode: WpNavMode,

    /// Limits used to build new legs, updated by speed changes
    limits: TrackLimits,

    output_target: TrackTarget,
    report: StatusReport,

    /// Origin of the current leg
    origin: Vector3<f64>,

    /// Destination of the current leg
    destination: Vector3<f64>,

    /// Waypoints following the current destination
    pending: VecDeque<Vector3<f64>>,

    /// Index of the current leg within the mission
    leg_index: usize,

    /// Position held once the mission is complete or aborted
    hold_pos: Vector3<f64>,

    prev_leg: SCurve,
    this_leg: SCurve,
    next_leg: SCurve,

    /// If true the current leg may blend into the next one
    fast_waypoint: bool,
}

/// The status report containing various monitoring quantities.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub mode: WpNavMode,

    /// Index of the leg being executed
    pub leg_index: usize,

    /// Time left on the current leg
    pub time_remaining_s: f64,

    /// True if a new leg became current during this cycle
    pub leg_changed: bool,

    /// True if the next leg has been started before the current one finished
    pub corner_cutting: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum WpNavError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    /// A mission is already being executed. Abort it before starting a new one.
    #[error("Attempted to begin a mission while one is already in progress")]
    MissionAlreadyLoaded,

    #[error("Attempted to begin a mission with no waypoints")]
    EmptyMission,
}

/// The possible modes of execution of WpNav. Each mode is handled by a
/// `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum WpNavMode {
    Off,
    FollowLegs,
    MissionComplete,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WpNavMode {
    fn default() -> Self {
        WpNavMode::Off
    }
}

impl WpNav {
    /// Initialise the WpNav module.
    ///
    /// Expected init data is a path to the parameter file.
    pub fn init(params_path: &str) -> Result<Self, WpNavError> {
        let params = params::load(params_path).map_err(WpNavError::ParamLoadError)?;

        Ok(Self::new(params))
    }

    /// Create a new instance from already loaded parameters.
    pub fn new(params: Params) -> Self {
        Self {
            limits: params.track_limits(),
            params,
            mode: WpNavMode::Off,
            output_target: TrackTarget::default(),
            report: StatusReport::default(),
            origin: Vector3::zeros(),
            destination: Vector3::zeros(),
            pending: VecDeque::new(),
            leg_index: 0,
            hold_pos: Vector3::zeros(),
            prev_leg: SCurve::default(),
            this_leg: SCurve::default(),
            next_leg: SCurve::default(),
            fast_waypoint: false,
        }
    }

    /// Process waypoint navigation, advancing the target by `dt` seconds.
    pub fn proc(&mut self, dt: f64) -> Result<(TrackTarget, StatusReport), WpNavError> {
        self.report = StatusReport::default();

        match self.mode {
            WpNavMode::Off => self.mode_off(),
            WpNavMode::FollowLegs => self.mode_follow_legs(dt),
            WpNavMode::MissionComplete => self.mode_mission_complete(),
        }?;

        self.report.mode = self.mode;
        self.report.leg_index = self.leg_index;

        Ok((self.output_target, self.report))
    }

    /// Begin executing a mission.
    ///
    /// The vehicle is assumed to be stationary at `origin`, and will visit
    /// each of the `waypoints` in order. Execution begins on the next call to
    /// `proc`.
    ///
    /// Beginning a new mission before the current one has finished will
    /// result in an error. To stop a mission whilst it's executing you must
    /// call `abort_mission`.
    pub fn begin_mission(
        &mut self,
        origin: Vector3<f64>,
        waypoints: Vec<Vector3<f64>>,
    ) -> Result<(), WpNavError> {
        if self.mode == WpNavMode::FollowLegs {
            return Err(WpNavError::MissionAlreadyLoaded);
        }

        let mut pending: VecDeque<_> = waypoints.into();
        let destination = match pending.pop_front() {
            Some(d) => d,
            None => return Err(WpNavError::EmptyMission),
        };

        info!(
            "Beginning mission of {} waypoints from {:?}",
            pending.len() + 1,
            origin.as_slice()
        );

        self.origin = origin;
        self.destination = destination;
        self.pending = pending;
        self.leg_index = 0;
        self.output_target = TrackTarget::at(origin);

        self.prev_leg.init();
        self.this_leg
            .calculate_track(&self.origin, &self.destination, &self.limits);
        self.build_next_leg();

        self.mode = WpNavMode::FollowLegs;

        Ok(())
    }

    /// Abort the current mission.
    ///
    /// The target is held at its last position with zero velocity from the
    /// next call to `proc`.
    pub fn abort_mission(&mut self) {
        if self.mode == WpNavMode::FollowLegs {
            info!("Mission aborted on leg {}", self.leg_index);
            self.finish_mission(self.output_target.pos);
        }
    }

    /// Change the horizontal speed limit, updating the current and next legs.
    pub fn set_speed_xy(&mut self, speed_ms: f64) {
        self.limits.speed_xy = speed_ms;

        let TrackLimits {
            speed_xy,
            speed_up,
            speed_down,
            ..
        } = self.limits;
        self.this_leg.set_speed_max(speed_xy, speed_up, speed_down);
        self.next_leg.set_speed_max(speed_xy, speed_up, speed_down);
    }

    pub fn mode(&self) -> WpNavMode {
        self.mode
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The leg currently being executed.
    pub fn current_leg(&self) -> &SCurve {
        &self.this_leg
    }

    /// Mode not executing.
    ///
    /// No actions are taken in this mode. To move from Off to FollowLegs the
    /// user must call `begin_mission`.
    fn mode_off(&mut self) -> Result<(), WpNavError> {
        Ok(())
    }

    /// Mode following legs.
    ///
    /// The target starts from the current leg origin and each leg adds its
    /// own motion. When the current leg is consumed the legs are shifted and
    /// a new next leg is built.
    fn mode_follow_legs(&mut self, dt: f64) -> Result<(), WpNavError> {
        let mut target = TrackTarget::at(self.origin);

        let leg_done = self.this_leg.advance_target_along_track(
            &mut self.prev_leg,
            &mut self.next_leg,
            self.params.wp_radius_m,
            self.fast_waypoint,
            dt,
            &mut target,
        );

        self.output_target = target;
        self.report.corner_cutting = is_positive(self.next_leg.get_time_elapsed());

        if leg_done {
            self.shift_legs();
        }

        self.report.time_remaining_s = self.this_leg.get_time_remaining();

        Ok(())
    }

    /// Mode mission complete.
    ///
    /// Hold the final position.
    fn mode_mission_complete(&mut self) -> Result<(), WpNavError> {
        self.output_target = TrackTarget::at(self.hold_pos);
        Ok(())
    }

    /// Make the next leg current, or finish the mission if there are no more
    /// waypoints.
    fn shift_legs(&mut self) {
        let next_destination = match self.pending.pop_front() {
            Some(d) => d,
            None => {
                info!("Mission complete at {:?}", self.destination.as_slice());
                self.finish_mission(self.destination);
                return;
            }
        };

        // The current leg only needs to keep contributing if the corner is
        // being cut
        self.prev_leg = match self.fast_waypoint {
            true => std::mem::take(&mut self.this_leg),
            false => SCurve::default(),
        };
        self.this_leg = std::mem::take(&mut self.next_leg);

        self.origin = self.destination;
        self.destination = next_destination;
        self.leg_index += 1;
        self.report.leg_changed = true;

        debug!(
            "Starting leg {} to {:?} ({:.3} s elapsed)",
            self.leg_index,
            self.destination.as_slice(),
            self.this_leg.get_time_elapsed()
        );

        self.build_next_leg();
    }

    /// Build the leg following the current one, if there is one.
    fn build_next_leg(&mut self) {
        match self.pending.front() {
            Some(next_destination) => {
                self.next_leg
                    .calculate_track(&self.destination, next_destination, &self.limits);
                self.fast_waypoint = self.params.fast_waypoints && self.next_leg.is_built();
            }
            None => {
                self.next_leg.init();
                self.fast_waypoint = false;
            }
        }
    }

    fn finish_mission(&mut self, hold_pos: Vector3<f64>) {
        self.hold_pos = hold_pos;
        self.output_target = TrackTarget::at(hold_pos);
        self.pending.clear();
        self.prev_leg.init();
        self.this_leg.init();
        self.next_leg.init();
        self.fast_waypoint = false;
        self.mode = WpNavMode::MissionComplete;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(fast_waypoints: bool) -> Params {
        Params {
            speed_xy_ms: 5.0,
            speed_up_ms: 2.5,
            speed_down_ms: 2.5,
            accel_xy_mss: 2.0,
            accel_z_mss: 1.0,
            jerk_time_s: 0.5,
            jerk_max_msss: 5.0,
            wp_radius_m: 5.0,
            fast_waypoints,
            cycle_period_s: 0.01,
            max_duration_s: 1000.0,
        }
    }

    fn square() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(20.0, 0.0, 0.0),
            Vector3::new(20.0, 20.0, 0.0),
            Vector3::new(0.0, 20.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
        ]
    }

    /// Run a mission to completion, returning the mission duration, number of
    /// leg changes and the final target.
    fn run(nav: &mut WpNav) -> (f64, usize, TrackTarget) {
        let mut time: f64 = 0.0;
        let mut leg_changes = 0;
        let mut target = TrackTarget::default();

        while nav.mode() == WpNavMode::FollowLegs && time < 1000.0 {
            let (t, report) = nav.proc(0.01).unwrap();
            target = t;
            time += 0.01;

            if report.leg_changed {
                leg_changes += 1;
            }
        }

        (time, leg_changes, target)
    }

    #[test]
    fn test_begin_mission_errors() {
        let mut nav = WpNav::new(params(false));

        assert!(matches!(
            nav.begin_mission(Vector3::zeros(), vec![]),
            Err(WpNavError::EmptyMission)
        ));
        assert_eq!(nav.mode(), WpNavMode::Off);

        nav.begin_mission(Vector3::zeros(), square()).unwrap();
        assert_eq!(nav.mode(), WpNavMode::FollowLegs);

        assert!(matches!(
            nav.begin_mission(Vector3::zeros(), square()),
            Err(WpNavError::MissionAlreadyLoaded)
        ));
    }

    #[test]
    fn test_off_does_nothing() {
        let mut nav = WpNav::new(params(false));
        let (target, report) = nav.proc(0.01).unwrap();

        assert_eq!(target, TrackTarget::default());
        assert_eq!(report.mode, WpNavMode::Off);
    }

    #[test]
    fn test_mission_stopping_at_waypoints() {
        let mut nav = WpNav::new(params(false));
        nav.begin_mission(Vector3::zeros(), square()).unwrap();

        let (time, leg_changes, target) = run(&mut nav);

        assert_eq!(nav.mode(), WpNavMode::MissionComplete);
        assert_eq!(leg_changes, 3);
        assert!((time - 30.04).abs() < 0.05);
        assert!(target.pos.norm() < 1e-6);

        // The final position is held
        let (target, report) = nav.proc(0.01).unwrap();
        assert_eq!(target, TrackTarget::default());
        assert_eq!(report.mode, WpNavMode::MissionComplete);

        // A new mission can be started once complete
        assert!(nav.begin_mission(Vector3::zeros(), square()).is_ok());
    }

    #[test]
    fn test_fast_waypoints() {
        let mut nav = WpNav::new(params(true));
        nav.begin_mission(Vector3::zeros(), square()).unwrap();

        let mut cut_corner = false;
        let mut max_handover_dist: f64 = 0.0;
        let mut time: f64 = 0.0;
        while nav.mode() == WpNavMode::FollowLegs && time < 1000.0 {
            let (target, report) = nav.proc(0.01).unwrap();
            time += 0.01;

            if report.corner_cutting {
                cut_corner = true;
            }

            // Hands over to the next leg close to the waypoint being passed
            if report.leg_changed {
                let dist = square()
                    .iter()
                    .map(|wp| (target.pos - wp).norm())
                    .fold(f64::INFINITY, f64::min);
                max_handover_dist = max_handover_dist.max(dist);
            }
        }

        assert!(cut_corner);
        assert!(max_handover_dist < 5.0);
        assert_eq!(nav.mode(), WpNavMode::MissionComplete);

        // Faster than stopping at every waypoint
        assert!((time - 19.51).abs() < 0.05);
    }

    #[test]
    fn test_duplicate_waypoint() {
        let mut nav = WpNav::new(params(true));
        nav.begin_mission(
            Vector3::zeros(),
            vec![
                Vector3::new(20.0, 0.0, 0.0),
                Vector3::new(20.0, 0.0, 0.0),
                Vector3::new(40.0, 0.0, 0.0),
            ],
        )
        .unwrap();

        let (_, leg_changes, target) = run(&mut nav);

        assert_eq!(nav.mode(), WpNavMode::MissionComplete);
        assert_eq!(leg_changes, 2);
        assert!((target.pos - Vector3::new(40.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_abort() {
        let mut nav = WpNav::new(params(false));
        nav.begin_mission(Vector3::zeros(), square()).unwrap();

        let mut last = TrackTarget::default();
        for _ in 0..300 {
            last = nav.proc(0.01).unwrap().0;
        }
        assert!(last.vel.norm() > 0.0);

        nav.abort_mission();
        let (target, report) = nav.proc(0.01).unwrap();

        assert_eq!(report.mode, WpNavMode::MissionComplete);
        assert_eq!(target.pos, last.pos);
        assert_eq!(target.vel, Vector3::zeros());
    }

    #[test]
    fn test_set_speed() {
        let mut nav = WpNav::new(params(false));
        nav.begin_mission(Vector3::zeros(), vec![Vector3::new(100.0, 0.0, 0.0)])
            .unwrap();

        let (_, report) = nav.proc(0.01).unwrap();
        let remaining = report.time_remaining_s;

        nav.set_speed_xy(3.0);
        let (_, report) = nav.proc(0.01).unwrap();

        assert_eq!(nav.current_leg().get_speed_along_track(), 3.0);
        assert!(report.time_remaining_s > remaining);
    }
}
