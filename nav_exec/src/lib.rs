//! # Navigation library
//!
//! Trajectory generation and waypoint navigation for the navigation
//! executable.
//!
//! - `scurve` builds and evaluates jerk-limited straight-line legs,
//! - `wp_nav` sequences legs through a mission and blends the corners,
//! - `mission` loads the waypoint lists to execute.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod mission;
pub mod scurve;
pub mod wp_nav;
