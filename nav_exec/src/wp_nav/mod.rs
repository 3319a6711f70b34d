//! # Waypoint navigation module
//!
//! Waypoint navigation drives a position target through a sequence of
//! waypoints, one S-curve leg between each pair. Three legs are kept at any
//! time:
//!
//! - the previous leg, which may still be finishing after a corner was cut,
//! - the current leg,
//! - the next leg, built ahead of time so that it can be started before the
//!   current one finishes.
//!
//! When fast waypoints are enabled the next leg is started as soon as the
//! corner it would create is predicted to stay within the waypoint radius and
//! the limits of both legs, giving a smooth blend through the waypoint. On
//! handover the legs shift down (next becomes current, current becomes
//! previous). Otherwise the vehicle comes to a stop at each waypoint.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;
