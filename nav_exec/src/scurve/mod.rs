//! # S-Curve trajectory module
//!
//! Generates jerk limited trajectories along a straight line (a leg) between
//! an origin and a destination. A leg is described by a fixed table of 23
//! segments, each holding the cumulative jerk, acceleration, velocity and
//! position along the leg at the end of that phase:
//!
//! | Index    | Phase                                               |
//! |----------|-----------------------------------------------------|
//! | 0        | Initial state                                       |
//! | 1 - 7    | Acceleration (jerk up, constant acceleration, jerk down) |
//! | 8 - 14   | Velocity change, zero length until the speed is retargeted |
//! | 15       | Constant velocity cruise                            |
//! | 16 - 22  | Deceleration, mirrored in jerk sign                 |
//!
//! The jerk ramps use a raised cosine profile so the acceleration is
//! continuous across every segment boundary. All quantities inside the table
//! are scalars along the leg, `SCurve` projects them onto the leg direction.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod builder;
mod eval;
mod segment;
mod solver;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use eval::MotionState;
pub use segment::*;
pub use solver::*;
pub use state::*;
