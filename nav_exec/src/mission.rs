//! Mission files
//!
//! A mission is a TOML file giving the starting position and the sequence of
//! waypoints to visit, all in meters in the local frame (z up):
//!
//! ```toml
//! origin_m = [0.0, 0.0, 0.0]
//! waypoints_m = [
//!     [20.0, 0.0, 0.0],
//!     [20.0, 20.0, 5.0],
//! ]
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// Internal
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Mission {
    /// Starting position of the vehicle
    pub origin_m: [f64; 3],

    /// Waypoints to visit in order
    pub waypoints_m: Vec<[f64; 3]>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("Could not load the mission file: {0}")]
    LoadError(params::LoadError),

    #[error("Waypoint {0} is not finite")]
    NonFiniteWaypoint(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Mission {
    /// Load a mission from the given file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MissionError> {
        let mission: Self = params::load_file(path).map_err(MissionError::LoadError)?;
        mission.validate()?;

        Ok(mission)
    }

    /// Parse a mission from a TOML string.
    pub fn from_str(mission_str: &str) -> Result<Self, MissionError> {
        let mission: Self = params::from_str(mission_str).map_err(MissionError::LoadError)?;
        mission.validate()?;

        Ok(mission)
    }

    pub fn origin(&self) -> Vector3<f64> {
        Vector3::from(self.origin_m)
    }

    pub fn waypoints(&self) -> Vec<Vector3<f64>> {
        self.waypoints_m.iter().map(|&w| Vector3::from(w)).collect()
    }

    /// Check that every coordinate is finite. The origin is reported as
    /// waypoint 0 and the waypoints from 1.
    fn validate(&self) -> Result<(), MissionError> {
        std::iter::once(&self.origin_m)
            .chain(self.waypoints_m.iter())
            .enumerate()
            .find(|(_, p)| p.iter().any(|c| !c.is_finite()))
            .map_or(Ok(()), |(i, _)| Err(MissionError::NonFiniteWaypoint(i)))
    }
}
