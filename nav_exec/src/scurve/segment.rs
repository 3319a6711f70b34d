//! Segment table for a single S-curve leg

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::error;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Index of the initial state.
pub const SEG_INIT: usize = 0;

/// Index of the constant acceleration segment of the acceleration phase.
pub const SEG_ACCEL_MAX: usize = 4;

/// Index of the last segment of the acceleration phase.
pub const SEG_ACCEL_END: usize = 7;

/// Index of the last segment of the velocity change phase.
pub const SEG_CHANGE_END: usize = 14;

/// Index of the constant velocity (cruise) segment.
pub const SEG_CONST: usize = 15;

/// Index of the last segment of the deceleration phase.
pub const SEG_DECEL_END: usize = 22;

/// Number of segments in a fully built leg.
pub const NUM_SEGS: usize = SEG_DECEL_END + 1;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Shape of the jerk within a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentType {
    /// Jerk is held at `jerk_ref` for the whole segment.
    ConstantJerk,

    /// Jerk rises from zero to `jerk_ref` along a raised cosine.
    PositiveJerk,

    /// Jerk falls from `jerk_ref` to zero along a raised cosine.
    NegativeJerk,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state along the leg at the end of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// Time since the start of the leg at which this segment ends.
    ///
    /// Units: seconds
    pub end_time: f64,

    pub seg_type: SegmentType,

    /// Peak (or constant) jerk of this segment.
    ///
    /// Units: meters/second^3
    pub jerk_ref: f64,

    /// Units: meters/second^2
    pub end_accel: f64,

    /// Units: meters/second
    pub end_vel: f64,

    /// Units: meters
    pub end_pos: f64,
}

/// Fixed table of segments describing one leg, plus the number of segments
/// which have been built.
///
/// Only a table with `NUM_SEGS` built segments describes a usable leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentTable {
    segments: [Segment; NUM_SEGS],

    num_segs: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SegmentType {
    fn default() -> Self {
        SegmentType::ConstantJerk
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::hold(0.0, 0.0, 0.0)
    }
}

impl Segment {
    /// A zero jerk, zero acceleration segment ending at the given time, speed
    /// and position.
    pub fn hold(end_time: f64, end_vel: f64, end_pos: f64) -> Self {
        Self {
            end_time,
            seg_type: SegmentType::ConstantJerk,
            jerk_ref: 0.0,
            end_accel: 0.0,
            end_vel,
            end_pos,
        }
    }
}

impl Default for SegmentTable {
    fn default() -> Self {
        let mut table = Self {
            segments: [Segment::default(); NUM_SEGS],
            num_segs: SEG_INIT,
        };
        table.reset();
        table
    }
}

impl SegmentTable {
    /// Clear the table back to a single stationary initial segment.
    pub fn reset(&mut self) {
        self.segments = [Segment::default(); NUM_SEGS];
        self.num_segs = self.append(SEG_INIT, Segment::default());
    }

    /// Number of segments that have been built.
    pub fn num_segs(&self) -> usize {
        self.num_segs
    }

    /// Set the number of built segments, usually to the cursor returned by
    /// the final append of a build.
    pub fn set_num_segs(&mut self, num_segs: usize) {
        self.num_segs = num_segs.min(NUM_SEGS);
    }

    /// True if every segment of the leg has been built.
    pub fn is_full(&self) -> bool {
        self.num_segs == NUM_SEGS
    }

    /// All segments, including any which have not been built.
    pub fn segments(&self) -> &[Segment; NUM_SEGS] {
        &self.segments
    }

    /// The segment at `index`.
    ///
    /// Indices are always one of the `SEG_*` constants or derived from them,
    /// out of range indices are clamped to the last segment.
    pub fn get(&self, index: usize) -> &Segment {
        &self.segments[index.min(SEG_DECEL_END)]
    }

    /// Mutable access to the segment at `index`, see [`SegmentTable::get`].
    pub fn get_mut(&mut self, index: usize) -> &mut Segment {
        &mut self.segments[index.min(SEG_DECEL_END)]
    }

    /// Write a segment at `index` and return the index of the next segment.
    ///
    /// Writes beyond the end of the table are refused and the cursor is
    /// returned unchanged.
    pub fn append(&mut self, index: usize, segment: Segment) -> usize {
        if index >= NUM_SEGS {
            error!(
                "Attempted to write segment {} beyond the end of the table ({} segments)",
                index, NUM_SEGS
            );
            return index;
        }

        self.segments[index] = segment;
        index + 1
    }
}
