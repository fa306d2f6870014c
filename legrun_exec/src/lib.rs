//! # Leg run library.
//!
//! Everything the leg run executable is built from, exposed so the
//! benchmarks and any other host can drive the controller directly.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Input buffer - named values read by the controller each cycle
pub mod info;

/// Leg run controller - runs back and forth along a leg, turning at each end
pub mod leg_run;

/// Objective functions over course and speed
pub mod objective;

/// Turn coordination - matches turn speeds with peers sharing a group
pub mod turn_coord;

/// Turn path generators
pub mod turn_gen;

/// Waypoint engine - tracks arrival at a sequence of points
pub mod wpt_eng;
