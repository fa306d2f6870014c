//! # Waypoint Engine Module
//!
//! The waypoint engine tracks a vehicle's progress along an ordered sequence
//! of points. Each call to `WptEngine::advance` takes the vehicle position and
//! reports what happened as a `WptEvent`:
//!
//! - `Empty` - there are no points to follow,
//! - `Transit` - still heading for the current waypoint,
//! - `Advanced` - the current waypoint was reached, the next one is active,
//! - `Cycled` - the last point was reached and the sequence restarted,
//! - `Completed` - the last point was reached and no repeats are left.
//!
//! A waypoint is reached if any of the following hold:
//!
//! - the vehicle is inside the capture radius,
//! - the vehicle was once inside the slip radius and is now moving away from
//!   the waypoint (a "slip" hit, fired once at the first receding sample),
//! - the capture line is enabled and the vehicle has crossed the line through
//!   the waypoint perpendicular to the track from the previous point.
//!
//! When a lead distance and damper are configured the engine also computes a
//! track point, a point on the track line ahead of the vehicle which pulls it
//! back onto the line rather than steering straight at the waypoint.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;
