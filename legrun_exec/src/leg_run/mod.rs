//! # Leg run controller
//!
//! Drives a vehicle back and forth along a straight leg between two points,
//! making a reversing turn at each end. The controller cycles through three
//! modes:
//!
//! - `Leg1` - heading for the first leg point (`p1`)
//! - `Turn` - following a generated turn path back onto the leg
//! - `Leg2` - heading for the second leg point (`p2`)
//!
//! so the mode sequence from start up is always `leg1, turn, leg2, turn,
//! leg1, ...`. Mode handlers never switch mode themselves, they return a
//! `ModeRequest` which the controller applies once per cycle.
//!
//! The leg can be moved, stretched or rotated at any time. Geometry updates
//! are staged and only take effect when `settle` is called, at which point a
//! turn in progress is interrupted so the vehicle doesn't finish a turn that
//! no longer meets the leg.
//!
//! Each cycle the controller produces a course and speed objective, plus a
//! list of postings: status lines, flags, visuals and, when coordination is
//! enabled, the turn distance broadcast used by `turn_coord`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod flags;
mod leg;
mod params;
mod speeds;
mod state;
mod viz;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use flags::*;
pub use leg::*;
pub use params::*;
pub use speeds::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in configuring the controller.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown parameter {0}")]
    UnknownParam(String),

    #[error("Could not parse value \"{1}\" for parameter {0}")]
    InvalidValue(String, String),

    #[error("Value {1} for parameter {0} is out of range")]
    OutOfRange(String, f64),

    #[error("Leg of length {0:.2} m is shorter than the minimum of {1:.2} m")]
    LegTooShort(f64, f64),

    #[error("Leg points have not been set")]
    LegUnset,

    #[error("Waypoint engine rejected the parameter: {0}")]
    WptParam(crate::wpt_eng::ParamError),
}

/// Errors in initialising or running the controller.
#[derive(Debug, thiserror::Error)]
pub enum LegRunError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid configuration: {0}")]
    ConfigError(ConfigError),
}

impl From<crate::wpt_eng::ParamError> for ConfigError {
    fn from(e: crate::wpt_eng::ParamError) -> Self {
        ConfigError::WptParam(e)
    }
}
