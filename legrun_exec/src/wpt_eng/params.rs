//! Waypoint engine parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the waypoint engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Distance inside which a waypoint counts as reached.
    pub capture_radius_m: f64,

    /// Near miss distance. A waypoint counts as reached once the vehicle has
    /// been inside this radius and starts to move away. Only used when larger
    /// than the capture radius.
    pub slip_radius_m: f64,

    /// Whether crossing the line perpendicular to the track through the
    /// waypoint counts as reaching it.
    pub capture_line: CaptureLine,

    /// Distance ahead along the track line to place the track point, zero
    /// to steer straight at the waypoint.
    pub lead_m: f64,

    /// Cross-track distance inside which the lead distance is stretched (by
    /// up to a factor of 3 on the track line), zero to disable trackline
    /// following.
    pub lead_damper_m: f64,

    /// How many extra times the sequence is repeated.
    pub repeat: Repeat,

    /// Order the sequence is followed in.
    pub order: Order,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Capture line behaviour
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureLine {
    Off,
    On,

    /// The capture line is the only arrival criterion, both radii are zeroed
    Absolute,
}

/// Number of times the sequence is repeated after the first pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RepeatRepr", into = "RepeatRepr")]
pub enum Repeat {
    Forever,
    Times(u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Normal,
    Reverse,
}

/// How a repeat count is written in a parameter file, either a number or
/// the word `forever`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RepeatRepr {
    Times(u32),
    Word(String),
}

/// Errors from setting an engine parameter by name.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("Unknown waypoint engine parameter {0}")]
    UnknownParam(String),

    #[error("Invalid value for waypoint engine parameter {0}: {1}")]
    InvalidValue(String, String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            capture_radius_m: 3.0,
            slip_radius_m: 15.0,
            capture_line: CaptureLine::Off,
            lead_m: 0.0,
            lead_damper_m: 0.0,
            repeat: Repeat::Times(0),
            order: Order::Normal,
        }
    }
}

impl Repeat {
    /// The repeat count as a signed integer, -1 meaning forever.
    pub fn as_i64(&self) -> i64 {
        match self {
            Repeat::Forever => -1,
            Repeat::Times(n) => *n as i64,
        }
    }
}

impl FromStr for Repeat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("forever") {
            Ok(Repeat::Forever)
        }
        else {
            s.parse::<u32>()
                .map(Repeat::Times)
                .map_err(|_| format!("expected \"forever\" or a count, found {}", s))
        }
    }
}

impl TryFrom<RepeatRepr> for Repeat {
    type Error = String;

    fn try_from(r: RepeatRepr) -> Result<Self, Self::Error> {
        match r {
            RepeatRepr::Times(n) => Ok(Repeat::Times(n)),
            RepeatRepr::Word(w) => w.parse(),
        }
    }
}

impl From<Repeat> for RepeatRepr {
    fn from(r: Repeat) -> Self {
        match r {
            Repeat::Forever => RepeatRepr::Word("forever".into()),
            Repeat::Times(n) => RepeatRepr::Times(n),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repeat::Forever => write!(f, "forever"),
            Repeat::Times(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for CaptureLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "on" => Ok(CaptureLine::On),
            "false" | "off" => Ok(CaptureLine::Off),
            "absolute" => Ok(CaptureLine::Absolute),
            o => Err(format!("expected true, false or absolute, found {}", o)),
        }
    }
}

impl fmt::Display for CaptureLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureLine::Off => write!(f, "false"),
            CaptureLine::On => write!(f, "true"),
            CaptureLine::Absolute => write!(f, "absolute"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        wpt: Params,
    }

    #[test]
    fn test_params_from_toml() {
        let w: Wrapper = util::params::parse(
            "[wpt]\n\
            capture_radius_m = 5.0\n\
            repeat = \"forever\"\n\
            capture_line = \"absolute\"\n"
        ).unwrap();

        assert_eq!(w.wpt.capture_radius_m, 5.0);
        assert_eq!(w.wpt.slip_radius_m, 15.0);
        assert_eq!(w.wpt.repeat, Repeat::Forever);
        assert_eq!(w.wpt.capture_line, CaptureLine::Absolute);

        let w: Wrapper = util::params::parse("[wpt]\nrepeat = 3\n").unwrap();
        assert_eq!(w.wpt.repeat, Repeat::Times(3));

        assert!(util::params::parse::<Wrapper>("[wpt]\nrepeat = \"often\"\n").is_err());
    }

    #[test]
    fn test_repeat_from_str() {
        assert_eq!("Forever".parse::<Repeat>(), Ok(Repeat::Forever));
        assert_eq!("2".parse::<Repeat>(), Ok(Repeat::Times(2)));
        assert!("-1".parse::<Repeat>().is_err());
        assert_eq!(Repeat::Forever.as_i64(), -1);
    }
}
