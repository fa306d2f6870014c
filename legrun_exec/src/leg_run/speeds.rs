//! Per-leg speed overrides

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::str::FromStr;

use super::{params::parse_num, ConfigError};
use comms_if::legrun::LegSpdsReport;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// List of leg speeds and the one in force.
///
/// Each time a leg starts the next speed in the list is used. The first leg
/// after a list is (re)loaded uses the first speed.
#[derive(Debug, Clone, Default)]
pub struct LegSpeeds {
    spds_ms: Vec<f64>,

    /// Index of the last speed used, -1 before the first leg
    ix: i64,

    curr_ms: Option<f64>,

    /// Wrap to the start of the list after the last speed
    pub repeat: bool,

    /// Keep the override through turns
    pub onturn: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A change to the leg speed list.
#[derive(Debug, Clone, PartialEq)]
pub enum LegSpdsCmd {
    /// Empty the list
    Clear,

    /// Start again from the first speed
    Reset,

    /// Replace the list
    Replace(Vec<f64>),

    /// Add to the end of the list
    Append(Vec<f64>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegSpeeds {
    pub fn new(spds_ms: Vec<f64>, repeat: bool, onturn: bool) -> Self {
        Self {
            spds_ms,
            ix: -1,
            curr_ms: None,
            repeat,
            onturn,
        }
    }

    /// Apply a change, rejecting speeds outside `(0, max_speed_ms]`.
    pub fn apply(&mut self, cmd: LegSpdsCmd, max_speed_ms: f64) -> Result<(), ConfigError> {
        let check = |spds: &[f64]| -> Result<(), ConfigError> {
            match spds.iter().find(|s| !(**s > 0.0) || **s > max_speed_ms) {
                Some(bad) => Err(ConfigError::OutOfRange(String::from("leg_spds"), *bad)),
                None => Ok(()),
            }
        };

        match cmd {
            LegSpdsCmd::Clear => {
                self.spds_ms.clear();
                self.ix = -1;
            }
            LegSpdsCmd::Reset => self.ix = -1,
            LegSpdsCmd::Replace(spds) => {
                check(&spds)?;
                self.spds_ms = spds;
                self.ix = -1;
            }
            LegSpdsCmd::Append(spds) => {
                check(&spds)?;
                self.spds_ms.extend(spds);
            }
        }

        Ok(())
    }

    /// Called as a turn starts.
    pub fn on_enter_turn(&mut self) {
        if !self.onturn {
            self.curr_ms = None;
        }
    }

    /// Called as a leg starts, moving on to the next speed.
    pub fn on_enter_leg(&mut self) {
        self.curr_ms = None;
        let len = self.spds_ms.len() as i64;
        if len == 0 {
            return;
        }

        let next = self.ix + 1;
        self.ix = if next < len {
            next
        }
        else if self.repeat {
            0
        }
        else {
            len
        };

        if self.ix >= 0 && self.ix < len {
            self.curr_ms = Some(self.spds_ms[self.ix as usize]);
        }
    }

    /// The override in force, `None` to use the cruise speed.
    pub fn current(&self) -> Option<f64> {
        self.curr_ms
    }

    pub fn speeds(&self) -> &[f64] {
        &self.spds_ms
    }

    pub fn report(&self, vname: &str, cruise_ms: f64) -> LegSpdsReport {
        let active_ix = match self.curr_ms {
            Some(_) if self.ix >= 0 => Some(self.ix as usize),
            _ => None,
        };

        LegSpdsReport {
            vname: vname.to_string(),
            cruise_ms,
            leg_spds_ms: self.spds_ms.clone(),
            active_ix,
        }
    }
}

impl FromStr for LegSpdsCmd {
    type Err = ConfigError;

    /// Parse `clear`, `reset`, `replace,<list>` or `<list>`, where a list is
    /// comma separated speeds each optionally prefixed by `N:` to repeat it
    /// `N` times.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let s = s.to_lowercase();
        let invalid = || ConfigError::InvalidValue(String::from("leg_spds"), s.clone());

        match s.as_str() {
            "clear" => return Ok(LegSpdsCmd::Clear),
            "reset" => return Ok(LegSpdsCmd::Reset),
            _ => (),
        }

        let (replace, list) = match s.strip_prefix("replace,") {
            Some(rest) => (true, rest),
            None => (false, s.as_str()),
        };

        let mut spds = Vec::new();
        for entry in list.split(',') {
            let mut parts = entry.splitn(2, ':');
            let first = parts.next().unwrap_or("");
            let (count, spd) = match parts.next() {
                Some(spd) => {
                    let count = first.parse::<usize>().ok().filter(|n| *n > 0);
                    (count.ok_or_else(invalid)?, spd)
                }
                None => (1, first),
            };
            let spd = parse_num(spd).ok_or_else(invalid)?;
            spds.extend(std::iter::repeat(spd).take(count));
        }

        Ok(if replace {
            LegSpdsCmd::Replace(spds)
        }
        else {
            LegSpdsCmd::Append(spds)
        })
    }
}
