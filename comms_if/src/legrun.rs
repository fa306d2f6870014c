//! # Leg-run reports
//!
//! Structured string reports produced by the leg-run controller. All reports
//! use the comma separated `key=value` form so they can be read by humans and
//! by the simple peer parsers used on other vehicles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Turn distance broadcast, sent to the coordination group
pub const TURN_DIST_VAR: &str = "LR_TURN_DIST";

/// Per-leg speed report
pub const LEG_SPDS_VAR: &str = "LR_LEG_SPDS";

/// Current controller mode
pub const MODE_VAR: &str = "LEGRUN_MODE";

/// Settings summary, posted after each reconfiguration
pub const SETTINGS_VAR: &str = "BHV_SETTINGS";

/// Coordinated turn speed
pub const TCOORD_SPD_VAR: &str = "LR_TCOORD_SPD";

/// Smallest turn distance among the coordinating vehicles
pub const MIN_DIST_VAR: &str = "LR_MIN_DIST";

/// Largest turn distance among the coordinating vehicles
pub const MAX_DIST_VAR: &str = "LR_MAX_DIST";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Signed distance a vehicle has left to travel until the end of its next
/// turn, in the form `vname=abe,tdist=123.4`.
///
/// The sign gives the leg phase the vehicle is in, vehicles only coordinate
/// with peers of the same sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDistReport {
    pub vname: String,
    pub tdist_m: f64,
}

/// Report of the cruise speed and the per-leg speed overrides, with the one
/// currently in use wrapped in brackets:
/// `vname=abe,cruise=2,legs=1.5,[2.5],3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSpdsReport {
    pub vname: String,
    pub cruise_ms: f64,
    pub leg_spds_ms: Vec<f64>,

    /// Index of the override in use, `None` if cruising
    pub active_ix: Option<usize>,
}

/// Waypoint progress status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WptStatus {
    pub vname: String,
    pub behavior_name: String,
    pub index: usize,
    pub capture_hits: u32,
    pub total_hits: u32,
    pub cycles: u32,
    pub dist_m: f64,
    pub eta_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ReportParseError {
    #[error("Report is missing the {0} field")]
    MissingField(&'static str),

    #[error("Report field {0} has an invalid value: {1}")]
    InvalidValue(&'static str, String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl fmt::Display for TurnDistReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vname={},tdist={}", self.vname, fmt_num(self.tdist_m, 2))
    }
}

impl FromStr for TurnDistReport {
    type Err = ReportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vname = tok_parse(s, "vname")
            .filter(|v| !v.is_empty())
            .ok_or(ReportParseError::MissingField("vname"))?;

        let tdist = tok_parse(s, "tdist")
            .ok_or(ReportParseError::MissingField("tdist"))?;

        let tdist_m = tdist
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
            .ok_or_else(|| ReportParseError::InvalidValue("tdist", tdist.to_string()))?;

        Ok(Self {
            vname: vname.to_string(),
            tdist_m,
        })
    }
}

impl fmt::Display for LegSpdsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vname={}", self.vname)?;

        match self.active_ix {
            Some(_) => write!(f, ",cruise={}", fmt_num(self.cruise_ms, 6))?,
            None => write!(f, ",cruise=[{}]", fmt_num(self.cruise_ms, 6))?,
        }

        for (i, spd) in self.leg_spds_ms.iter().enumerate() {
            f.write_str(if i == 0 { ",legs=" } else { "," })?;

            if self.active_ix == Some(i) {
                write!(f, "[{}]", fmt_num(*spd, 6))?;
            }
            else {
                write!(f, "{}", fmt_num(*spd, 6))?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for WptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vname={},behavior-name={},index={},hits={}/{},cycles={},dist={:.0},eta={:.0}",
            self.vname,
            self.behavior_name,
            self.index,
            self.capture_hits,
            self.total_hits,
            self.cycles,
            self.dist_m,
            self.eta_s
        )
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a number with at most `max_dec` decimal places, dropping trailing
/// zeros (so 2.50 is written `2.5` and 2.00 is written `2`).
pub fn fmt_num(value: f64, max_dec: usize) -> String {
    let s = format!("{:.*}", max_dec, value);

    if !s.contains('.') {
        return s;
    }

    let s = s.trim_end_matches('0').trim_end_matches('.');

    if s == "-0" {
        "0".to_string()
    }
    else {
        s.to_string()
    }
}

/// Find the value of `key` in a `key=value,key=value` string.
pub fn tok_parse<'a>(s: &'a str, key: &str) -> Option<&'a str> {
    s.split(',').find_map(|entry| {
        let mut kv = entry.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(k), Some(v)) if k.trim() == key => Some(v.trim()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_turn_dist_report() {
        let r = TurnDistReport {
            vname: "abe".to_string(),
            tdist_m: -123.456,
        };
        assert_eq!(r.to_string(), "vname=abe,tdist=-123.46");

        let p: TurnDistReport = "tdist=40, vname=ben".parse().unwrap();
        assert_eq!(p.vname, "ben");
        assert_eq!(p.tdist_m, 40.0);

        assert_eq!(
            "vname=ben".parse::<TurnDistReport>(),
            Err(ReportParseError::MissingField("tdist"))
        );
        assert!(matches!(
            "vname=ben,tdist=far".parse::<TurnDistReport>(),
            Err(ReportParseError::InvalidValue("tdist", _))
        ));
        assert!("vname=,tdist=3".parse::<TurnDistReport>().is_err());
    }

    #[test]
    fn test_leg_spds_report() {
        let mut r = LegSpdsReport {
            vname: "abe".to_string(),
            cruise_ms: 2.0,
            leg_spds_ms: vec![1.5, 2.5, 3.0],
            active_ix: None,
        };
        assert_eq!(r.to_string(), "vname=abe,cruise=[2],legs=1.5,2.5,3");

        r.active_ix = Some(1);
        assert_eq!(r.to_string(), "vname=abe,cruise=2,legs=1.5,[2.5],3");

        r.leg_spds_ms.clear();
        r.active_ix = None;
        assert_eq!(r.to_string(), "vname=abe,cruise=[2]");
    }

    #[test]
    fn test_wpt_status() {
        let s = WptStatus {
            vname: "abe".to_string(),
            behavior_name: "legrun".to_string(),
            index: 1,
            capture_hits: 2,
            total_hits: 3,
            cycles: 1,
            dist_m: 45.4,
            eta_s: 22.7,
        };
        assert_eq!(
            s.to_string(),
            "vname=abe,behavior-name=legrun,index=1,hits=2/3,cycles=1,dist=45,eta=23"
        );
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(2.0, 2), "2");
        assert_eq!(fmt_num(2.50, 2), "2.5");
        assert_eq!(fmt_num(-0.001, 2), "0");
        assert_eq!(fmt_num(10.0, 0), "10");
    }
}
