//! Leg run parameters and run-time parameter updates

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::{ConfigError, LegCentre, LegSpdsCmd, VarDataPair};
use crate::turn_gen::{TurnDir, TurnGenKind};
use crate::wpt_eng;
use comms_if::legrun::tok_parse;
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest permitted minimum leg length.
pub const MIN_LEG_LENGTH_FLOOR_M: f64 = 5.0;

/// Smallest permitted minimum turn radius.
pub const MIN_TURN_RAD_FLOOR_M: f64 = 2.0;

/// Smallest permitted turn point gap.
pub const TURN_PT_GAP_FLOOR_M: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the leg run controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Name of this vehicle
    pub vname: String,

    /// Name of this controller instance, used in status lines and labels
    pub name: String,

    /// First leg point
    pub p1: Option<(f64, f64)>,

    /// Second leg point
    pub p2: Option<(f64, f64)>,

    /// Speed used when no override applies
    pub cruise_speed_ms: f64,

    /// Top of the speed domain
    pub max_speed_ms: f64,

    /// Weight given to the course objective over the speed objective, in
    /// percent
    pub patience: f64,

    /// Legs shorter than this are rejected
    pub min_leg_length_m: f64,

    /// Turn radii are never set below this
    pub min_turn_rad_m: f64,

    /// Log a warning when the vehicle overshoots the end of a leg
    pub warn_overshoot: bool,

    /// Arc length between generated turn points
    pub turn_pt_gap_m: f64,

    /// Turn made at the end of leg 1
    pub turn1: TurnEnd,

    /// Turn made at the end of leg 2
    pub turn2: TurnEnd,

    /// Which turn generator to use
    pub turn_gen: TurnGenKind,

    /// Percentage of the leg after which the mid-leg flags are posted
    pub mid_pct: f64,

    /// Variable the status line is posted to, `silent` to disable
    pub wpt_status_var: String,

    /// Per-leg speed overrides, consumed one per leg
    pub leg_spds: Vec<f64>,

    /// Wrap back to the first leg speed after the last one
    pub leg_spds_repeat: bool,

    /// Keep the leg speed override applied during turns
    pub leg_spds_onturn: bool,

    /// Coordination group, `None` to run uncoordinated
    pub coord: Option<String>,

    /// Restart the leg run rather than completing
    pub perpetual: bool,

    /// Flags posted when the leg sequence cycles, as `VAR=value`
    pub cycle_flags: Vec<String>,

    /// Flags posted when a leg end is reached
    pub wpt_flags: Vec<String>,

    /// Flags posted every cycle while on a leg
    pub leg_flags: Vec<String>,

    /// Flags posted once per leg after `mid_pct` of it
    pub mid_flags: Vec<String>,

    /// Visual hints as `key=value,key=value`
    pub visual_hints: Option<String>,

    /// Waypoint arrival parameters, shared by the leg and turn engines
    pub wpt: wpt_eng::Params,
}

/// Parameters of the turn at one end of the leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnEnd {
    pub dir: TurnDir,
    pub rad_m: f64,

    /// Bias as a percentage of the largest possible bias
    pub bias_pct: f64,

    /// Straight run beyond the leg end before turning
    pub ext_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which end of the leg a turn parameter applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ends {
    One,
    Two,
    Both,
}

/// Flag sets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlagKind {
    Cycle,
    Wpt,
    Leg,
    Mid,
}

/// A single typed parameter change.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamUpdate {
    P1(Vector2<f64>),
    P2(Vector2<f64>),
    Leg(LegCentre),
    ShiftPt(Vector2<f64>),
    LegLength(f64),
    LegLengthMod(f64),
    LegLengthMin(f64),
    LegAngle(f64),
    LegAngleMod(f64),

    Speed(f64),
    LegSpds(LegSpdsCmd),
    LegSpdsRepeat(bool),
    LegSpdsOnTurn(bool),
    Patience(f64),

    WptStatusVar(String),
    Flag(FlagKind, VarDataPair),
    WarnOvershoot(bool),
    MidPct(f64),

    /// Forwarded to both waypoint engines
    WptShared(String, String),

    /// Forwarded to the leg engine only
    WptLegs(String, String),

    TurnDir(Ends, TurnDir),
    TurnRad(Ends, f64),
    TurnRadMod(Ends, f64),
    TurnRadMin(f64),
    TurnBias(Ends, f64),
    TurnBiasMod(Ends, f64),
    TurnExt(Ends, f64),
    TurnPtGap(f64),
    TurnGen(TurnGenKind),

    Coord(Option<String>),
    VisualHints(String),
    Perpetual(bool),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            vname: String::from("ownship"),
            name: String::from("bhv_legrun"),
            p1: None,
            p2: None,
            cruise_speed_ms: 0.0,
            max_speed_ms: 5.0,
            patience: 50.0,
            min_leg_length_m: 50.0,
            min_turn_rad_m: 5.0,
            warn_overshoot: false,
            turn_pt_gap_m: 25.0,
            turn1: TurnEnd::default(),
            turn2: TurnEnd::default(),
            turn_gen: TurnGenKind::Williamson,
            mid_pct: 25.0,
            wpt_status_var: String::from("WPT_STAT"),
            leg_spds: Vec::new(),
            leg_spds_repeat: false,
            leg_spds_onturn: false,
            coord: None,
            perpetual: false,
            cycle_flags: Vec::new(),
            wpt_flags: Vec::new(),
            leg_flags: Vec::new(),
            mid_flags: Vec::new(),
            visual_hints: None,
            wpt: wpt_eng::Params::default(),
        }
    }
}

impl Default for TurnEnd {
    fn default() -> Self {
        Self {
            dir: TurnDir::Star,
            rad_m: 15.0,
            bias_pct: 0.0,
            ext_m: 0.0,
        }
    }
}

impl Params {
    /// Apply floors and clips, and reject values that cannot be used.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.patience = maths::clamp(self.patience, 1.0, 99.0);
        self.min_leg_length_m = self.min_leg_length_m.max(MIN_LEG_LENGTH_FLOOR_M);
        self.min_turn_rad_m = self.min_turn_rad_m.max(MIN_TURN_RAD_FLOOR_M);
        self.turn_pt_gap_m = self.turn_pt_gap_m.max(TURN_PT_GAP_FLOOR_M);

        if !(self.max_speed_ms > 0.0) {
            return Err(ConfigError::OutOfRange("max_speed_ms".into(), self.max_speed_ms));
        }
        if !(self.cruise_speed_ms >= 0.0) || self.cruise_speed_ms > self.max_speed_ms {
            return Err(ConfigError::OutOfRange(
                "cruise_speed_ms".into(),
                self.cruise_speed_ms,
            ));
        }
        if !(self.mid_pct >= 0.0 && self.mid_pct <= 100.0) {
            return Err(ConfigError::OutOfRange("mid_pct".into(), self.mid_pct));
        }

        validate_turn_end("turn1", &mut self.turn1, self.min_turn_rad_m)?;
        validate_turn_end("turn2", &mut self.turn2, self.min_turn_rad_m)?;

        if let Some(c) = self.coord.take() {
            self.coord = parse_coord(&c)?;
        }

        for spd in self.leg_spds.iter() {
            if !(*spd > 0.0) || *spd > self.max_speed_ms {
                return Err(ConfigError::OutOfRange("leg_spds".into(), *spd));
            }
        }

        for flag in self
            .cycle_flags
            .iter()
            .chain(self.wpt_flags.iter())
            .chain(self.leg_flags.iter())
            .chain(self.mid_flags.iter())
        {
            flag.parse::<VarDataPair>()?;
        }

        Ok(())
    }

    /// Parameters of the turn at the given end (`Ends::Both` gives the
    /// first).
    pub fn turn_end(&self, end: Ends) -> &TurnEnd {
        match end {
            Ends::Two => &self.turn2,
            _ => &self.turn1,
        }
    }
}

impl ParamUpdate {
    /// Parse a `key = value` parameter.
    pub fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        let key = key.trim().to_lowercase();
        let value = value.trim();
        let invalid = || ConfigError::InvalidValue(key.clone(), value.to_string());
        let num = || parse_num(value).ok_or_else(invalid);

        let update = match key.as_str() {
            "p1" | "vx1" => ParamUpdate::P1(parse_point(value).ok_or_else(invalid)?),
            "p2" | "vx2" => ParamUpdate::P2(parse_point(value).ok_or_else(invalid)?),
            "leg" => ParamUpdate::Leg(value.parse().map_err(|_| invalid())?),
            "shift_pt" | "shift_point" => {
                ParamUpdate::ShiftPt(parse_point(value).ok_or_else(invalid)?)
            }
            "leg_length" => ParamUpdate::LegLength(positive(&key, num()?)?),
            "leg_length_mod" => ParamUpdate::LegLengthMod(num()?),
            "leg_length_min" => ParamUpdate::LegLengthMin(num()?),
            "leg_angle" => ParamUpdate::LegAngle(num()?),
            "leg_angle_mod" => ParamUpdate::LegAngleMod(num()?),

            "speed" => ParamUpdate::Speed(num()?),
            "leg_spds" => ParamUpdate::LegSpds(value.parse()?),
            "leg_spds_repeat" => ParamUpdate::LegSpdsRepeat(parse_bool(value).ok_or_else(invalid)?),
            "leg_spds_onturn" => ParamUpdate::LegSpdsOnTurn(parse_bool(value).ok_or_else(invalid)?),
            "patience" => ParamUpdate::Patience(num()?),

            "wpt_status_var" => {
                if value.is_empty() || value.contains(char::is_whitespace) {
                    return Err(invalid());
                }
                ParamUpdate::WptStatusVar(value.to_string())
            }
            "cycleflag" | "cycle_flag" => ParamUpdate::Flag(FlagKind::Cycle, value.parse()?),
            "wptflag" | "wpt_flag" => ParamUpdate::Flag(FlagKind::Wpt, value.parse()?),
            "legflag" | "leg_flag" => ParamUpdate::Flag(FlagKind::Leg, value.parse()?),
            "midflag" | "mid_flag" => ParamUpdate::Flag(FlagKind::Mid, value.parse()?),
            "warn_overshoot" => ParamUpdate::WarnOvershoot(parse_bool(value).ok_or_else(invalid)?),
            "mid_pct" => {
                let v = num()?;
                if !(v >= 0.0 && v <= 100.0) {
                    return Err(ConfigError::OutOfRange(key, v));
                }
                ParamUpdate::MidPct(v)
            }

            "lead" | "lead_damper" | "capture_line" | "radius" | "capture_radius"
            | "slip_radius" => ParamUpdate::WptShared(key.clone(), value.to_string()),
            "repeat" => ParamUpdate::WptLegs(key.clone(), value.to_string()),

            "turn_dir" => ParamUpdate::TurnDir(Ends::Both, value.parse().map_err(|_| invalid())?),
            "turn1_dir" => ParamUpdate::TurnDir(Ends::One, value.parse().map_err(|_| invalid())?),
            "turn2_dir" => ParamUpdate::TurnDir(Ends::Two, value.parse().map_err(|_| invalid())?),
            "turn_rad" => ParamUpdate::TurnRad(Ends::Both, positive(&key, num()?)?),
            "turn1_rad" => ParamUpdate::TurnRad(Ends::One, positive(&key, num()?)?),
            "turn2_rad" => ParamUpdate::TurnRad(Ends::Two, positive(&key, num()?)?),
            "turn_rad_mod" => ParamUpdate::TurnRadMod(Ends::Both, num()?),
            "turn1_rad_mod" => ParamUpdate::TurnRadMod(Ends::One, num()?),
            "turn2_rad_mod" => ParamUpdate::TurnRadMod(Ends::Two, num()?),
            "turn_rad_min" => ParamUpdate::TurnRadMin(num()?),
            "turn_bias" => ParamUpdate::TurnBias(Ends::Both, bias(&key, num()?)?),
            "turn1_bias" => ParamUpdate::TurnBias(Ends::One, bias(&key, num()?)?),
            "turn2_bias" => ParamUpdate::TurnBias(Ends::Two, bias(&key, num()?)?),
            "turn_bias_mod" => ParamUpdate::TurnBiasMod(Ends::Both, num()?),
            "turn1_bias_mod" => ParamUpdate::TurnBiasMod(Ends::One, num()?),
            "turn2_bias_mod" => ParamUpdate::TurnBiasMod(Ends::Two, num()?),
            "turn_ext" => ParamUpdate::TurnExt(Ends::Both, non_neg(&key, num()?)?),
            "turn1_ext" => ParamUpdate::TurnExt(Ends::One, non_neg(&key, num()?)?),
            "turn2_ext" => ParamUpdate::TurnExt(Ends::Two, non_neg(&key, num()?)?),
            "turn_pt_gap" => ParamUpdate::TurnPtGap(non_neg(&key, num()?)?),
            "turn_gen" => ParamUpdate::TurnGen(value.parse().map_err(|_| invalid())?),

            "coord" => ParamUpdate::Coord(parse_coord(value)?),
            "visual_hints" => ParamUpdate::VisualHints(value.to_string()),
            "perpetual" => ParamUpdate::Perpetual(parse_bool(value).ok_or_else(invalid)?),

            _ => return Err(ConfigError::UnknownParam(key)),
        };

        Ok(update)
    }

    /// True if this update moves, stretches or rotates the leg.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            ParamUpdate::P1(_)
                | ParamUpdate::P2(_)
                | ParamUpdate::Leg(_)
                | ParamUpdate::ShiftPt(_)
                | ParamUpdate::LegLength(_)
                | ParamUpdate::LegLengthMod(_)
                | ParamUpdate::LegAngle(_)
                | ParamUpdate::LegAngleMod(_)
        )
    }
}

impl Ends {
    pub fn one(&self) -> bool {
        matches!(self, Ends::One | Ends::Both)
    }

    pub fn two(&self) -> bool {
        matches!(self, Ends::Two | Ends::Both)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub(crate) fn parse_num(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a point written `x,y` or `x=..,y=..`.
pub(crate) fn parse_point(s: &str) -> Option<Vector2<f64>> {
    if s.contains('=') {
        let x = parse_num(tok_parse(s, "x")?)?;
        let y = parse_num(tok_parse(s, "y")?)?;
        return Some(Vector2::new(x, y));
    }

    let mut parts = s.split(',');
    let x = parse_num(parts.next()?)?;
    let y = parse_num(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    Some(Vector2::new(x, y))
}

/// Coordination group: `true` and `all` mean every vehicle, `false`, `off`
/// and the empty string disable coordination, anything else is a group name.
fn parse_coord(s: &str) -> Result<Option<String>, ConfigError> {
    if s.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidValue("coord".into(), s.to_string()));
    }

    let s = s.to_lowercase();
    Ok(match s.as_str() {
        "true" | "all" => Some(String::from("all")),
        "" | "false" | "off" => None,
        _ => Some(s.trim_start_matches("group=").to_string()),
    })
}

fn validate_turn_end(key: &str, end: &mut TurnEnd, min_rad_m: f64) -> Result<(), ConfigError> {
    if !(end.rad_m > 0.0) {
        return Err(ConfigError::OutOfRange(format!("{}.rad_m", key), end.rad_m));
    }
    if end.rad_m < min_rad_m {
        warn!(
            "{} radius of {:.1} m raised to the minimum of {:.1} m",
            key, end.rad_m, min_rad_m
        );
        end.rad_m = min_rad_m;
    }
    end.bias_pct = maths::clamp(end.bias_pct, -100.0, 100.0);
    end.ext_m = end.ext_m.max(0.0);

    Ok(())
}

fn positive(key: &str, v: f64) -> Result<f64, ConfigError> {
    if v > 0.0 {
        Ok(v)
    }
    else {
        Err(ConfigError::OutOfRange(key.to_string(), v))
    }
}

fn non_neg(key: &str, v: f64) -> Result<f64, ConfigError> {
    if v >= 0.0 {
        Ok(v)
    }
    else {
        Err(ConfigError::OutOfRange(key.to_string(), v))
    }
}

fn bias(key: &str, v: f64) -> Result<f64, ConfigError> {
    if v >= -100.0 && v <= 100.0 {
        Ok(v)
    }
    else {
        Err(ConfigError::OutOfRange(key.to_string(), v))
    }
}
