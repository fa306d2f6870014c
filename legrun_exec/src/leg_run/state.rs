//! Implementation of the leg run controller state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::fmt;

// Internal
use super::viz::{self, Labels, LEGPT_HINTS, NEXTPT_HINTS, TRACKPT_DRAW_DIST_M, TURN_HINTS};
use super::*;
use crate::info::{InfoBuffer, NAV_HEADING, NAV_SPEED, NAV_X, NAV_Y};
use crate::objective::{Objective, ObjectiveBuilder, PeakBuilder, MAX_UTIL};
use crate::turn_coord::{CoordSpeed, TurnCoord};
use crate::turn_gen::{TurnGen, TurnPath};
use crate::wpt_eng::{self, CaptureLine, Repeat, WptEngine, WptEvent};
use comms_if::{
    legrun::{self as lr, fmt_num, TurnDistReport, WptStatus},
    post::Posting,
    viz::{VisualHints, VisualSpec},
};
use util::{geom, maths, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Status line variable value which disables the status line.
const SILENT: &str = "silent";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Leg run controller.
pub struct LegRunCtrl {
    params: Params,
    builder: PeakBuilder,
    hints: VisualHints,
    labels: Labels,
    flags: FlagSets,

    /// Engine following the two leg points
    wpt_legs: WptEngine,

    /// Engine following the points of the turn in progress
    wpt_turn: WptEngine,

    /// Requested leg geometry, installed into `wpt_legs` by `settle`
    leg: LegGeom,
    staged: Staged,

    /// Turn previews for each end, `None` when out of date
    previews: Option<[TurnPath; 2]>,
    preview_pending: bool,
    turn_interrupt: bool,

    mode: Mode,
    pending: Option<ModeRequest>,
    leg_count1: u32,
    leg_count2: u32,
    turn_count: u32,
    mid_event_yet: bool,
    complete: bool,

    speeds: LegSpeeds,
    odometer: Odometer,

    coord: TurnCoord,
    turn_dist_m: f64,
    coord_spd: Option<CoordSpeed>,

    nav: Option<Nav>,
    track_pt: Option<Vector2<f64>>,
    next_pt: Option<Vector2<f64>>,

    postings: Vec<Posting>,
    report: StatusReport,
}

/// Geometry changes waiting for `settle`.
#[derive(Debug, Clone, Default)]
struct Staged {
    /// Some leg geometry update arrived since the last settle
    geometry: bool,
    new_leg: bool,
    leg_len_m: Option<f64>,
    leg_len_mod_m: f64,
    leg_ang_deg: Option<f64>,
    leg_ang_mod_deg: f64,
    shift_pt_m: Option<Vector2<f64>>,
}

#[derive(Debug, Clone, Default)]
struct FlagSets {
    cycle: Vec<VarDataPair>,
    wpt: Vec<VarDataPair>,
    leg: Vec<VarDataPair>,
    mid: Vec<VarDataPair>,
}

/// Vehicle navigation state as last read.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Nav {
    pub pos_m: Vector2<f64>,
    pub heading_deg: f64,
    pub speed_ms: f64,
}

/// Result of running a mode handler.
#[derive(Debug, Clone, Copy)]
struct Step {
    /// True if the handler produced a track point to steer for
    ok: bool,
    request: Option<ModeRequest>,
}

/// Output of one controller cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Output {
    /// Course and speed objective, `None` if the controller has nothing to
    /// steer for this cycle
    pub objective: Option<Objective>,

    /// Desired course, the centre of the course objective.
    ///
    /// Units: degrees
    pub course_deg: Option<f64>,

    /// Desired speed, the peak of the speed objective.
    ///
    /// Units: meters/second
    pub speed_ms: Option<f64>,

    pub postings: Vec<Posting>,
}

/// Status report for leg run processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub mode: Mode,
    pub complete: bool,

    /// Position or heading was missing from the input
    pub input_missing: bool,

    /// Speed was missing from the input, the last known speed was used
    pub speed_missing: bool,

    /// The requested leg could not be installed
    pub geometry_degenerate: bool,

    pub leg_count1: u32,
    pub leg_count2: u32,
    pub turn_count: u32,

    /// Signed distance to the end of the next turn
    pub turn_dist_m: f64,

    pub coord_peers: usize,
    pub coord_spd_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Leg1,
    Turn,
    Leg2,
}

/// Mode change asked for by a mode handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Turn,
    Leg,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Mode {
    fn default() -> Self {
        Mode::Leg1
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Leg1 => "leg1",
            Mode::Turn => "turn",
            Mode::Leg2 => "leg2",
        })
    }
}

impl Default for LegRunCtrl {
    fn default() -> Self {
        Self::build(Params::default(), VisualHints::default(), FlagSets::default())
    }
}

impl State for LegRunCtrl {
    type InitData = String;
    type InitError = LegRunError;

    type InputData = InfoBuffer;
    type OutputData = Output;
    type StatusReport = StatusReport;
    type ProcError = LegRunError;

    /// Initialise the controller from the named parameter file.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(&init_data).map_err(LegRunError::ParamLoadError)?;

        *self = Self::new(params).map_err(LegRunError::ConfigError)?;

        info!(
            "LegRunCtrl {} initialised for {}, session at {:?}",
            self.params.name, self.params.vname, session.session_root
        );

        Ok(())
    }

    /// Run one cycle of the controller.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report.input_missing = false;
        self.report.speed_missing = false;
        self.coord_spd = None;

        let output = self.run_cycle(input_data);

        self.report.mode = self.mode;
        self.report.complete = self.complete;
        self.report.leg_count1 = self.leg_count1;
        self.report.leg_count2 = self.leg_count2;
        self.report.turn_count = self.turn_count;
        self.report.turn_dist_m = self.turn_dist_m;
        self.report.coord_peers = self.coord_spd.map(|c| c.num_peers).unwrap_or(0);
        self.report.coord_spd_ms = self.coord_spd.map(|c| c.spd_ms);

        Ok((output, self.report))
    }

    fn finished(&self) -> bool {
        self.complete
    }
}

impl LegRunCtrl {
    /// Build a controller from a set of parameters.
    pub fn new(params: Params) -> Result<Self, ConfigError> {
        let mut params = params;
        params.validate()?;

        let mut hints = VisualHints::default();
        if let Some(ref h) = params.visual_hints {
            if !hints.set_hints(h) {
                return Err(ConfigError::InvalidValue("visual_hints".into(), h.clone()));
            }
        }

        let parse = |v: &Vec<String>| -> Result<Vec<VarDataPair>, ConfigError> {
            v.iter().map(|s| s.parse()).collect()
        };
        let flags = FlagSets {
            cycle: parse(&params.cycle_flags)?,
            wpt: parse(&params.wpt_flags)?,
            leg: parse(&params.leg_flags)?,
            mid: parse(&params.mid_flags)?,
        };

        Ok(Self::build(params, hints, flags))
    }

    fn build(mut params: Params, hints: VisualHints, flags: FlagSets) -> Self {
        // Both engines run their points as given so the ends keep their
        // meaning
        params.wpt.order = wpt_eng::Order::Normal;

        let mut turn_wpt = params.wpt.clone();
        turn_wpt.repeat = Repeat::Times(0);

        let to_v = |p: Option<(f64, f64)>| p.map(|(x, y)| Vector2::new(x, y));

        let mut ctrl = Self {
            builder: PeakBuilder::new(params.max_speed_ms),
            labels: Labels::new(&params.vname, &params.name),
            wpt_legs: WptEngine::new(params.wpt.clone()),
            wpt_turn: WptEngine::new(turn_wpt),
            leg: LegGeom {
                p1: to_v(params.p1),
                p2: to_v(params.p2),
            },
            staged: Staged {
                new_leg: true,
                ..Default::default()
            },
            previews: None,
            preview_pending: true,
            turn_interrupt: false,
            mode: Mode::Leg1,
            pending: None,
            leg_count1: 0,
            leg_count2: 0,
            turn_count: 0,
            mid_event_yet: false,
            complete: false,
            speeds: LegSpeeds::new(
                params.leg_spds.clone(),
                params.leg_spds_repeat,
                params.leg_spds_onturn,
            ),
            odometer: Odometer::default(),
            coord: TurnCoord::new(params.vname.clone()),
            turn_dist_m: 0.0,
            coord_spd: None,
            nav: None,
            track_pt: None,
            next_pt: None,
            postings: Vec::new(),
            report: StatusReport::default(),
            hints,
            flags,
            params,
        };

        ctrl.settle();
        ctrl
    }

    // ---- CONFIGURATION ----

    /// Stage a parameter update. Geometry changes take effect on the next
    /// `settle`.
    pub fn apply(&mut self, update: ParamUpdate) -> Result<(), ConfigError> {
        trace!("Applying {:?}", update);

        if update.is_geometry() {
            self.staged.geometry = true;
        }

        match update {
            ParamUpdate::P1(p) => {
                self.leg.p1 = Some(p);
                self.staged.new_leg = true;
            }
            ParamUpdate::P2(p) => {
                self.leg.p2 = Some(p);
                self.staged.new_leg = true;
            }
            ParamUpdate::Leg(c) => {
                self.leg = LegGeom::from_centre(&c);
                self.staged.new_leg = true;
            }
            ParamUpdate::ShiftPt(p) => self.staged.shift_pt_m = Some(p),
            ParamUpdate::LegLength(l) => self.staged.leg_len_m = Some(l),
            ParamUpdate::LegLengthMod(d) => self.staged.leg_len_mod_m += d,
            ParamUpdate::LegLengthMin(v) => {
                self.params.min_leg_length_m = v.max(MIN_LEG_LENGTH_FLOOR_M)
            }
            ParamUpdate::LegAngle(a) => self.staged.leg_ang_deg = Some(a),
            ParamUpdate::LegAngleMod(d) => self.staged.leg_ang_mod_deg += d,

            ParamUpdate::Speed(s) => {
                if !(s >= 0.0) || s > self.params.max_speed_ms {
                    return Err(ConfigError::OutOfRange("speed".into(), s));
                }
                self.params.cruise_speed_ms = s;
            }
            ParamUpdate::LegSpds(cmd) => {
                self.speeds.apply(cmd, self.params.max_speed_ms)?;
                self.params.leg_spds = self.speeds.speeds().to_vec();
            }
            ParamUpdate::LegSpdsRepeat(b) => {
                self.speeds.repeat = b;
                self.params.leg_spds_repeat = b;
            }
            ParamUpdate::LegSpdsOnTurn(b) => {
                self.speeds.onturn = b;
                self.params.leg_spds_onturn = b;
            }
            ParamUpdate::Patience(p) => self.params.patience = maths::clamp(p, 1.0, 99.0),

            ParamUpdate::WptStatusVar(v) => self.params.wpt_status_var = v,
            ParamUpdate::Flag(kind, pair) => match kind {
                FlagKind::Cycle => self.flags.cycle.push(pair),
                FlagKind::Wpt => self.flags.wpt.push(pair),
                FlagKind::Leg => self.flags.leg.push(pair),
                FlagKind::Mid => self.flags.mid.push(pair),
            },
            ParamUpdate::WarnOvershoot(b) => self.params.warn_overshoot = b,
            ParamUpdate::MidPct(v) => self.params.mid_pct = v,

            ParamUpdate::WptShared(k, v) => {
                self.wpt_legs.set_param(&k, &v)?;
                self.wpt_turn.set_param(&k, &v)?;
                self.params.wpt = self.wpt_legs.params().clone();
                self.invalidate_previews();
            }
            ParamUpdate::WptLegs(k, v) => {
                self.wpt_legs.set_param(&k, &v)?;
                self.params.wpt = self.wpt_legs.params().clone();
            }

            ParamUpdate::TurnDir(ends, d) => self.modify_turns(ends, |t, _| t.dir = d),
            ParamUpdate::TurnRad(ends, r) => {
                self.modify_turns(ends, |t, min| t.rad_m = r.max(min))
            }
            ParamUpdate::TurnRadMod(ends, d) => {
                self.modify_turns(ends, |t, min| t.rad_m = (t.rad_m + d).max(min))
            }
            ParamUpdate::TurnRadMin(v) => {
                self.params.min_turn_rad_m = v.max(MIN_TURN_RAD_FLOOR_M);
                self.modify_turns(Ends::Both, |t, min| t.rad_m = t.rad_m.max(min));
            }
            ParamUpdate::TurnBias(ends, b) => self.modify_turns(ends, |t, _| t.bias_pct = b),
            ParamUpdate::TurnBiasMod(ends, d) => self.modify_turns(ends, |t, _| {
                t.bias_pct = maths::clamp(t.bias_pct + d, -100.0, 100.0)
            }),
            ParamUpdate::TurnExt(ends, e) => self.modify_turns(ends, |t, _| t.ext_m = e),
            ParamUpdate::TurnPtGap(g) => {
                self.params.turn_pt_gap_m = g.max(TURN_PT_GAP_FLOOR_M);
                self.invalidate_previews();
            }
            ParamUpdate::TurnGen(k) => {
                self.params.turn_gen = k;
                self.invalidate_previews();
            }

            ParamUpdate::Coord(c) => {
                self.params.coord = c;
                self.coord.clear();
            }
            ParamUpdate::VisualHints(s) => {
                if !self.hints.set_hints(&s) {
                    return Err(ConfigError::InvalidValue("visual_hints".into(), s));
                }
                self.invalidate_previews();
            }
            ParamUpdate::Perpetual(b) => self.params.perpetual = b,
        }

        Ok(())
    }

    /// Parse and stage a parameter given as strings. Returns false, logging
    /// the reason, if it was rejected.
    pub fn set_param_str(&mut self, key: &str, value: &str) -> bool {
        match ParamUpdate::parse(key, value).and_then(|u| self.apply(u)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Rejected {} = {}: {}", key, value, e);
                false
            }
        }
    }

    /// Apply all staged geometry changes.
    ///
    /// Call once after every batch of parameter updates. If the resulting
    /// leg is valid it is installed, a turn in progress is interrupted and
    /// the turn previews are redrawn.
    pub fn settle(&mut self) {
        if let Repeat::Times(n) = self.wpt_legs.params().repeat {
            if n > 0 {
                self.params.perpetual = true;
            }
        }

        if std::mem::take(&mut self.staged.geometry) {
            if let Some(len) = self.staged.leg_len_m.take() {
                self.staged.new_leg |= self.leg.set_length(len);
            }
            if let Some(ang) = self.staged.leg_ang_deg.take() {
                self.staged.new_leg |= self.leg.set_angle(ang);
            }
            if self.staged.leg_len_mod_m != 0.0 {
                if let Some(curr) = self.leg.length() {
                    let len = (curr + self.staged.leg_len_mod_m)
                        .max(self.params.min_leg_length_m);
                    self.staged.new_leg |= self.leg.set_length(len);
                }
                self.staged.leg_len_mod_m = 0.0;
            }
            if self.staged.leg_ang_mod_deg != 0.0 {
                if let Some(curr) = self.leg.angle() {
                    let ang = geom::angle_360(curr + self.staged.leg_ang_mod_deg);
                    self.staged.new_leg |= self.leg.set_angle(ang);
                }
                self.staged.leg_ang_mod_deg = 0.0;
            }
            if let Some(pt) = self.staged.shift_pt_m.take() {
                self.staged.new_leg |= self.leg.set_centre(pt);
            }
        }

        if self.staged.new_leg {
            self.staged.new_leg = false;

            match self.install_leg() {
                Ok(()) => self.report.geometry_degenerate = false,
                Err(e) => {
                    warn!("Leg not installed: {}", e);
                    self.report.geometry_degenerate = true;

                    // Keep describing the leg actually being run
                    if let [a, b] = self.wpt_legs.positions()[..] {
                        self.leg = LegGeom::new(a, b);
                    }
                }
            }
        }

        self.post_config_status();
    }

    /// Set the vehicle name used in reports and labels.
    pub fn set_vname<S: Into<String>>(&mut self, vname: S) {
        self.params.vname = vname.into();
        self.labels = Labels::new(&self.params.vname, &self.params.name);
        self.coord.set_own_vname(self.params.vname.clone());
    }

    fn install_leg(&mut self) -> Result<(), ConfigError> {
        let (p1, p2) = self.leg.points().ok_or(ConfigError::LegUnset)?;

        let len = geom::dist(&p1, &p2);
        if len < self.params.min_leg_length_m {
            return Err(ConfigError::LegTooShort(len, self.params.min_leg_length_m));
        }

        self.wpt_legs.set_points(&[p1, p2], true);
        self.params.p1 = Some((p1.x, p1.y));
        self.params.p2 = Some((p2.x, p2.y));
        self.invalidate_previews();

        debug!(
            "Installed leg ({:.1}, {:.1}) -> ({:.1}, {:.1})",
            p1.x, p1.y, p2.x, p2.y
        );

        if self.mode == Mode::Turn {
            info!("Leg changed during a turn, interrupting the turn");
            self.turn_interrupt = true;
        }

        Ok(())
    }

    fn modify_turns<F: Fn(&mut TurnEnd, f64)>(&mut self, ends: Ends, f: F) {
        let min = self.params.min_turn_rad_m;
        if ends.one() {
            f(&mut self.params.turn1, min);
        }
        if ends.two() {
            f(&mut self.params.turn2, min);
        }
        self.invalidate_previews();
    }

    fn invalidate_previews(&mut self) {
        self.previews = None;
        self.preview_pending = true;
    }

    // ---- PROCESSING ----

    fn run_cycle(&mut self, input: &InfoBuffer) -> Output {
        if self.complete {
            return self.output(None);
        }

        let pos_m = match (input.get_scalar(NAV_X), input.get_scalar(NAV_Y)) {
            (Some(x), Some(y)) => Vector2::new(x, y),
            _ => return self.input_missing("position"),
        };
        let heading_deg = match input.get_scalar(NAV_HEADING) {
            Some(h) => h,
            None => return self.input_missing("heading"),
        };
        let speed_ms = match input.get_scalar(NAV_SPEED) {
            Some(s) => s,
            None => {
                warn!("No speed in the input, using the last known speed");
                self.report.speed_missing = true;
                self.nav.map(|n| n.speed_ms).unwrap_or(0.0)
            }
        };
        self.nav = Some(Nav {
            pos_m,
            heading_deg,
            speed_ms,
        });

        self.odometer.update(&pos_m);

        if self.preview_pending {
            self.post_previews(true);
        }

        // The handler of the mode we switch to gets a second chance to
        // produce a track point this cycle
        let mut ok = self.run_mode(&pos_m);
        self.apply_pending();
        if !ok && !self.complete {
            ok = self.run_mode(&pos_m);
            self.apply_pending();
        }

        let spds = self
            .speeds
            .report(&self.params.vname, self.params.cruise_speed_ms);
        self.push(Posting::str(lr::LEG_SPDS_VAR, spds.to_string()));
        self.push(Posting::str(lr::MODE_VAR, self.mode.to_string()));

        if !ok {
            return self.output(None);
        }

        if self.params.coord.is_some() {
            self.post_turn_dist(&pos_m);
            self.update_coord_speed(input);
        }

        self.build_objective()
    }

    fn input_missing(&mut self, what: &str) -> Output {
        warn!("No {} in the input, controller idle", what);
        self.report.input_missing = true;
        self.erase_all_viewables();
        self.output(None)
    }

    fn output(&mut self, objective: Option<(Objective, f64, f64)>) -> Output {
        let postings = std::mem::take(&mut self.postings);
        match objective {
            Some((obj, course_deg, speed_ms)) => Output {
                objective: Some(obj),
                course_deg: Some(course_deg),
                speed_ms: Some(speed_ms),
                postings,
            },
            None => Output {
                postings,
                ..Default::default()
            },
        }
    }

    /// Run the handler for the current mode, returning true if it has a
    /// track point.
    fn run_mode(&mut self, pos_m: &Vector2<f64>) -> bool {
        let step = match self.mode {
            Mode::Leg1 | Mode::Leg2 => self.mode_leg(pos_m),
            Mode::Turn => self.mode_turn(pos_m),
        };

        if step.request.is_some() {
            self.pending = step.request;
        }

        step.ok
    }

    fn mode_leg(&mut self, pos_m: &Vector2<f64>) -> Step {
        let event = self.wpt_legs.advance(pos_m);
        self.track_pt = self.wpt_legs.track_point();
        self.next_pt = self.wpt_legs.next_point();

        if event == WptEvent::Empty {
            return Step {
                ok: false,
                request: None,
            };
        }

        let mut request = None;
        let advanced = self.wpt_legs.has_advanced();

        if advanced {
            if event != WptEvent::Completed || self.params.perpetual {
                request = Some(ModeRequest::Turn);
            }
            self.post_flags(FlagKind::Wpt);
            self.odometer.pause();
        }
        if self.wpt_legs.has_cycled() {
            self.post_flags(FlagKind::Cycle);
        }

        if event == WptEvent::Completed {
            if self.params.perpetual {
                info!("Leg run complete, restarting");
                self.wpt_legs.reset_for_new_traversal();
            }
            else {
                info!("Leg run complete");
                self.complete = true;
            }

            self.post_leg_seglist(false);
            self.post_steer_points(false);
            return Step { ok: false, request };
        }

        if !advanced {
            self.post_flags(FlagKind::Leg);
        }

        // Mid-leg flags, only once the vehicle has been to the first end
        if self.leg_count1 > 0 && !self.mid_event_yet {
            let pct = self.wpt_legs.pct_to_next(pos_m).unwrap_or(0.0) * 100.0;
            if pct > self.params.mid_pct {
                self.post_flags(FlagKind::Mid);
                self.mid_event_yet = true;
            }
        }

        self.post_status_line(pos_m);
        self.post_leg_seglist(true);
        self.post_steer_points(true);
        self.post_leg_points(true);

        Step { ok: true, request }
    }

    fn mode_turn(&mut self, pos_m: &Vector2<f64>) -> Step {
        let event = self.wpt_turn.advance(pos_m);
        self.track_pt = self.wpt_turn.track_point();
        self.next_pt = self.wpt_turn.next_point();

        let leg = Step {
            ok: false,
            request: Some(ModeRequest::Leg),
        };

        if self.turn_interrupt {
            self.turn_interrupt = false;
            self.post_turn_seglist(false);
            self.post_steer_points(false);
            return leg;
        }

        if matches!(event, WptEvent::Completed | WptEvent::Empty) {
            self.post_turn_seglist(false);
            self.post_steer_points(false);
            self.odometer.reset();
            self.odometer.unpause();
            return leg;
        }

        if self.wpt_turn.has_advanced() {
            self.post_turn_seglist(true);
        }

        self.post_steer_points(true);
        self.post_leg_points(true);

        Step {
            ok: true,
            request: None,
        }
    }

    /// Apply the pending mode request, if any.
    fn apply_pending(&mut self) {
        let request = match self.pending.take() {
            Some(r) => r,
            None => return,
        };

        match (request, self.mode) {
            (ModeRequest::Turn, Mode::Leg1) | (ModeRequest::Turn, Mode::Leg2) => {
                let end = match self.mode {
                    Mode::Leg1 => Ends::One,
                    _ => Ends::Two,
                };

                if !self.init_turn_points(end) {
                    warn!("Could not generate a turn, staying in {}", self.mode);
                    return;
                }

                match end {
                    Ends::One => self.leg_count1 += 1,
                    _ => self.leg_count2 += 1,
                }
                self.turn_count += 1;
                self.mid_event_yet = false;
                self.speeds.on_enter_turn();
                self.mode = Mode::Turn;
            }
            (ModeRequest::Leg, Mode::Turn) => {
                self.mode = if self.leg_count1 == self.leg_count2 {
                    Mode::Leg1
                }
                else {
                    Mode::Leg2
                };
                self.speeds.on_enter_leg();
            }
            _ => {
                trace!("Ignoring {:?} request in {}", request, self.mode);
                return;
            }
        }

        info!(
            "Mode now {} (legs {}/{}, turns {})",
            self.mode, self.leg_count1, self.leg_count2, self.turn_count
        );
    }

    /// Generate the turn at the given end of the leg and load it into the
    /// turn engine.
    fn init_turn_points(&mut self, end: Ends) -> bool {
        let os = self.nav.map(|n| n.pos_m);
        let path = match self.turn_path(end, os) {
            Some(p) if !p.is_empty() => p,
            _ => return false,
        };

        self.wpt_turn.reset_state();
        self.wpt_turn.set_points(path.points(), false);
        self.post_turn_seglist(true);

        true
    }

    /// Generate the turn made at one end of the installed leg.
    ///
    /// If `os` is given and the vehicle has already passed the turn start,
    /// the turn starts from the vehicle instead.
    fn turn_path(&self, end: Ends, os: Option<Vector2<f64>>) -> Option<TurnPath> {
        let (p1, p2) = match self.wpt_legs.positions()[..] {
            [a, b] => (a, b),
            _ => return None,
        };

        let (end_m, from_m) = match end {
            Ends::Two => (p2, p1),
            _ => (p1, p2),
        };
        let cfg = *self.params.turn_end(end);

        let travel_deg = geom::rel_ang(&from_m, &end_m);
        let mut start_m = end_m;
        if cfg.ext_m > 0.0 {
            start_m = geom::project_point(travel_deg, cfg.ext_m, &start_m);
        }

        if let Some(os) = os {
            if geom::angle_from_three_points(&start_m, &from_m, &os) > 90.0 {
                if self.params.warn_overshoot {
                    warn!(
                        "Overshot the turn start by {:.1} m",
                        geom::dist(&start_m, &os)
                    );
                }
                start_m = os;
            }
        }

        let mut gen = TurnGen::new(self.params.turn_gen);
        gen.set_start_pose(start_m, travel_deg);
        gen.set_end_pos(end_m);
        gen.set_turn_radius(cfg.rad_m.max(self.params.min_turn_rad_m));
        gen.set_point_gap(self.params.turn_pt_gap_m);
        gen.set_bias_pct(cfg.bias_pct);
        gen.set_dir(cfg.dir);

        Some(gen.generate())
    }

    /// Signed distance to the end of the next turn, broadcast to the
    /// coordination group.
    fn post_turn_dist(&mut self, pos_m: &Vector2<f64>) {
        let (p1, p2) = match self.wpt_legs.positions()[..] {
            [a, b] => (a, b),
            _ => return,
        };

        self.turn_dist_m = match self.mode {
            Mode::Leg1 => geom::dist(pos_m, &p1),
            Mode::Leg2 => -geom::dist(pos_m, &p2),
            Mode::Turn => {
                let d = self.wpt_turn.dist_to_end(pos_m) + geom::dist(&p1, &p2);
                if self.leg_count1 != self.leg_count2 {
                    -d
                }
                else {
                    d
                }
            }
        };

        let report = TurnDistReport {
            vname: self.params.vname.clone(),
            tdist_m: self.turn_dist_m,
        };
        let mut posting = Posting::str(lr::TURN_DIST_VAR, report.to_string());
        if let Some(ref group) = self.params.coord {
            posting = posting.to_group(group.clone());
        }
        self.push(posting);
    }

    fn update_coord_speed(&mut self, input: &InfoBuffer) {
        let now_s = input.time();
        let bad = self.coord.ingest_raw(
            input.recent_values(lr::TURN_DIST_VAR).iter().map(String::as_str),
            now_s,
        );
        if bad > 0 {
            debug!("{} unreadable turn distance reports", bad);
        }

        if self.mode != Mode::Turn {
            return;
        }

        let max_ms = self.params.max_speed_ms;
        self.coord_spd = self
            .coord
            .coord_speed(self.turn_dist_m, self.params.cruise_speed_ms, now_s)
            .map(|mut cs| {
                cs.spd_ms = maths::clamp(cs.spd_ms, 0.0, max_ms);
                cs
            });

        if let Some(cs) = self.coord_spd {
            self.push(Posting::num(lr::MIN_DIST_VAR, cs.min_dist_m));
            self.push(Posting::num(lr::MAX_DIST_VAR, cs.max_dist_m));
        }
    }

    fn build_objective(&mut self) -> Output {
        let (nav, track_pt) = match (self.nav, self.track_pt) {
            (Some(n), Some(t)) => (n, t),
            _ => return self.output(None),
        };

        let mut speed_ms = self.params.cruise_speed_ms;
        if let Some(s) = self.speeds.current() {
            if s > 0.0 {
                speed_ms = s;
            }
        }
        let coord_ms = self.coord_spd.map(|c| c.spd_ms).unwrap_or(-1.0);
        if coord_ms > 0.0 {
            speed_ms = coord_ms;
        }
        self.push(Posting::num(lr::TCOORD_SPD_VAR, coord_ms));

        let course_deg = geom::rel_ang(&nav.pos_m, &track_pt);

        let crs = self.builder.course(course_deg, nav.heading_deg);
        let spd = self.builder.speed(speed_ms, nav.speed_ms);
        let patience = self.params.patience;
        let obj = self.builder.combine(crs, spd, patience, MAX_UTIL - patience);

        self.output(Some((obj, course_deg, speed_ms)))
    }

    // ---- POSTINGS ----

    fn push(&mut self, posting: Posting) {
        self.postings.push(posting);
    }

    fn push_spec(&mut self, spec: VisualSpec) {
        self.postings.push(viz::post(&spec));
    }

    fn macros(&self) -> Macros {
        let pos_m = self.nav.map(|n| n.pos_m).unwrap_or_else(Vector2::zeros);
        let next = self.wpt_legs.next_point().unwrap_or_else(Vector2::zeros);
        let odo = self.odometer.total();

        let mut m = Macros::new();
        m.set("VNAME", &self.params.vname);
        m.set("SPEED", fmt_num(self.nav.map(|n| n.speed_ms).unwrap_or(0.0), 2));
        m.set("NI", self.wpt_legs.curr_index());
        m.set("NX", fmt_num(next.x, 2));
        m.set("NY", fmt_num(next.y, 2));
        m.set("CYCLES", self.wpt_legs.cycle_count());
        m.set(
            "CYCREM",
            self.wpt_legs
                .repeats_remaining()
                .map(|r| r.to_string())
                .unwrap_or_else(|| String::from("forever")),
        );
        m.set("WPTS_HIT", self.wpt_legs.total_hits());
        m.set("MODE", self.mode);
        m.set("DIST_NP", fmt_num(self.wpt_legs.dist_to_next(&pos_m).unwrap_or(0.0), 2));
        m.set("DIST_PP", fmt_num(self.wpt_legs.dist_to_prev(&pos_m).unwrap_or(0.0), 2));
        m.set(
            "PCT_NP",
            fmt_num(self.wpt_legs.pct_to_next(&pos_m).unwrap_or(0.0) * 100.0, 0),
        );
        m.set("LEG_ODO", fmt_num(odo, 2));
        m.set("ODO", fmt_num(odo, 2));
        m.set("LEG_ID", self.leg_count1 + self.leg_count2);
        m
    }

    fn post_flags(&mut self, kind: FlagKind) {
        let set = match kind {
            FlagKind::Cycle => &self.flags.cycle,
            FlagKind::Wpt => &self.flags.wpt,
            FlagKind::Leg => &self.flags.leg,
            FlagKind::Mid => &self.flags.mid,
        };
        if set.is_empty() {
            return;
        }

        let macros = self.macros();
        let postings: Vec<Posting> = set.iter().map(|f| f.to_posting(&macros)).collect();
        self.postings.extend(postings);
    }

    fn post_status_line(&mut self, pos_m: &Vector2<f64>) {
        if self.params.wpt_status_var == SILENT {
            return;
        }

        let dist_m = self.wpt_legs.dist_to_next(pos_m).unwrap_or(0.0);
        let speed_ms = self.nav.map(|n| n.speed_ms).unwrap_or(0.0);
        let status = WptStatus {
            vname: self.params.vname.clone(),
            behavior_name: self.params.name.clone(),
            index: self.wpt_legs.curr_index(),
            capture_hits: self.wpt_legs.capture_hits(),
            total_hits: self.wpt_legs.total_hits(),
            cycles: self.wpt_legs.cycle_count(),
            dist_m,
            eta_s: if speed_ms > 0.0 { dist_m / speed_ms } else { 0.0 },
        };

        let var = self.params.wpt_status_var.clone();
        self.push(Posting::str(var, status.to_string()));
    }

    /// Settings summary, posted after each reconfiguration.
    fn post_config_status(&mut self) {
        let wpt = self.wpt_legs.params();
        let mut s = format!(
            "type=LegRunCtrl,name={},speed={},currix={},wpt_status={},capture_radius={},slip_radius={}",
            self.params.name,
            fmt_num(self.params.cruise_speed_ms, 1),
            self.wpt_legs.curr_index(),
            self.params.wpt_status_var,
            fmt_num(wpt.capture_radius_m, 1),
            fmt_num(wpt.slip_radius_m, 1),
        );
        match wpt.capture_line {
            CaptureLine::Absolute => s.push_str(",capture_line=absolute"),
            CaptureLine::On => s.push_str(",capture_line=true"),
            CaptureLine::Off => (),
        }
        s.push_str(&format!(",patience={}", fmt_num(self.params.patience, 2)));

        self.push(Posting::str(lr::SETTINGS_VAR, s));
    }

    fn post_leg_seglist(&mut self, active: bool) {
        let pts = self.wpt_legs.positions();
        let spec = viz::seglist(&self.labels.leg, &pts, &self.hints, None, active);
        self.push_spec(spec);
    }

    fn post_turn_seglist(&mut self, active: bool) {
        let pts = self.wpt_turn.positions();
        let spec = viz::seglist(&self.labels.turn, &pts, &self.hints, None, active);
        self.push_spec(spec);
    }

    fn post_steer_points(&mut self, active: bool) {
        let next = viz::point(
            &self.labels.next_pt,
            self.next_pt,
            &self.hints,
            Some(NEXTPT_HINTS),
            active,
        );

        // Only worth drawing the track point when it is clear of the next
        // point
        let track_active = active
            && match (self.track_pt, self.next_pt) {
                (Some(t), Some(n)) => geom::dist(&t, &n) > TRACKPT_DRAW_DIST_M,
                _ => false,
            };
        let track = viz::point(
            &self.labels.track_pt,
            self.track_pt,
            &self.hints,
            Some(NEXTPT_HINTS),
            track_active,
        );

        self.push_spec(next);
        self.push_spec(track);
    }

    fn post_leg_points(&mut self, active: bool) {
        for (i, pt) in [self.leg.p1, self.leg.p2].iter().enumerate() {
            let spec = viz::point(
                &self.labels.leg_pts[i],
                *pt,
                &self.hints,
                Some(LEGPT_HINTS),
                active,
            );
            self.push_spec(spec);
        }
    }

    fn post_previews(&mut self, active: bool) {
        let paths: Vec<Vec<Vector2<f64>>> = if active {
            let [t1, t2] = self.previews();
            vec![t1.points().to_vec(), t2.points().to_vec()]
        }
        else {
            vec![Vec::new(), Vec::new()]
        };

        let leg_pts = match self.leg.points() {
            Some((a, b)) => vec![a, b],
            None => Vec::new(),
        };

        for (i, pts) in paths.iter().chain(std::iter::once(&leg_pts)).enumerate() {
            let spec = viz::seglist(
                &self.labels.previews[i],
                pts,
                &self.hints,
                Some(TURN_HINTS),
                active && !pts.is_empty(),
            );
            self.push_spec(spec);
        }

        self.preview_pending = false;
    }

    fn erase_all_viewables(&mut self) {
        self.post_leg_seglist(false);
        self.post_turn_seglist(false);
        self.post_steer_points(false);
        self.post_leg_points(false);
        self.post_previews(false);
        self.preview_pending = true;
    }

    // ---- ACCESSORS ----

    /// The turns that would be made at each end of the installed leg,
    /// regenerated only when the leg or turn parameters change.
    pub fn previews(&mut self) -> [TurnPath; 2] {
        if self.previews.is_none() {
            let t1 = self.turn_path(Ends::One, None).unwrap_or_default();
            let t2 = self.turn_path(Ends::Two, None).unwrap_or_default();
            self.previews = Some([t1, t2]);
        }

        match self.previews {
            Some(ref p) => p.clone(),
            None => Default::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn leg_counts(&self) -> (u32, u32) {
        (self.leg_count1, self.leg_count2)
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The leg as last requested.
    pub fn leg(&self) -> &LegGeom {
        &self.leg
    }

    /// Points of the leg being run.
    pub fn installed_leg(&self) -> Vec<Vector2<f64>> {
        self.wpt_legs.positions()
    }

    /// Points of the turn in progress, or of the last turn made.
    pub fn turn_points(&self) -> Vec<Vector2<f64>> {
        self.wpt_turn.positions()
    }

    pub fn track_point(&self) -> Option<Vector2<f64>> {
        self.track_pt
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn builder(&self) -> &PeakBuilder {
        &self.builder
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::viz::VIEW_SEGLIST;

    fn leg_params() -> Params {
        let mut p = Params::default();
        p.vname = String::from("abe");
        p.p1 = Some((0.0, 0.0));
        p.p2 = Some((100.0, 0.0));
        p.cruise_speed_ms = 2.0;
        p.turn_pt_gap_m = 5.0;
        p
    }

    /// Run a cycle at `pos`, then move `pos` up to 1 m toward the track
    /// point.
    fn tick(ctrl: &mut LegRunCtrl, pos: &mut Vector2<f64>, t: f64) -> Output {
        let ib = InfoBuffer::with_nav(t, *pos, 0.0, 1.0);
        let (out, _) = ctrl.proc(&ib).unwrap();

        if let Some(tp) = ctrl.track_point() {
            let d = tp - *pos;
            let n = d.norm();
            if n > 1.0 {
                *pos += d / n;
            }
            else {
                *pos = tp;
            }
        }

        out
    }

    #[test]
    fn test_mode_sequence() {
        let mut p = leg_params();
        p.wpt.repeat = Repeat::Forever;
        let mut ctrl = LegRunCtrl::new(p).unwrap();

        let mut pos = Vector2::new(50.0, 0.0);
        let mut modes = vec![ctrl.mode()];

        for i in 0..2000 {
            tick(&mut ctrl, &mut pos, i as f64);

            let (c1, c2) = ctrl.leg_counts();
            assert_eq!(ctrl.turn_count(), c1 + c2);

            if *modes.last().unwrap() != ctrl.mode() {
                modes.push(ctrl.mode());
            }
        }

        assert!(modes.len() >= 5);
        assert_eq!(
            modes[..5],
            [Mode::Leg1, Mode::Turn, Mode::Leg2, Mode::Turn, Mode::Leg1]
        );
        assert!(!ctrl.finished());
    }

    #[test]
    fn test_completes_when_not_perpetual() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();
        let mut pos = Vector2::new(50.0, 0.0);

        let mut t = 0.0;
        while !ctrl.finished() && t < 2000.0 {
            tick(&mut ctrl, &mut pos, t);
            t += 1.0;
        }

        assert!(ctrl.finished());
        assert_eq!(ctrl.leg_counts(), (1, 0));
        assert_eq!(ctrl.mode(), Mode::Leg2);

        let out = tick(&mut ctrl, &mut pos, t);
        assert!(out.objective.is_none());
    }

    #[test]
    fn test_turn_interrupted_by_new_leg() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();
        let mut pos = Vector2::new(50.0, 0.0);

        let mut t = 0.0;
        while ctrl.mode() != Mode::Turn {
            tick(&mut ctrl, &mut pos, t);
            t += 1.0;
            assert!(t < 500.0);
        }
        tick(&mut ctrl, &mut pos, t);
        assert_eq!(ctrl.mode(), Mode::Turn);

        assert!(ctrl.set_param_str("p2", "150,0"));
        ctrl.settle();
        assert_eq!(ctrl.installed_leg()[1], Vector2::new(150.0, 0.0));

        let out = tick(&mut ctrl, &mut pos, t + 1.0);
        assert_eq!(ctrl.mode(), Mode::Leg2);
        assert_eq!(ctrl.turn_count(), 1);
        assert!(out.objective.is_some());
    }

    #[test]
    fn test_short_leg_rejected() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();

        assert!(ctrl.set_param_str("p2", "10,0"));
        ctrl.settle();

        assert!(ctrl.report().geometry_degenerate);
        assert_eq!(ctrl.installed_leg()[1], Vector2::new(100.0, 0.0));
        assert_eq!(ctrl.leg().p2, Some(Vector2::new(100.0, 0.0)));

        assert!(ctrl.set_param_str("leg_length", "200"));
        ctrl.settle();
        assert!(!ctrl.report().geometry_degenerate);
        assert!((geom::dist(&ctrl.installed_leg()[0], &ctrl.installed_leg()[1]) - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_bad_params() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();
        assert!(!ctrl.set_param_str("not_a_param", "1"));
        assert!(!ctrl.set_param_str("speed", "50"));
        assert!(!ctrl.set_param_str("leg_spds", "0"));
        assert!(ctrl.set_param_str("turn_rad", "1"));
        assert_eq!(ctrl.params().turn1.rad_m, ctrl.params().min_turn_rad_m);
    }

    #[test]
    fn test_missing_input() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();

        let mut ib = InfoBuffer::with_nav(0.0, Vector2::new(50.0, 0.0), 0.0, 1.0);
        ib.remove_scalar(NAV_X);

        let (out, report) = ctrl.proc(&ib).unwrap();
        assert!(report.input_missing);
        assert!(out.objective.is_none());
        assert!(out.postings.iter().any(|p| p.var == VIEW_SEGLIST
            && p.as_str().map(|s| s.contains("active=false")).unwrap_or(false)));

        let mut ib = InfoBuffer::with_nav(1.0, Vector2::new(50.0, 0.0), 0.0, 1.0);
        ib.remove_scalar(NAV_SPEED);
        let (out, report) = ctrl.proc(&ib).unwrap();
        assert!(!report.input_missing);
        assert!(report.speed_missing);
        assert!(out.objective.is_some());
    }

    #[test]
    fn test_objective_and_status() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();
        let ib = InfoBuffer::with_nav(0.0, Vector2::new(50.0, 0.0), 0.0, 1.0);
        let (out, _) = ctrl.proc(&ib).unwrap();

        // Heading west for the first leg point
        assert!((out.course_deg.unwrap() - 270.0).abs() < 1e-6);
        assert_eq!(out.speed_ms, Some(2.0));
        assert!(out
            .postings
            .iter()
            .any(|p| p.var == "WPT_STAT" && p.as_str().unwrap().contains("vname=abe")));
        assert!(out
            .postings
            .iter()
            .any(|p| p.var == lr::MODE_VAR && p.as_str() == Some("leg1")));

        assert!(ctrl.set_param_str("wpt_status_var", "silent"));
        let (out, _) = ctrl.proc(&ib).unwrap();
        assert!(!out.postings.iter().any(|p| p.var == "WPT_STAT"));
    }

    #[test]
    fn test_leg_speeds() {
        let mut p = leg_params();
        p.leg_spds = vec![1.5];
        let mut ctrl = LegRunCtrl::new(p).unwrap();
        let mut pos = Vector2::new(50.0, 0.0);

        let mut t = 0.0;
        let mut seen_turn = false;
        while ctrl.mode() != Mode::Leg2 {
            let out = tick(&mut ctrl, &mut pos, t);
            if ctrl.mode() == Mode::Turn && out.objective.is_some() {
                assert_eq!(out.speed_ms, Some(2.0));
                seen_turn = true;
            }
            t += 1.0;
            assert!(t < 1000.0);
        }
        assert!(seen_turn);

        let out = tick(&mut ctrl, &mut pos, t);
        assert_eq!(out.speed_ms, Some(1.5));
    }

    #[test]
    fn test_coordination() {
        let mut p = leg_params();
        p.coord = Some(String::from("all"));
        let mut ctrl = LegRunCtrl::new(p).unwrap();
        let mut pos = Vector2::new(50.0, 0.0);

        let out = tick(&mut ctrl, &mut pos, 0.0);
        let tdist = out
            .postings
            .iter()
            .find(|p| p.var == lr::TURN_DIST_VAR)
            .unwrap();
        assert_eq!(tdist.as_str(), Some("vname=abe,tdist=50"));

        let mut t = 1.0;
        while ctrl.mode() != Mode::Turn {
            tick(&mut ctrl, &mut pos, t);
            t += 1.0;
            assert!(t < 500.0);
        }

        // A peer in the same phase, further from its turn end
        let mut ib = InfoBuffer::with_nav(t, pos, 0.0, 1.0);
        ib.push_string(lr::TURN_DIST_VAR, "vname=ben,tdist=-500");
        let (out, report) = ctrl.proc(&ib).unwrap();

        assert_eq!(report.coord_peers, 1);
        let spd = report.coord_spd_ms.unwrap();
        assert!(spd > 0.0 && spd < 2.0);
        assert_eq!(out.speed_ms, Some(spd));
    }

    #[test]
    fn test_coord_speed_capped() {
        let mut p = leg_params();
        p.coord = Some(String::from("all"));
        let mut ctrl = LegRunCtrl::new(p).unwrap();
        let mut pos = Vector2::new(50.0, 0.0);

        let mut t = 0.0;
        while ctrl.mode() != Mode::Turn {
            tick(&mut ctrl, &mut pos, t);
            t += 1.0;
            assert!(t < 500.0);
        }

        // A peer almost done with its turn asks us for more than twice cruise
        let mut ib = InfoBuffer::with_nav(t, pos, 0.0, 1.0);
        ib.push_string(lr::TURN_DIST_VAR, "vname=ben,tdist=-1");
        let (out, report) = ctrl.proc(&ib).unwrap();

        let max = ctrl.params().max_speed_ms;
        assert_eq!(report.coord_spd_ms, Some(max));
        assert_eq!(out.speed_ms, Some(max));
    }

    #[test]
    fn test_leg_keeps_point_order() {
        let mut p = leg_params();
        p.wpt.order = wpt_eng::Order::Reverse;
        let mut ctrl = LegRunCtrl::new(p).unwrap();

        assert_eq!(
            ctrl.installed_leg(),
            vec![Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0)]
        );

        assert!(!ctrl.set_param_str("order", "reverse"));
        assert!(!ctrl.set_param_str("order", "toggle"));
        ctrl.settle();
        assert_eq!(ctrl.installed_leg()[0], Vector2::new(0.0, 0.0));

        // The first turn is made at p1
        let mut pos = Vector2::new(50.0, 0.0);
        let mut t = 0.0;
        while ctrl.mode() != Mode::Turn {
            tick(&mut ctrl, &mut pos, t);
            t += 1.0;
            assert!(t < 500.0);
        }
        assert_eq!(ctrl.leg_counts(), (1, 0));
        assert!(pos.x < 50.0);
    }

    #[test]
    fn test_settle_without_geometry_keeps_leg() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();

        assert!(ctrl.set_param_str("speed", "1.5"));
        assert!(ctrl.set_param_str("turn_rad", "25"));
        ctrl.settle();
        assert_eq!(
            ctrl.installed_leg(),
            vec![Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0)]
        );

        assert!(ctrl.set_param_str("leg_angle_mod", "90"));
        assert_eq!(ctrl.installed_leg()[1], Vector2::new(100.0, 0.0));
        ctrl.settle();
        let leg = ctrl.installed_leg();
        assert!((leg[0] - Vector2::new(50.0, 50.0)).norm() < 1e-6);
        assert!((leg[1] - Vector2::new(50.0, -50.0)).norm() < 1e-6);
    }

    #[test]
    fn test_previews() {
        let mut ctrl = LegRunCtrl::new(leg_params()).unwrap();
        let [t1, t2] = ctrl.previews();
        assert!(!t1.is_empty());
        assert!(!t2.is_empty());

        let ib = InfoBuffer::with_nav(0.0, Vector2::new(50.0, 0.0), 0.0, 1.0);
        let (out, _) = ctrl.proc(&ib).unwrap();
        assert!(out
            .postings
            .iter()
            .any(|p| p.as_str().map(|s| s.contains("abe_preview1")).unwrap_or(false)));

        // Only posted again after a change
        let (out, _) = ctrl.proc(&ib).unwrap();
        assert!(!out
            .postings
            .iter()
            .any(|p| p.as_str().map(|s| s.contains("abe_preview1")).unwrap_or(false)));

        assert!(ctrl.set_param_str("turn1_rad", "30"));
        let [t1b, _] = ctrl.previews();
        assert!(t1b.length() > t1.length());
    }
}
