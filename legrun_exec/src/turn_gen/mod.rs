//! # Turn Generation Module
//!
//! Generates the discretised path a vehicle follows to reverse its heading
//! at the end of a leg. Given a start pose and an end position (the end
//! heading is always the start heading plus 180 degrees) a generator
//! produces a `TurnPath`: an ordered list of points ending at the end
//! position, plus its length.
//!
//! Two kinds of turn are available, selected by `TurnGenKind`:
//!
//! - `Williamson` - the full lane-switching Williamson turn, which can
//!   reverse onto a lane closer than one turn diameter away by swinging out
//!   first.
//! - `Simple180` - a single half circle, suitable when the lane gap is at
//!   least a turn diameter.
//!
//! Arcs are sampled at a fixed arc length spacing (the point gap), and the
//! final sample of each arc is always at its exact end angle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod simple;
mod williamson;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use util::{geom, maths};

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use williamson::WilliamsonGeom;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Consecutive points closer than this are merged.
pub const MERGE_THRESH_M: f64 = 1e-6;

/// Tolerance when comparing arc angles against their limits.
const ANGLE_EPS_DEG: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A generated turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnPath {
    /// Where the vehicle starts the turn from
    start_m: Vector2<f64>,

    /// Points to follow, in order
    points_m: Vec<Vector2<f64>>,

    /// Length from the start through every point
    length_m: f64,
}

/// Turn generator.
///
/// Setters which take a value that can be invalid return false and leave the
/// generator unchanged. Until a start pose, radius and point gap have all
/// been set `generate` produces an empty path.
#[derive(Debug, Clone)]
pub struct TurnGen {
    kind: TurnGenKind,

    start: Option<(Vector2<f64>, f64)>,
    end_m: Option<Vector2<f64>>,
    radius_m: Option<f64>,
    pt_gap_m: Option<f64>,

    /// Requested lane gap, replaced by the measured one when the end
    /// position is known
    lane_gap_m: f64,
    bias_pct: f64,
    ext_m: f64,
    dir: TurnDir,

    last_geom: Option<WilliamsonGeom>,
}

/// The fully resolved inputs to a single generation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TurnInputs {
    pub start_m: Vector2<f64>,
    pub heading_deg: f64,
    pub end_m: Vector2<f64>,
    pub radius_m: f64,
    pub pt_gap_m: f64,
    pub lane_gap_m: f64,
    pub bias_m: f64,
    pub ext_m: f64,
    pub port: bool,

    /// Signed distance of the end position ahead of the start along the
    /// start heading, negative if behind
    pub natural_ext_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which side the turn is made to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDir {
    Port,
    Star,

    /// Turn toward the side the end position lies on
    Auto,
}

/// The kind of turn to generate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnGenKind {
    Williamson,
    Simple180,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TurnPath {
    /// Build a path, computing its length from the start position.
    pub fn new(start_m: Vector2<f64>, points_m: Vec<Vector2<f64>>) -> Self {
        let mut p = Self {
            start_m,
            points_m,
            length_m: 0.0,
        };
        p.update_length();
        p
    }

    pub fn start(&self) -> Vector2<f64> {
        self.start_m
    }

    pub fn points(&self) -> &[Vector2<f64>] {
        &self.points_m
    }

    /// The last point of the path, `None` if empty.
    pub fn end(&self) -> Option<Vector2<f64>> {
        self.points_m.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }

    /// Length from the start through every point.
    pub fn length(&self) -> f64 {
        self.length_m
    }

    /// Remove points closer than `thresh_m` to the point before them.
    pub fn merge_points(&mut self, thresh_m: f64) {
        let mut merged: Vec<Vector2<f64>> = Vec::with_capacity(self.points_m.len());

        for p in self.points_m.drain(..) {
            match merged.last() {
                Some(last) if geom::dist(last, &p) < thresh_m => (),
                _ => merged.push(p),
            }
        }

        self.points_m = merged;
        self.update_length();
    }

    fn update_length(&mut self) {
        self.length_m = match self.points_m.first() {
            Some(first) => {
                geom::dist(&self.start_m, first) + geom::polyline_len(&self.points_m, 0)
            }
            None => 0.0,
        };
    }
}

impl TurnGen {
    pub fn new(kind: TurnGenKind) -> Self {
        Self {
            kind,
            start: None,
            end_m: None,
            radius_m: None,
            pt_gap_m: None,
            lane_gap_m: 0.0,
            bias_pct: 0.0,
            ext_m: 0.0,
            dir: TurnDir::Star,
            last_geom: None,
        }
    }

    pub fn kind(&self) -> TurnGenKind {
        self.kind
    }

    /// Set the pose the turn starts from.
    pub fn set_start_pose(&mut self, pos_m: Vector2<f64>, heading_deg: f64) {
        self.start = Some((pos_m, geom::angle_360(heading_deg)));
    }

    /// Set the position the turn must end at.
    pub fn set_end_pos(&mut self, pos_m: Vector2<f64>) {
        self.end_m = Some(pos_m);
    }

    /// Heading at the end of the turn, the reverse of the start heading.
    pub fn end_heading(&self) -> Option<f64> {
        self.start.map(|(_, h)| geom::angle_360(h + 180.0))
    }

    /// Set the turn radius, false if not positive.
    pub fn set_turn_radius(&mut self, radius_m: f64) -> bool {
        if !(radius_m > 0.0) || !radius_m.is_finite() {
            return false;
        }
        self.radius_m = Some(radius_m);
        true
    }

    /// Set the arc length between points, false if not positive.
    pub fn set_point_gap(&mut self, gap_m: f64) -> bool {
        if !(gap_m > 0.0) || !gap_m.is_finite() {
            return false;
        }
        self.pt_gap_m = Some(gap_m);
        true
    }

    /// Set the lane gap, false if negative. Only used when no end position
    /// is set, otherwise the gap is measured from the geometry.
    pub fn set_lane_gap(&mut self, gap_m: f64) -> bool {
        if !(gap_m >= 0.0) {
            return false;
        }
        self.lane_gap_m = gap_m;
        true
    }

    /// Set the bias as a percentage of the largest possible bias, clipped
    /// to `[-100, 100]`.
    pub fn set_bias_pct(&mut self, pct: f64) {
        if pct.is_finite() {
            self.bias_pct = maths::clamp(pct, -100.0, 100.0);
        }
    }

    /// Set the straight run-up before the turn, negative values become 0.
    pub fn set_extent(&mut self, ext_m: f64) {
        if ext_m.is_finite() {
            self.ext_m = ext_m.max(0.0);
        }
    }

    pub fn set_dir(&mut self, dir: TurnDir) {
        self.dir = dir;
    }

    /// True if the generator has everything it needs.
    pub fn valid(&self) -> bool {
        self.start.is_some() && self.radius_m.is_some() && self.pt_gap_m.is_some()
    }

    /// The lane gap the next generation will use.
    pub fn lane_gap(&self) -> f64 {
        match (self.start, self.end_m) {
            (Some((s, h)), Some(e)) => {
                geom::dist_point_to_line(&e, &s, &geom::project_point(h, 20.0, &s))
            }
            _ => self.lane_gap_m,
        }
    }

    /// The largest bias magnitude for the current radius and lane gap.
    pub fn max_bias(&self) -> f64 {
        match self.radius_m {
            Some(r) => (r - self.lane_gap() / 2.0).max(0.0),
            None => 0.0,
        }
    }

    /// The bias in metres, always within `[-max_bias, max_bias]`.
    pub fn bias(&self) -> f64 {
        self.bias_pct / 100.0 * self.max_bias()
    }

    /// Geometry of the last Williamson turn generated.
    pub fn last_geom(&self) -> Option<&WilliamsonGeom> {
        self.last_geom.as_ref()
    }

    /// Generate the turn. Returns an empty path if the generator is not
    /// valid.
    pub fn generate(&mut self) -> TurnPath {
        self.last_geom = None;

        let inputs = match self.resolve() {
            Some(i) => i,
            None => return TurnPath::default(),
        };

        let mut path = match self.kind {
            TurnGenKind::Williamson => {
                let (path, geom) = williamson::generate(&inputs);
                self.last_geom = Some(geom);
                path
            }
            TurnGenKind::Simple180 => simple::generate(&inputs),
        };

        path.merge_points(MERGE_THRESH_M);
        path
    }

    /// Work out everything a generation needs, including the turn side and
    /// how far fore or aft of the start the end position is.
    fn resolve(&self) -> Option<TurnInputs> {
        if !self.valid() {
            return None;
        }
        let (start_m, heading_deg) = self.start?;
        let radius_m = self.radius_m?;
        let pt_gap_m = self.pt_gap_m?;

        // Without an end position the turn ends a lane gap to the side
        let lane_gap_m = self.lane_gap();
        let side = match self.dir {
            TurnDir::Port => heading_deg - 90.0,
            _ => heading_deg + 90.0,
        };
        let end_m = self
            .end_m
            .unwrap_or_else(|| geom::project_point(side, lane_gap_m, &start_m));

        let angle_diff = geom::angle_180(geom::rel_ang(&start_m, &end_m) - heading_deg);

        let port = match self.dir {
            TurnDir::Port => true,
            TurnDir::Star => false,
            TurnDir::Auto => lane_gap_m > 0.0 && angle_diff < 0.0,
        };

        let fore = angle_diff > -90.0 && angle_diff < 90.0;
        let beam = geom::project_point(heading_deg + 90.0, 20.0, &start_m);
        let along_m = geom::dist_point_to_line(&end_m, &start_m, &beam);
        let natural_ext_m = if fore { along_m } else { -along_m };

        Some(TurnInputs {
            start_m,
            heading_deg,
            end_m,
            radius_m,
            pt_gap_m,
            lane_gap_m,
            bias_m: self.bias(),
            ext_m: self.ext_m,
            port,
            natural_ext_m,
        })
    }
}

impl FromStr for TurnDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "port" => Ok(TurnDir::Port),
            "star" | "starboard" => Ok(TurnDir::Star),
            "auto" => Ok(TurnDir::Auto),
            o => Err(format!("expected port, star or auto, found {}", o)),
        }
    }
}

impl fmt::Display for TurnDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDir::Port => write!(f, "port"),
            TurnDir::Star => write!(f, "star"),
            TurnDir::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for TurnGenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "williamson" => Ok(TurnGenKind::Williamson),
            "simple180" | "simple" => Ok(TurnGenKind::Simple180),
            o => Err(format!("expected williamson or simple180, found {}", o)),
        }
    }
}

impl fmt::Display for TurnGenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnGenKind::Williamson => write!(f, "williamson"),
            TurnGenKind::Simple180 => write!(f, "simple180"),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Sample an arc of `radius_m` about `centre` which starts at compass angle
/// `start_deg` and sweeps `sweep_deg` degrees, clockwise if `clockwise`.
///
/// Samples are `gap_m` of arc apart and the last sample is always at the end
/// of the sweep. A negative sweep produces no points.
pub(crate) fn arc_points(
    centre: &Vector2<f64>,
    radius_m: f64,
    start_deg: f64,
    sweep_deg: f64,
    clockwise: bool,
    gap_m: f64,
) -> Vec<Vector2<f64>> {
    if !(sweep_deg >= -ANGLE_EPS_DEG) {
        return Vec::new();
    }
    let sweep_deg = sweep_deg.max(0.0);

    let step_deg = (gap_m / radius_m).to_degrees();
    let sign = if clockwise { 1.0 } else { -1.0 };
    let at = |delta: f64| geom::project_point(start_deg + sign * delta, radius_m, centre);

    let mut pts = Vec::new();
    let mut delta = 0.0;
    while delta < sweep_deg - ANGLE_EPS_DEG {
        pts.push(at(delta));
        delta += step_deg;
    }
    pts.push(at(sweep_deg));

    pts
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validity() {
        let mut tg = TurnGen::new(TurnGenKind::Williamson);
        assert!(!tg.valid());
        assert!(tg.generate().is_empty());

        assert!(!tg.set_turn_radius(0.0));
        assert!(!tg.set_turn_radius(-3.0));
        assert!(!tg.set_point_gap(0.0));
        assert!(!tg.set_lane_gap(-1.0));

        tg.set_start_pose(Vector2::new(0.0, 0.0), 90.0);
        assert!(tg.set_turn_radius(10.0));
        assert!(!tg.valid());
        assert!(tg.set_point_gap(1.0));
        assert!(tg.valid());
        assert_eq!(tg.end_heading(), Some(270.0));
    }

    #[test]
    fn test_bias_clamped() {
        let mut tg = TurnGen::new(TurnGenKind::Williamson);
        tg.set_start_pose(Vector2::new(0.0, 0.0), 0.0);
        tg.set_end_pos(Vector2::new(10.0, 0.0));
        tg.set_turn_radius(15.0);
        tg.set_point_gap(1.0);

        // Lane gap of 10 gives a largest bias of 10
        assert!((tg.lane_gap() - 10.0).abs() < 1e-9);
        assert!((tg.max_bias() - 10.0).abs() < 1e-9);

        for pct in [-250.0, -100.0, -30.0, 0.0, 55.0, 100.0, 1e6].iter() {
            tg.set_bias_pct(*pct);
            assert!(tg.bias().abs() <= tg.max_bias() + 1e-12);
        }

        tg.set_bias_pct(150.0);
        assert!((tg.bias() - 10.0).abs() < 1e-9);
        tg.set_bias_pct(-50.0);
        assert!((tg.bias() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_points() {
        let c = Vector2::new(0.0, 0.0);

        // Quarter circle of radius 10 from north to east, 1 m spacing
        let pts = arc_points(&c, 10.0, 0.0, 90.0, true, 1.0);
        let first = pts[0];
        let last = pts[pts.len() - 1];
        assert!(first.x.abs() < 1e-9 && (first.y - 10.0).abs() < 1e-9);
        assert!((last.x - 10.0).abs() < 1e-9 && last.y.abs() < 1e-9);

        // Arc length is 15.7 m so 16 steps and the end point
        assert_eq!(pts.len(), 17);

        assert!(arc_points(&c, 10.0, 0.0, -5.0, true, 1.0).is_empty());
        assert_eq!(arc_points(&c, 10.0, 0.0, 0.0, true, 1.0).len(), 1);
    }

    #[test]
    fn test_merge_points() {
        let mut p = TurnPath::new(
            Vector2::new(0.0, 0.0),
            vec![
                Vector2::new(0.0, 1.0),
                Vector2::new(0.0, 1.0 + 1e-9),
                Vector2::new(0.0, 2.0),
            ],
        );
        assert!((p.length() - 2.0).abs() < 1e-6);

        p.merge_points(MERGE_THRESH_M);
        assert_eq!(p.len(), 2);
        assert!((p.length() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_dir() {
        let mut tg = TurnGen::new(TurnGenKind::Simple180);
        tg.set_start_pose(Vector2::new(0.0, 0.0), 0.0);
        tg.set_turn_radius(10.0);
        tg.set_point_gap(1.0);
        tg.set_dir(TurnDir::Auto);

        // End to the west, a port turn keeps every point west of the start
        tg.set_end_pos(Vector2::new(-20.0, 0.0));
        let p = tg.generate();
        assert!(p.points().iter().all(|pt| pt.x <= 1e-9));

        tg.set_end_pos(Vector2::new(20.0, 0.0));
        let p = tg.generate();
        assert!(p.points().iter().all(|pt| pt.x >= -1e-9));
    }
}
