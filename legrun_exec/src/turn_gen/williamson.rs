//! Williamson turn geometry
//!
//! When the lane gap is narrower than the turn diameter the vehicle swings
//! out away from the new lane, loops around a large arc and then tucks back
//! in (switch 1). Otherwise two quarter arcs joined through the far side of
//! the turn circle are enough (switch 2).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::{arc_points, TurnInputs, TurnPath};
use util::geom::{self, project_point};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The construction used for the last generated turn, kept for display and
/// inspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WilliamsonGeom {
    /// True if the narrow lane construction was used
    pub switch1: bool,

    /// Centre of the lane gap, level with the start
    pub c0_m: Vector2<f64>,

    /// Starboard side circle centre
    pub c1_m: Vector2<f64>,

    /// Port side circle centre
    pub c2_m: Vector2<f64>,

    /// Main loop centre
    pub c3_m: Vector2<f64>,

    /// Entry arc sweep
    pub theta1_deg: f64,

    /// Exit arc sweep
    pub theta2_deg: f64,

    /// Angle left uncovered by the main loop
    pub ang_w_deg: f64,

    /// Distance from the lane centre forward to the main loop centre,
    /// before any extension
    pub b_m: f64,

    pub lane_gap_m: f64,

    /// How far the turn was shifted along the heading to start at the real
    /// end of the leg
    pub natural_ext_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub(crate) fn generate(inp: &TurnInputs) -> (TurnPath, WilliamsonGeom) {
    if 2.0 * inp.radius_m > inp.lane_gap_m {
        switch1(inp)
    } else {
        switch2(inp)
    }
}

/// Narrow lane: swing out, loop, tuck in.
fn switch1(inp: &TurnInputs) -> (TurnPath, WilliamsonGeom) {
    let r = inp.radius_m;
    let d = inp.lane_gap_m;
    let h = inp.heading_deg;
    let port_ang = h - 90.0;
    let star_ang = h + 90.0;
    let bias = inp.bias_m;

    let theta = ((r + d / 2.0) / (2.0 * r)).max(-1.0).min(1.0).acos();
    let theta_deg = theta.to_degrees();
    let mut ang_w = (90.0 - theta_deg) * 2.0;
    let b = theta.sin() * 2.0 * r;
    let mut be = b + inp.ext_m;

    let k1 = r + d / 2.0 - bias;
    let k2 = r + d / 2.0 + bias;

    // With a bias the loop must reach far enough forward for both tangent
    // constructions to exist
    if bias != 0.0 {
        for k in [k1, k2].iter() {
            let lim = (4.0 * r * r - k * k).max(0.0).sqrt();
            if be < lim {
                be = lim + 1.0;
            }
        }
    }

    let start = inp.start_m;
    let (mut c0, mut c1, mut c2) = if inp.port {
        (
            project_point(port_ang, d / 2.0 - bias, &start),
            project_point(star_ang, r, &start),
            project_point(port_ang, r + d, &start),
        )
    } else {
        (
            project_point(star_ang, d / 2.0 - bias, &start),
            project_point(star_ang, r + d, &start),
            project_point(port_ang, r, &start),
        )
    };
    let mut c3 = project_point(h, be, &c0);

    let mut pts = Vec::new();
    if inp.natural_ext_m > 0.0 {
        let n = inp.natural_ext_m;
        c0 = project_point(h, n, &c0);
        c1 = project_point(h, n, &c1);
        c2 = project_point(h, n, &c2);
        c3 = project_point(h, n, &c3);
        pts.push(start);
    }

    let mut theta1 = theta_deg;
    let mut theta2 = (180.0 - ang_w) / 2.0;
    if be > b {
        theta1 = tangent_sweep(be, k1, r);
        theta2 = tangent_sweep(be, k2, r);
        ang_w = 180.0 - (theta1 + theta2);
    }

    let gap = inp.pt_gap_m;
    if inp.port {
        pts.extend(arc_points(&c1, r, port_ang, theta1, true, gap));
        pts.extend(arc_points(&c3, r, h + 90.0 + theta1, 360.0 - ang_w, false, gap));
        pts.extend(arc_points(&c2, r, star_ang - theta2, theta2, true, gap));
    } else {
        pts.extend(arc_points(&c2, r, star_ang, theta1, false, gap));
        pts.extend(arc_points(&c3, r, h - 90.0 - theta1, 360.0 - ang_w, true, gap));
        pts.extend(arc_points(&c1, r, port_ang + theta2, theta2, false, gap));
    }

    finish(inp, &mut pts);

    let geom = WilliamsonGeom {
        switch1: true,
        c0_m: c0,
        c1_m: c1,
        c2_m: c2,
        c3_m: c3,
        theta1_deg: theta1,
        theta2_deg: theta2,
        ang_w_deg: ang_w,
        b_m: b,
        lane_gap_m: d,
        natural_ext_m: inp.natural_ext_m.max(0.0),
    };

    (TurnPath::new(start, pts), geom)
}

/// Wide lane: two quarter arcs.
fn switch2(inp: &TurnInputs) -> (TurnPath, WilliamsonGeom) {
    let r = inp.radius_m;
    let d = inp.lane_gap_m;
    let h = inp.heading_deg;
    let port_ang = h - 90.0;
    let star_ang = h + 90.0;
    let k = d / 2.0 - r;

    let start = inp.start_m;
    let side = if inp.port { port_ang } else { star_ang };
    let mut c0 = project_point(side, d / 2.0, &start);
    let mut c3 = project_point(h, inp.ext_m, &c0);
    let mut c1 = project_point(star_ang, k, &c3);
    let mut c2 = project_point(port_ang, k, &c3);

    let mut pts = Vec::new();
    if inp.natural_ext_m > 0.0 {
        let n = inp.natural_ext_m;
        c0 = project_point(h, n, &c0);
        c1 = project_point(h, n, &c1);
        c2 = project_point(h, n, &c2);
        c3 = project_point(h, n, &c3);
        pts.push(start);
    }

    let gap = inp.pt_gap_m;
    if inp.port {
        pts.extend(arc_points(&c1, r, h + 90.0, 90.0, false, gap));
        pts.extend(arc_points(&c2, r, h, 90.0, false, gap));
    } else {
        pts.extend(arc_points(&c2, r, h - 90.0, 90.0, true, gap));
        pts.extend(arc_points(&c1, r, h, 90.0, true, gap));
    }

    finish(inp, &mut pts);

    let geom = WilliamsonGeom {
        switch1: false,
        c0_m: c0,
        c1_m: c1,
        c2_m: c2,
        c3_m: c3,
        theta1_deg: 90.0,
        theta2_deg: 90.0,
        ang_w_deg: 0.0,
        b_m: 0.0,
        lane_gap_m: d,
        natural_ext_m: inp.natural_ext_m.max(0.0),
    };

    (TurnPath::new(start, pts), geom)
}

/// Sweep of the arc joining a side circle to the main loop when the loop
/// centre is `be` ahead and `k` across.
fn tangent_sweep(be: f64, k: f64, r: f64) -> f64 {
    let h = (be * be + k * k).sqrt() / 2.0;
    let a = (be / k).atan().to_degrees();
    let b = (r / h).max(-1.0).min(1.0).acos().to_degrees();
    a - b
}

/// Close the path at the end position.
fn finish(inp: &TurnInputs, pts: &mut Vec<Vector2<f64>>) {
    let at_end = pts
        .last()
        .map(|p| geom::dist(p, &inp.end_m) < super::MERGE_THRESH_M)
        .unwrap_or(false);

    if !at_end {
        pts.push(inp.end_m);
    }
}

#[cfg(test)]
mod test {
    use super::super::*;
    use std::f64::consts::PI;

    fn gen(start: (f64, f64), hdg: f64, end: (f64, f64), r: f64) -> TurnGen {
        let mut tg = TurnGen::new(TurnGenKind::Williamson);
        tg.set_start_pose(Vector2::new(start.0, start.1), hdg);
        tg.set_end_pos(Vector2::new(end.0, end.1));
        tg.set_turn_radius(r);
        tg.set_point_gap(0.5);
        tg
    }

    #[test]
    fn test_wide_lane_semicircle() {
        // Lane gap of one diameter reduces to a half circle
        let mut tg = gen((0.0, 0.0), 0.0, (30.0, 0.0), 15.0);
        let p = tg.generate();

        assert!(!tg.last_geom().map(|g| g.switch1).unwrap_or(true));
        assert!((p.length() - PI * 15.0).abs() < 0.1, "length {}", p.length());

        let end = p.end().unwrap();
        assert!((end - Vector2::new(30.0, 0.0)).norm() < 1e-6);

        // Starboard turn heading north stays in the north east
        assert!(p.points().iter().all(|pt| pt.x >= -1e-9 && pt.y >= -1e-9));
    }

    #[test]
    fn test_zero_lane_gap() {
        let mut tg = gen((0.0, 0.0), 90.0, (0.0, 0.0), 15.0);
        let p = tg.generate();

        let g = tg.last_geom().copied();
        assert!(g.map(|g| g.switch1).unwrap_or(false));

        // 60 degree entry, 300 degree loop, 60 degree exit
        assert!((p.length() - 7.0 * PI / 3.0 * 15.0).abs() < 0.2, "length {}", p.length());

        let end = p.end().unwrap();
        assert!(end.norm() < 1e-6);

        // Consecutive points never further apart than the point gap
        let mut prev = p.start();
        for pt in p.points() {
            assert!((pt - prev).norm() <= 0.5 + 1e-6);
            prev = *pt;
        }
    }

    #[test]
    fn test_narrow_lane_ends_on_lane() {
        for port in [true, false].iter() {
            let end = if *port { (-10.0, 0.0) } else { (10.0, 0.0) };
            let mut tg = gen((0.0, 0.0), 0.0, end, 20.0);
            tg.set_dir(if *port { TurnDir::Port } else { TurnDir::Star });
            let p = tg.generate();

            assert!(p.len() > 10);

            // The exit arc finishes on the end position by itself
            let n = p.len();
            let last = p.points()[n - 1];
            assert!((last - Vector2::new(end.0, end.1)).norm() < 1e-6);

            // Swinging out means the path goes the other way first
            let swing = p.points()[1].x;
            if *port {
                assert!(swing > 0.0);
            } else {
                assert!(swing < 0.0);
            }
        }
    }

    #[test]
    fn test_first_point_at_entry() {
        // Narrow and wide lanes, each with the end level with the start and
        // 12 m further on
        let cases = [(20.0, 10.0, 0.0), (20.0, 10.0, 12.0), (10.0, 30.0, 0.0), (10.0, 30.0, 12.0)];

        for (r, gap, ahead) in cases.iter() {
            for port in [true, false].iter() {
                let across = if *port { -gap } else { *gap };
                let mut tg = gen((0.0, 0.0), 0.0, (across, *ahead), *r);
                tg.set_dir(if *port { TurnDir::Port } else { TurnDir::Star });
                let p = tg.generate();
                let g = tg.last_geom().copied().unwrap();

                assert!((g.natural_ext_m - ahead).abs() < 1e-9);

                // The turn proper starts level with the end position
                let entry = Vector2::new(0.0, *ahead);
                let first = if *ahead > 0.0 {
                    assert!(p.points()[0].norm() < 1e-9);
                    p.points()[1]
                } else {
                    p.points()[0]
                };
                assert!((first - entry).norm() <= 0.5, "first {:?}", first);

                // The next point leaves the entry at most a gap away
                let next = p.points().iter().find(|pt| (*pt - first).norm() > 1e-9).unwrap();
                assert!((next - first).norm() <= 0.5 + 1e-6);

                let end = p.end().unwrap();
                assert!((end - Vector2::new(across, *ahead)).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_bias_changes_loop() {
        let mut tg = gen((0.0, 0.0), 0.0, (10.0, 0.0), 20.0);
        let plain = tg.generate();

        tg.set_bias_pct(50.0);
        let biased = tg.generate();

        assert!(plain.length() > 0.0 && biased.length() > 0.0);
        assert!((plain.length() - biased.length()).abs() > 1.0);

        let end = biased.end().unwrap();
        assert!((end - Vector2::new(10.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_end_behind_start() {
        // End is 12 m behind the start and a lane to starboard
        let mut tg = gen((0.0, 0.0), 0.0, (40.0, -12.0), 15.0);
        let p = tg.generate();

        let end = p.end().unwrap();
        assert!((end - Vector2::new(40.0, -12.0)).norm() < 1e-6);
        assert!(p.length() > PI * 15.0);
    }
}
