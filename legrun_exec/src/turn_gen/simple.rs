//! Half circle turn
//!
//! A single 180 degree arc after the straight run-up. The radius grows to
//! half the lane gap when the lane is wider than the turn diameter, and the
//! path is closed by the end position when the arc does not reach it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{arc_points, TurnInputs, TurnPath, MERGE_THRESH_M};
use util::geom::{dist, project_point};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub(crate) fn generate(inp: &TurnInputs) -> TurnPath {
    let h = inp.heading_deg;
    let r = inp.radius_m.max(inp.lane_gap_m / 2.0);
    let run_up_m = inp.ext_m + inp.natural_ext_m.max(0.0);

    let mut pts = Vec::new();
    let arc_start = project_point(h, run_up_m, &inp.start_m);
    if run_up_m > 0.0 {
        pts.push(inp.start_m);
    }

    let (side, opposite) = if inp.port {
        (h - 90.0, h + 90.0)
    } else {
        (h + 90.0, h - 90.0)
    };
    let centre = project_point(side, r, &arc_start);
    pts.extend(arc_points(&centre, r, opposite, 180.0, !inp.port, inp.pt_gap_m));

    let at_end = pts
        .last()
        .map(|p| dist(p, &inp.end_m) < MERGE_THRESH_M)
        .unwrap_or(false);
    if !at_end {
        pts.push(inp.end_m);
    }

    TurnPath::new(inp.start_m, pts)
}
