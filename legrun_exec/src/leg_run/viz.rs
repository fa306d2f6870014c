//! Visual specs posted by the controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use comms_if::post::Posting;
use comms_if::viz::{VisualHints, VisualSpec};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Hint groups
pub(crate) const TURN_HINTS: &str = "turn";
pub(crate) const NEXTPT_HINTS: &str = "nextpt";
pub(crate) const LEGPT_HINTS: &str = "legpt";

/// The track point is only drawn when at least this far from the next point.
pub(crate) const TRACKPT_DRAW_DIST_M: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Labels of every object the controller draws.
#[derive(Debug, Clone)]
pub(crate) struct Labels {
    pub leg: String,
    pub turn: String,
    pub previews: [String; 3],
    pub track_pt: String,
    pub next_pt: String,
    pub leg_pts: [String; 2],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Labels {
    pub fn new(vname: &str, name: &str) -> Self {
        Self {
            leg: format!("{}_{}", vname, name),
            turn: format!("{}_turn", vname),
            previews: [
                format!("{}_preview1", vname),
                format!("{}_preview2", vname),
                format!("{}_preview3", vname),
            ],
            track_pt: format!("{}'s track-point", vname),
            next_pt: format!("{}'s next waypoint", vname),
            leg_pts: [String::from("leg_vx1"), String::from("leg_vx2")],
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// A segment list, or the spec erasing it if `active` is false.
pub(crate) fn seglist(
    label: &str,
    pts: &[Vector2<f64>],
    hints: &VisualHints,
    group: Option<&str>,
    active: bool,
) -> VisualSpec {
    let spec = VisualSpec::seglist(label, pts.iter().map(|p| (p.x, p.y)).collect());
    if active {
        spec.with_hints(hints, group)
    }
    else {
        spec.inactive()
    }
}

/// A point, or the spec erasing it if `active` is false or there is no
/// point.
pub(crate) fn point(
    label: &str,
    pt: Option<Vector2<f64>>,
    hints: &VisualHints,
    group: Option<&str>,
    active: bool,
) -> VisualSpec {
    let p = pt.unwrap_or_else(Vector2::zeros);
    let spec = VisualSpec::point(label, p.x, p.y);
    if active && pt.is_some() {
        spec.with_hints(hints, group)
    }
    else {
        spec.inactive()
    }
}

pub(crate) fn post(spec: &VisualSpec) -> Posting {
    Posting::str(spec.var(), spec.to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::viz::VIEW_POINT;

    #[test]
    fn test_labels_and_specs() {
        let l = Labels::new("abe", "bhv_legrun");
        assert_eq!(l.leg, "abe_bhv_legrun");
        assert_eq!(l.previews[2], "abe_preview3");

        let hints = VisualHints::default();
        let spec = point(&l.next_pt, Some(Vector2::new(1.0, 2.0)), &hints, Some(NEXTPT_HINTS), true);
        assert!(spec.active);
        assert!(spec.hints.iter().any(|(k, v)| k == "vertex_color" && v == "yellow"));

        let p = post(&spec);
        assert_eq!(p.var, VIEW_POINT);

        let gone = point(&l.track_pt, None, &hints, Some(NEXTPT_HINTS), true);
        assert!(!gone.active);
    }
}
