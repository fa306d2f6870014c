//! # Planar geometry
//!
//! Small geometry primitives on `Vector2<f64>` points. All angles are compass
//! degrees: 0 points along +y (north), 90 along +x (east), increasing
//! clockwise.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use crate::maths::{get_ang_dist_360, rem_euclid};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this length a segment is treated as a single point.
const DEGENERATE_LEN_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle into `[0, 360)`.
pub fn angle_360(deg: f64) -> f64 {
    let a = rem_euclid(deg, 360.0);
    if a >= 360.0 { 0.0 } else { a }
}

/// Wrap an angle into `(-180, 180]`.
pub fn angle_180(deg: f64) -> f64 {
    let a = angle_360(deg);
    if a > 180.0 { a - 360.0 } else { a }
}

/// Unsigned difference between two angles, in `[0, 180]`.
pub fn ang_diff(a_deg: f64, b_deg: f64) -> f64 {
    get_ang_dist_360(a_deg, b_deg).abs()
}

/// Compass bearing from `from` to `to`. Coincident points give 0.
pub fn rel_ang(from: &Vector2<f64>, to: &Vector2<f64>) -> f64 {
    let d = to - from;

    if d.norm() < DEGENERATE_LEN_M {
        return 0.0;
    }

    angle_360(d.x.atan2(d.y).to_degrees())
}

/// The point `dist_m` away from `from` along the compass bearing `ang_deg`.
pub fn project_point(ang_deg: f64, dist_m: f64, from: &Vector2<f64>) -> Vector2<f64> {
    let a = ang_deg.to_radians();
    from + Vector2::new(a.sin(), a.cos()) * dist_m
}

/// Distance between two points.
pub fn dist(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    (a - b).norm()
}

/// Perpendicular distance from `pt` to the infinite line through `a` and `b`.
///
/// If `a` and `b` coincide the distance to `a` is returned.
pub fn dist_point_to_line(pt: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let len = ab.norm();

    if len < DEGENERATE_LEN_M {
        return dist(pt, a);
    }

    // 2D cross product magnitude over the base length
    let ap = pt - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

/// The point on segment `a`-`b` closest to `pt`.
pub fn perp_seg_int_pt(a: &Vector2<f64>, b: &Vector2<f64>, pt: &Vector2<f64>) -> Vector2<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    if len_sq < DEGENERATE_LEN_M * DEGENERATE_LEN_M {
        return *a;
    }

    let t = ((pt - a).dot(&ab) / len_sq).max(0.0).min(1.0);
    a + ab * t
}

/// Distance from `pt` to the segment `a`-`b`.
pub fn dist_point_to_seg(pt: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    dist(pt, &perp_seg_int_pt(a, b, pt))
}

/// The interior angle, in degrees, at `vertex` of the triangle formed with
/// `a` and `b`. Returns 0 if either side has zero length.
pub fn angle_from_three_points(
    vertex: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>
) -> f64 {
    let va = a - vertex;
    let vb = b - vertex;
    let denom = va.norm() * vb.norm();

    if denom < DEGENERATE_LEN_M {
        return 0.0;
    }

    (va.dot(&vb) / denom).max(-1.0).min(1.0).acos().to_degrees()
}

/// Length of the polyline through `pts`, starting at index `from_ix`.
pub fn polyline_len(pts: &[Vector2<f64>], from_ix: usize) -> f64 {
    if from_ix >= pts.len() {
        return 0.0;
    }

    pts[from_ix..]
        .windows(2)
        .map(|w| dist(&w[0], &w[1]))
        .sum()
}

/// Centre of the axis aligned bounding box of `pts`, `None` if empty.
pub fn bbox_centre(pts: &[Vector2<f64>]) -> Option<Vector2<f64>> {
    let first = pts.first()?;

    let (min, max) = pts.iter().fold((*first, *first), |(min, max), p| {
        (
            Vector2::new(min.x.min(p.x), min.y.min(p.y)),
            Vector2::new(max.x.max(p.x), max.y.max(p.y))
        )
    });

    Some((min + max) / 2.0)
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_angle_wrapping() {
        assert!(close(angle_360(-90.0), 270.0));
        assert!(close(angle_360(720.0), 0.0));
        assert!(close(angle_180(270.0), -90.0));
        assert!(close(angle_180(180.0), 180.0));
        assert!(close(ang_diff(350.0, 10.0), 20.0));
    }

    #[test]
    fn test_rel_ang_and_project() {
        let o = Vector2::new(0.0, 0.0);

        assert!(close(rel_ang(&o, &Vector2::new(0.0, 10.0)), 0.0));
        assert!(close(rel_ang(&o, &Vector2::new(10.0, 0.0)), 90.0));
        assert!(close(rel_ang(&o, &Vector2::new(0.0, -10.0)), 180.0));
        assert!(close(rel_ang(&o, &Vector2::new(-10.0, 0.0)), 270.0));

        let p = project_point(90.0, 5.0, &Vector2::new(1.0, 1.0));
        assert!(close(p.x, 6.0) && close(p.y, 1.0));

        let p = project_point(rel_ang(&o, &Vector2::new(3.0, 4.0)), 5.0, &o);
        assert!(close(p.x, 3.0) && close(p.y, 4.0));
    }

    #[test]
    fn test_line_and_segment() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, 0.0);

        assert!(close(dist_point_to_line(&Vector2::new(20.0, 5.0), &a, &b), 5.0));
        assert!(close(dist_point_to_seg(&Vector2::new(20.0, 5.0), &a, &b), 125f64.sqrt()));

        let q = perp_seg_int_pt(&a, &b, &Vector2::new(4.0, -3.0));
        assert!(close(q.x, 4.0) && close(q.y, 0.0));

        let q = perp_seg_int_pt(&a, &b, &Vector2::new(-4.0, 3.0));
        assert!(close(q.x, 0.0) && close(q.y, 0.0));
    }

    #[test]
    fn test_angle_from_three_points() {
        let c = Vector2::new(100.0, 0.0);
        let p = Vector2::new(0.0, 0.0);

        assert!(close(angle_from_three_points(&c, &p, &Vector2::new(100.0, 10.0)), 90.0));
        assert!(angle_from_three_points(&c, &p, &Vector2::new(101.0, 0.0)) > 90.0);
        assert!(angle_from_three_points(&c, &p, &Vector2::new(99.0, 0.0)) < 90.0);
        assert!(close(angle_from_three_points(&c, &c, &p), 0.0));
    }

    #[test]
    fn test_polyline() {
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(3.0, 4.0),
            Vector2::new(3.0, 10.0)
        ];

        assert!(close(polyline_len(&pts, 0), 11.0));
        assert!(close(polyline_len(&pts, 1), 6.0));
        assert!(close(polyline_len(&pts, 5), 0.0));

        let c = bbox_centre(&pts).unwrap();
        assert!(close(c.x, 1.5) && close(c.y, 5.0));
        assert!(bbox_centre(&[]).is_none());
    }
}
