//! # Objective functions
//!
//! The controller does not command the vehicle directly. It expresses what
//! it wants as utility functions over the course and speed domains, which a
//! downstream solver combines with other behaviours' wishes. This module
//! provides the `ObjectiveBuilder` seam and the default piecewise-linear
//! implementation, `PeakBuilder`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use util::{geom, maths};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Utility of the best possible value.
pub const MAX_UTIL: f64 = 100.0;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Builds the objective functions the controller emits each cycle.
pub trait ObjectiveBuilder {
    /// Preference over course for steering toward `target_deg` when the
    /// current heading is `curr_deg`.
    fn course(&self, target_deg: f64, curr_deg: f64) -> Objective;

    /// Preference over speed for holding `target_ms`.
    fn speed(&self, target_ms: f64, curr_ms: f64) -> Objective;

    /// Weighted combination of two objectives.
    fn combine(&self, a: Objective, b: Objective, weight_a: f64, weight_b: f64) -> Objective;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A peaked piecewise-linear function.
///
/// Utility is `max_util` at the summit, falling by `summit_delta` linearly
/// across the peak width, then down to `min_util` across the base width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub summit: f64,
    pub peak_width: f64,
    pub base_width: f64,
    pub summit_delta: f64,
    pub min_util: f64,
    pub max_util: f64,
}

/// Speed preference: best at `target_ms`, `low_util` at `low_ms`, zero at
/// rest, `high_util` at `high_ms` and zero at the top of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedCurve {
    pub target_ms: f64,
    pub low_ms: f64,
    pub high_ms: f64,
    pub low_util: f64,
    pub high_util: f64,
    pub max_speed_ms: f64,
}

/// Default objective builder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeakBuilder {
    /// Top of the speed domain
    pub max_speed_ms: f64,

    /// Search resolution over course
    pub course_res_deg: f64,

    /// Search resolution over speed
    pub speed_res_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A utility function over course, speed or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Objective {
    /// Maximum over a set of wrapping peaks on the course domain
    Course(Vec<Peak>),

    Speed(SpeedCurve),

    /// Weighted sum of two objectives
    Coupled {
        a: Box<Objective>,
        b: Box<Objective>,
        weight_a: f64,
        weight_b: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Peak {
    /// Evaluate at distance `offset` from the summit.
    fn eval_offset(&self, offset: f64) -> f64 {
        let offset = offset.abs();
        let shoulder = self.max_util - self.summit_delta;

        if offset <= self.peak_width {
            if self.peak_width <= 0.0 {
                return self.max_util;
            }
            self.max_util - self.summit_delta * offset / self.peak_width
        }
        else if offset <= self.peak_width + self.base_width && self.base_width > 0.0 {
            let frac = (offset - self.peak_width) / self.base_width;
            shoulder - (shoulder - self.min_util) * frac
        }
        else {
            self.min_util
        }
    }

    /// Evaluate on the wrapping course domain.
    pub fn eval_course(&self, course_deg: f64) -> f64 {
        self.eval_offset(geom::ang_diff(course_deg, self.summit))
    }
}

impl SpeedCurve {
    pub fn eval(&self, spd_ms: f64) -> f64 {
        let lerp = |x0: f64, y0: f64, x1: f64, y1: f64, x: f64| {
            if (x1 - x0).abs() < f64::EPSILON {
                y1
            }
            else {
                maths::lin_map((x0, x1), (y0, y1), x)
            }
        };

        if spd_ms < 0.0 || spd_ms > self.max_speed_ms {
            0.0
        }
        else if spd_ms <= self.low_ms {
            lerp(0.0, 0.0, self.low_ms, self.low_util, spd_ms)
        }
        else if spd_ms <= self.target_ms {
            lerp(self.low_ms, self.low_util, self.target_ms, MAX_UTIL, spd_ms)
        }
        else if spd_ms <= self.high_ms {
            lerp(self.target_ms, MAX_UTIL, self.high_ms, self.high_util, spd_ms)
        }
        else {
            lerp(self.high_ms, self.high_util, self.max_speed_ms, 0.0, spd_ms)
        }
    }
}

impl Objective {
    /// Utility of a course and speed pair, normalised so that the best
    /// possible value is `MAX_UTIL`.
    pub fn eval(&self, course_deg: f64, spd_ms: f64) -> f64 {
        match self {
            Objective::Course(peaks) => peaks
                .iter()
                .map(|p| p.eval_course(course_deg))
                .fold(0.0, f64::max),
            Objective::Speed(curve) => curve.eval(spd_ms),
            Objective::Coupled {
                a,
                b,
                weight_a,
                weight_b,
            } => {
                let total = weight_a + weight_b;
                if total <= 0.0 {
                    return 0.0;
                }
                (a.eval(course_deg, spd_ms) * weight_a + b.eval(course_deg, spd_ms) * weight_b)
                    / total
            }
        }
    }

    /// True if the objective depends on course.
    pub fn has_course(&self) -> bool {
        match self {
            Objective::Course(_) => true,
            Objective::Speed(_) => false,
            Objective::Coupled { a, b, .. } => a.has_course() || b.has_course(),
        }
    }

    /// True if the objective depends on speed.
    pub fn has_speed(&self) -> bool {
        match self {
            Objective::Course(_) => false,
            Objective::Speed(_) => true,
            Objective::Coupled { a, b, .. } => a.has_speed() || b.has_speed(),
        }
    }

    /// The course and speed with the highest utility, searched on a grid.
    /// Either is `None` if the objective does not depend on it.
    pub fn best(&self, builder: &PeakBuilder) -> (Option<f64>, Option<f64>) {
        let courses = grid(0.0, 360.0 - builder.course_res_deg, builder.course_res_deg);
        let speeds = grid(0.0, builder.max_speed_ms, builder.speed_res_ms);

        // Course and speed terms are additive so each can be searched alone
        let best_course = if self.has_course() {
            argmax(&courses, |c| self.eval(c, 0.0))
        }
        else {
            None
        };
        let best_speed = if self.has_speed() {
            argmax(&speeds, |s| self.eval(best_course.unwrap_or(0.0), s))
        }
        else {
            None
        };

        (best_course, best_speed)
    }
}

impl Default for PeakBuilder {
    fn default() -> Self {
        Self {
            max_speed_ms: 5.0,
            course_res_deg: 1.0,
            speed_res_ms: 0.05,
        }
    }
}

impl PeakBuilder {
    pub fn new(max_speed_ms: f64) -> Self {
        Self {
            max_speed_ms: max_speed_ms.max(0.0),
            ..Self::default()
        }
    }
}

impl ObjectiveBuilder for PeakBuilder {
    fn course(&self, target_deg: f64, curr_deg: f64) -> Objective {
        // A sharp peak on the target, and a small bump around the current
        // heading to damp hunting between near-equal choices
        Objective::Course(vec![
            Peak {
                summit: geom::angle_360(target_deg),
                peak_width: 0.0,
                base_width: 180.0,
                summit_delta: 50.0,
                min_util: 0.0,
                max_util: MAX_UTIL,
            },
            Peak {
                summit: geom::angle_360(curr_deg),
                peak_width: 30.0,
                base_width: 180.0,
                summit_delta: 5.0,
                min_util: 0.0,
                max_util: 20.0,
            },
        ])
    }

    fn speed(&self, target_ms: f64, _curr_ms: f64) -> Objective {
        let target_ms = target_ms.max(0.0).min(self.max_speed_ms);
        Objective::Speed(SpeedCurve {
            target_ms,
            low_ms: 0.1f64.min(target_ms),
            high_ms: (target_ms + 0.4).min(self.max_speed_ms),
            low_util: 70.0,
            high_util: 20.0,
            max_speed_ms: self.max_speed_ms,
        })
    }

    fn combine(&self, a: Objective, b: Objective, weight_a: f64, weight_b: f64) -> Objective {
        Objective::Coupled {
            a: Box::new(a),
            b: Box::new(b),
            weight_a: weight_a.max(0.0),
            weight_b: weight_b.max(0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn grid(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || hi < lo {
        return vec![lo];
    }
    let n = ((hi - lo) / step).round() as usize;
    (0..=n).map(|i| lo + i as f64 * step).collect()
}

fn argmax<F: Fn(f64) -> f64>(xs: &[f64], f: F) -> Option<f64> {
    xs.iter()
        .filter_map(|x| NotNan::new(f(*x)).ok().map(|u| (*x, u)))
        .max_by_key(|(_, u)| *u)
        .map(|(x, _)| x)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_course_peak_wraps() {
        let b = PeakBuilder::default();
        let obj = b.course(350.0, 90.0);

        assert!((obj.eval(350.0, 0.0) - 100.0).abs() < 1e-9);
        // 20 degrees either side of the summit, across north
        assert!((obj.eval(10.0, 0.0) - obj.eval(330.0, 0.0)).abs() < 1e-9);
        assert!(obj.eval(10.0, 0.0) < 100.0);

        let (c, s) = obj.best(&b);
        assert_eq!(c, Some(350.0));
        assert!(s.is_none());
    }

    #[test]
    fn test_speed_curve() {
        let b = PeakBuilder::new(4.0);
        let obj = b.speed(2.0, 0.0);

        assert!((obj.eval(0.0, 2.0) - 100.0).abs() < 1e-9);
        assert!((obj.eval(0.0, 0.1) - 70.0).abs() < 1e-9);
        assert!((obj.eval(0.0, 2.4) - 20.0).abs() < 1e-9);
        assert_eq!(obj.eval(0.0, 0.0), 0.0);
        assert_eq!(obj.eval(0.0, 4.0), 0.0);
    }

    #[test]
    fn test_combined_best() {
        let b = PeakBuilder::default();
        let crs = b.course(45.0, 0.0);
        let spd = b.speed(1.5, 1.0);
        let obj = b.combine(crs, spd, 70.0, 30.0);

        assert!(obj.has_course() && obj.has_speed());
        let (c, s) = obj.best(&b);
        assert_eq!(c, Some(45.0));
        assert!((s.unwrap() - 1.5).abs() < 1e-9);
        assert!((obj.eval(45.0, 1.5) - 100.0).abs() < 1e-9);
    }
}
