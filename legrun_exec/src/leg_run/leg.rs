//! Leg geometry and the leg odometer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{params::parse_num, ConfigError};
use comms_if::legrun::tok_parse;
use util::geom;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The two end points of the leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LegGeom {
    pub p1: Option<Vector2<f64>>,
    pub p2: Option<Vector2<f64>>,
}

/// A leg given by its centre, bearing (from `p1` to `p2`) and length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegCentre {
    pub centre_m: Vector2<f64>,
    pub ang_deg: f64,
    pub len_m: f64,
}

/// Distance travelled while on a leg.
#[derive(Debug, Clone, Copy, Default)]
pub struct Odometer {
    last_m: Option<Vector2<f64>>,
    total_m: f64,
    paused: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegGeom {
    pub fn new(p1: Vector2<f64>, p2: Vector2<f64>) -> Self {
        Self {
            p1: Some(p1),
            p2: Some(p2),
        }
    }

    pub fn from_centre(c: &LegCentre) -> Self {
        let half = c.len_m / 2.0;
        Self::new(
            geom::project_point(c.ang_deg + 180.0, half, &c.centre_m),
            geom::project_point(c.ang_deg, half, &c.centre_m),
        )
    }

    /// Both points, if both are set.
    pub fn points(&self) -> Option<(Vector2<f64>, Vector2<f64>)> {
        Some((self.p1?, self.p2?))
    }

    pub fn length(&self) -> Option<f64> {
        self.points().map(|(a, b)| geom::dist(&a, &b))
    }

    /// Bearing from `p1` to `p2`.
    pub fn angle(&self) -> Option<f64> {
        self.points().map(|(a, b)| geom::rel_ang(&a, &b))
    }

    pub fn centre(&self) -> Option<Vector2<f64>> {
        self.points().map(|(a, b)| (a + b) / 2.0)
    }

    fn centred(&self) -> Option<LegCentre> {
        let (a, b) = self.points()?;
        if geom::dist(&a, &b) <= 0.0 {
            return None;
        }
        Some(LegCentre {
            centre_m: (a + b) / 2.0,
            ang_deg: geom::rel_ang(&a, &b),
            len_m: geom::dist(&a, &b),
        })
    }

    /// Stretch or shrink the leg about its centre. False if the leg is
    /// unset or has no direction.
    pub fn set_length(&mut self, len_m: f64) -> bool {
        match self.centred() {
            Some(c) if len_m > 0.0 => {
                *self = Self::from_centre(&LegCentre { len_m, ..c });
                true
            }
            _ => false,
        }
    }

    /// Rotate the leg about its centre so `p1` to `p2` has the given
    /// bearing.
    pub fn set_angle(&mut self, ang_deg: f64) -> bool {
        match self.centred() {
            Some(c) => {
                *self = Self::from_centre(&LegCentre {
                    ang_deg: geom::angle_360(ang_deg),
                    ..c
                });
                true
            }
            None => false,
        }
    }

    /// Move the leg so its centre lies on `centre_m`.
    pub fn set_centre(&mut self, centre_m: Vector2<f64>) -> bool {
        match self.points() {
            Some((a, b)) => {
                let shift = centre_m - (a + b) / 2.0;
                *self = Self::new(a + shift, b + shift);
                true
            }
            None => false,
        }
    }
}

impl FromStr for LegCentre {
    type Err = ConfigError;

    /// Parse `x:y:ang:len` or `x=..,y=..,ang=..,len=..`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue(String::from("leg"), s.to_string());

        let vals: Vec<f64> = if s.contains('=') {
            ["x", "y", "ang", "len"]
                .iter()
                .map(|k| tok_parse(s, k).and_then(parse_num))
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(invalid)?
        }
        else {
            s.split(':')
                .map(parse_num)
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(invalid)?
        };

        if vals.len() != 4 || !(vals[3] > 0.0) {
            return Err(invalid());
        }

        Ok(Self {
            centre_m: Vector2::new(vals[0], vals[1]),
            ang_deg: geom::angle_360(vals[2]),
            len_m: vals[3],
        })
    }
}

impl Odometer {
    pub fn update(&mut self, pos_m: &Vector2<f64>) {
        if let Some(last) = self.last_m {
            if !self.paused {
                self.total_m += geom::dist(&last, pos_m);
            }
        }
        self.last_m = Some(*pos_m);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn reset(&mut self) {
        self.total_m = 0.0;
    }

    pub fn total(&self) -> f64 {
        self.total_m
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: Vector2<f64>, b: Vector2<f64>) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn test_leg_mods() {
        let mut leg = LegGeom::new(Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0));
        assert!((leg.angle().unwrap() - 90.0).abs() < 1e-9);

        assert!(leg.set_length(50.0));
        assert!(close(leg.p1.unwrap(), Vector2::new(25.0, 0.0)));
        assert!(close(leg.p2.unwrap(), Vector2::new(75.0, 0.0)));

        assert!(leg.set_angle(0.0));
        assert!(close(leg.p1.unwrap(), Vector2::new(50.0, -25.0)));
        assert!(close(leg.p2.unwrap(), Vector2::new(50.0, 25.0)));

        assert!(leg.set_centre(Vector2::new(0.0, 0.0)));
        assert!(close(leg.p2.unwrap(), Vector2::new(0.0, 25.0)));

        let mut unset = LegGeom::default();
        assert!(!unset.set_length(10.0));
        assert!(!unset.set_centre(Vector2::new(0.0, 0.0)));
    }

    #[test]
    fn test_leg_centre_parse() {
        let a: LegCentre = "10:20:90:100".parse().unwrap();
        let b: LegCentre = "x=10,y=20,ang=90,len=100".parse().unwrap();
        assert_eq!(a, b);

        let leg = LegGeom::from_centre(&a);
        assert!(close(leg.p1.unwrap(), Vector2::new(-40.0, 20.0)));
        assert!(close(leg.p2.unwrap(), Vector2::new(60.0, 20.0)));

        assert!("10:20:90".parse::<LegCentre>().is_err());
        assert!("10:20:90:-5".parse::<LegCentre>().is_err());
        assert!("x=1,y=2,len=3".parse::<LegCentre>().is_err());
    }

    #[test]
    fn test_odometer() {
        let mut odo = Odometer::default();
        odo.update(&Vector2::new(0.0, 0.0));
        odo.update(&Vector2::new(3.0, 4.0));
        assert_eq!(odo.total(), 5.0);

        odo.pause();
        odo.update(&Vector2::new(3.0, 14.0));
        assert_eq!(odo.total(), 5.0);

        odo.reset();
        odo.unpause();
        odo.update(&Vector2::new(3.0, 16.0));
        assert_eq!(odo.total(), 2.0);
    }
}
