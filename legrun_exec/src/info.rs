//! # Information buffer
//!
//! Snapshot of everything the controller reads from the outside world in one
//! cycle: the mission time, navigation scalars and any string messages
//! received since the last cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const NAV_X: &str = "NAV_X";
pub const NAV_Y: &str = "NAV_Y";
pub const NAV_HEADING: &str = "NAV_HEADING";
pub const NAV_SPEED: &str = "NAV_SPEED";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfoBuffer {
    time_s: f64,
    scalars: HashMap<String, f64>,
    strings: HashMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InfoBuffer {
    pub fn new(time_s: f64) -> Self {
        Self {
            time_s,
            ..Self::default()
        }
    }

    /// Build a buffer holding a full navigation solution.
    pub fn with_nav(time_s: f64, pos_m: Vector2<f64>, heading_deg: f64, speed_ms: f64) -> Self {
        let mut ib = Self::new(time_s);
        ib.set_scalar(NAV_X, pos_m.x);
        ib.set_scalar(NAV_Y, pos_m.y);
        ib.set_scalar(NAV_HEADING, heading_deg);
        ib.set_scalar(NAV_SPEED, speed_ms);
        ib
    }

    /// Mission time in seconds.
    pub fn time(&self) -> f64 {
        self.time_s
    }

    pub fn set_time(&mut self, time_s: f64) {
        self.time_s = time_s;
    }

    pub fn set_scalar<S: Into<String>>(&mut self, name: S, value: f64) {
        self.scalars.insert(name.into(), value);
    }

    pub fn remove_scalar(&mut self, name: &str) {
        self.scalars.remove(name);
    }

    /// Value of a scalar, `None` if it has never been set or is not finite.
    pub fn get_scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied().filter(|v| v.is_finite())
    }

    /// Queue a string message received on `key`.
    pub fn push_string<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.strings
            .entry(key.into())
            .or_insert_with(Vec::new)
            .push(value.into());
    }

    /// Messages received on `key` since the buffer was last cleared, oldest
    /// first.
    pub fn recent_values(&self, key: &str) -> &[String] {
        self.strings.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Drop every queued string message.
    pub fn clear_strings(&mut self) {
        self.strings.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_info_buffer() {
        let mut ib = InfoBuffer::with_nav(3.0, Vector2::new(1.0, 2.0), 90.0, 1.5);
        assert_eq!(ib.get_scalar(NAV_Y), Some(2.0));
        assert_eq!(ib.time(), 3.0);

        ib.set_scalar(NAV_SPEED, f64::NAN);
        assert!(ib.get_scalar(NAV_SPEED).is_none());
        assert!(ib.get_scalar("DEPTH").is_none());

        assert!(ib.recent_values("LR_TURN_DIST").is_empty());
        ib.push_string("LR_TURN_DIST", "vname=abe,tdist=3");
        ib.push_string("LR_TURN_DIST", "vname=ben,tdist=4");
        assert_eq!(ib.recent_values("LR_TURN_DIST").len(), 2);

        ib.clear_strings();
        assert!(ib.recent_values("LR_TURN_DIST").is_empty());
    }
}
