//! # Turn coordination
//!
//! Vehicles running the same pattern broadcast how far they have left to go
//! until the end of their next turn. While turning each vehicle compares its
//! own distance to those of its in-step peers and scales its speed so the
//! fleet finishes the turn together: a vehicle with further to go speeds up,
//! one that is ahead slows down.
//!
//! Peers are only in step if their distance has the same sign as ours (the
//! sign encodes which leg the turn started from) and they have reported in
//! the last `STALE_AFTER_S` seconds.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

use comms_if::legrun::TurnDistReport;
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Reports older than this are dropped from the peer table.
pub const STALE_AFTER_S: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A map whose entries carry the time they were last written.
#[derive(Debug, Clone)]
pub struct ExpiringMap<K, V> {
    entries: HashMap<K, (V, f64)>,
}

/// Peer turn distance table and speed calculation.
#[derive(Debug, Clone)]
pub struct TurnCoord {
    own_vname: String,
    peers: ExpiringMap<String, f64>,
}

/// The result of a coordination pass.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CoordSpeed {
    /// Speed to use for the rest of the turn
    pub spd_ms: f64,

    /// Smallest distance among ourselves and the in-step peers
    pub min_dist_m: f64,

    /// Largest distance among ourselves and the in-step peers
    pub max_dist_m: f64,

    /// Number of in-step peers
    pub num_peers: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<K: Eq + Hash, V> Default for ExpiringMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> ExpiringMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, stamping it with `now_s`.
    pub fn insert(&mut self, key: K, value: V, now_s: f64) {
        self.entries.insert(key, (value, now_s));
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(v, _)| v)
    }

    /// Time the entry was last written.
    pub fn stamp(&self, key: &K) -> Option<f64> {
        self.entries.get(key).map(|(_, t)| *t)
    }

    /// Remove every entry written more than `ttl_s` before `now_s`. Returns
    /// the number removed.
    pub fn purge_older_than(&mut self, now_s: f64, ttl_s: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (_, t)| now_s - *t <= ttl_s);
        before - self.entries.len()
    }

    /// Keep only the entries for which `f` returns true.
    pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, mut f: F) {
        self.entries.retain(|k, (v, _)| f(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, (v, _))| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TurnCoord {
    pub fn new<S: Into<String>>(own_vname: S) -> Self {
        Self {
            own_vname: own_vname.into(),
            peers: ExpiringMap::new(),
        }
    }

    pub fn set_own_vname<S: Into<String>>(&mut self, own_vname: S) {
        self.own_vname = own_vname.into();
    }

    /// Record a peer report. Our own reports are ignored.
    pub fn ingest(&mut self, report: TurnDistReport, now_s: f64) {
        if report.vname == self.own_vname {
            return;
        }
        trace!("Turn distance from {}: {:.2}", report.vname, report.tdist_m);
        self.peers.insert(report.vname, report.tdist_m, now_s);
    }

    /// Parse and record a list of raw `vname=..,tdist=..` strings. Returns
    /// the number that could not be parsed.
    pub fn ingest_raw<'a, I>(&mut self, reports: I, now_s: f64) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bad = 0;
        for raw in reports {
            match raw.parse::<TurnDistReport>() {
                Ok(r) => self.ingest(r, now_s),
                Err(e) => {
                    debug!("Ignoring turn distance report \"{}\": {}", raw, e);
                    bad += 1;
                }
            }
        }
        bad
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }

    pub fn peer_dist(&self, vname: &str) -> Option<f64> {
        self.peers.get(&vname.to_string()).copied()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Drop stale and out of step peers and compute the coordinated speed.
    ///
    /// The speed is `(|own| / avg)^2 * cruise` where `avg` is the mean
    /// absolute distance over ourselves and every in-step peer. Returns
    /// `None` when there are no in-step peers.
    pub fn coord_speed(&mut self, own_dist_m: f64, cruise_ms: f64, now_s: f64) -> Option<CoordSpeed> {
        self.peers.purge_older_than(now_s, STALE_AFTER_S);
        self.peers.retain(|_, d| own_dist_m * d > 0.0);

        if self.peers.is_empty() {
            return None;
        }

        let own = own_dist_m.abs();
        let dists: Vec<f64> = std::iter::once(own)
            .chain(self.peers.iter().map(|(_, d)| d.abs()))
            .collect();

        let min_dist_m = dists.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_dist_m = dists.iter().cloned().fold(0.0, f64::max);

        let avg = maths::mean(dists)?;
        if avg <= 0.0 {
            return None;
        }
        let ratio = own / avg;

        Some(CoordSpeed {
            spd_ms: ratio * ratio * cruise_ms,
            min_dist_m,
            max_dist_m,
            num_peers: self.peers.len(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn report(vname: &str, tdist_m: f64) -> TurnDistReport {
        TurnDistReport {
            vname: vname.to_string(),
            tdist_m,
        }
    }

    #[test]
    fn test_expiring_map() {
        let mut m = ExpiringMap::new();
        m.insert("a", 1, 0.0);
        m.insert("b", 2, 4.0);
        m.insert("c", 3, 6.0);

        assert_eq!(m.purge_older_than(10.0, 5.0), 1);
        assert!(m.get(&"a").is_none());
        assert_eq!(m.get(&"b"), Some(&2));
        assert_eq!(m.stamp(&"c"), Some(6.0));

        m.retain(|_, v| *v > 2);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_two_vehicle_speed() {
        let mut tc = TurnCoord::new("ben");
        tc.ingest(report("abe", 40.0), 0.0);

        let cs = tc.coord_speed(10.0, 2.0, 0.5).unwrap();
        assert!((cs.spd_ms - 0.32).abs() < 1e-9);
        assert_eq!(cs.num_peers, 1);
        assert_eq!(cs.min_dist_m, 10.0);
        assert_eq!(cs.max_dist_m, 40.0);

        // The vehicle further behind speeds up
        let mut tc = TurnCoord::new("abe");
        tc.ingest(report("ben", 10.0), 0.0);
        let cs = tc.coord_speed(40.0, 2.0, 0.5).unwrap();
        assert!((cs.spd_ms - (40.0f64 / 25.0).powi(2) * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_purge() {
        let mut tc = TurnCoord::new("abe");
        tc.ingest_raw(vec!["vname=ben,tdist=-30", "vname=cal,tdist=20"], 0.0);
        assert_eq!(tc.num_peers(), 2);

        // Ben is in the other phase
        let cs = tc.coord_speed(20.0, 1.0, 1.0).unwrap();
        assert_eq!(cs.num_peers, 1);
        assert!(tc.peer_dist("ben").is_none());
        assert!((cs.spd_ms - 1.0).abs() < 1e-9);

        // Cal goes stale
        assert!(tc.coord_speed(20.0, 1.0, 6.5).is_none());
        assert_eq!(tc.num_peers(), 0);
    }

    #[test]
    fn test_own_and_bad_reports_ignored() {
        let mut tc = TurnCoord::new("abe");
        let bad = tc.ingest_raw(vec!["vname=abe,tdist=5", "tdist=5", "vname=ben,tdist=x"], 0.0);

        assert_eq!(bad, 2);
        assert_eq!(tc.num_peers(), 0);
        assert!(tc.coord_speed(5.0, 1.0, 0.0).is_none());
    }
}
