//! Waypoint engine state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::*;
use util::geom;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point in a waypoint sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position in the local frame
    pub pos_m: Vector2<f64>,

    /// Optional depth or altitude, carried through untouched
    pub z_m: Option<f64>,

    /// Optional free text tag
    pub tag: Option<String>,
}

/// Tracks progress along a waypoint sequence.
#[derive(Debug, Clone)]
pub struct WptEngine {
    params: Params,

    /// The sequence as installed, before any reversal
    seq_raw: Vec<Waypoint>,

    /// The sequence in the order being followed
    seq: Vec<Waypoint>,

    /// Index into `seq` of the waypoint being sought
    curr_ix: usize,

    /// The point the vehicle is coming from. `None` until the first
    /// `advance` after a reset.
    prev_pt: Option<Vector2<f64>>,

    /// Point the vehicle should steer toward
    track_pt: Option<Vector2<f64>>,

    /// True if the track point is ahead of the vehicle on the track line
    /// rather than the waypoint itself
    track_pt_distinct: bool,

    /// Closest approach to the current waypoint since it became active
    cpa_m: Option<f64>,

    capture_hits: u32,
    slip_hits: u32,
    line_hits: u32,

    /// Number of times the end of the sequence has been reached
    repeats_sofar: u32,

    state: WptEvent,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of feeding a position to the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WptEvent {
    Empty,
    Completed,
    Cycled,
    Advanced,
    Transit,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<Vector2<f64>> for Waypoint {
    fn from(pos_m: Vector2<f64>) -> Self {
        Self {
            pos_m,
            z_m: None,
            tag: None,
        }
    }
}

impl Default for WptEngine {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl WptEngine {
    /// Create a new engine with no points.
    pub fn new(params: Params) -> Self {
        let mut params = params;
        params.capture_radius_m = params.capture_radius_m.max(0.0);
        params.slip_radius_m = params.slip_radius_m.max(0.0);
        params.lead_m = params.lead_m.max(0.0);
        params.lead_damper_m = params.lead_damper_m.max(0.0);

        let mut eng = Self {
            params,
            seq_raw: Vec::new(),
            seq: Vec::new(),
            curr_ix: 0,
            prev_pt: None,
            track_pt: None,
            track_pt_distinct: false,
            cpa_m: None,
            capture_hits: 0,
            slip_hits: 0,
            line_hits: 0,
            repeats_sofar: 0,
            state: WptEvent::Transit,
        };

        if eng.params.capture_line == CaptureLine::Absolute {
            eng.set_capture_line(CaptureLine::Absolute);
        }

        eng
    }

    /// Clear the sequence and every counter.
    pub fn reset_state(&mut self) {
        self.seq.clear();
        self.seq_raw.clear();
        self.prev_pt = None;
        self.track_pt = None;
        self.track_pt_distinct = false;

        self.curr_ix = 0;
        self.state = WptEvent::Transit;
        self.cpa_m = None;

        self.capture_hits = 0;
        self.slip_hits = 0;
        self.line_hits = 0;
        self.repeats_sofar = 0;
    }

    /// Install a new sequence.
    ///
    /// The repeat count and CPA are reset. If `retain` is set the current
    /// index is kept (clamped to the new sequence) and the previous point
    /// becomes the point before it, otherwise following restarts from the
    /// first point.
    pub fn set_seq(&mut self, seq: Vec<Waypoint>, retain: bool) {
        self.state = WptEvent::Transit;

        // No slip hit is possible on the first sample against a new sequence
        self.cpa_m = None;

        // Cycles are counted per sequence
        self.repeats_sofar = 0;

        self.seq_raw = seq;
        self.rebuild_seq();

        if retain && !self.seq.is_empty() {
            if self.curr_ix >= self.seq.len() {
                self.curr_ix = 0;
            }

            let prev_ix = match self.curr_ix {
                0 => self.seq.len() - 1,
                i => i - 1,
            };
            self.prev_pt = Some(self.seq[prev_ix].pos_m);
        }
        else {
            self.curr_ix = 0;
        }
    }

    /// Install a sequence of plain points.
    pub fn set_points(&mut self, pts: &[Vector2<f64>], retain: bool) {
        self.set_seq(pts.iter().map(|p| Waypoint::from(*p)).collect(), retain);
    }

    /// Follow the sequence forwards or backwards. A change restarts following
    /// from the first point of the new order.
    pub fn set_order(&mut self, order: Order) {
        if self.params.order == order {
            return;
        }

        self.params.order = order;
        self.rebuild_seq();

        self.curr_ix = 0;
        self.state = WptEvent::Transit;
        self.prev_pt = None;
    }

    /// Flip the order the sequence is followed in.
    pub fn toggle_order(&mut self) {
        let order = match self.params.order {
            Order::Normal => Order::Reverse,
            Order::Reverse => Order::Normal,
        };
        self.set_order(order);
    }

    /// Negative values are ignored.
    pub fn set_capture_radius(&mut self, radius_m: f64) {
        if radius_m >= 0.0 {
            self.params.capture_radius_m = radius_m;
        }
    }

    /// Negative values are ignored.
    pub fn set_slip_radius(&mut self, radius_m: f64) {
        if radius_m >= 0.0 {
            self.params.slip_radius_m = radius_m;
        }
    }

    /// Set the capture line mode, `Absolute` also zeroes both radii.
    pub fn set_capture_line(&mut self, mode: CaptureLine) {
        self.params.capture_line = mode;

        if mode == CaptureLine::Absolute {
            self.params.capture_radius_m = 0.0;
            self.params.slip_radius_m = 0.0;
        }
    }

    /// Negative values are ignored.
    pub fn set_lead(&mut self, lead_m: f64) {
        if lead_m >= 0.0 {
            self.params.lead_m = lead_m;
        }
    }

    /// Negative values are ignored.
    pub fn set_lead_damper(&mut self, damper_m: f64) {
        if damper_m >= 0.0 {
            self.params.lead_damper_m = damper_m;
        }
    }

    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.params.repeat = repeat;
    }

    /// Jump to a waypoint. Out of range indices are ignored.
    pub fn set_curr_index(&mut self, index: usize) {
        if index >= self.seq.len() {
            return;
        }

        // The next distance seen will become the CPA
        self.curr_ix = index;
        self.cpa_m = None;
    }

    /// Move the whole sequence so that its bounding box is centred on `centre`.
    pub fn set_centre(&mut self, centre: Vector2<f64>) {
        let old = match geom::bbox_centre(&self.positions_raw()) {
            Some(c) => c,
            None => return,
        };

        let shift = centre - old;

        for w in self.seq_raw.iter_mut().chain(self.seq.iter_mut()) {
            w.pos_m += shift;
        }

        if let Some(p) = self.prev_pt.as_mut() {
            *p += shift;
        }
    }

    /// Restart from the first point, clearing the repeat count. Hit counters
    /// are kept.
    pub fn reset_for_new_traversal(&mut self) {
        self.curr_ix = 0;
        self.state = WptEvent::Transit;
        self.cpa_m = None;
        self.prev_pt = None;
        self.repeats_sofar = 0;
    }

    /// Set a parameter by name.
    ///
    /// Recognised keys are `order`, `repeat`, `capture_radius` (or `radius`),
    /// `slip_radius`, `capture_line`, `lead` and `lead_damper`.
    pub fn set_param(&mut self, key: &str, value: &str) -> Result<(), ParamError> {
        let key = key.trim().to_lowercase();
        let value = value.trim();
        let invalid = || ParamError::InvalidValue(key.clone(), value.to_string());

        match key.as_str() {
            "order" => match value.to_lowercase().as_str() {
                "reverse" | "reversed" => self.set_order(Order::Reverse),
                "normal" => self.set_order(Order::Normal),
                "toggle" => self.toggle_order(),
                _ => return Err(invalid()),
            },
            "repeat" => self.set_repeat(value.parse().map_err(|_| invalid())?),
            "radius" | "capture_radius" => {
                self.set_capture_radius(parse_non_neg(value).ok_or_else(invalid)?)
            }
            "slip_radius" => self.set_slip_radius(parse_non_neg(value).ok_or_else(invalid)?),
            "capture_line" => self.set_capture_line(value.parse().map_err(|_| invalid())?),
            "lead" => self.set_lead(parse_non_neg(value).ok_or_else(invalid)?),
            "lead_damper" => self.set_lead_damper(parse_non_neg(value).ok_or_else(invalid)?),
            _ => return Err(ParamError::UnknownParam(key.clone())),
        }

        Ok(())
    }

    /// Feed the vehicle position to the engine.
    ///
    /// After any event other than `Completed` or `Empty` the current index is
    /// valid, and after `Cycled` it is 0.
    pub fn advance(&mut self, pos_m: &Vector2<f64>) -> WptEvent {
        // Coming from wherever the vehicle is if nothing better is known
        if self.prev_pt.is_none() {
            self.prev_pt = Some(*pos_m);
        }

        self.state = self.advance_aux(pos_m);

        self.track_pt = self.curr_point();
        self.track_pt_distinct = false;

        match self.state {
            WptEvent::Completed | WptEvent::Empty => (),
            _ => self.calc_track_point(pos_m),
        }

        self.state
    }

    fn advance_aux(&mut self, pos_m: &Vector2<f64>) -> WptEvent {
        let size = self.seq.len();
        if size == 0 {
            return WptEvent::Empty;
        }
        if self.has_completed() {
            return WptEvent::Completed;
        }

        let curr = self.seq[self.curr_ix].pos_m;
        let dist = geom::dist(pos_m, &curr);

        let cpa = match self.cpa_m {
            Some(c) if c <= dist => c,
            _ => dist,
        };
        self.cpa_m = Some(cpa);

        let mut arrived = false;

        if dist < self.params.capture_radius_m {
            arrived = true;
            self.capture_hits += 1;
        }
        else if self.params.slip_radius_m > self.params.capture_radius_m
            && dist > cpa
            && cpa <= self.params.slip_radius_m
        {
            arrived = true;
            self.slip_hits += 1;
        }

        if !arrived && self.params.capture_line != CaptureLine::Off {
            if let Some(prev) = self.prev_pt {
                if geom::angle_from_three_points(&curr, &prev, pos_m) >= 90.0 {
                    arrived = true;
                    self.line_hits += 1;
                }
            }
        }

        if !arrived {
            return WptEvent::Transit;
        }

        self.prev_pt = Some(curr);
        self.curr_ix += 1;

        if self.curr_ix >= size {
            self.curr_ix = 0;
            self.cpa_m = None;
            self.repeats_sofar += 1;

            if let Repeat::Times(max) = self.params.repeat {
                if self.repeats_sofar > max {
                    self.prev_pt = None;
                    return WptEvent::Completed;
                }
            }

            return WptEvent::Cycled;
        }

        self.cpa_m = Some(geom::dist(pos_m, &self.seq[self.curr_ix].pos_m));
        WptEvent::Advanced
    }

    /// Place the track point ahead of the vehicle's projection onto the
    /// track line, or leave it on the waypoint if it would pass it.
    fn calc_track_point(&mut self, pos_m: &Vector2<f64>) {
        if self.params.lead_m <= 0.0 || self.params.lead_damper_m <= 0.0 {
            return;
        }

        let (prev, curr) = match (self.prev_pt, self.curr_point()) {
            (Some(p), Some(c)) => (p, c),
            _ => return,
        };

        let perp = geom::perp_seg_int_pt(&prev, &curr, pos_m);

        // Stretch the lead as the vehicle closes on the track line
        let mut damper_factor = 1.0;
        let dist_to_line = geom::dist(&perp, pos_m);
        if dist_to_line < self.params.lead_damper_m {
            damper_factor += 2.0 * (1.0 - dist_to_line / self.params.lead_damper_m);
        }

        let track_dist = self.params.lead_m * damper_factor;
        if geom::dist(&perp, &curr) <= track_dist {
            return;
        }

        self.track_pt = Some(geom::project_point(
            geom::rel_ang(&prev, &curr),
            track_dist,
            &perp
        ));
        self.track_pt_distinct = true;
    }

    fn rebuild_seq(&mut self) {
        self.seq = self.seq_raw.clone();
        if self.params.order == Order::Reverse {
            self.seq.reverse();
        }
    }

    fn positions_raw(&self) -> Vec<Vector2<f64>> {
        self.seq_raw.iter().map(|w| w.pos_m).collect()
    }

    fn curr_point(&self) -> Option<Vector2<f64>> {
        self.seq.get(self.curr_ix).map(|w| w.pos_m)
    }
}

/// Queries
impl WptEngine {
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn size(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn curr_index(&self) -> usize {
        self.curr_ix
    }

    /// The sequence in the order it is followed.
    pub fn seq(&self) -> &[Waypoint] {
        &self.seq
    }

    /// Positions of the sequence in the order it is followed.
    pub fn positions(&self) -> Vec<Vector2<f64>> {
        self.seq.iter().map(|w| w.pos_m).collect()
    }

    /// A point of the sequence, `None` if out of range.
    pub fn point(&self, ix: usize) -> Option<&Waypoint> {
        self.seq.get(ix)
    }

    /// The waypoint currently sought, `None` if the sequence is empty.
    pub fn next_point(&self) -> Option<Vector2<f64>> {
        self.curr_point()
    }

    /// The point to steer toward, set by the last call to `advance`.
    pub fn track_point(&self) -> Option<Vector2<f64>> {
        self.track_pt
    }

    /// True if the track point is a lead point rather than the waypoint.
    pub fn track_point_distinct(&self) -> bool {
        self.track_pt_distinct
    }

    pub fn prev_point(&self) -> Option<Vector2<f64>> {
        self.prev_pt
    }

    pub fn cpa(&self) -> Option<f64> {
        self.cpa_m
    }

    pub fn state(&self) -> WptEvent {
        self.state
    }

    pub fn capture_hits(&self) -> u32 {
        self.capture_hits
    }

    pub fn slip_hits(&self) -> u32 {
        self.slip_hits
    }

    pub fn line_hits(&self) -> u32 {
        self.line_hits
    }

    pub fn total_hits(&self) -> u32 {
        self.capture_hits + self.slip_hits + self.line_hits
    }

    /// Number of times the end of the sequence has been reached.
    pub fn cycle_count(&self) -> u32 {
        self.repeats_sofar
    }

    /// Repeats left before completion, `None` if repeating forever.
    pub fn repeats_remaining(&self) -> Option<u32> {
        match self.params.repeat {
            Repeat::Forever => None,
            Repeat::Times(max) => Some(max.saturating_sub(self.repeats_sofar)),
        }
    }

    pub fn has_completed(&self) -> bool {
        self.state == WptEvent::Completed
    }

    /// True if the last `advance` reached a waypoint.
    pub fn has_advanced(&self) -> bool {
        matches!(
            self.state,
            WptEvent::Completed | WptEvent::Cycled | WptEvent::Advanced
        )
    }

    /// True if the last `advance` reached the end of the sequence.
    pub fn has_cycled(&self) -> bool {
        matches!(self.state, WptEvent::Completed | WptEvent::Cycled)
    }

    /// Distance to the current waypoint, `None` if there isn't one.
    pub fn dist_to_next(&self, pos_m: &Vector2<f64>) -> Option<f64> {
        self.curr_point().map(|c| geom::dist(pos_m, &c))
    }

    /// Distance to the previous point, `None` if there isn't one.
    pub fn dist_to_prev(&self, pos_m: &Vector2<f64>) -> Option<f64> {
        self.prev_pt.map(|p| geom::dist(pos_m, &p))
    }

    /// Distance to the current waypoint and then along the rest of the
    /// sequence to its last point.
    pub fn dist_to_end(&self, pos_m: &Vector2<f64>) -> f64 {
        let to_next = self.dist_to_next(pos_m).unwrap_or(0.0);
        to_next + geom::polyline_len(&self.positions(), self.curr_ix)
    }

    /// Distance travelled along the sequence, estimated from the distance
    /// left.
    pub fn dist_from_beg(&self, pos_m: &Vector2<f64>) -> f64 {
        let total = geom::polyline_len(&self.positions(), 0);
        (total - self.dist_to_end(pos_m)).max(0.0)
    }

    /// Fraction of the way from the previous point to the current one, in
    /// `[0, 1]`. `None` without a previous point.
    pub fn pct_to_next(&self, pos_m: &Vector2<f64>) -> Option<f64> {
        let to_prev = self.dist_to_prev(pos_m)?;
        let to_next = self.dist_to_next(pos_m)?;
        let total = to_prev + to_next;

        if total <= 0.0 {
            return None;
        }

        Some(to_prev / total)
    }
}

fn parse_non_neg(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod test {
    use super::*;

    fn v(x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(x, y)
    }

    fn engine(capture: f64, slip: f64) -> WptEngine {
        WptEngine::new(Params {
            capture_radius_m: capture,
            slip_radius_m: slip,
            ..Default::default()
        })
    }

    #[test]
    fn test_empty() {
        let mut eng = WptEngine::default();
        assert_eq!(eng.advance(&v(0.0, 0.0)), WptEvent::Empty);
        assert!(eng.next_point().is_none());
        assert!(eng.point(0).is_none());
        assert!(eng.dist_to_next(&v(0.0, 0.0)).is_none());
    }

    /// A vehicle passes a waypoint at a closest distance of 8 m, inside the
    /// slip radius but outside the capture radius.
    #[test]
    fn test_slip_hit() {
        let mut eng = engine(3.0, 15.0);
        eng.set_points(&[v(0.0, 0.0), v(0.0, 500.0)], false);

        let mut events = Vec::new();
        for i in 0..=60 {
            let x = -30.0 + i as f64;
            events.push((x, eng.advance(&v(x, -8.0))));
        }

        let advanced: Vec<_> = events
            .iter()
            .filter(|(_, e)| *e == WptEvent::Advanced)
            .collect();

        // The CPA is at x = 0, the first receding sample is x = 1
        assert_eq!(advanced.len(), 1);
        assert_eq!(advanced[0].0, 1.0);
        assert_eq!(eng.slip_hits(), 1);
        assert_eq!(eng.capture_hits(), 0);
        assert_eq!(eng.curr_index(), 1);
    }

    /// Vehicle driving along y = 0 through a two point sequence.
    #[test]
    fn test_straight_run_events() {
        let mut eng = engine(3.0, 15.0);
        eng.set_points(&[v(0.0, 0.0), v(100.0, 0.0)], false);

        let mut events = Vec::new();
        for i in 0..=120 {
            let x = -10.0 + i as f64;
            let e = eng.advance(&v(x, 0.0));

            if e != WptEvent::Completed && e != WptEvent::Empty {
                assert!(eng.curr_index() < eng.size());
            }

            events.push((x, e));
        }

        let arrivals: Vec<_> = events
            .iter()
            .filter(|(_, e)| *e != WptEvent::Transit && *e != WptEvent::Completed)
            .collect();

        // The first point is captured on the way in, the second ends the
        // single pass
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].1, WptEvent::Advanced);
        assert!(arrivals[0].0 > -3.0 && arrivals[0].0 < 3.0);

        let done = events
            .iter()
            .find(|(_, e)| *e == WptEvent::Completed)
            .unwrap();
        assert!(done.0 >= 97.0 && done.0 <= 103.0);
        assert!(eng.has_completed());
        assert_eq!(eng.cycle_count(), 1);
    }

    #[test]
    fn test_cycle_resets_index() {
        let mut eng = engine(3.0, 3.0);
        eng.set_repeat(Repeat::Forever);
        eng.set_points(&[v(0.0, 0.0), v(10.0, 0.0)], false);

        assert_eq!(eng.advance(&v(0.0, 0.0)), WptEvent::Advanced);
        assert_eq!(eng.curr_index(), 1);
        assert_eq!(eng.advance(&v(10.0, 0.0)), WptEvent::Cycled);
        assert_eq!(eng.curr_index(), 0);
        assert!(eng.cpa().is_none());
        assert_eq!(eng.repeats_remaining(), None);

        assert_eq!(eng.advance(&v(5.0, 0.0)), WptEvent::Transit);
        assert_eq!(eng.advance(&v(0.5, 0.0)), WptEvent::Advanced);
    }

    #[test]
    fn test_forever_keeps_cycling() {
        let mut eng = engine(3.0, 3.0);
        eng.set_repeat(Repeat::Forever);
        eng.set_points(&[v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0)], false);

        for cycle in 1..=4 {
            for (ix, pt) in [v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0)].iter().enumerate() {
                let e = eng.advance(pt);
                if ix < 2 {
                    assert_eq!(e, WptEvent::Advanced);
                    assert_eq!(eng.curr_index(), ix + 1);
                }
                else {
                    assert_eq!(e, WptEvent::Cycled);
                    assert_eq!(eng.curr_index(), 0);
                }
            }

            assert_eq!(eng.cycle_count(), cycle);
            assert!(!eng.has_completed());
            assert_eq!(eng.repeats_remaining(), None);
        }

        assert_eq!(eng.capture_hits(), 12);
        assert_eq!(eng.advance(&v(5.0, 5.0)), WptEvent::Transit);
    }

    #[test]
    fn test_repeats_then_complete() {
        let mut eng = engine(3.0, 3.0);
        eng.set_repeat(Repeat::Times(1));
        eng.set_points(&[v(0.0, 0.0)], false);

        assert_eq!(eng.repeats_remaining(), Some(1));
        assert_eq!(eng.advance(&v(0.0, 0.0)), WptEvent::Cycled);
        assert_eq!(eng.repeats_remaining(), Some(0));
        assert_eq!(eng.advance(&v(0.0, 0.0)), WptEvent::Completed);
        assert!(eng.prev_point().is_none());
        assert_eq!(eng.advance(&v(50.0, 0.0)), WptEvent::Completed);
        assert!(eng.has_cycled() && eng.has_advanced());
    }

    #[test]
    fn test_capture_line() {
        let mut eng = engine(3.0, 3.0);
        eng.set_capture_line(CaptureLine::On);
        eng.set_points(&[v(0.0, 0.0), v(100.0, 0.0)], true);

        // Retaining index 0 makes the last point the previous one, so the
        // capture line through (0, 0) faces (100, 0)
        assert_eq!(eng.prev_point(), Some(v(100.0, 0.0)));

        assert_eq!(eng.advance(&v(10.0, 30.0)), WptEvent::Transit);
        assert_eq!(eng.advance(&v(-0.5, 30.0)), WptEvent::Advanced);
        assert_eq!(eng.line_hits(), 1);
        assert_eq!(eng.total_hits(), 1);
    }

    #[test]
    fn test_capture_line_absolute() {
        let mut eng = WptEngine::default();
        eng.set_param("capture_line", "absolute").unwrap();
        assert_eq!(eng.params().capture_radius_m, 0.0);
        assert_eq!(eng.params().slip_radius_m, 0.0);
        assert_eq!(eng.params().capture_line, CaptureLine::Absolute);
    }

    #[test]
    fn test_lead_track_point() {
        let mut eng = WptEngine::new(Params {
            lead_m: 10.0,
            lead_damper_m: 5.0,
            ..Default::default()
        });
        eng.set_points(&[v(0.0, 0.0), v(100.0, 0.0)], false);
        eng.set_curr_index(1);

        // Far from the line the lead is unstretched
        eng.advance(&v(0.0, 0.0));
        eng.advance(&v(20.0, 20.0));
        let tp = eng.track_point().unwrap();
        assert!((tp.x - 30.0).abs() < 1e-9 && tp.y.abs() < 1e-9);
        assert!(eng.track_point_distinct());

        // On the line the lead is tripled
        eng.advance(&v(20.0, 0.0));
        let tp = eng.track_point().unwrap();
        assert!((tp.x - 50.0).abs() < 1e-9);

        // Near the end the track point collapses onto the waypoint
        eng.advance(&v(95.0, 10.0));
        assert_eq!(eng.track_point(), Some(v(100.0, 0.0)));
        assert!(!eng.track_point_distinct());
    }

    #[test]
    fn test_order_and_retain() {
        let mut eng = engine(3.0, 3.0);
        eng.set_points(&[v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)], false);
        eng.set_curr_index(2);

        eng.set_points(&[v(0.0, 5.0), v(10.0, 5.0), v(20.0, 5.0)], true);
        assert_eq!(eng.curr_index(), 2);
        assert_eq!(eng.prev_point(), Some(v(10.0, 5.0)));

        eng.set_param("order", "toggle").unwrap();
        assert_eq!(eng.curr_index(), 0);
        assert_eq!(eng.next_point(), Some(v(20.0, 5.0)));
        assert!(eng.prev_point().is_none());

        // Reinstalling keeps the reversal
        eng.set_points(&[v(0.0, 0.0), v(10.0, 0.0)], false);
        assert_eq!(eng.next_point(), Some(v(10.0, 0.0)));
    }

    #[test]
    fn test_distances() {
        let mut eng = engine(3.0, 3.0);
        eng.set_points(&[v(0.0, 0.0), v(100.0, 0.0), v(100.0, 50.0)], false);
        eng.set_curr_index(1);
        eng.advance(&v(40.0, 0.0));

        let pos = v(40.0, 0.0);
        assert_eq!(eng.dist_to_next(&pos), Some(60.0));
        assert_eq!(eng.dist_to_end(&pos), 110.0);
        assert_eq!(eng.dist_from_beg(&pos), 40.0);

        // The previous point is where the vehicle first was
        let pct = eng.pct_to_next(&v(70.0, 0.0)).unwrap();
        assert!((pct - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_set_centre() {
        let mut eng = WptEngine::default();
        eng.set_points(&[v(0.0, 0.0), v(10.0, 20.0)], false);
        eng.set_centre(v(100.0, 100.0));
        assert_eq!(eng.positions(), vec![v(95.0, 90.0), v(105.0, 110.0)]);
    }

    #[test]
    fn test_set_param_errors() {
        let mut eng = WptEngine::default();
        assert_eq!(
            eng.set_param("speed", "1"),
            Err(ParamError::UnknownParam("speed".into()))
        );
        assert!(eng.set_param("capture_radius", "-1").is_err());
        assert!(eng.set_param("repeat", "lots").is_err());
        assert!(eng.set_param("order", "sideways").is_err());

        eng.set_param("repeat", "forever").unwrap();
        eng.set_param("slip_radius", "20").unwrap();
        eng.set_param("lead", "8").unwrap();
        assert_eq!(eng.params().repeat, Repeat::Forever);
        assert_eq!(eng.params().slip_radius_m, 20.0);
        assert_eq!(eng.params().lead_m, 8.0);
    }
}
