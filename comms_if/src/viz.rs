//! # Visualisation specs
//!
//! Point and segment-list drawing requests. Every spec has an active and an
//! inactive rendering, the inactive one tells a viewer to erase any object
//! previously drawn under the same label.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Variable name under which point specs are published
pub const VIEW_POINT: &str = "VIEW_POINT";

/// Variable name under which segment list specs are published
pub const VIEW_SEGLIST: &str = "VIEW_SEGLIST";

/// Hint keys which may carry a group prefix (`turn_edge_color` and so on).
const HINT_KEYS: [&str; 5] = [
    "vertex_size",
    "edge_size",
    "vertex_color",
    "edge_color",
    "label_color",
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A drawable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSpec {
    /// Unique label, a later spec with the same label replaces this one
    pub label: String,

    /// What to draw
    pub shape: Shape,

    /// False if this spec erases the labelled object
    pub active: bool,

    /// Drawing hints such as colours and sizes
    pub hints: Vec<(String, String)>,
}

/// A set of drawing hints, keyed by hint name.
///
/// Hints may be grouped with a prefix, so `turn_edge_color` is the edge
/// colour applied to objects drawn in the `turn` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualHints {
    hints: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point { x: f64, y: f64 },
    SegList { pts: Vec<(f64, f64)> },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisualSpec {
    pub fn point<L: Into<String>>(label: L, x: f64, y: f64) -> Self {
        Self {
            label: label.into(),
            shape: Shape::Point { x, y },
            active: true,
            hints: Vec::new(),
        }
    }

    pub fn seglist<L: Into<String>>(label: L, pts: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            shape: Shape::SegList { pts },
            active: true,
            hints: Vec::new(),
        }
    }

    /// Turn this spec into the one which erases it.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Apply the hints of the given group (or the base hints for `None`).
    pub fn with_hints(mut self, hints: &VisualHints, group: Option<&str>) -> Self {
        self.hints = hints.for_group(group);
        self
    }

    /// Name of the variable this spec is published under.
    pub fn var(&self) -> &'static str {
        match self.shape {
            Shape::Point { .. } => VIEW_POINT,
            Shape::SegList { .. } => VIEW_SEGLIST,
        }
    }

    /// Number of vertices in the spec.
    pub fn num_vertices(&self) -> usize {
        match self.shape {
            Shape::Point { .. } => 1,
            Shape::SegList { ref pts } => pts.len(),
        }
    }
}

impl fmt::Display for VisualSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            Shape::Point { x, y } => write!(f, "x={:.2},y={:.2}", x, y)?,
            Shape::SegList { ref pts } => {
                write!(f, "pts={{")?;
                for (i, (x, y)) in pts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{:.2},{:.2}", x, y)?;
                }
                write!(f, "}}")?;
            }
        }

        write!(f, ",label={}", self.label)?;

        if !self.active {
            return write!(f, ",active=false");
        }

        for (k, v) in self.hints.iter() {
            write!(f, ",{}={}", k, v)?;
        }

        Ok(())
    }
}

impl Default for VisualHints {
    fn default() -> Self {
        let mut h = VisualHints {
            hints: BTreeMap::new(),
        };

        for (k, v) in [
            ("vertex_size", "3"),
            ("edge_size", "1"),
            ("vertex_color", "dodger_blue"),
            ("edge_color", "white"),
            ("label_color", "off"),
            ("nextpt_vertex_size", "5"),
            ("nextpt_vertex_color", "yellow"),
            ("nextpt_label_color", "aqua"),
            ("legpt_vertex_size", "12"),
            ("legpt_vertex_color", "lime_green"),
            ("legpt_label_color", "off"),
            ("turn_vertex_size", "1"),
            ("turn_edge_size", "1"),
            ("turn_vertex_color", "gray70"),
            ("turn_edge_color", "gray30"),
            ("turn_label_color", "off"),
        ]
        .iter()
        {
            h.hints.insert(k.to_string(), v.to_string());
        }

        h
    }
}

impl VisualHints {
    /// Set hints from a `key=value,key=value` string.
    ///
    /// Returns false, leaving the hints untouched, if any entry is malformed
    /// or names an unknown hint.
    pub fn set_hints(&mut self, spec: &str) -> bool {
        let mut parsed = Vec::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut kv = entry.splitn(2, '=');
            let key = kv.next().unwrap_or("").trim().to_lowercase();
            let val = match kv.next() {
                Some(v) if !v.trim().is_empty() => v.trim().to_string(),
                _ => return false,
            };

            let known = HINT_KEYS
                .iter()
                .any(|h| key == *h || key.ends_with(&format!("_{}", h)));
            if !known {
                return false;
            }

            parsed.push((key, val));
        }

        if parsed.is_empty() {
            return false;
        }

        self.hints.extend(parsed);
        true
    }

    /// Get a single hint.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(|s| s.as_str())
    }

    /// The hints for a group with the prefix stripped, base hints for `None`.
    pub fn for_group(&self, group: Option<&str>) -> Vec<(String, String)> {
        match group {
            None => self
                .hints
                .iter()
                .filter(|(k, _)| HINT_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Some(g) => {
                let prefix = format!("{}_", g);
                self.hints
                    .iter()
                    .filter_map(|(k, v)| {
                        k.strip_prefix(prefix.as_str())
                            .filter(|rest| HINT_KEYS.contains(rest))
                            .map(|rest| (rest.to_string(), v.clone()))
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_spec_strings() {
        let p = VisualSpec::point("abe's next waypoint", 1.0, 2.5);
        assert_eq!(p.to_string(), "x=1.00,y=2.50,label=abe's next waypoint");
        assert_eq!(p.var(), VIEW_POINT);

        let s = VisualSpec::seglist("abe_turn", vec![(0.0, 0.0), (10.0, 5.0)]).inactive();
        assert_eq!(s.to_string(), "pts={0.00,0.00:10.00,5.00},label=abe_turn,active=false");
        assert_eq!(s.var(), VIEW_SEGLIST);
    }

    #[test]
    fn test_hints() {
        let mut h = VisualHints::default();

        let turn = h.for_group(Some("turn"));
        assert!(turn.contains(&("edge_color".to_string(), "gray30".to_string())));
        assert!(turn.iter().all(|(k, _)| !k.starts_with("turn_")));

        assert!(h.set_hints("turn_edge_color=red, vertex_size=4"));
        assert_eq!(h.get("turn_edge_color"), Some("red"));
        assert_eq!(h.get("vertex_size"), Some("4"));

        assert!(!h.set_hints("bogus=1"));
        assert!(!h.set_hints("edge_color"));

        let s = VisualSpec::point("p", 0.0, 0.0).with_hints(&h, Some("nextpt"));
        assert!(s.to_string().contains("vertex_color=yellow"));
    }
}
