//! # Parameter script interpreter module
//!
//! This module provides an interpreter for timed parameter scripts, allowing
//! a mission to be reconfigured at set times. A script is a list of
//! statements of the form
//!
//! ```text
//! 12.5: leg_length = 120;
//! 30: turn_rad = 20;
//! ```
//!
//! Lines which do not match (comments for example) are ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A parameter update which is scripted to occur at a specific time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedParam {
    /// The time the update is supposed to be applied at
    pub exec_time_s: f64,

    /// Parameter name
    pub key: String,

    /// Parameter value, unparsed
    pub value: String
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending`
/// to acquire the list of updates that are due.
pub struct ScriptInterpreter {
    script_path: PathBuf,
    cmds: VecDeque<ScriptedParam>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script statements must be in time order, found {1} s after {0} s")]
    OutOfOrder(f64, f64),

    #[error("Could not build the script pattern: {0}")]
    PatternError(regex::Error)
}

pub enum PendingParams {
    None,
    Some(Vec<ScriptedParam>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = PathBuf::from(script_path.as_ref());
        
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_str(&script)?;
        interp.script_path = path;

        Ok(interp)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^=;\s]+)\s*=\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::PatternError)?;

        let mut cmds: VecDeque<ScriptedParam> = VecDeque::new();

        for cap in re.captures_iter(script) {
            let field = |i: usize| cap.get(i).map(|m| m.as_str()).unwrap_or("");

            let exec_time_s: f64 = field(1)
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = cmds.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(
                        prev.exec_time_s, exec_time_s
                    ));
                }
            }

            cmds.push_back(ScriptedParam {
                exec_time_s,
                key: field(3).to_string(),
                value: field(4).trim().to_string()
            });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            script_path: PathBuf::new(),
            cmds
        })
    }

    /// Return the updates which are due at `current_time_s`.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingParams {

        // If the queue is empty the script is over
        if self.cmds.is_empty() {
            return PendingParams::EndOfScript
        }

        let mut due: Vec<ScriptedParam> = vec![];

        while let Some(c) = self.cmds.front() {
            if c.exec_time_s > current_time_s {
                break;
            }
            if let Some(c) = self.cmds.pop_front() {
                due.push(c);
            }
        }

        if due.is_empty() {
            PendingParams::None
        }
        else {
            PendingParams::Some(due)
        }
    }

    /// Path the script was loaded from, empty if built from a string.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Get the number of updates left in the script
    pub fn get_num_pending(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_script_parse_and_pending() {
        let script = "\
            # retarget the leg half way through\n\
            5.0: leg_length = 120;\n\
            5.0: turn_rad=20 ;\n\
            12: leg_spds = 2:1.5, 2.0;\n";

        let mut si = ScriptInterpreter::from_str(script).unwrap();
        assert_eq!(si.get_num_pending(), 3);
        assert_eq!(si.get_duration(), 12.0);

        assert!(matches!(si.get_pending(1.0), PendingParams::None));

        match si.get_pending(5.0) {
            PendingParams::Some(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].key, "leg_length");
                assert_eq!(v[0].value, "120");
                assert_eq!(v[1].key, "turn_rad");
                assert_eq!(v[1].value, "20");
            },
            _ => panic!("Expected pending updates")
        }

        match si.get_pending(20.0) {
            PendingParams::Some(v) => assert_eq!(v[0].value, "2:1.5, 2.0"),
            _ => panic!("Expected pending updates")
        }

        assert!(matches!(si.get_pending(21.0), PendingParams::EndOfScript));
    }

    #[test]
    fn test_script_errors() {
        assert!(matches!(
            ScriptInterpreter::from_str("nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str("5: a = 1;\n2: b = 2;"),
            Err(ScriptError::OutOfOrder(_, _))
        ));
    }
}
