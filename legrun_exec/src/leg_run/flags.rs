//! Flags posted on controller events
//!
//! A flag is a `VAR=value` pair. String values may contain macros of the
//! form `$[NAME]`, expanded from the controller state at the time the flag
//! is posted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ConfigError;
use comms_if::post::{PostValue, Posting};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A variable and the value to post to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDataPair {
    pub var: String,
    pub value: PostValue,
}

/// Macro values available to flags.
#[derive(Debug, Clone, Default)]
pub struct Macros {
    values: Vec<(&'static str, String)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VarDataPair {
    /// Build the posting for this flag, expanding macros in string values.
    pub fn to_posting(&self, macros: &Macros) -> Posting {
        match self.value {
            PostValue::Num(n) => Posting::num(self.var.clone(), n),
            PostValue::Str(ref s) => Posting::str(self.var.clone(), macros.expand(s)),
        }
    }
}

impl FromStr for VarDataPair {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue(String::from("flag"), s.to_string());

        let mut kv = s.splitn(2, '=');
        let var = kv.next().map(str::trim).filter(|v| !v.is_empty());
        let value = kv.next().map(str::trim);

        match (var, value) {
            (Some(var), Some(value)) if !var.contains(char::is_whitespace) => {
                let value = match value.parse::<f64>() {
                    Ok(n) if n.is_finite() => PostValue::Num(n),
                    _ => PostValue::Str(value.trim_matches('"').to_string()),
                };
                Ok(Self {
                    var: var.to_string(),
                    value,
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: ToString>(&mut self, name: &'static str, value: V) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.values.push((name, value.to_string())),
        }
    }

    /// Replace every known `$[NAME]` in `s`. Unknown macros are left as
    /// they are.
    pub fn expand(&self, s: &str) -> String {
        if !s.contains("$[") {
            return s.to_string();
        }

        let mut out = s.to_string();
        for (name, value) in self.values.iter() {
            out = out.replace(&format!("$[{}]", name), value);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let f: VarDataPair = "RETURN = true".parse().unwrap();
        assert_eq!(f.var, "RETURN");
        assert_eq!(f.value, PostValue::Str(String::from("true")));

        let f: VarDataPair = "LEGS_DONE=3".parse().unwrap();
        assert_eq!(f.value, PostValue::Num(3.0));

        assert!("=3".parse::<VarDataPair>().is_err());
        assert!("NOVALUE".parse::<VarDataPair>().is_err());
        assert!("TWO WORDS=1".parse::<VarDataPair>().is_err());
    }

    #[test]
    fn test_macros() {
        let mut m = Macros::new();
        m.set("LEG_ID", 4);
        m.set("MODE", "turn");
        m.set("MODE", "leg2");

        let f: VarDataPair = "LEG_REPORT=id=$[LEG_ID],mode=$[MODE],x=$[NX]".parse().unwrap();
        let p = f.to_posting(&m);
        assert_eq!(p.var, "LEG_REPORT");
        assert_eq!(p.as_str(), Some("id=4,mode=leg2,x=$[NX]"));
    }
}
