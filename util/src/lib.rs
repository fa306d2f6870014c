//! Utility library for the leg-run autonomy software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod geom;
pub mod host;
#[macro_use]
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod script_interpreter;
pub mod time;
