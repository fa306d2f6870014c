//! # Communications interface crate.
//!
//! Provides the plain data types exchanged between the leg-run controller
//! and the rest of the autonomy stack.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Leg-run status and coordination reports
pub mod legrun;

/// Published values
pub mod post;

/// Visualisation specs
pub mod viz;
