//! subform: a composable sub-form engine.
//!
//! A form is a tree of leaf, group and collection nodes. Parent and child
//! values stay synchronized in both directions, discriminant fields swap
//! variant subtrees in place, and validation errors are aggregated into a
//! tree shaped like the domain value.
//!
//! Layers, innermost first:
//! - [`domain`]: the form engine (no I/O)
//! - [`application`]: the vehicle/droid listing form, scripted edits, services
//! - [`infrastructure`]: filesystem boundary and service wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
