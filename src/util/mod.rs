//! Shared helpers
//!
//! `testing` is public so integration tests can share the log setup.

pub mod testing;
