//! Application layer: listing schema, edits and services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod edit;
pub mod error;
pub mod error_ext;
pub mod listing;
pub mod services;

pub use edit::Edit;
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
