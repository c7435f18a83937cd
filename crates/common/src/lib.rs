//! Common utilities for tandem crates.
//!
//! - [`debug`] - Per-module logging controlled via the `DEBUG` environment
//!   variable

pub mod debug;

pub use debug::{create_logger, Logger};
