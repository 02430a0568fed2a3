//! rc-core: shared error type, configuration, and identifiers.
//!
//! This crate is the foundational dependency for the other rc-* crates. It
//! carries no I/O beyond reading the configuration file.

pub mod config;
pub mod error;
pub mod ids;

pub use error::{Error, Result};
pub use ids::SessionId;
