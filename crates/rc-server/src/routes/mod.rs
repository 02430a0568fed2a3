//! Route handlers for the HTTP API.

pub mod direct;
pub mod health;
pub mod library;
pub mod stream;
