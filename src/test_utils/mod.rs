//! Shared helpers for unit tests
mod common;
mod recording_handler;

pub use common::*;
pub use recording_handler::*;
