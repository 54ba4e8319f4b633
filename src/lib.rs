//! ripforge - optical disc ripping into a media library
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod drive;
pub mod error;
pub mod metadata;
pub mod processor;
pub mod selection;
pub mod server;
pub mod state;
pub mod storage;
pub mod workflow;

pub use error::{Result, RipError};
