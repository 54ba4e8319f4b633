//! # ripforge-av
//!
//! External tool plumbing for the ripforge workflows.
//!
//! This crate provides:
//! - **Command execution** ([`ToolCommand`], [`CommandRunner`]) -- structured
//!   argument lists and captured `{code, stdout, stderr}` results, with a
//!   trait seam so tests can script tool responses.
//! - **Tool detection** ([`check_tools`]) -- locate makemkvcon, filebot,
//!   ffprobe, eject and mountpoint.
//! - **Duration probing** ([`probe::probe_duration`]) -- ffprobe's container
//!   duration in seconds.
//!
//! ## Example
//!
//! ```no_run
//! use ripforge_av::{probe, SystemRunner};
//! use std::path::Path;
//!
//! let secs = probe::probe_duration(&SystemRunner, Path::new("ffprobe"), Path::new("t00.mkv"))?;
//! println!("{:.0} seconds", secs);
//! # Ok::<(), ripforge_av::Error>(())
//! ```

pub mod command;
mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use command::{CommandRunner, SystemRunner, ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo, KNOWN_TOOLS};
