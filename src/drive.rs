//! Mapping between physical device paths and makemkvcon drive specifiers.
//!
//! makemkvcon addresses drives either as `disc:N` (an index it assigns) or
//! as `dev:<path>` (a raw device node). Linux optical drives follow
//! `/dev/srN`, so the index is read from the path; macOS raw disk nodes
//! (`/dev/rdiskN`) do not line up with makemkvcon's index and are passed
//! through as device nodes instead.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Which makemkvcon addressing convention to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveAddressing {
    /// Pick per device path: raw disk nodes use `dev:`, everything else `disc:`
    #[default]
    Auto,
    /// Always `disc:N`
    Index,
    /// Always `dev:<path>`
    Device,
}

/// Drive identifier in the form makemkvcon expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveSpecifier {
    /// `disc:N`
    Index(String),
    /// `dev:/dev/rdisk2`
    Device(PathBuf),
}

impl fmt::Display for DriveSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveSpecifier::Index(index) => write!(f, "disc:{}", index),
            DriveSpecifier::Device(path) => write!(f, "dev:{}", path.display()),
        }
    }
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid regex"))
}

/// First run of digits anywhere in the string.
///
/// This is a lexical match, not positional: `/dev/sr1/part2` yields `1`.
pub fn first_digit_run(s: &str) -> Option<&str> {
    digits_re().find(s).map(|m| m.as_str())
}

fn is_raw_disk_node(device: &str) -> bool {
    device.contains("rdisk") || device.starts_with("/dev/disk")
}

/// Convert a device path to a makemkvcon drive specifier.
pub fn format_for_extraction_tool(device: &Path, addressing: DriveAddressing) -> DriveSpecifier {
    let device_str = device.to_string_lossy();

    let use_device_node = match addressing {
        DriveAddressing::Device => true,
        DriveAddressing::Index => false,
        DriveAddressing::Auto => is_raw_disk_node(&device_str),
    };

    if use_device_node {
        return DriveSpecifier::Device(device.to_path_buf());
    }

    match first_digit_run(&device_str) {
        Some(index) => DriveSpecifier::Index(index.to_string()),
        None => {
            tracing::warn!(
                "No drive index in device path {:?}, defaulting to disc:0",
                device
            );
            DriveSpecifier::Index("0".to_string())
        }
    }
}

/// Map a drive specifier back to the device node used for `eject`.
pub fn device_path_for_eject(spec: &DriveSpecifier) -> PathBuf {
    match spec {
        DriveSpecifier::Index(index) => PathBuf::from(format!("/dev/sr{}", index)),
        DriveSpecifier::Device(path) => path.clone(),
    }
}

/// Optical drives present on this machine: `/dev/sr*` followed by `/dev/rdisk*`.
pub fn discover_optical_devices() -> Vec<PathBuf> {
    discover_in(Path::new("/dev"))
}

fn discover_in(dev_dir: &Path) -> Vec<PathBuf> {
    let entries: Vec<PathBuf> = match std::fs::read_dir(dev_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            tracing::debug!("Cannot list {:?}: {}", dev_dir, e);
            return Vec::new();
        }
    };

    let mut devices = Vec::new();
    for prefix in ["sr", "rdisk"] {
        let mut matched: Vec<PathBuf> = entries
            .iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(prefix))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        matched.sort();
        devices.extend(matched);
    }
    devices
}
