//! External tool detection.

use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Whether the rip workflows cannot run without it.
    pub required: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// A tool the workflows invoke, with the argument that prints its version.
#[derive(Debug, Clone, Copy)]
pub struct KnownTool {
    pub name: &'static str,
    pub version_arg: Option<&'static str>,
    pub required: bool,
}

/// Every tool the rip workflows shell out to.
pub const KNOWN_TOOLS: &[KnownTool] = &[
    KnownTool {
        name: "makemkvcon",
        version_arg: None,
        required: true,
    },
    KnownTool {
        name: "filebot",
        version_arg: Some("-version"),
        required: false,
    },
    KnownTool {
        name: "ffprobe",
        version_arg: Some("-version"),
        required: false,
    },
    KnownTool {
        name: "eject",
        version_arg: Some("--version"),
        required: false,
    },
    KnownTool {
        name: "mountpoint",
        version_arg: Some("--version"),
        required: false,
    },
];

/// Check if a tool is available and get its information.
///
/// `program` may be a bare name looked up in `PATH` or an explicit path.
///
/// # Example
///
/// ```no_run
/// use ripforge_av::check_tool;
///
/// let info = check_tool("ffprobe", "ffprobe", Some("-version"));
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, program: impl AsRef<Path>, version_arg: Option<&str>) -> ToolInfo {
    let path = match which::which(program.as_ref()) {
        Ok(p) => p,
        Err(_) => {
            return ToolInfo {
                name: name.to_string(),
                available: false,
                required: false,
                version: None,
                path: None,
            }
        }
    };

    let version = version_arg.and_then(|arg| detect_version(&path, arg));

    ToolInfo {
        name: name.to_string(),
        available: true,
        required: false,
        version,
        path: Some(path),
    }
}

/// Check every known tool, resolving each name through `resolve` first so
/// configured path overrides are honoured.
pub fn check_tools<F>(resolve: F) -> Vec<ToolInfo>
where
    F: Fn(&str) -> PathBuf,
{
    KNOWN_TOOLS
        .iter()
        .map(|tool| {
            let mut info = check_tool(tool.name, resolve(tool.name), tool.version_arg);
            info.required = tool.required;
            info
        })
        .collect()
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}

/// Run `<tool> <version_arg>` and return the first line of stdout.
fn detect_version(path: &Path, version_arg: &str) -> Option<String> {
    let output = Command::new(path).arg(version_arg).output().ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool("nonexistent", "nonexistent_tool_12345", Some("--version"));
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn check_tools_reports_every_known_tool() {
        let infos = check_tools(|name| PathBuf::from(format!("{name}_missing_xyz")));
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["makemkvcon", "filebot", "ffprobe", "eject", "mountpoint"]
        );
        assert!(infos.iter().all(|i| !i.available));
        assert!(infos[0].required);
    }

    #[test]
    fn configured_path_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("filebot");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(get_tool_path("filebot", Some(&fake)).unwrap(), fake);
    }
}
