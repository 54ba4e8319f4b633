//! Duration probing via ffprobe.

use crate::command::{CommandRunner, ToolCommand};
use crate::{Error, Result};
use std::path::Path;

/// Build the ffprobe invocation that prints only the container duration.
pub fn duration_command(ffprobe: &Path, file: &Path) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ])
    .path_arg(file);
    cmd
}

/// Parse ffprobe's single-value duration output (e.g. `"2641.520000\n"`).
pub fn parse_duration_output(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    let secs: f64 = value
        .parse()
        .map_err(|_| Error::parse_error("ffprobe", format!("not a duration: {:?}", value)))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::parse_error(
            "ffprobe",
            format!("duration out of range: {}", secs),
        ));
    }

    Ok(secs)
}

/// Probe the duration of a media file in seconds.
pub fn probe_duration(runner: &dyn CommandRunner, ffprobe: &Path, file: &Path) -> Result<f64> {
    if !file.exists() {
        return Err(Error::file_not_found(file));
    }

    let output = runner.execute(&duration_command(ffprobe, file))?;
    parse_duration_output(&output.stdout)
}
