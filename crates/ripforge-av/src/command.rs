//! Builder for executing external tool commands with captured output.
//!
//! Every invocation is an explicit program plus argument list; nothing is
//! passed through a shell. Execution goes through the [`CommandRunner`]
//! trait so callers can substitute a scripted runner in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{Error, Result};

/// Output captured from a tool execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Build a successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Build a failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A builder for constructing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use ripforge_av::{CommandRunner, SystemRunner, ToolCommand};
///
/// let mut cmd = ToolCommand::new("makemkvcon");
/// cmd.arg("-r").arg("info").arg("disc:0");
/// let output = SystemRunner.run(&cmd)?;
/// println!("{}", output.stdout);
/// # Ok::<(), ripforge_av::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(&mut self, p: &Path) -> &mut Self {
        self.args.push(p.to_string_lossy().into_owned());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short program name used in logs and errors (`/usr/bin/ffprobe` -> `ffprobe`).
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Executes [`ToolCommand`]s.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output.
    ///
    /// A non-zero exit is *not* an error at this level; only a failure to
    /// spawn or wait on the process is. Use [`CommandRunner::execute`] for
    /// the stricter form.
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput>;

    /// Whether the given program can be located.
    fn available(&self, program: &Path) -> bool {
        which::which(program).is_ok()
    }

    /// Run the command and treat a non-zero exit as [`Error::ToolFailed`].
    fn execute(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        let output = self.run(cmd)?;
        if !output.success() {
            let status = output
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(Error::tool_failed(
                cmd.program_name(),
                format!("exited with status {}: {}", status, output.stderr.trim()),
            ));
        }
        Ok(output)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        tracing::debug!("Running: {}", cmd);

        let output = Command::new(cmd.program())
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(cmd.program_name())
                } else {
                    Error::tool_failed(cmd.program_name(), format!("failed to spawn: {e}"))
                }
            })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
