//! Shared test harness for integration tests.
//!
//! Provides [`FakeDisc`], a [`CommandRunner`] that plays the part of
//! makemkvcon, FileBot, ffprobe, eject and mountpoint against a temporary
//! library, and [`FixedSpace`] for free-space queries.
#![allow(dead_code)]

use parking_lot::Mutex;
use ripforge::config::Config;
use ripforge::storage::SpaceProbe;
use ripforge_av::{CommandRunner, Error, Result, ToolCommand, ToolOutput};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Robot-mode disc info with a label and `(title, seconds)` durations.
pub fn disc_info(label: &str, titles: &[(u32, u64)]) -> String {
    let mut out = format!("TCOUNT:{}\nCINFO:2,0,\"{}\"\n", titles.len(), label);
    for (id, secs) in titles {
        out.push_str(&format!(
            "TINFO:{},9,0,\"{}:{:02}:{:02}\"\n",
            id,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        ));
    }
    out
}

/// Scripted stand-in for every external tool a rip touches.
pub struct FakeDisc {
    /// `makemkvcon -r info` output
    pub info: String,
    /// Files `makemkvcon mkv` writes, with the duration ffprobe reports
    pub rips: Vec<(String, f64)>,
    pub extract_fails: bool,
    /// First line printed by `filebot -list`; `None` is a miss
    pub lookup: Option<String>,
    pub filebot_installed: bool,
    pub rename_fails: bool,
    pub ffprobe_installed: bool,
    pub eject_fails: bool,
    pub is_mountpoint: bool,
    /// Set once makemkvcon has been asked to rip
    pub extract_started: Arc<AtomicBool>,
    pub log: Mutex<Vec<ToolCommand>>,
}

impl Default for FakeDisc {
    fn default() -> Self {
        Self {
            info: String::new(),
            rips: Vec::new(),
            extract_fails: false,
            lookup: None,
            filebot_installed: true,
            rename_fails: false,
            ffprobe_installed: true,
            eject_fails: false,
            is_mountpoint: true,
            extract_started: Arc::new(AtomicBool::new(false)),
            log: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDisc {
    /// Every command run so far, rendered as `program arg arg ...`.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().iter().map(|c| c.to_string()).collect()
    }

    /// Commands run for one program.
    pub fn calls(&self, program: &str) -> Vec<Vec<String>> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.program_name() == program)
            .map(|c| c.get_args().to_vec())
            .collect()
    }

    fn makemkvcon(&self, args: &[String]) -> Result<ToolOutput> {
        if args.first().map(String::as_str) == Some("-r") {
            return Ok(ToolOutput::ok(self.info.clone()));
        }

        self.extract_started.store(true, Ordering::SeqCst);
        if self.extract_fails {
            return Ok(ToolOutput::failed(1, "Failed to open disc"));
        }

        let dir = PathBuf::from(&args[3]);
        for (name, _) in &self.rips {
            std::fs::write(dir.join(name), b"mkv")?;
        }
        Ok(ToolOutput::ok("Copy complete."))
    }

    fn filebot(&self, args: &[String]) -> Result<ToolOutput> {
        if !self.filebot_installed {
            return Err(Error::tool_not_found("filebot"));
        }
        match args.first().map(String::as_str) {
            Some("-list") => Ok(match &self.lookup {
                Some(line) => ToolOutput::ok(format!("{}\n", line)),
                None => ToolOutput::ok(""),
            }),
            _ if self.rename_fails => Ok(ToolOutput::failed(1, "Failed to match files")),
            _ => Ok(ToolOutput::ok("Processed 1 file")),
        }
    }

    fn ffprobe(&self, args: &[String]) -> Result<ToolOutput> {
        let file = args.last().map(PathBuf::from).unwrap_or_default();
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        match self.rips.iter().find(|(n, _)| *n == name) {
            Some((_, secs)) => Ok(ToolOutput::ok(format!("{:.6}\n", secs))),
            None => Ok(ToolOutput::failed(1, "Invalid data found when processing input")),
        }
    }
}

impl CommandRunner for FakeDisc {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        self.log.lock().push(cmd.clone());
        let args = cmd.get_args();

        match cmd.program_name().as_str() {
            "makemkvcon" => self.makemkvcon(args),
            "filebot" => self.filebot(args),
            "ffprobe" => self.ffprobe(args),
            "eject" if self.eject_fails => Ok(ToolOutput::failed(1, "unable to eject")),
            "eject" => Ok(ToolOutput::ok("")),
            "mountpoint" if self.is_mountpoint => Ok(ToolOutput::ok("")),
            "mountpoint" => Ok(ToolOutput::failed(1, "")),
            other => Err(Error::tool_not_found(other)),
        }
    }

    fn available(&self, program: &Path) -> bool {
        match program.file_name().and_then(|n| n.to_str()) {
            Some("ffprobe") => self.ffprobe_installed,
            Some("filebot") => self.filebot_installed,
            _ => true,
        }
    }
}

/// Free space per path; unknown paths fail the query.
#[derive(Default)]
pub struct FixedSpace(pub HashMap<PathBuf, u64>);

impl FixedSpace {
    pub fn new(disks: &[(&Path, u64)]) -> Self {
        Self(disks.iter().map(|(p, b)| (p.to_path_buf(), *b)).collect())
    }
}

impl SpaceProbe for FixedSpace {
    fn available_bytes(&self, path: &Path) -> std::io::Result<u64> {
        self.0
            .get(path)
            .copied()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such disk"))
    }
}

/// A temporary library root and a default config pointing at it.
pub struct Library {
    pub dir: TempDir,
    pub config: Config,
}

impl Library {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_storage(dir.path());
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
