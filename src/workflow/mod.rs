//! Movie and TV rip workflows.
//!
//! Each workflow is a fixed sequence of [`RipStep`]s run synchronously on
//! the calling thread. The first fatal error ends the job; degraded steps
//! append a warning to the [`RipReport`] and carry on.

mod movie;
mod tv;

pub use movie::rip_movie;
pub use tv::{parse_season_disc, rip_tv, season_dir_name};

use crate::config::Config;
use crate::drive::{device_path_for_eject, format_for_extraction_tool, DriveSpecifier};
use crate::error::{Result, RipError};
use crate::selection::{self, DiscInfo};
use crate::storage::{self, PoolDisk, SpaceProbe, StorageTarget};
use ripforge_av::{CommandRunner, ToolCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Movie,
    Tv,
}

/// One rip request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipJob {
    pub kind: JobKind,
    pub device: PathBuf,
    /// Category folder for movies; unused for TV.
    pub category: String,
    /// Movie or show name. May be empty for movies, in which case the disc
    /// label is used.
    pub query: String,
    pub season: Option<u32>,
    /// Parsed but not used for episode numbering.
    pub disc: Option<u32>,
}

impl RipJob {
    pub fn movie(
        device: impl Into<PathBuf>,
        category: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            kind: JobKind::Movie,
            device: device.into(),
            category: category.into(),
            query: query.into(),
            season: None,
            disc: None,
        }
    }

    /// Build a TV job from a `<season>-<disc>` argument.
    pub fn tv(device: impl Into<PathBuf>, query: impl Into<String>, season_disc: &str) -> Result<Self> {
        let (season, disc) = parse_season_disc(season_disc)?;
        Ok(Self {
            kind: JobKind::Tv,
            device: device.into(),
            category: String::new(),
            query: query.into(),
            season: Some(season),
            disc: Some(disc),
        })
    }

    /// Short description for logs and job listings.
    pub fn describe(&self) -> String {
        let name = if self.query.trim().is_empty() {
            "<disc label>"
        } else {
            self.query.trim()
        };
        match (self.kind, self.season, self.disc) {
            (JobKind::Tv, Some(s), Some(d)) => format!("{} S{:02} disc {}", name, s, d),
            _ => name.to_string(),
        }
    }
}

/// Final name and directory for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub final_name: String,
    pub output_dir: PathBuf,
}

/// Outcome of a successful rip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RipReport {
    pub output_dir: PathBuf,
    pub final_name: String,
    /// Pool member selected for this job, when pool resolution ran.
    pub disk: Option<PoolDisk>,
    pub kept_files: Vec<PathBuf>,
    pub removed_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl RipReport {
    /// Log a warning and record it on the report.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Workflow states, in the order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RipStep {
    ResolveName,
    ParseSeasonDisc,
    ValidateStorage,
    ResolveMetadata,
    BuildPath,
    FormatDrive,
    Extract,
    RetentionFilter,
    Rename,
    Eject,
    Report,
}

impl fmt::Display for RipStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RipStep::ResolveName => "resolving name",
            RipStep::ParseSeasonDisc => "parsing season/disc",
            RipStep::ValidateStorage => "validating storage",
            RipStep::ResolveMetadata => "looking up metadata",
            RipStep::BuildPath => "creating output directory",
            RipStep::FormatDrive => "formatting drive",
            RipStep::Extract => "extracting",
            RipStep::RetentionFilter => "filtering episodes",
            RipStep::Rename => "renaming",
            RipStep::Eject => "ejecting",
            RipStep::Report => "finishing",
        };
        f.write_str(s)
    }
}

/// Step observer, called as each state is entered.
pub type StepCallback<'a> = Box<dyn Fn(RipStep) + Send + Sync + 'a>;

/// Everything a workflow needs besides the job itself.
pub struct RipContext<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    space: &'a dyn SpaceProbe,
    cancel: Option<Arc<AtomicBool>>,
    on_step: Option<StepCallback<'a>>,
}

impl<'a> RipContext<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner, space: &'a dyn SpaceProbe) -> Self {
        Self {
            config,
            runner,
            space,
            cancel: None,
            on_step: None,
        }
    }

    /// Stop at the next state boundary once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_step_callback(mut self, callback: StepCallback<'a>) -> Self {
        self.on_step = Some(callback);
        self
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner
    }

    fn enter(&self, step: RipStep) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::SeqCst) {
                tracing::info!("Cancelled before {}", step);
                return Err(RipError::Cancelled);
            }
        }
        tracing::debug!("Step: {}", step);
        if let Some(cb) = &self.on_step {
            cb(step);
        }
        Ok(())
    }

    fn validate_storage(&self) -> Result<StorageTarget> {
        storage::resolve_storage_root(
            &self.config.storage,
            self.runner,
            &self.config.tools.mountpoint(),
            self.space,
        )
    }

    fn drive_for(&self, device: &Path) -> DriveSpecifier {
        let drive = format_for_extraction_tool(device, self.config.drive.addressing);
        tracing::info!("Using device {:?} as {}", device, drive);
        drive
    }

    /// `makemkvcon -r info <drive>`.
    fn disc_info(&self, drive: &DriveSpecifier) -> ripforge_av::Result<DiscInfo> {
        let mut cmd = ToolCommand::new(self.config.tools.makemkvcon());
        cmd.args(["-r", "info"]).arg(drive.to_string());
        let output = self.runner.execute(&cmd)?;
        Ok(selection::parse_disc_info(&output.stdout))
    }

    /// `makemkvcon mkv <drive> <title> <dir> --minlength=<secs>`.
    fn extract(&self, drive: &DriveSpecifier, title: &str, dir: &Path, min_length: u64) -> Result<()> {
        let mut cmd = ToolCommand::new(self.config.tools.makemkvcon());
        cmd.arg("mkv")
            .arg(drive.to_string())
            .arg(title)
            .path_arg(dir)
            .arg(format!("--minlength={}", min_length));

        tracing::info!("Ripping title {} to {:?}", title, dir);
        self.runner.execute(&cmd).map_err(RipError::Extraction)?;
        Ok(())
    }

    fn eject(&self, drive: &DriveSpecifier, report: &mut RipReport) {
        let device = device_path_for_eject(drive);
        let mut cmd = ToolCommand::new(self.config.tools.eject());
        cmd.path_arg(&device);

        if let Err(e) = self.runner.execute(&cmd) {
            report.warn(format!("Could not eject {}: {}", device.display(), e));
        }
    }
}

/// Create the output directory and confirm it accepts writes.
fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| RipError::CreateOutputDir {
        path: dir.to_path_buf(),
        source,
    })?;
    storage::verify_storage_path(dir)
}

/// Check that a category is one plain folder name directly under the root.
pub fn validate_category(category: &str) -> Result<&str> {
    let category = category.trim();
    if category.is_empty() {
        return Err(RipError::MissingCategory);
    }
    let mut parts = Path::new(category).components();
    let single = matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || category.contains(['/', '\\']) {
        return Err(RipError::InvalidCategory(category.to_string()));
    }
    Ok(category)
}

/// Turn a resolved title into a single folder and file name.
///
/// Leading dots and separators are dropped and inner separators become
/// `-`, so `Face/Off (1997)` is stored as `Face-Off (1997)`.
pub fn folder_name(name: &str) -> Option<String> {
    let cleaned = name
        .trim()
        .trim_start_matches(['/', '\\', '.'])
        .replace(['/', '\\'], "-");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Show path relative to the storage root. `None` if any component climbs
/// out of it or nothing is left.
fn relative_show_path(show_path: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for part in show_path.split(['/', '\\']).map(str::trim) {
        match part {
            "" | "." => continue,
            ".." => return None,
            part => path.push(part),
        }
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Run the workflow matching the job's kind.
pub fn run_job(ctx: &RipContext<'_>, job: &RipJob) -> Result<RipReport> {
    match job.kind {
        JobKind::Movie => rip_movie(ctx, job),
        JobKind::Tv => rip_tv(ctx, job),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tv_job_parses_season_disc() {
        let job = RipJob::tv("/dev/sr0", "Breaking Bad", "1-2").unwrap();
        assert_eq!(job.season, Some(1));
        assert_eq!(job.disc, Some(2));
        assert_eq!(job.describe(), "Breaking Bad S01 disc 2");
    }

    #[test]
    fn tv_job_rejects_bad_season_disc() {
        assert!(matches!(
            RipJob::tv("/dev/sr0", "Breaking Bad", "1"),
            Err(RipError::InvalidSeasonDisc(_))
        ));
    }

    #[test]
    fn movie_job_without_query_describes_label() {
        let job = RipJob::movie("/dev/sr0", "SciFi", "");
        assert_eq!(job.describe(), "<disc label>");
    }

    #[test]
    fn category_must_be_one_folder() {
        assert_eq!(validate_category(" SciFi ").unwrap(), "SciFi");
        assert!(matches!(validate_category("  "), Err(RipError::MissingCategory)));
        for bad in ["..", ".", "../../x", "/etc", "a/b", "a\\b", "SciFi/"] {
            assert!(
                matches!(validate_category(bad), Err(RipError::InvalidCategory(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn folder_name_strips_separators() {
        assert_eq!(folder_name("Face/Off (1997)").unwrap(), "Face-Off (1997)");
        assert_eq!(folder_name("/tmp/evil").unwrap(), "tmp-evil");
        assert_eq!(folder_name("../../x").unwrap(), "x");
        assert_eq!(folder_name(".hidden").unwrap(), "hidden");
        assert_eq!(folder_name("Heat (1995)").unwrap(), "Heat (1995)");
        assert_eq!(folder_name(" ../ "), None);
    }

    #[test]
    fn show_path_stays_relative() {
        assert_eq!(
            relative_show_path("/Breaking Bad (2008)").unwrap(),
            PathBuf::from("Breaking Bad (2008)")
        );
        assert_eq!(
            relative_show_path("Unknown/./Lost").unwrap(),
            PathBuf::from("Unknown").join("Lost")
        );
        assert_eq!(relative_show_path("../../etc"), None);
        assert_eq!(relative_show_path("Shows/../../x"), None);
        assert_eq!(relative_show_path("//"), None);
    }

    #[test]
    fn cancel_flag_stops_at_next_step() {
        let config = Config::default();
        let runner = ripforge_av::SystemRunner;
        let space = storage::StatvfsProbe;
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = RipContext::new(&config, &runner, &space).with_cancel_flag(flag.clone());

        assert!(ctx.enter(RipStep::ResolveName).is_ok());
        flag.store(true, Ordering::SeqCst);
        assert!(matches!(
            ctx.enter(RipStep::ValidateStorage),
            Err(RipError::Cancelled)
        ));
    }

    #[test]
    fn step_callback_sees_each_step() {
        let config = Config::default();
        let runner = ripforge_av::SystemRunner;
        let space = storage::StatvfsProbe;
        let seen = parking_lot::Mutex::new(Vec::new());
        let ctx = RipContext::new(&config, &runner, &space)
            .with_step_callback(Box::new(|step| seen.lock().push(step)));

        ctx.enter(RipStep::ResolveName).unwrap();
        ctx.enter(RipStep::Extract).unwrap();
        drop(ctx);
        assert_eq!(
            seen.into_inner(),
            vec![RipStep::ResolveName, RipStep::Extract]
        );
    }
}
