//! FileBot lookups and renames.

use ripforge_av::{CommandRunner, Error as ToolError, ToolCommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result of a FileBot rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameOutcome {
    Renamed,
    /// FileBot exited non-zero; files may or may not have moved.
    Uncertain { reason: String },
}

/// Wraps the `filebot` CLI.
pub struct MetadataResolver<'a> {
    runner: &'a dyn CommandRunner,
    filebot: PathBuf,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(runner: &'a dyn CommandRunner, filebot: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            filebot: filebot.into(),
        }
    }

    /// `filebot -list --db <db> --q <query> --format <format>`.
    ///
    /// Returns the first non-empty output line, or `None` on a miss, a
    /// non-zero exit, or when FileBot cannot be run.
    pub fn lookup(&self, query: &str, database: &str, format: &str) -> Option<String> {
        let mut cmd = ToolCommand::new(&self.filebot);
        cmd.args(["-list", "--db", database, "--q", query, "--format", format]);

        let output = match self.runner.run(&cmd) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!("Metadata lookup for {:?} failed: {}", query, e);
                return None;
            }
        };

        if !output.success() {
            tracing::warn!(
                "filebot -list exited with {:?} for {:?}: {}",
                output.code,
                query,
                output.stderr.trim()
            );
            return None;
        }

        first_line(&output.stdout)
    }

    /// `filebot -rename <dir> -r --db <db> --format <format> --action move`.
    ///
    /// Errors only when FileBot could not be run at all; a non-zero exit is
    /// reported as [`RenameOutcome::Uncertain`].
    pub fn rename(&self, dir: &Path, database: &str, format: &str) -> Result<RenameOutcome, ToolError> {
        let mut cmd = ToolCommand::new(&self.filebot);
        cmd.arg("-rename")
            .path_arg(dir)
            .args(["-r", "--db", database, "--format", format, "--action", "move"]);

        tracing::debug!("FileBot command: {}", cmd);
        let output = self.runner.run(&cmd)?;

        if output.success() {
            return Ok(RenameOutcome::Renamed);
        }

        let reason = match output.stderr.trim() {
            "" => format!("filebot exited with {:?}", output.code),
            msg => msg.to_string(),
        };
        Ok(RenameOutcome::Uncertain { reason })
    }
}

fn first_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// `"Star Wars: A New Hope (1977)"` -> `"StarWarsANewHope1977"`.
///
/// Splits on every non-alphanumeric character and upper-cases the first
/// letter of each word; the rest of each word is kept as-is.
pub fn to_camel_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Show path used when the lookup misses: `Unknown/<CamelName>`.
pub fn fallback_show_path(query: &str) -> String {
    let name = to_camel_case(query);
    if name.is_empty() {
        "Unknown/Unknown".to_string()
    } else {
        format!("Unknown/{}", name)
    }
}

/// FileBot episode format with the season baked in: `{n} - S01E{e} - {t}`.
pub fn episode_format(season: u32) -> String {
    format!("{{n}} - S{:02}E{{e}} - {{t}}", season)
}

/// Rename every `.mkv` in `dir` to `<name>.mkv`, `<name>1.mkv`, ...
///
/// Files are renamed in sorted order. Returns the new paths.
pub fn local_rename_mkv(dir: &Path, name: &str) -> std::io::Result<Vec<PathBuf>> {
    let files = crate::selection::list_mkv_files(dir)?;

    if files.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no MKV files found in {}", dir.display()),
        ));
    }
    if files.len() > 1 {
        tracing::warn!(
            "More than one file in {:?}, manual rename may be required",
            dir
        );
    }

    let mut renamed = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let target = if i == 0 {
            dir.join(format!("{}.mkv", name))
        } else {
            dir.join(format!("{}{}.mkv", name, i))
        };

        if *file != target {
            std::fs::rename(file, &target)?;
            tracing::info!("Renamed: {:?} -> {:?}", file.file_name(), target.file_name());
        }
        renamed.push(target);
    }

    Ok(renamed)
}
