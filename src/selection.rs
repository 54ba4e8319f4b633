//! Disc title parsing and selection.
//!
//! `makemkvcon -r info` prints one record per line. The ones used here:
//!
//! ```text
//! CINFO:2,0,"INCEPTION"                 disc label
//! TINFO:0,9,0,"2:28:07"                 title 0 duration (h:mm:ss)
//! TINFO:3,27,0,"5000"                   title 3 duration (seconds)
//! ```

use regex::Regex;
use ripforge_av::{probe, CommandRunner};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Movie extraction floor: features shorter than an hour are never ripped.
pub const MIN_MOVIE_SECS: u64 = 3600;

/// TV extraction floor and lower bound of the episode band.
pub const MIN_EPISODE_SECS: u64 = 600;

/// Upper bound of the episode band; longer files are merged "play all" tracks.
pub const MAX_EPISODE_SECS: u64 = 3900;

/// Title ripped when no duration could be parsed.
pub const FALLBACK_TITLE: &str = "0";

/// One title enumerated on the disc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscTitle {
    pub id: String,
    pub duration_secs: u64,
}

/// Parsed `makemkvcon -r info` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscInfo {
    pub label: Option<String>,
    pub titles: Vec<DiscTitle>,
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^CINFO:2,0,"(.+)"$"#).expect("valid label regex"))
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^TINFO:(\d+),(9|27),\d+,"([0-9:]+)"$"#).expect("valid duration regex")
    })
}

/// Parse `h:mm:ss`, `m:ss` or plain seconds.
fn parse_duration(value: &str) -> Option<u64> {
    value
        .split(':')
        .try_fold((0u64, 0usize), |(acc, n), part| {
            let part: u64 = part.parse().ok()?;
            Some((acc.checked_mul(60)?.checked_add(part)?, n + 1))
        })
        .filter(|(_, n)| (1..=3).contains(n))
        .map(|(secs, _)| secs)
}

/// Parse disc info records. Titles keep the order they first appear in.
pub fn parse_disc_info(output: &str) -> DiscInfo {
    let mut info = DiscInfo::default();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');

        if info.label.is_none() {
            if let Some(caps) = label_re().captures(line) {
                let label = caps[1].trim();
                if !label.is_empty() {
                    info.label = Some(label.to_string());
                }
                continue;
            }
        }

        let Some(caps) = duration_re().captures(line) else {
            continue;
        };
        let id = &caps[1];
        let value = &caps[3];
        let duration = match &caps[2] {
            "9" => parse_duration(value),
            _ => value.parse().ok(),
        };

        let Some(duration_secs) = duration else {
            tracing::debug!("Unparseable duration for title {}: {:?}", id, value);
            continue;
        };

        if info.titles.iter().any(|t| t.id == id) {
            continue;
        }
        info.titles.push(DiscTitle {
            id: id.to_string(),
            duration_secs,
        });
    }

    info
}

/// Which title to hand to makemkvcon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleSelection {
    /// The longest title at or above the floor.
    Longest(DiscTitle),
    /// Nothing qualified; rip [`FALLBACK_TITLE`] and let `--minlength` reject it if short.
    Fallback,
}

impl TitleSelection {
    pub fn title_id(&self) -> &str {
        match self {
            TitleSelection::Longest(t) => &t.id,
            TitleSelection::Fallback => FALLBACK_TITLE,
        }
    }
}

/// Longest title with `duration_secs >= floor`; the first one listed wins ties.
pub fn select_longest(titles: &[DiscTitle], floor: u64) -> TitleSelection {
    let mut best: Option<&DiscTitle> = None;

    for title in titles.iter().filter(|t| t.duration_secs >= floor) {
        if best.map_or(true, |b| title.duration_secs > b.duration_secs) {
            best = Some(title);
        }
    }

    match best {
        Some(t) => TitleSelection::Longest(t.clone()),
        None => TitleSelection::Fallback,
    }
}

/// Accepted episode length, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeBand {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for EpisodeBand {
    fn default() -> Self {
        Self {
            min_secs: MIN_EPISODE_SECS,
            max_secs: MAX_EPISODE_SECS,
        }
    }
}

impl EpisodeBand {
    /// Whether a file of `duration` seconds is kept. Fractions are truncated.
    pub fn retains(&self, duration: f64) -> bool {
        let secs = duration.trunc() as u64;
        secs >= self.min_secs && secs <= self.max_secs
    }
}

/// `.mkv` files directly inside `dir`, sorted by name.
pub fn list_mkv_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_mkv = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("mkv"))
            .unwrap_or(false);
        if is_mkv {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Files kept and removed by [`filter_episodes`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetentionReport {
    pub kept: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Kept because their duration could not be probed.
    pub unprobed: Vec<PathBuf>,
}

/// Delete every `.mkv` in `dir` whose duration falls outside `band`.
///
/// A file whose probe fails is kept. A file that cannot be deleted is
/// reported as kept.
pub fn filter_episodes(
    runner: &dyn CommandRunner,
    ffprobe: &Path,
    dir: &Path,
    band: EpisodeBand,
) -> std::io::Result<RetentionReport> {
    let mut report = RetentionReport::default();

    for file in list_mkv_files(dir)? {
        let duration = match probe::probe_duration(runner, ffprobe, &file) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Could not probe {:?}, keeping it: {}", file, e);
                report.unprobed.push(file.clone());
                report.kept.push(file);
                continue;
            }
        };

        if band.retains(duration) {
            report.kept.push(file);
            continue;
        }

        let reason = if (duration.trunc() as u64) < band.min_secs {
            "shorter than an episode"
        } else {
            "longer than an episode"
        };
        tracing::info!(
            "Removing {:?}: {} ({:.2} min)",
            file.file_name().unwrap_or_default(),
            reason,
            duration / 60.0
        );

        match std::fs::remove_file(&file) {
            Ok(()) => report.removed.push(file),
            Err(e) => {
                tracing::warn!("Could not remove {:?}: {}", file, e);
                report.kept.push(file);
            }
        }
    }

    Ok(report)
}
