use super::{
    prepare_output_dir, relative_show_path, ResolvedTarget, RipContext, RipJob, RipReport,
    RipStep,
};
use crate::error::{Result, RipError};
use crate::metadata::{self, MetadataResolver, RenameOutcome};
use crate::selection::{self, EpisodeBand};

/// Highest season number that renders as two digits.
const MAX_SEASON: u32 = 99;

/// Parse `"<season>-<disc>"`, e.g. `"1-2"` for season 1, disc 2.
pub fn parse_season_disc(s: &str) -> Result<(u32, u32)> {
    let invalid = || RipError::InvalidSeasonDisc(s.to_string());

    let (season, disc) = s.trim().split_once('-').ok_or_else(invalid)?;
    let season: u32 = season.parse().map_err(|_| invalid())?;
    let disc: u32 = disc.parse().map_err(|_| invalid())?;

    if season == 0 || season > MAX_SEASON || disc == 0 {
        return Err(invalid());
    }
    Ok((season, disc))
}

/// `"Season 01"`.
pub fn season_dir_name(season: u32) -> String {
    format!("Season {:02}", season)
}

/// Rip every episode-length title of a TV disc into
/// `<root>/<show path>/Season NN`.
pub fn rip_tv(ctx: &RipContext<'_>, job: &RipJob) -> Result<RipReport> {
    let config = ctx.config();
    let mut report = RipReport::default();

    ctx.enter(RipStep::ParseSeasonDisc)?;
    let (season, disc) = match (job.season, job.disc) {
        (Some(s), Some(d)) if s > 0 && s <= MAX_SEASON && d > 0 => (s, d),
        (s, d) => {
            return Err(RipError::InvalidSeasonDisc(format!(
                "{}-{}",
                s.map(|v| v.to_string()).unwrap_or_default(),
                d.map(|v| v.to_string()).unwrap_or_default()
            )))
        }
    };
    let query = job.query.trim();
    if query.is_empty() {
        return Err(RipError::NameUnresolved);
    }
    tracing::info!(
        "Season {} disc {}; disc number is not used for episode numbering",
        season,
        disc
    );

    ctx.enter(RipStep::ValidateStorage)?;
    let target = ctx.validate_storage()?;
    report.disk = target.disk.clone();

    ctx.enter(RipStep::ResolveMetadata)?;
    tracing::info!("Looking up show info in {} for: {}", config.tv.database, query);
    let resolver = MetadataResolver::new(ctx.runner(), config.tools.filebot());
    let found = resolver
        .lookup(query, &config.tv.database, &config.tv.show_format)
        .filter(|found| {
            let usable = relative_show_path(found).is_some();
            if !usable {
                tracing::warn!("Ignoring show path outside the storage root: {}", found);
            }
            usable
        });
    let show_path = match found {
        Some(found) => {
            tracing::info!("Found: {}", found);
            found
        }
        None => {
            let fallback = metadata::fallback_show_path(query);
            report.warn(format!(
                "Could not find show in {}, using {}",
                config.tv.database, fallback
            ));
            fallback
        }
    };

    ctx.enter(RipStep::BuildPath)?;
    let show_dir = relative_show_path(&show_path).ok_or(RipError::NameUnresolved)?;
    let resolved = ResolvedTarget {
        output_dir: target.root.join(show_dir).join(season_dir_name(season)),
        final_name: show_path,
    };
    prepare_output_dir(&resolved.output_dir)?;

    ctx.enter(RipStep::FormatDrive)?;
    let drive = ctx.drive_for(&job.device);

    ctx.enter(RipStep::Extract)?;
    ctx.extract(&drive, "all", &resolved.output_dir, config.tv.min_length_secs)?;

    ctx.enter(RipStep::RetentionFilter)?;
    let ffprobe = config.tools.ffprobe();
    if ctx.runner().available(&ffprobe) {
        let band = EpisodeBand {
            min_secs: config.tv.min_length_secs,
            max_secs: config.tv.max_episode_secs,
        };
        match selection::filter_episodes(ctx.runner(), &ffprobe, &resolved.output_dir, band) {
            Ok(retention) => {
                for file in &retention.unprobed {
                    report.warn(format!("Could not probe {}, kept it", file.display()));
                }
                report.removed_files = retention.removed;
            }
            Err(e) => report.warn(format!("Episode filtering failed: {}", e)),
        }
    } else {
        report.warn("ffprobe not found, skipping play-all cleanup");
    }

    ctx.enter(RipStep::Rename)?;
    match resolver.rename(
        &resolved.output_dir,
        &config.tv.rename_database,
        &metadata::episode_format(season),
    ) {
        Ok(RenameOutcome::Renamed) => tracing::info!("Renamed episodes with FileBot"),
        Ok(RenameOutcome::Uncertain { reason }) => {
            report.warn(format!("FileBot rename may not have completed: {}", reason))
        }
        Err(e) => report.warn(format!("FileBot rename failed: {}", e)),
    }

    ctx.enter(RipStep::Eject)?;
    ctx.eject(&drive, &mut report);

    ctx.enter(RipStep::Report)?;
    report.kept_files = selection::list_mkv_files(&resolved.output_dir)?;
    report.output_dir = resolved.output_dir;
    report.final_name = resolved.final_name;
    tracing::info!(
        "Rip complete, {} episode file(s) in {:?}",
        report.kept_files.len(),
        report.output_dir
    );

    Ok(report)
}
