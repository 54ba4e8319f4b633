use super::{
    folder_name, prepare_output_dir, validate_category, ResolvedTarget, RipContext, RipJob,
    RipReport, RipStep,
};
use crate::error::{Result, RipError};
use crate::metadata::{self, MetadataResolver, RenameOutcome};
use crate::selection::{self, DiscInfo, TitleSelection};

/// Rip the main feature of a movie disc into `<root>/<category>/<name>`.
pub fn rip_movie(ctx: &RipContext<'_>, job: &RipJob) -> Result<RipReport> {
    let config = ctx.config();
    let mut report = RipReport::default();
    let drive = ctx.drive_for(&job.device);

    // Disc info is queried at most once and shared between name discovery
    // and title selection.
    let mut disc: Option<DiscInfo> = None;

    ctx.enter(RipStep::ResolveName)?;
    let category = validate_category(&job.category)?;
    let name = match job.query.trim() {
        "" => {
            tracing::info!("Discovering movie name from disc...");
            let info = match ctx.disc_info(&drive) {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!("Could not read disc info: {}", e);
                    DiscInfo::default()
                }
            };
            let label = info.label.clone();
            disc = Some(info);
            let label = label.ok_or(RipError::NameUnresolved)?;
            tracing::info!("Discovered movie name: {}", label);
            label
        }
        query => query.to_string(),
    };

    ctx.enter(RipStep::ValidateStorage)?;
    let target = ctx.validate_storage()?;
    report.disk = target.disk.clone();

    ctx.enter(RipStep::ResolveMetadata)?;
    tracing::info!("Looking up movie info in {} for: {}", config.movie.database, name);
    let resolver = MetadataResolver::new(ctx.runner(), config.tools.filebot());
    let final_name = match resolver.lookup(&name, &config.movie.database, &config.movie.name_format) {
        Some(found) => {
            tracing::info!("Found: {}", found);
            found
        }
        None => {
            report.warn(format!(
                "Could not find movie in {}, using provided name: {}",
                config.movie.database, name
            ));
            name.clone()
        }
    };

    ctx.enter(RipStep::BuildPath)?;
    let final_name = folder_name(&final_name).ok_or(RipError::NameUnresolved)?;
    let resolved = ResolvedTarget {
        output_dir: target.root.join(category).join(&final_name),
        final_name,
    };
    prepare_output_dir(&resolved.output_dir)?;
    tracing::info!("Putting movie in {:?}", resolved.output_dir);

    ctx.enter(RipStep::FormatDrive)?;
    tracing::info!("Target: {}/{}.mkv", resolved.output_dir.display(), resolved.final_name);

    ctx.enter(RipStep::Extract)?;
    let info = match disc {
        Some(info) => info,
        None => ctx.disc_info(&drive).unwrap_or_else(|e| {
            tracing::warn!("Could not read disc info, ripping the default title: {}", e);
            DiscInfo::default()
        }),
    };
    let selection = selection::select_longest(&info.titles, config.movie.min_length_secs);
    match &selection {
        TitleSelection::Longest(t) => {
            tracing::info!("Longest title: {} ({} s)", t.id, t.duration_secs)
        }
        TitleSelection::Fallback => tracing::info!(
            "No title of at least {} s found, falling back to title {}",
            config.movie.min_length_secs,
            selection.title_id()
        ),
    }
    ctx.extract(
        &drive,
        selection.title_id(),
        &resolved.output_dir,
        config.movie.min_length_secs,
    )?;

    ctx.enter(RipStep::Rename)?;
    match resolver.rename(
        &resolved.output_dir,
        &config.movie.database,
        &config.movie.name_format,
    ) {
        Ok(RenameOutcome::Renamed) => tracing::info!("Renamed movie file with FileBot"),
        Ok(RenameOutcome::Uncertain { reason }) => {
            report.warn(format!("FileBot rename may not have completed: {}", reason))
        }
        Err(e) => {
            tracing::warn!("FileBot unavailable ({}), renaming locally", e);
            if let Err(e) = metadata::local_rename_mkv(&resolved.output_dir, &resolved.final_name) {
                report.warn(format!("Local rename failed: {}", e));
            }
        }
    }

    ctx.enter(RipStep::Eject)?;
    ctx.eject(&drive, &mut report);

    ctx.enter(RipStep::Report)?;
    report.kept_files = selection::list_mkv_files(&resolved.output_dir)?;
    report.output_dir = resolved.output_dir;
    report.final_name = resolved.final_name;
    tracing::info!("Rip complete, files are in {:?}", report.output_dir);

    Ok(report)
}
