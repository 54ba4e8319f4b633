//! Error types for the rip workflows.
//!
//! Every variant here is fatal to the job that raised it. Degraded outcomes
//! (metadata miss, rename or eject failure, missing probe tool) are logged
//! and collected as warnings on the [`RipReport`](crate::workflow::RipReport)
//! instead.

use std::path::PathBuf;

/// Result type alias using [`RipError`].
pub type Result<T> = std::result::Result<T, RipError>;

#[derive(Debug, thiserror::Error)]
pub enum RipError {
    /// No name from `-m`, the positional query, or the disc label.
    #[error("could not determine a title name; provide one with -m")]
    NameUnresolved,

    #[error("target category must be provided")]
    MissingCategory,

    /// Category is not a single folder name under the storage root.
    #[error("invalid category {0:?}: must be a single folder name")]
    InvalidCategory(String),

    /// Season/disc argument not of the form `<season>-<disc>`.
    #[error("invalid season-disc {0:?}: expected e.g. \"1-2\" for season 1, disc 2")]
    InvalidSeasonDisc(String),

    #[error("storage path does not exist: {}", .0.display())]
    StorageMissing(PathBuf),

    #[error("storage path is not a directory: {}", .0.display())]
    StorageNotDirectory(PathBuf),

    #[error("storage path is not writable: {}: {source}", path.display())]
    StorageNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage path is not a mountpoint: {}", .0.display())]
    NotMountpoint(PathBuf),

    /// Pool resolution was given no member disks.
    #[error("no candidate disks in storage pool")]
    NoCandidates,

    /// Every member disk failed its free-space query.
    #[error("no accessible disk in storage pool")]
    NoAccessibleDisk,

    #[error(
        "insufficient free space on {}: {available} bytes available, {required} required",
        disk.display()
    )]
    InsufficientSpace {
        disk: PathBuf,
        available: u64,
        required: u64,
    },

    #[error("failed to create output directory {}: {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// makemkvcon could not be run or exited non-zero.
    #[error("extraction failed: {0}")]
    Extraction(#[source] ripforge_av::Error),

    #[error("job cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RipError {
    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            RipError::NameUnresolved => "name_unresolved",
            RipError::MissingCategory => "missing_category",
            RipError::InvalidCategory(_) => "invalid_category",
            RipError::InvalidSeasonDisc(_) => "invalid_season_disc",
            RipError::StorageMissing(_)
            | RipError::StorageNotDirectory(_)
            | RipError::StorageNotWritable { .. }
            | RipError::NotMountpoint(_) => "storage_unavailable",
            RipError::NoCandidates | RipError::NoAccessibleDisk => "pool_unavailable",
            RipError::InsufficientSpace { .. } => "insufficient_space",
            RipError::CreateOutputDir { .. } => "output_dir",
            RipError::Extraction(_) => "extraction_failed",
            RipError::Cancelled => "cancelled",
            RipError::Io(_) => "io_error",
        }
    }
}
