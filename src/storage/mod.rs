//! Storage target resolution.
//!
//! Validates the library root and, for pooled storage, picks the member
//! disk with the most free space.

pub mod pool;

pub use pool::{parse_pool_members, pool_members};

use crate::config::StorageConfig;
use crate::error::{Result, RipError};
use ripforge_av::{CommandRunner, ToolCommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Minimum free space on the selected disk: 5 GiB.
pub const MIN_FREE_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Name of the probe file written by [`verify_storage_path`].
const WRITE_TEST_FILE: &str = ".rip_test";

/// A pool member and its free space at the time of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolDisk {
    pub mount_path: PathBuf,
    pub available_bytes: u64,
}

/// Free-space query for a mounted filesystem.
pub trait SpaceProbe: Send + Sync {
    fn available_bytes(&self, path: &Path) -> std::io::Result<u64>;
}

/// Queries free space with `statvfs(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

impl SpaceProbe for StatvfsProbe {
    #[cfg(unix)]
    fn available_bytes(&self, path: &Path) -> std::io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(std::io::Error::from)?;
        #[allow(clippy::unnecessary_cast)]
        let bytes = stat.blocks_available() as u64 * stat.fragment_size() as u64;
        Ok(bytes)
    }

    #[cfg(not(unix))]
    fn available_bytes(&self, path: &Path) -> std::io::Result<u64> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("free space query not supported for {:?}", path),
        ))
    }
}

/// Pick the disk with the most free space, requiring at least [`MIN_FREE_BYTES`].
pub fn resolve_best_disk(pool: &[PathBuf], probe: &dyn SpaceProbe) -> Result<PoolDisk> {
    select_disk(pool, probe, MIN_FREE_BYTES)
}

/// Pick the disk with the most free space, requiring at least `min_free` bytes.
///
/// Disks whose query fails are skipped with a warning. Ties go to the disk
/// listed first.
pub fn select_disk(pool: &[PathBuf], probe: &dyn SpaceProbe, min_free: u64) -> Result<PoolDisk> {
    if pool.is_empty() {
        return Err(RipError::NoCandidates);
    }

    let mut best: Option<PoolDisk> = None;

    for disk in pool {
        let available = match probe.available_bytes(disk) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not stat {:?}: {}", disk, e);
                continue;
            }
        };

        tracing::debug!("{:?}: {} bytes available", disk, available);

        let better = match &best {
            Some(current) => available > current.available_bytes,
            None => true,
        };
        if better {
            best = Some(PoolDisk {
                mount_path: disk.clone(),
                available_bytes: available,
            });
        }
    }

    let best = best.ok_or(RipError::NoAccessibleDisk)?;

    tracing::info!(
        "Disk with most space: {:?} ({:.2} GB available)",
        best.mount_path,
        best.available_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    );

    if best.available_bytes < min_free {
        return Err(RipError::InsufficientSpace {
            disk: best.mount_path,
            available: best.available_bytes,
            required: min_free,
        });
    }

    Ok(best)
}

/// Check that the storage root exists, is a directory and accepts writes.
pub fn verify_storage_path(path: &Path) -> Result<()> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RipError::StorageMissing(path.to_path_buf()))
        }
        Err(e) => return Err(RipError::Io(e)),
    };

    if !meta.is_dir() {
        return Err(RipError::StorageNotDirectory(path.to_path_buf()));
    }

    let test_file = path.join(WRITE_TEST_FILE);
    std::fs::write(&test_file, b"test").map_err(|source| RipError::StorageNotWritable {
        path: path.to_path_buf(),
        source,
    })?;
    if let Err(e) = std::fs::remove_file(&test_file) {
        tracing::debug!("Could not remove {:?}: {}", test_file, e);
    }

    Ok(())
}

/// `mountpoint -q <path>`; any failure to run counts as "not a mountpoint".
pub fn is_mountpoint(runner: &dyn CommandRunner, mountpoint: &Path, path: &Path) -> bool {
    let mut cmd = ToolCommand::new(mountpoint);
    cmd.arg("-q").path_arg(path);
    match runner.run(&cmd) {
        Ok(out) => out.success(),
        Err(e) => {
            tracing::warn!("Could not run mountpoint: {}", e);
            false
        }
    }
}

/// Where a job writes: the library root, and the pool disk backing it when
/// pool resolution ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub root: PathBuf,
    pub disk: Option<PoolDisk>,
}

/// Validate configured storage and resolve the root for one job.
pub fn resolve_storage_root(
    config: &StorageConfig,
    runner: &dyn CommandRunner,
    mountpoint_tool: &Path,
    probe: &dyn SpaceProbe,
) -> Result<StorageTarget> {
    if config.require_mountpoint && !is_mountpoint(runner, mountpoint_tool, &config.path) {
        return Err(RipError::NotMountpoint(config.path.clone()));
    }

    verify_storage_path(&config.path)?;

    if !config.pool.enabled {
        return Ok(StorageTarget {
            root: config.path.clone(),
            disk: None,
        });
    }

    let members = pool_members(&config.pool.fstab, &config.path, &config.pool.fs_type);
    if members.is_empty() {
        tracing::warn!(
            "No {} pool declared for {:?} in {:?}; skipping free-space check",
            config.pool.fs_type,
            config.path,
            config.pool.fstab
        );
        return Ok(StorageTarget {
            root: config.path.clone(),
            disk: None,
        });
    }

    let disk = select_disk(&members, probe, config.pool.min_free_bytes)?;

    let root = if config.pool.write_direct {
        verify_storage_path(&disk.mount_path)?;
        disk.mount_path.clone()
    } else {
        config.path.clone()
    };

    Ok(StorageTarget {
        root,
        disk: Some(disk),
    })
}
