//! Pool membership from the mount table.
//!
//! A pooled filesystem (mergerfs) is declared in fstab as
//! `/mnt/disk1:/mnt/disk2 /plex/storage fuse.mergerfs defaults 0 0`; the
//! first column lists the member disks separated by colons.

use std::path::{Path, PathBuf};

/// Member disks of the pool mounted at `mount_point`, parsed from fstab text.
///
/// Only entries whose mount point equals `mount_point` and whose filesystem
/// type contains `fs_type` are considered. Returns an empty list when no
/// entry matches.
pub fn parse_pool_members(fstab: &str, mount_point: &Path, fs_type: &str) -> Vec<PathBuf> {
    for line in fstab.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }

        let (source, target, kind) = (fields[0], fields[1], fields[2]);
        if !kind.contains(fs_type) || Path::new(target) != mount_point {
            continue;
        }

        return source
            .split(':')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
    }

    Vec::new()
}

/// Read `fstab_path` and return the pool members for `mount_point`.
pub fn pool_members(fstab_path: &Path, mount_point: &Path, fs_type: &str) -> Vec<PathBuf> {
    match std::fs::read_to_string(fstab_path) {
        Ok(content) => parse_pool_members(&content, mount_point, fs_type),
        Err(e) => {
            tracing::warn!("Could not read mount table {:?}: {}", fstab_path, e);
            Vec::new()
        }
    }
}
