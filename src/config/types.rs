use crate::drive::DriveAddressing;
use crate::selection::{MAX_EPISODE_SECS, MIN_EPISODE_SECS, MIN_MOVIE_SECS};
use crate::storage::MIN_FREE_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub movie: MovieConfig,

    #[serde(default)]
    pub tv: TvConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Library root; categories and shows are created beneath it
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Refuse to rip unless `path` is a mountpoint (checked with `mountpoint -q`)
    #[serde(default)]
    pub require_mountpoint: bool,

    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("/plex/storage")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            require_mountpoint: false,
            pool: PoolConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Resolve the pool's member disks before every rip
    #[serde(default)]
    pub enabled: bool,

    /// Mount table declaring the pool
    #[serde(default = "default_fstab")]
    pub fstab: PathBuf,

    /// Substring matched against the filesystem-type column
    #[serde(default = "default_fs_type")]
    pub fs_type: String,

    /// Write directly to the member disk with the most free space instead of
    /// the pooled mount
    #[serde(default)]
    pub write_direct: bool,

    /// Minimum free space on the selected disk
    #[serde(default = "default_min_free_bytes")]
    pub min_free_bytes: u64,
}

fn default_fstab() -> PathBuf {
    PathBuf::from("/etc/fstab")
}

fn default_fs_type() -> String {
    "mergerfs".to_string()
}

fn default_min_free_bytes() -> u64 {
    MIN_FREE_BYTES
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fstab: default_fstab(),
            fs_type: default_fs_type(),
            write_direct: false,
            min_free_bytes: default_min_free_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriveConfig {
    #[serde(default = "default_device")]
    pub default_device: PathBuf,

    #[serde(default)]
    pub addressing: DriveAddressing,
}

fn default_device() -> PathBuf {
    PathBuf::from("/dev/sr0")
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            default_device: default_device(),
            addressing: DriveAddressing::default(),
        }
    }
}

/// Optional path overrides for external tools. Unset entries are looked up
/// in `PATH` by name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub makemkvcon_path: Option<PathBuf>,

    #[serde(default)]
    pub filebot_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub eject_path: Option<PathBuf>,

    #[serde(default)]
    pub mountpoint_path: Option<PathBuf>,
}

impl ToolsConfig {
    pub fn makemkvcon(&self) -> PathBuf {
        resolve(&self.makemkvcon_path, "makemkvcon")
    }

    pub fn filebot(&self) -> PathBuf {
        resolve(&self.filebot_path, "filebot")
    }

    pub fn ffprobe(&self) -> PathBuf {
        resolve(&self.ffprobe_path, "ffprobe")
    }

    pub fn eject(&self) -> PathBuf {
        resolve(&self.eject_path, "eject")
    }

    pub fn mountpoint(&self) -> PathBuf {
        resolve(&self.mountpoint_path, "mountpoint")
    }

    /// Program for a tool name as listed in `ripforge_av::KNOWN_TOOLS`.
    pub fn program_for(&self, name: &str) -> PathBuf {
        match name {
            "makemkvcon" => self.makemkvcon(),
            "filebot" => self.filebot(),
            "ffprobe" => self.ffprobe(),
            "eject" => self.eject(),
            "mountpoint" => self.mountpoint(),
            other => PathBuf::from(other),
        }
    }
}

fn resolve(custom: &Option<PathBuf>, name: &str) -> PathBuf {
    match custom {
        Some(p) if p.exists() => p.clone(),
        Some(p) => {
            tracing::warn!("Configured {} path {:?} does not exist, using PATH", name, p);
            PathBuf::from(name)
        }
        None => PathBuf::from(name),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovieConfig {
    /// FileBot database used for lookup and rename
    #[serde(default = "default_movie_db")]
    pub database: String,

    /// FileBot format for the movie name, also used for the rename
    #[serde(default = "default_movie_format")]
    pub name_format: String,

    /// Passed to makemkvcon as `--minlength`
    #[serde(default = "default_movie_min_length")]
    pub min_length_secs: u64,
}

fn default_movie_db() -> String {
    "TheMovieDB".to_string()
}

fn default_movie_format() -> String {
    "{n} ({y})".to_string()
}

fn default_movie_min_length() -> u64 {
    MIN_MOVIE_SECS
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            database: default_movie_db(),
            name_format: default_movie_format(),
            min_length_secs: default_movie_min_length(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TvConfig {
    /// FileBot database used to resolve the show directory
    #[serde(default = "default_movie_db")]
    pub database: String,

    /// FileBot format producing `Genre/Show (Year) {tmdb-id}`
    #[serde(default = "default_show_format")]
    pub show_format: String,

    /// FileBot database used to rename episodes
    #[serde(default = "default_tv_rename_db")]
    pub rename_database: String,

    /// Extraction floor and lower bound of the retention band
    #[serde(default = "default_episode_min")]
    pub min_length_secs: u64,

    /// Upper bound of the retention band; longer files are "play all" tracks
    #[serde(default = "default_episode_max")]
    pub max_episode_secs: u64,
}

fn default_show_format() -> String {
    "{genre.toCamelCase()}/{n} ({y}) {tmdb-$id}".to_string()
}

fn default_tv_rename_db() -> String {
    "TheTVDB".to_string()
}

fn default_episode_min() -> u64 {
    MIN_EPISODE_SECS
}

fn default_episode_max() -> u64 {
    MAX_EPISODE_SECS
}

impl Default for TvConfig {
    fn default() -> Self {
        Self {
            database: default_movie_db(),
            show_format: default_show_format(),
            rename_database: default_tv_rename_db(),
            min_length_secs: default_episode_min(),
            max_episode_secs: default_episode_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Config {
    /// Default configuration rooted at the given storage path
    pub fn with_storage(path: impl AsRef<Path>) -> Self {
        let mut config = Self::default();
        config.storage.path = path.as_ref().to_path_buf();
        config
    }
}
