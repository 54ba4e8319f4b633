mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./rip.toml",
        "./ripforge.toml",
        "~/.config/rip/config.toml",
        "/etc/rip/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Expand `~` in user-supplied paths
fn expand_paths(config: &mut Config) {
    let storage = config.storage.path.to_string_lossy().to_string();
    config.storage.path = shellexpand::tilde(&storage).into_owned().into();

    if let Some(dir) = config.server.static_dir.take() {
        let dir = dir.to_string_lossy().to_string();
        config.server.static_dir = Some(shellexpand::tilde(&dir).into_owned().into());
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.storage.path.as_os_str().is_empty() {
        anyhow::bail!("storage.path cannot be empty");
    }

    if config.tv.min_length_secs > config.tv.max_episode_secs {
        anyhow::bail!(
            "tv.min_length_secs ({}) is greater than tv.max_episode_secs ({})",
            config.tv.min_length_secs,
            config.tv.max_episode_secs
        );
    }

    if config.storage.pool.enabled && config.storage.pool.fs_type.trim().is_empty() {
        anyhow::bail!("storage.pool.fs_type cannot be empty when the pool is enabled");
    }

    if !config.storage.path.exists() {
        tracing::warn!("Storage path does not exist: {:?}", config.storage.path);
    }

    Ok(())
}
