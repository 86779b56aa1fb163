mod types;

pub use types::*;

use anyhow::{Context, Result};
use reelhouse_common::VolumeId;
use reelhouse_media::{Manager, MountPoint, ResourceMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./reelhouse.toml",
        "./config.toml",
        "~/.config/reelhouse/config.toml",
        "/etc/reelhouse/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.media.mode == ResourceMode::Buffered && config.media.buffer_size.as_u64() == 0 {
        anyhow::bail!("Buffer size must be greater than 0 in buffered mode");
    }
    if usize::try_from(config.media.buffer_size.as_u64()).is_err() {
        anyhow::bail!("Buffer size too large for this platform");
    }

    let mut mounted: HashMap<PathBuf, String> = HashMap::new();
    for (index, volume) in config.media.volumes.iter().enumerate() {
        let label = if volume.id.is_empty() {
            format!("#{}", index + 1)
        } else {
            volume.id.clone()
        };

        if volume.paths.is_empty() {
            anyhow::bail!("Volume '{}' must have at least one path", label);
        }

        for path in &volume.paths {
            let absolute = std::path::absolute(path)
                .with_context(|| format!("Failed to resolve path {:?}", path))?;
            if let Some(other) = mounted.insert(absolute, label.clone()) {
                anyhow::bail!(
                    "Path {:?} is mounted by more than one volume ('{}' and '{}')",
                    path,
                    other,
                    label
                );
            }
            if !path.is_dir() {
                tracing::warn!("Media path does not exist or is not a directory: {:?}", path);
            }
        }
    }

    Ok(())
}

/// Build a volume from bare paths, with a generated id.
pub fn volume_from_paths(paths: Vec<PathBuf>, max_io: usize) -> VolumeConfig {
    VolumeConfig {
        id: String::new(),
        max_io,
        paths,
    }
}

/// Expand configured volumes into mount points.
///
/// Empty ids are replaced by a generated one. A volume with several paths
/// becomes one mount point per path, suffixed `-1`, `-2`, ..., each with its
/// own limiter of the volume's size.
pub fn mount_points(media: &MediaConfig) -> Vec<MountPoint> {
    let mut mounts = Vec::new();

    for volume in &media.volumes {
        let id = if volume.id.is_empty() {
            VolumeId::generate()
        } else {
            VolumeId::new(volume.id.clone())
        };
        let max_io = volume.max_io.max(1);

        if let [path] = volume.paths.as_slice() {
            mounts.push(MountPoint::new(id, path.clone(), max_io));
            continue;
        }

        for (n, path) in volume.paths.iter().enumerate() {
            let mount_id = VolumeId::new(format!("{}-{}", id, n + 1));
            mounts.push(MountPoint::new(mount_id, path.clone(), max_io));
        }
    }

    mounts
}

/// Build the media manager described by `media`.
pub fn build_manager(media: &MediaConfig) -> Result<Manager> {
    let buffer_size = usize::try_from(media.buffer_size.as_u64())
        .context("Buffer size too large for this platform")?;

    let manager = Manager::new(media.mode, buffer_size, mount_points(media))
        .context("Failed to set up media volumes")?
        .with_rescan_interval(Duration::from_secs(media.rescan_interval_secs.max(1)));

    for mount in manager.mounts() {
        tracing::info!(
            volume = %mount.id(),
            root = %mount.root().display(),
            max_io = mount.limiter().capacity(),
            "Mounted volume"
        );
    }

    Ok(manager)
}
