mod cli;

use reelhouse::{
    config::{self, Config},
    server::{self, AppContext},
};
use reelhouse_media::Manager;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting Reelhouse server");
    tracing::info!(
        mode = %config.media.mode,
        buffer_size = %config.media.buffer_size,
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let manager = Arc::new(config::build_manager(&config.media)?);
    let ctx = AppContext::new(manager, config);

    server::start_server(ctx).await
}

/// Fold `serve` flags into the loaded config.
///
/// `--mount` replaces the configured volumes; positional paths are added as
/// one more volume. With neither, and nothing configured, the current
/// directory is served.
#[allow(clippy::too_many_arguments)]
fn apply_serve_args(
    config: &mut Config,
    paths: Vec<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    mode: Option<reelhouse_media::ResourceMode>,
    buffer_size: Option<config::ByteSize>,
    max_io: Option<usize>,
    mounts: Vec<config::MountArg>,
) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(mode) = mode {
        config.media.mode = mode;
    }
    if let Some(size) = buffer_size {
        config.media.buffer_size = size;
    }
    if let Some(max_io) = max_io {
        config.media.max_io = max_io;
    }

    if !mounts.is_empty() {
        config.media.volumes = mounts.into_iter().map(|m| m.0).collect();
    }
    add_path_volume(config, paths);
}

fn add_path_volume(config: &mut Config, mut paths: Vec<PathBuf>) {
    if paths.is_empty() && config.media.volumes.is_empty() {
        paths.push(PathBuf::from("."));
    }
    if !paths.is_empty() {
        let max_io = config.media.max_io;
        config
            .media
            .volumes
            .push(config::volume_from_paths(paths, max_io));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelhouse=trace,reelhouse_media=trace,reelhouse_common=debug,tower_http=debug"
                .to_string()
        } else {
            "reelhouse=info,reelhouse_media=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    match cli.command {
        Commands::Serve {
            paths,
            host,
            port,
            mode,
            buffer_size,
            max_io,
            mounts,
        } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            apply_serve_args(
                &mut config, paths, host, port, mode, buffer_size, max_io, mounts,
            );
            config::validate_config(&config)?;

            let rt = tokio::runtime::Runtime::new()?;
            let result = rt.block_on(start_server(config));
            rt.shutdown_timeout(Duration::from_secs(1));
            result
        }
        Commands::Scan { paths, json } => scan(cli.config.as_deref(), paths, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate(path.as_deref())
        }
        Commands::Version => {
            println!("reelhouse {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn scan(config_path: Option<&Path>, paths: Vec<PathBuf>, json: bool) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if !paths.is_empty() {
        config.media.volumes.clear();
    }
    add_path_volume(&mut config, paths);
    config::validate_config(&config)?;

    let manager: Manager = config::build_manager(&config.media)?;
    manager.scan_all();
    let files = manager.list_files();

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    println!("{:<38} {:<20} {:>12}  NAME", "ID", "CATEGORY", "SIZE");
    for file in &files {
        println!(
            "{:<38} {:<20} {:>12}  {}",
            file.id, file.category, file.size, file.name
        );
    }
    println!(
        "\n{} files across {} mounts",
        files.len(),
        manager.mounts().count()
    );
    Ok(())
}

fn validate(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    config::validate_config(&config)?;

    println!("Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Media: mode {}, buffer {}, rescan every {}s",
        config.media.mode, config.media.buffer_size, config.media.rescan_interval_secs
    );
    for volume in &config.media.volumes {
        let id = if volume.id.is_empty() {
            "<generated>"
        } else {
            volume.id.as_str()
        };
        println!(
            "  Volume {}: max_io {}, {} path(s)",
            id,
            volume.max_io,
            volume.paths.len()
        );
    }

    Ok(())
}
