//! Library of Babel server
//!
//! Settings come from an optional TOML file; `--bind` and `--debug` override it. The live
//! settings file (admins, bans, mutes, tunables) is watched and re-read whenever it changes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use babel_library::config::{ConfigWatcher, LiveConfig, ServerConfig};
use babel_library::network::{LibraryServer, ServerContext};
use clap::Parser;
use log::{info, warn};

/// Explorable library holding every possible page
#[derive(Parser, Debug)]
#[command(name = "babel-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server configuration (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Live settings (JSON), overriding the configuration
    #[arg(long, value_name = "PATH")]
    live_config: Option<PathBuf>,

    /// Log every inbound packet
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load server configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.bind_address = bind.clone();
    }
    if let Some(path) = &args.live_config {
        config.live_config_path = Some(path.clone());
    }
    config.debug |= args.debug;
    Ok(config)
}

fn load_live_config(config: &ServerConfig) -> LiveConfig {
    let Some(path) = &config.live_config_path else {
        return LiveConfig::default();
    };
    match LiveConfig::load(path) {
        Ok(live) => live,
        Err(e) => {
            warn!("Using default live settings: {}", e);
            LiveConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = load_config(&args)?;
    let live = load_live_config(&config);

    let watcher = match &config.live_config_path {
        Some(path) => match ConfigWatcher::watch(path) {
            Ok(watcher) => {
                info!("Watching {} for live setting changes", path.display());
                Some(watcher)
            }
            Err(e) => {
                warn!("Live settings will not be reloaded: {}", e);
                None
            }
        },
        None => None,
    };

    let context = ServerContext::new(config, live).context("Invalid library configuration")?;
    let server = LibraryServer::bind(context)
        .await
        .context("Failed to bind the listening socket")?;

    server.run(watcher).await.context("Server stopped")?;
    Ok(())
}
