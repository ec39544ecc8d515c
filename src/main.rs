//! # Lumen - Wayland client runtime
//!
//! Connects to the compositor named by the environment, creates an
//! xdg-toplevel surface, and animates a shared-memory checkerboard while
//! reporting coalesced input frames. Exits 0 on clean shutdown, 1 on any
//! bootstrap failure.

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use lumen::{LumenClient, LumenConfig};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "A shared-memory Wayland client with frame-paced rendering and atomic input frames")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/lumen/lumen.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the toplevel title
    #[arg(short, long)]
    title: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting Lumen - Wayland client runtime");
    info!("📄 Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match LumenConfig::load(&cli.config) {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            warn!("⚠️ Failed to load configuration: {e:#}");
            info!("📝 Using default configuration");
            LumenConfig::default()
        }
    };

    // Override config with CLI flags
    if let Some(title) = cli.title {
        config.window.title = title;
    }

    let client = LumenClient::connect(config)?;
    client.run()?;

    info!("👋 Lumen shutting down");
    Ok(())
}
