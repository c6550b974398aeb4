//! roled - Activity role reconciliation daemon
//!
//! Watches member activity across chat communities and keeps activity
//! roles in line with each community's policy.

use clap::Parser;
use roled_daemon::{DaemonConfig, Runtime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// roled daemon CLI
#[derive(Parser)]
#[command(name = "roled")]
#[command(about = "Activity role reconciliation daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ROLED_CONFIG")]
    config: Option<String>,

    /// Policy storage directory
    #[arg(short, long, env = "ROLED_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Background sweep interval in seconds
    #[arg(long, env = "ROLED_INTERVAL")]
    interval: Option<u64>,

    /// Log level
    #[arg(long, env = "ROLED_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "ROLED_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(interval) = cli.interval {
        config.scheduler.background_interval_secs = interval;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Print startup banner
    println!(
        r#"
            _          _
  _ __ ___ | | ___  __| |
 | '__/ _ \| |/ _ \/ _` |
 | | | (_) | |  __/ (_| |
 |_|  \___/|_|\___|\__,_|

  Activity role reconciliation daemon
  Version: {}
  Data directory: {}
  Sweep interval: {}s
"#,
        env!("CARGO_PKG_VERSION"),
        config.data_dir.display(),
        config.scheduler.background_interval_secs
    );

    let runtime = Runtime::new(config)?;
    runtime.run().await?;

    Ok(())
}
