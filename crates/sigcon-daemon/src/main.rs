use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sigcon_daemon::config::DaemonConfig;
use sigcon_daemon::daemon::Daemon;

#[derive(Parser, Debug)]
#[command(
    name = "sigcon-daemon",
    about = "Signal daemon - polls feeds, runs the director/kernel hierarchy and the persona tournament"
)]
struct Cli {
    /// Path to daemon configuration file
    #[arg(short, long, default_value = "config/sigcon.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: DaemonConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse daemon config")?;

    let repository = sigcon::open_repository(&config.core.store)?;

    let daemon = Daemon::new(config, repository).context("Failed to start daemon")?;
    let cancel = daemon.cancel_token();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    daemon
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Daemon error: {e}"))?;

    Ok(())
}
