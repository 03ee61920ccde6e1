use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use sigcon_models::config::SigconConfig;
use sigcon_models::trade_signal::TradeSignal;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sigcon", about = "Run a trade signal through the consensus panel")]
struct Cli {
    /// Path to configuration file. Defaults are used when it does not exist.
    #[arg(short, long, default_value = "config/sigcon.toml")]
    config: String,

    /// Read TradeSignal JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config: SigconConfig = if std::path::Path::new(&cli.config).exists() {
        let config_str = std::fs::read_to_string(&cli.config)
            .with_context(|| format!("Failed to read config: {}", cli.config))?;
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?
    } else {
        tracing::warn!(path = %cli.config, "Config file not found, using defaults");
        SigconConfig::default()
    };

    let signal_json = if let Some(input_path) = &cli.input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    let signal: TradeSignal =
        serde_json::from_str(&signal_json).context("Failed to parse TradeSignal JSON")?;

    let orchestrator =
        sigcon::build_orchestrator(&config).context("Failed to build orchestrator")?;
    let enriched = sigcon::evaluate(&orchestrator, signal).await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&enriched)?
    } else {
        serde_json::to_string(&enriched)?
    };
    println!("{output}");

    Ok(())
}
