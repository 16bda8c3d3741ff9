mod config_commands;
mod relay_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    slackbase_config::SlackbaseConfig,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "slackbase", about = "Slackbase: relay Slack channels into a Keybase team")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the default locations.
    #[arg(long, global = true, env = "SLACKBASE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay (default when no subcommand is provided).
    Run,
    /// Reconcile channel history once and exit.
    Sync,
    /// List the channels the Keybase team exposes.
    Channels,
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit config file, or fall back to discovery.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SlackbaseConfig> {
    let config = match path {
        Some(path) => slackbase_config::load_config(path)?,
        None => slackbase_config::discover_and_load(),
    };

    match config.display.tz() {
        Some(tz) => slackbase_common::time::set_display_timezone(tz),
        None => warn!(
            timezone = %config.display.timezone,
            "unknown display timezone, keeping UTC"
        ),
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    // Slack HTTPS and the Socket Mode WebSocket share this provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!(version = env!("CARGO_PKG_VERSION"), "slackbase starting");

    match cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(cli.config.as_ref())?;
            relay_commands::run(&config).await
        },
        Some(Commands::Sync) => {
            let config = load_config(cli.config.as_ref())?;
            relay_commands::sync(&config).await
        },
        Some(Commands::Channels) => {
            let config = load_config(cli.config.as_ref())?;
            relay_commands::channels(&config).await
        },
        Some(Commands::Check { verbose }) => config_commands::check(cli.config.as_deref(), verbose),
    }
}
