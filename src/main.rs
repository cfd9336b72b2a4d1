//! Options Data Gate
//!
//! Command-line entry point. Results are printed to stdout as JSON; logs go
//! to stderr.

use options_data_gate::cli::Cli;
use options_data_gate::commands::{self, CommandOutput};
use options_data_gate::config::Config;
use options_data_gate::error::GateError;
use options_data_gate::state::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse_args();

    let output = match load_config(&cli) {
        Ok(config) => {
            info!("Loaded configuration from {}", cli.config.display());
            let state = AppState::from_config(config);
            commands::execute(&state, &cli.command).await
        }
        Err(e) => CommandOutput::failure(&e),
    };

    println!("{}", serde_json::to_string_pretty(&output.body)?);
    std::process::exit(output.exit_code);
}

fn load_config(cli: &Cli) -> Result<Config, GateError> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(seconds) = cli.timeout {
        config.set_timeouts(seconds);
        config.validate()?;
    }
    Ok(config)
}
