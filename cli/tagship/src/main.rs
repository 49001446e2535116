//! tagship - create or update a GitHub release and upload its assets.
//!
//! Intended to run as a CI step on tag pushes. See `tagship --help`.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tagship::config::{Cli, LogFormat};
use tagship::{error, runner};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let result = async {
        let (config, settings) = cli.inputs.into_config()?;
        runner::run(&config, &settings).await
    }
    .await;

    if let Err(e) = result {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

/// Log to stderr so stdout stays free for step outputs.
fn init_tracing(format: LogFormat) {
    let (text, json) = match format {
        LogFormat::Text => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(text)
        .with(json)
        .init();
}
