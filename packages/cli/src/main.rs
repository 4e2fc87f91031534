mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pagekit::{Framework, FrameworkConfig};

use crate::cli::Cli;
use crate::error::CliError;

fn load_config(cli: &Cli) -> Result<FrameworkConfig, CliError> {
    let path = cli.config_path()?;
    // An explicitly named file has to exist.
    let mut config = if path.exists() || cli.config.is_some() {
        FrameworkConfig::load(&path)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        FrameworkConfig::default()
    };

    if let Some(dir) = &cli.data_dir {
        config.storage_dir = Some(dir.clone());
    } else if config.storage_dir.is_none() {
        config.storage_dir = Some(Cli::default_data_dir()?);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let fw = Framework::new(config)?;

    let mut stdout = std::io::stdout().lock();
    let result = commands::run(cli.command, &fw, &mut stdout).await;

    // Persist directory changes before the runtime goes away.
    if let Err(error) = fw.file_cache().flush().await {
        tracing::warn!(%error, "could not flush cache directory");
    }
    result
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
