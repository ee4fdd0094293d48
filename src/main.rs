use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use onous_core::{run, Settings};

/// Replays an operations CSV against the stored player state and prints the balance table.
#[derive(Debug, Parser)]
#[command(name = "onous-core", version)]
struct Cli {
    /// Operations file (`op,player,target,amount`)
    input: PathBuf,

    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long, env = "ONOUS_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_cli(Cli::parse()) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }
    run(&settings, &cli.input, std::io::stdout())
}
