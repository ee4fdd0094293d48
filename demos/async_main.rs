use std::env;
use std::error::Error;
use std::process;

use onous_core::{run_async, Settings};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_app().await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run_app() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        return Err("Usage: cargo run --example async_main -- operations.csv".into());
    }

    let settings = Settings::load(None)?;
    run_async(&settings, &args[1], std::io::stdout()).await
}
