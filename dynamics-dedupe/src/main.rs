use clap::Parser;
use log::debug;

mod api;
mod cli;
mod config;
mod services;
mod workflow;

use cli::Cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "warn,dynamics_dedupe=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    debug!("Starting dynamics-dedupe {}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = cli::run(cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
