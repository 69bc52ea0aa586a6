use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use kolibri_search_provider::{
    config::Config,
    core::ProviderResult,
    logging::init_logger,
    service::{cancel_on_signal, dbus, launcher::CommandLauncher},
};

/// GNOME Shell search provider for Kolibri content
#[derive(Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    conf: Option<String>,
}

#[tokio::main]
async fn main() -> ProviderResult<()> {
    // Read command-line arguments
    let opt = Opt::parse();

    // Load configuration with optional override
    let config = Config::load_with_opt_override(opt.conf.as_deref())?;

    // Initialize logging
    init_logger(&config.log);

    let launcher = Arc::new(CommandLauncher::new(&config.launcher));
    let shutdown = CancellationToken::new();

    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    log::info!("Starting search provider...");
    dbus::run(&config, launcher, shutdown).await
}
