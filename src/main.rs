use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use tracing::info;

use r_harbor::{
    config::Config,
    engine::DockerClient,
    logging::init_tracing,
    server::{AppState, ImageServer},
};

/// Docker image browser and pull-task server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overrides the config file
    #[arg(long)]
    address: Option<String>,

    /// Port to bind, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let engine = DockerClient::connect(&config.docker)?;
    let state = AppState::new(Arc::new(engine), config.search.limit);

    info!(
        "Starting r_harbor at {}:{}",
        config.server.address, config.server.port
    );
    ImageServer::new(state, &config.server.address, config.server.port)
        .start_server()
        .await?;

    Ok(())
}
