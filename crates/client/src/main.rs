mod config;
mod fetch;
mod follow;
mod push;
mod sessions;

use std::io;

use anyhow::Result;
use clap::Parser;
use finishcam_core::SessionLocation;

use crate::config::{Cli, ClientConfig, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref(), &cli.overrides)?;
    log::debug!("configuration: {config:?}");

    match cli.command {
        Command::Follow { url } => follow::follow(&config, SessionLocation::parse(&url)?).await,
        Command::Sessions { url, embedded } => {
            let mut out = io::stdout();
            sessions::list_sessions(&config, &url, embedded.as_deref(), &mut out).await
        }
    }
}
