//! ragstore CLI
//!
//! Configuration comes from `config.toml`, `config.<RUST_ENV>.toml` and
//! `RAGSTORE_*` variables; results are printed as JSON on stdout.
use anyhow::Result;
use clap::Parser;

use ragstore_core::config::Settings;

mod commands;
mod logging;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(uri) = cli.store {
        settings.store.uri = uri;
    }
    let _guard = logging::init_tracing(&settings.logging)?;
    commands::run(cli.command, settings).await
}
