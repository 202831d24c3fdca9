//! ProxyHarvest CLI — collect proxy lists from public sources.
//!
//! Fetches every source listed for a category, keeps the lines that look
//! like `ip:port`, and writes one sorted, duplicate-free list per category.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
