//! repodocs CLI: generate a Docusaurus documentation site from a local
//! repository.
//!
//! Pages are extracted from the repository's own files and git history,
//! optionally rewritten by an AI model, and sanitized for MDX.

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
