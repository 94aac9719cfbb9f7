//! calmerge CLI: merge every iCal feed linked from a club page into one calendar.
//!
//! Discovers calendar-feed links on a web page, downloads the feeds, and
//! writes a single deduplicated `.ics` file.

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
