mod anim;
mod app;
mod cash_in;
mod config;
mod engine;
mod error;
mod geometry;
mod input;
mod model;
mod pedometer;
mod reconcile;
mod registry;
mod screen;
mod storage;
mod wellbeing;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "pawpet")]
#[command(about = "Terminal virtual pet: feed it from your backpack, walk to earn paw points")]
pub(crate) struct Cli {
    /// Settings file (defaults to settings.json in the data directory)
    #[arg(long)]
    pub(crate) settings: Option<PathBuf>,

    /// Ignore the save file and start with a new pet
    #[arg(long, default_value_t = false)]
    pub(crate) fresh: bool,

    /// Turn on passive need decay for this run
    #[arg(long, default_value_t = false)]
    pub(crate) decay: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(cli).await
}
