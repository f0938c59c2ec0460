pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod invoice;
pub mod remote;
pub mod render;
pub mod select;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod task;
pub mod ui_state;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting trellis CLI");

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        cli.overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );
    debug!(files = ?cfg.loaded_files, "configuration loaded");

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let mut renderer = render::Renderer::new(&cfg)?;

    commands::dispatch(&cfg, &mut renderer, &data_dir, cli.command)?;

    info!("done");
    Ok(())
}
