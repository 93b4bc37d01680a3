use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use log::{info, warn};
use maintenance_scraping::{
    config::Config,
    job::{run, RunContext, RunSummary},
    session::{BrowserSession, SavedPages},
    site::Run,
};
use maintenance_scraping_utils::fs_toml_util::read_toml_or_default;

#[derive(Parser)]
struct Opts {
    #[arg(value_enum)]
    run: Run,
    #[arg(long, default_value = "maintenance-scraping.toml")]
    config: PathBuf,
    #[arg(long)]
    output_root: Option<PathBuf>,
    /// Read `<site>.html` files from this directory instead of starting a browser.
    #[arg(long)]
    saved_pages: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let opts = Opts::parse();
    let mut config: Config = read_toml_or_default(&opts.config)?;
    if let Some(output_root) = opts.output_root {
        config.output_root = output_root;
    }
    let ctx = RunContext::new(opts.run, config, Local::now().naive_local());
    info!("Starting {} run", ctx.run());

    let summary = match opts.saved_pages {
        Some(dir) => run(&ctx, SavedPages::new(dir)),
        None => run(&ctx, BrowserSession::launch(&ctx.config().session)?),
    }
    .with_context(|| format!("While running {}", ctx.run()))?;

    report(&summary);
    Ok(())
}

fn report(summary: &RunSummary) {
    for (site, written) in &summary.written {
        info!("{site}: {written} rows");
    }
    for (site, e) in &summary.failed {
        warn!("{site}: failed ({e})");
    }
    if let Some(table) = &summary.table {
        for record in table {
            println!("{}", record.fields().iter().join("\t"));
        }
    }
}
