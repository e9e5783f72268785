mod args;
mod clean;
mod client;
mod collector;
mod flatten;
mod input;
mod rate;
mod riot;
mod store;

use std::time::Duration;

use anyhow::bail;
use args::{Args, Command};
use clap::Parser;
use client::Client;
use collector::Collector;
use store::RawStore;

async fn extract(args: &Args) -> anyhow::Result<()> {
    let client = Client::new(
        args.api_key()?,
        &args.region,
        args.proxy.as_deref(),
        Duration::from_secs(args.max_rate_limit_wait),
    )?;
    let range = args.time_range()?;
    let store = RawStore::open(&args.raw_dir)?;
    let players = input::load_players(&args.players)?;

    let summary = Collector::new(&client, &store, range, &args.queues)?
        .run(&players)
        .await?;

    log::info!(
        "extraction complete: {} players, {} new matches, {} already stored, {} listing calls",
        summary.players_done,
        summary.saved,
        summary.skipped,
        summary.list_calls
    );
    for player in &summary.players_missing {
        log::warn!("not found: {}", player);
    }
    if !summary.is_clean() {
        for failed in &summary.failed {
            log::error!(
                "incomplete: {} queue {:?}: {}",
                failed.player,
                failed.queue,
                failed.reason
            );
        }
        bail!("{} player/queue pairs failed", summary.failed.len());
    }
    Ok(())
}

fn transform(args: &Args) -> anyhow::Result<()> {
    let store = RawStore::open(&args.raw_dir)?;
    let rows = flatten::flatten_store(&store)?;
    flatten::write_rows(&args.processed, &rows)
}

fn clean(args: &Args) -> anyhow::Result<()> {
    let rows = flatten::read_rows(&args.processed)?;
    let cleaned = clean::clean_rows(rows, &args.queues);
    clean::write_clean(&args.clean_output, &cleaned)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env has to be loaded before clap reads the environment
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Command::Extract => extract(&args).await,
        Command::Transform => transform(&args),
        Command::Clean => clean(&args),
        Command::Run => {
            extract(&args).await?;
            transform(&args)?;
            clean(&args)
        }
    }
}
