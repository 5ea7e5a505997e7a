use anyhow::{Context, Result};
use clap::Parser;
use happyappe::config::{Config, Overrides};
use happyappe::sync::{self, HttpClient};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sync posts from a Substack publication into the site's article document
#[derive(Parser, Debug)]
#[command(name = "sync-substack")]
#[command(version)]
struct Args {
    /// RSS feed to read
    #[arg(long, env = "SUBSTACK_FEED_URL")]
    feed_url: Option<String>,

    /// Where to write the article document
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Don't fetch post pages for items the feed only excerpts
    #[arg(long, default_value_t = false)]
    no_backfill: bool,

    /// Directory to start looking for `site.yaml` from
    #[arg(short = 'C', long, default_value = ".")]
    directory: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = Config::from_directory(
        &args.directory,
        Overrides {
            feed_url: args.feed_url,
            output: args.output,
            no_backfill: args.no_backfill,
        },
    )
    .context("Loading configuration")?;
    tracing::debug!(?config, "resolved configuration");

    let http = HttpClient::new(&config.user_agent).context("Building HTTP client")?;
    let summary = sync::run(&config, &http).context("Sync failed")?;
    println!(
        "Wrote {} articles to {}",
        summary.articles,
        summary.output.display()
    );
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = run(Args::parse()) {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}
