//! Fellowship Cache - offline chapter downloader
//!
//! Downloads Bible chapters into the persistent cache so they can be read
//! offline.
//!
//! Usage: `fellowship_cache <book> <chapter>[-<last>] [version]`

use std::ops::RangeInclusive;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fellowship_cache::{Config, Services};

/// Entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Wire services and open the persistent cache
/// 4. Print a single chapter, or download a range for offline use
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fellowship_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: db_path={}, api={}, version={}",
        config.db_path.display(),
        config.bible_api_base_url,
        config.default_bible_version
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (book, chapters, version) = match args.as_slice() {
        [book, range] => (book.clone(), parse_range(range)?, config.default_bible_version.clone()),
        [book, range, version] => (book.clone(), parse_range(range)?, version.clone()),
        _ => bail!("usage: fellowship_cache <book> <chapter>[-<last>] [version]"),
    };

    let services = Services::from_config(&config)?;
    if let Err(err) = services.store.initialize().await {
        warn!("{}; chapters will be fetched but not kept", err);
    }

    if chapters.start() == chapters.end() {
        let chapter = services
            .bible
            .get_chapter(&book, *chapters.start(), &version)
            .await?;
        for verse in &chapter.verses {
            println!("{}:{} {}", chapter.chapter, verse.verse, verse.text);
        }
        return Ok(());
    }

    let total = chapters.clone().count();
    let fetched = services
        .bible
        .prefetch_chapters(&book, chapters, &version)
        .await?;
    info!(
        "{} {}: {} downloaded, {} already cached",
        book,
        version,
        fetched,
        total - fetched
    );

    Ok(())
}

/// Parses `N` or `N-M` into an inclusive chapter range.
fn parse_range(raw: &str) -> anyhow::Result<RangeInclusive<u32>> {
    let (start, end) = match raw.split_once('-') {
        Some((start, end)) => (start, end),
        None => (raw, raw),
    };
    let start: u32 = start.trim().parse().with_context(|| format!("bad chapter '{start}'"))?;
    let end: u32 = end.trim().parse().with_context(|| format!("bad chapter '{end}'"))?;
    if start == 0 || end < start {
        bail!("invalid chapter range '{raw}'");
    }
    Ok(start..=end)
}
