#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use structopt::StructOpt;

use engine::html::ReqwestFetcher;
use engine::{json, Crawler, FileBuilder, SearchBuilder, SharedIndex};

#[derive(Debug, StructOpt)]
#[structopt(name = "sift", about = "A multi-threaded text search engine.")]
struct Settings {
    /// Build the index from every .txt/.text file under this directory.
    #[structopt(long)]
    path: Option<PathBuf>,

    /// Build the index by crawling from this seed URL (implies multi-threaded).
    #[structopt(long)]
    url: Option<String>,

    /// Worker thread count for building/searching/crawling. Invalid or < 1 defaults to 5.
    #[structopt(long)]
    threads: Option<i64>,

    /// Crawl budget (number of pages beyond the seed). Invalid or < 1 defaults to 50.
    #[structopt(long)]
    limit: Option<i64>,

    /// Maximum HTTP redirects to follow per fetch.
    #[structopt(long, default_value = "5")]
    max_redirects: usize,

    /// Write the built index as JSON.
    #[structopt(long)]
    write_index: bool,

    /// Output path for --write-index.
    #[structopt(long, default_value = "index.json")]
    index_path: PathBuf,

    /// Write per-location token counts as JSON.
    #[structopt(long)]
    write_counts: bool,

    /// Output path for --write-counts.
    #[structopt(long, default_value = "counts.json")]
    counts_path: PathBuf,

    /// Run queries (one per line) from this file against the built index.
    #[structopt(long)]
    query: Option<PathBuf>,

    /// Use exact-match search instead of the default prefix ("partial") search.
    #[structopt(long)]
    exact: bool,

    /// Output path for query results (written whenever --query is given).
    #[structopt(long, default_value = "results.json")]
    results_path: PathBuf,

    /// The log level filter.
    #[structopt(long, default_value = "info", env)]
    log_level: LevelFilter,

    /// Use ANSI colours for log levels.
    #[structopt(long, env)]
    pretty_logs: Option<bool>,

    /// An optional file to send persistent logs to, in addition to stdout.
    #[structopt(long, env)]
    log_file: Option<String>,
}

fn resolve_count(raw: Option<i64>, default: usize) -> usize {
    match raw {
        Some(n) if n >= 1 => n as usize,
        _ => default,
    }
}

fn setup_logger(level: LevelFilter, log_file: &Option<String>, pretty: bool) -> Result<()> {
    let mut colours = ColoredLevelConfig::new();

    if pretty {
        colours = colours
            .info(Color::Green)
            .warn(Color::Yellow)
            .error(Color::BrightRed)
            .debug(Color::Magenta)
            .trace(Color::Cyan);
    }

    let mut builder = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} | {} | {:<5} - {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                colours.color(record.level()),
                message,
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(file) = log_file {
        builder = builder.chain(fern::log_file(file)?);
    }

    builder.apply()?;
    Ok(())
}

fn main() {
    let settings = Settings::from_args();

    if let Err(e) = setup_logger(
        settings.log_level,
        &settings.log_file,
        settings.pretty_logs.unwrap_or(true),
    ) {
        eprintln!("error during logger setup: {:?}", e);
        return;
    }

    run(settings);
}

/// Drives the build/crawl/search pipeline. Every unit failure is logged
/// and skipped rather than aborting the whole run (spec §7's best-effort
/// propagation policy); the process always exits 0.
fn run(settings: Settings) {
    let threads = resolve_count(settings.threads, 5);
    let limit = resolve_count(settings.limit, 50) as u32;

    let index = Arc::new(SharedIndex::new());

    match (&settings.path, &settings.url) {
        (Some(path), _) => {
            info!("building index from {:?} with {} threads", path, threads);
            FileBuilder::new(threads).build(path, &index);
        }
        (None, Some(url)) => {
            info!("crawling from {} with limit {}", url, limit);
            let fetcher = Arc::new(ReqwestFetcher);
            Crawler::new(fetcher, threads).run(url, settings.max_redirects, limit, &index);
        }
        (None, None) => {
            error!("no input source given: pass --path or --url");
        }
    }

    let snapshot = index.snapshot();

    if settings.write_index {
        if let Err(e) = json::write_index(&snapshot, &settings.index_path) {
            error!("failed to write index to {:?}: {}", settings.index_path, e);
        }
    }

    if settings.write_counts {
        if let Err(e) = json::write_counts(&snapshot.counts(), &settings.counts_path) {
            error!("failed to write counts to {:?}: {}", settings.counts_path, e);
        }
    }

    if let Some(query_path) = &settings.query {
        info!("running queries from {:?}", query_path);
        let results = SearchBuilder::new(threads, settings.exact).run_queries(query_path, &index);
        if let Err(e) = json::write_results(&results, &settings.results_path) {
            error!(
                "failed to write results to {:?}: {}",
                settings.results_path, e
            );
        }
    }
}
