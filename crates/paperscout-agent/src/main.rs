//! paperscout: search arXiv and PubMed, rank by relevance, summarize the
//! best hits and save them as JSON.

mod output;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use paperscout_common::PaperRecord;
use paperscout_config::Config;
use paperscout_ingestion::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "paperscout", version, about = "Search, rank and summarize research papers")]
struct Cli {
    /// Search query.
    #[arg(short, long, default_value = "artificial intelligence")]
    search: String,

    /// Maximum results per source (defaults to the configured value).
    #[arg(short, long)]
    max: Option<usize>,

    /// Directory for the JSON artifact (defaults to the configured value).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file. Falls back to $PAPERSCOUT_CONFIG, then ./paperscout.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("paperscout=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    info!("paperscout {}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let max = cli.max.unwrap_or(config.pipeline.max_results_per_source);
    let out_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from(&config.output.dir));

    let pipeline = Pipeline::from_config(&config)?;
    let sources: Vec<String> = pipeline.sources().map(|s| s.to_string()).collect();
    info!(query = %cli.search, max, sources = ?sources, "Searching");

    let report = pipeline.run_query_report(&cli.search, max).await;
    pipeline.shutdown();

    if report.timed_out {
        warn!("Query timed out before every source answered");
    } else if report.all_sources_failed() {
        warn!("Every source failed; results are empty because nothing could be fetched");
    }

    print_results(&report.papers);
    let path = output::write_results(&out_dir, &cli.search, &report.papers)?;
    println!("\nSaved {} papers to {}", report.papers.len(), path.display());
    Ok(())
}

fn print_results(papers: &[PaperRecord]) {
    if papers.is_empty() {
        println!("No papers found.");
        return;
    }
    for (i, paper) in papers.iter().enumerate() {
        println!("\n{}. {}", i + 1, paper.title());
        println!("   Authors: {}", paper.authors().join(", "));
        println!("   Source:  {}", paper.source());
        println!("   URL:     {}", paper.url());
        if let Some(score) = paper.relevance_score() {
            println!("   Score:   {score:.3}");
        }
        if let Some(summary) = paper.summary() {
            println!("   Summary: {summary}");
        }
    }
}
