//! docgrab CLI - crawl a documentation site and save pages to disk

use clap::{Parser, Subcommand};
use docgrab::{
    ClientConfig, CrawlConfig, CrawlResult, Error, ExtractConfig, ExtractResult, ExtractorClient,
    PageFormat, DEFAULT_OUTPUT_DIR,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// docgrab - documentation crawling via a hosted extraction service
#[derive(Parser, Debug)]
#[command(name = "docgrab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a documentation site and persist each page
    Crawl {
        /// Root URL to crawl
        url: String,

        /// Maximum number of pages
        #[arg(long, default_value_t = 100)]
        limit: u32,

        /// Link-following depth from the root URL
        #[arg(long, default_value_t = 1)]
        max_depth: u32,

        /// Render wait per page, in milliseconds
        #[arg(long, default_value_t = 1000)]
        wait_for: u64,

        /// Content format to request (repeatable)
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<PageFormat>,

        /// Keep navigation and boilerplate instead of stripping it
        #[arg(long)]
        no_main_content: bool,

        /// Output directory for saved pages
        #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// API key (falls back to FIRECRAWL_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Run a schema-driven extract job and persist each document
    Extract {
        /// Root URL; everything under it is extracted
        url: String,

        /// Custom extraction instructions for the service
        #[arg(long)]
        prompt: Option<String>,

        /// Output directory for saved documents
        #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// API key (falls back to FIRECRAWL_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
}

/// Counters for one crawl or extract run
#[derive(Debug, Default)]
struct RunStats {
    saved: u32,
    failed: u32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Crawl {
            url,
            limit,
            max_depth,
            wait_for,
            formats,
            no_main_content,
            output,
            api_key,
        } => {
            let config = CrawlConfig::new()
                .limit(limit)
                .max_depth(max_depth)
                .wait_for_ms(wait_for)
                .only_main_content(!no_main_content)
                .formats(if formats.is_empty() {
                    vec![PageFormat::Markdown]
                } else {
                    formats
                });
            run_crawl(&url, config, &output, api_key).await
        }
        Commands::Extract {
            url,
            prompt,
            output,
            api_key,
        } => {
            let mut config = ExtractConfig::new();
            if let Some(prompt) = prompt {
                config = config.prompt(prompt);
            }
            run_extract(&url, config, &output, api_key).await
        }
    };

    match outcome {
        Ok(stats) if stats.failed > 0 => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}

fn build_client(api_key: Option<String>) -> Result<ExtractorClient, Error> {
    let client_config = match api_key {
        Some(key) => ClientConfig::new(key),
        None => ClientConfig::from_env()?,
    };
    ExtractorClient::new(client_config)
}

async fn run_crawl(
    url: &str,
    config: CrawlConfig,
    output: &Path,
    api_key: Option<String>,
) -> Result<RunStats, Error> {
    let client = build_client(api_key)?;
    let mut stream = client.crawl(url, config).await?;
    let mut stats = RunStats::default();

    while let Some(result) = stream.next().await {
        match result? {
            CrawlResult::Completed(page) => {
                persist_outcome(docgrab::save_page(&page, output), &mut stats);
            }
            CrawlResult::InProgress {
                total, completed, ..
            } => {
                info!(completed, total, "Crawl in progress");
            }
            CrawlResult::PageError { url, reason } => {
                stats.failed += 1;
                eprintln!(
                    "page failed: {} ({reason})",
                    url.as_deref().unwrap_or("<unknown url>")
                );
            }
        }
    }

    info!(
        pages = stream.completed_count(),
        saved = stats.saved,
        failed = stats.failed,
        "Crawl finished"
    );
    Ok(stats)
}

async fn run_extract(
    url: &str,
    config: ExtractConfig,
    output: &Path,
    api_key: Option<String>,
) -> Result<RunStats, Error> {
    let client = build_client(api_key)?;
    let mut stream = client.extract(url, config).await?;
    let mut stats = RunStats::default();

    while let Some(result) = stream.next().await {
        match result? {
            ExtractResult::Completed(doc) => {
                persist_outcome(docgrab::save_document(&doc, output), &mut stats);
            }
            ExtractResult::InProgress { status } => {
                info!(status = %status, "Extract in progress");
            }
            ExtractResult::Failed { reason } => {
                stats.failed += 1;
                eprintln!("extract job failed: {reason}");
            }
        }
    }

    info!(
        saved = stats.saved,
        failed = stats.failed,
        "Extract finished"
    );
    Ok(stats)
}

/// Fold one save attempt into the run counters
///
/// A write failure is scoped to its page: it is reported and counted, and
/// the rest of the run keeps persisting.
fn persist_outcome(result: Result<PathBuf, Error>, stats: &mut RunStats) {
    match result {
        Ok(path) => {
            stats.saved += 1;
            println!("{}", path.display());
        }
        Err(e) => {
            stats.failed += 1;
            eprintln!("write failed: {e}");
        }
    }
}
