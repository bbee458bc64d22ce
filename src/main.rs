#![allow(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use listing_harvester_lib::infrastructure::{AppConfig, init_logging, log_system_info};
use listing_harvester_lib::run_harvest;

/// Harvest apartment listings into CSV/JSON datasets
#[derive(Parser, Debug)]
#[command(name = "listing-harvester", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of listing pages to walk
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum number of items to collect
    #[arg(long)]
    max_items: Option<usize>,

    /// Directory the datasets are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only collect item URLs, skip item pages
    #[arg(long)]
    no_deep_scrape: bool,

    /// Skip the full JSON dataset
    #[arg(long)]
    no_json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(max_pages) = self.max_pages {
            config.crawling.max_pages = max_pages;
        }
        if let Some(max_items) = self.max_items {
            config.crawling.max_items = max_items;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory.clone_from(dir);
        }
        if self.no_deep_scrape {
            config.crawling.deep_scrape = false;
        }
        if self.no_json {
            config.output.save_json = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_to(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {e:#}");
    }
    log_system_info();

    match run_harvest(&config).await {
        Ok(summary) => {
            println!("Saved {}", summary.written.full_csv.display());
            if let Some(json) = &summary.written.full_json {
                println!("Saved {}", json.display());
            }
            println!("Saved {}", summary.written.mint_csv.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Harvest failed: {:#}", e);
            eprintln!("Harvest failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
