//! Listing Harvester main entry point
//!
//! This is the command-line interface for the catalog listing harvester.

use anyhow::{bail, Context};
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, validate, Config};
use listing_harvester::discovery::find_best_match;
use listing_harvester::output::print_summary;
use listing_harvester::shutdown::ShutdownCoordinator;
use listing_harvester::{HarvestError, Harvester};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing Harvester: a bounded, concurrent catalog listing scraper
///
/// Resolves a search term to a catalog category, discovers every product in
/// that category's sitemap, and appends product stats, listings and
/// deduplicated sellers to the output folder.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, concurrent catalog listing scraper", long_about = None)]
struct Cli {
    /// Category to harvest (overrides `search-term` in the config file)
    #[arg(value_name = "SEARCH_TERM")]
    search_term: Option<String>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Maximum catalog fetches in flight
    #[arg(long)]
    permits: Option<usize>,

    /// Listings requested per product
    #[arg(long)]
    page_size: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the catalog's categories and exit
    #[arg(long, conflicts_with = "dry_run")]
    list_categories: bool,

    /// Resolve the category and count its products without fetching listings
    #[arg(long, conflicts_with = "list_categories")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load(&cli)?;

    // Ctrl+C stops the run after in-flight fetches are written
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing in-flight products...");
                shutdown.request_shutdown();
            }
        }
    });

    let search_term = cli
        .search_term
        .clone()
        .or_else(|| config.category.search_term.clone());

    let mut harvester = Harvester::new(config, shutdown)?.with_progress(!cli.quiet);
    if let Some(hash) = config_hash {
        harvester = harvester.with_config_hash(hash);
    }

    if cli.list_categories {
        return handle_list_categories(&harvester, search_term.as_deref()).await;
    }

    let Some(search_term) = search_term else {
        bail!("No search term given: pass SEARCH_TERM or set search-term under [category]");
    };

    if cli.dry_run {
        handle_dry_run(&harvester, &search_term).await
    } else {
        handle_harvest(&harvester, &search_term).await
    }
}

/// Loads the config file (if any), applies CLI overrides and validates the result
fn load(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), None)
        }
    };

    if let Some(workers) = cli.workers {
        config.harvester.workers = workers;
    }
    if let Some(permits) = cli.permits {
        config.harvester.fetch_permits = permits;
    }
    if let Some(page_size) = cli.page_size {
        config.harvester.page_size = page_size;
    }
    validate(&config)?;

    Ok((config, config_hash))
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --list-categories: prints every category, marking the best match if a term is set
async fn handle_list_categories(
    harvester: &Harvester,
    search_term: Option<&str>,
) -> anyhow::Result<()> {
    let categories = harvester.list_categories().await?;
    let best = search_term.and_then(|term| find_best_match(&categories, term));

    println!("=== Catalog Categories ({}) ===\n", categories.len());
    for category in &categories {
        let marker = match best {
            Some(best) if best.category == category => " <- best match",
            _ => "",
        };
        println!("  {}{}", category.name, marker);
        println!("    {}", category.source_url);
    }

    Ok(())
}

/// Handles --dry-run: resolves the category and reports what would be fetched
async fn handle_dry_run(harvester: &Harvester, search_term: &str) -> anyhow::Result<()> {
    let plan = match harvester.plan(search_term).await {
        Ok(plan) => plan,
        Err(HarvestError::NoMatch { search_term }) => {
            println!("No category matches '{}'; nothing to do", search_term);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let config = harvester.config();

    println!("=== Listing Harvester Dry Run ===\n");

    println!("Category:");
    println!("  Name: {}", plan.category.name);
    println!("  Sitemap: {}", plan.category.source_url);
    println!("  Match score: {:.3}", plan.match_score);
    println!("  Products: {}", plan.item_ids.len());

    println!("\nHarvester:");
    println!("  Workers: {}", config.harvester.workers);
    println!("  Fetch permits: {}", config.harvester.fetch_permits);
    println!("  Page size: {}", config.harvester.page_size);
    println!("  Max retries: {}", config.harvester.max_retries);

    println!("\nOutput:");
    println!(
        "  Directory: {}",
        harvester.category_dir(&plan.category).display()
    );
    println!("  Format: {:?}", config.output.format);

    println!(
        "\n✓ Would fetch listings for {} products",
        plan.item_ids.len()
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(harvester: &Harvester, search_term: &str) -> anyhow::Result<()> {
    tracing::info!("Starting harvest for '{}'", search_term);

    match harvester.run(search_term).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(HarvestError::NoMatch { search_term }) => {
            tracing::warn!("No category matches '{}'; nothing to do", search_term);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
