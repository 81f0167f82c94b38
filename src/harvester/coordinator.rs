//! Harvest coordinator - pipeline orchestration
//!
//! This module wires discovery, the worker pool and the result writer into
//! one run:
//! - Resolving the category and extracting its product identifiers
//! - Saving sitemap and identifier snapshots
//! - Enqueuing every identifier and waiting for the queue to drain
//! - Handling user interrupts and fatal sink errors
//! - Producing the run summary and markdown report

use crate::config::{Config, HarvesterConfig};
use crate::discovery::{
    extract_product_ids, fetch_sitemap, match_category, resolve_categories, similarity,
};
use crate::harvester::fetcher::{build_http_client, CatalogClient, ListingFetcher};
use crate::harvester::queue::{WorkItem, WorkQueue};
use crate::harvester::retry::RetryPolicy;
use crate::harvester::worker::{spawn_workers, WorkerContext};
use crate::harvester::writer::{spawn_writer, WriterReport};
use crate::model::{CategoryDescriptor, ItemId};
use crate::output::{write_markdown_report, RunStatus, RunSummary, REPORT_FILE};
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};
use crate::storage::{open_sinks, SinkResult, Sinks};
use crate::HarvestError;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;

const INDEX_SNAPSHOT_FILE: &str = "sitemap_index.xml";
const IDS_SNAPSHOT_FILE: &str = "product_ids.json";

/// Sizing and retry settings for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workers: usize,
    pub fetch_permits: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &HarvesterConfig) -> Self {
        Self {
            workers: config.workers,
            fetch_permits: config.fetch_permits,
            queue_capacity: config.queue_capacity,
            retry: RetryPolicy::from_config(config),
        }
    }
}

/// Outcome of [`run_pipeline`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub items_total: usize,
    /// Identifiers actually put on the queue (fewer than total if interrupted)
    pub items_enqueued: usize,
    pub writer: WriterReport,
    pub cancelled: bool,
    /// Identifiers with no final outcome
    pub unprocessed: usize,
}

enum RunEnd {
    Drained,
    Interrupted,
    WriterStopped(Result<SinkResult<WriterReport>, JoinError>),
}

/// Runs the fetch-and-write pipeline over `item_ids`
///
/// Workers and the writer start first, then every identifier is enqueued
/// (waiting whenever the queue is full). The call returns once every
/// identifier has a final outcome, the user requests shutdown, or a sink
/// write fails. In the last case the run fails with [`HarvestError::Sink`].
pub async fn run_pipeline<F>(
    item_ids: Vec<ItemId>,
    fetcher: Arc<F>,
    sinks: Sinks,
    settings: &PipelineSettings,
    shutdown: SharedShutdown,
    progress: ProgressBar,
) -> Result<PipelineReport, HarvestError>
where
    F: ListingFetcher + ?Sized + 'static,
{
    let items_total = item_ids.len();
    let queue = Arc::new(WorkQueue::new(settings.queue_capacity));
    let stop = ShutdownCoordinator::shared();
    let (results, receiver) = mpsc::unbounded_channel();

    let mut writer = spawn_writer(sinks, receiver);
    let mut workers = spawn_workers(
        settings.workers,
        WorkerContext {
            queue: Arc::clone(&queue),
            permits: Arc::new(Semaphore::new(settings.fetch_permits)),
            fetcher,
            results,
            retry: settings.retry,
            progress: progress.clone(),
            stop: Arc::clone(&stop),
        },
    );

    tracing::info!(
        "Harvesting {} products with {} workers and {} fetch permits",
        items_total,
        settings.workers,
        settings.fetch_permits
    );

    let mut items_enqueued = 0;
    let end = tokio::select! {
        _ = async {
            for item_id in item_ids {
                queue.put(WorkItem::new(item_id)).await;
                items_enqueued += 1;
            }
            queue.join().await;
        } => RunEnd::Drained,
        _ = shutdown.wait_for_shutdown() => RunEnd::Interrupted,
        result = &mut writer => RunEnd::WriterStopped(result),
    };

    // Stops idle workers and cancels pending retry timers
    stop.request_shutdown();
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Worker task failed: {}", e);
        }
    }

    let cancelled = matches!(end, RunEnd::Interrupted);
    let writer_result = match end {
        RunEnd::WriterStopped(result) => result,
        RunEnd::Drained | RunEnd::Interrupted => writer.await,
    };
    let writer = writer_result.map_err(|e| HarvestError::Task(e.to_string()))??;

    let processed = writer.items_written + writer.failures.len();
    let report = PipelineReport {
        items_total,
        items_enqueued,
        unprocessed: items_total.saturating_sub(processed),
        writer,
        cancelled,
    };

    if report.cancelled {
        tracing::warn!(
            "Harvest interrupted: {} of {} products left unprocessed",
            report.unprocessed,
            items_total
        );
    } else {
        tracing::info!(
            "Harvest complete: {} products written, {} permanently failed",
            report.writer.items_written,
            report.writer.failures.len()
        );
    }

    Ok(report)
}

/// A resolved category and the products it lists
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub search_term: String,
    pub category: CategoryDescriptor,
    pub match_score: f64,
    pub item_ids: Vec<ItemId>,
}

/// Main harvester structure
pub struct Harvester {
    config: Config,
    config_hash: Option<String>,
    client: Client,
    shutdown: SharedShutdown,
    show_progress: bool,
}

impl Harvester {
    /// Creates a harvester from a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `shutdown` - Signalled by the caller to stop the run early
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Successfully created harvester
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config, shutdown: SharedShutdown) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.catalog, &config.harvester)?;

        Ok(Self {
            config,
            config_hash: None,
            client,
            shutdown,
            show_progress: false,
        })
    }

    /// Records the config file hash in the run report
    pub fn with_config_hash(mut self, config_hash: String) -> Self {
        self.config_hash = Some(config_hash);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output folder for one category
    pub fn category_dir(&self, category: &CategoryDescriptor) -> PathBuf {
        PathBuf::from(&self.config.output.directory).join(&category.name)
    }

    /// Fetches the sitemap index and returns its categories
    pub async fn list_categories(&self) -> Result<Vec<CategoryDescriptor>, HarvestError> {
        let (xml, categories) =
            resolve_categories(&self.client, &self.config.catalog.sitemap_index_url).await?;

        if self.config.output.save_snapshots {
            let dir = PathBuf::from(&self.config.output.directory);
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(dir.join(INDEX_SNAPSHOT_FILE), &xml).await?;
        }

        Ok(categories)
    }

    /// Fetches a category sitemap and extracts its product identifiers
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ItemId>)` - At least one identifier
    /// * `Err(HarvestError::NoIdentifiers)` - The sitemap lists no products
    pub async fn discover_items(
        &self,
        category: &CategoryDescriptor,
    ) -> Result<Vec<ItemId>, HarvestError> {
        let xml = fetch_sitemap(&self.client, &category.source_url).await?;
        let dir = self.category_dir(category);

        if self.config.output.save_snapshots {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(dir.join(format!("{}_sitemap.xml", category.name)), &xml).await?;
        }

        let item_ids = extract_product_ids(&xml)?;
        if item_ids.is_empty() {
            return Err(HarvestError::NoIdentifiers {
                category: category.name.clone(),
            });
        }

        if self.config.output.save_snapshots {
            let json = serde_json::to_vec_pretty(&item_ids)?;
            tokio::fs::write(dir.join(IDS_SNAPSHOT_FILE), json).await?;
        }

        Ok(item_ids)
    }

    /// Resolves `search_term` to a category and discovers its products
    pub async fn plan(&self, search_term: &str) -> Result<HarvestPlan, HarvestError> {
        let categories = self.list_categories().await?;
        let category = match_category(
            &categories,
            search_term,
            self.config.category.min_match_score,
        )?
        .clone();
        let match_score = similarity(search_term, &category.name);

        let item_ids = self.discover_items(&category).await?;
        tracing::info!(
            "Category '{}' lists {} products",
            category.name,
            item_ids.len()
        );

        Ok(HarvestPlan {
            search_term: search_term.to_string(),
            category,
            match_score,
            item_ids,
        })
    }

    /// Runs a full harvest for the category best matching `search_term`
    pub async fn run(&self, search_term: &str) -> Result<RunSummary, HarvestError> {
        let started_at = Utc::now();
        let plan = self.plan(search_term).await?;
        let dir = self.category_dir(&plan.category);

        let sinks = open_sinks(&dir, self.config.output.format)?;
        let fetcher = Arc::new(CatalogClient::new(self.client.clone(), &self.config));
        let settings = PipelineSettings::from_config(&self.config.harvester);
        let progress = self.progress_bar(&plan);
        let items_discovered = plan.item_ids.len();

        let report = run_pipeline(
            plan.item_ids,
            fetcher,
            sinks,
            &settings,
            Arc::clone(&self.shutdown),
            progress.clone(),
        )
        .await;
        progress.finish_and_clear();
        let report = report?;

        let summary = RunSummary {
            category: plan.category.name,
            source_url: plan.category.source_url,
            search_term: plan.search_term,
            match_score: plan.match_score,
            started_at,
            finished_at: Utc::now(),
            status: if report.cancelled {
                RunStatus::Interrupted
            } else {
                RunStatus::Completed
            },
            config_hash: self.config_hash.clone(),
            output_dir: dir.clone(),
            format: self.config.output.format,
            items_discovered,
            items_written: report.writer.items_written,
            details_written: report.writer.details_written,
            sellers_written: report.writer.sellers_written,
            duplicate_sellers_skipped: report.writer.duplicate_sellers_skipped,
            unprocessed: report.unprocessed,
            failures: report.writer.failures,
        };

        let report_path = dir.join(REPORT_FILE);
        write_markdown_report(&summary, &report_path)?;
        tracing::info!("Run report written to {}", report_path.display());

        Ok(summary)
    }

    fn progress_bar(&self, plan: &HarvestPlan) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(plan.item_ids.len() as u64);
        match ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => tracing::debug!("Falling back to default progress style: {}", e),
        }
        pb.set_message(format!("Harvesting {}", plan.category.name));
        pb
    }
}
