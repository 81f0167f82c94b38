//! Harvester module - the concurrent fetch-and-write pipeline
//!
//! This module contains:
//! - The catalog listings client and response decoding
//! - The bounded work queue and retry policy
//! - The permit-limited worker pool
//! - The single result writer that owns the sinks
//! - The coordinator that runs a harvest end to end

mod coordinator;
mod fetcher;
mod queue;
mod retry;
mod worker;
mod writer;

pub use coordinator::{run_pipeline, HarvestPlan, Harvester, PipelineReport, PipelineSettings};
pub use fetcher::{build_http_client, decode_listings, CatalogClient, ListingFetcher};
pub use queue::{WorkItem, WorkQueue};
pub use retry::RetryPolicy;
pub use worker::{spawn_workers, WorkerContext};
pub use writer::{spawn_writer, ResultWriter, WriterMessage, WriterReport};
