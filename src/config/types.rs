use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub category: CategoryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Worker pool and fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HarvesterConfig {
    /// Number of concurrent workers pulling from the work queue
    pub workers: usize,

    /// Maximum number of catalog fetches in flight at once
    pub fetch_permits: usize,

    /// Listings requested per product (first result page only)
    pub page_size: u32,

    /// Capacity of the bounded work queue
    pub queue_capacity: usize,

    /// Re-attempts allowed per product before it is reported as failed
    pub max_retries: u32,

    /// Base delay before the first re-attempt (milliseconds)
    pub retry_backoff_ms: u64,

    /// Upper bound on the retry delay (milliseconds)
    pub max_backoff_ms: u64,

    /// Pause held after each successful catalog response (milliseconds)
    pub courtesy_delay_ms: u64,

    /// Total per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl HarvesterConfig {
    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_millis(self.courtesy_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            fetch_permits: 50,
            page_size: 50,
            queue_capacity: 100_000,
            max_retries: 5,
            retry_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            courtesy_delay_ms: 200,
            request_timeout_secs: 30,
        }
    }
}

/// Remote catalog endpoints and request identity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CatalogConfig {
    /// Sitemap index listing one sitemap per category
    pub sitemap_index_url: String,

    /// Listings search endpoint; `{product_id}` is substituted per item
    pub listings_endpoint: String,

    pub user_agent: String,
    pub origin: String,
    pub referer: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sitemap_index_url: "https://www.tcgplayer.com/sitemap/index.xml".to_string(),
            listings_endpoint:
                "https://mp-search-api.tcgplayer.com/v1/product/{product_id}/listings".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
            origin: "https://www.tcgplayer.com".to_string(),
            referer: "https://www.tcgplayer.com/".to_string(),
        }
    }
}

/// Category selection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CategoryConfig {
    /// Free-text term matched against category names
    pub search_term: Option<String>,

    /// Minimum similarity (0.0 to 1.0) a match must reach; 0.0 accepts the best match
    pub min_match_score: f64,
}

/// Sink medium for the three record streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Root directory; each category gets its own folder beneath it
    pub directory: String,

    pub format: OutputFormat,

    /// Save the fetched sitemaps and the extracted identifier list
    pub save_snapshots: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
            format: OutputFormat::Jsonl,
            save_snapshots: true,
        }
    }
}
