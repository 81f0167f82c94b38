use crate::config::types::{CatalogConfig, CategoryConfig, Config, HarvesterConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

const MAX_PAGE_SIZE: u32 = 250;

/// The queue buffer is allocated up front at this size
const MAX_QUEUE_CAPACITY: usize = 1_000_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_catalog_config(&config.catalog)?;
    validate_category_config(&config.category)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates worker pool and fetch settings
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.fetch_permits < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-permits must be >= 1, got {}",
            config.fetch_permits
        )));
    }

    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.queue_capacity < 1 || config.queue_capacity > MAX_QUEUE_CAPACITY {
        return Err(ConfigError::Validation(format!(
            "queue-capacity must be between 1 and {}, got {}",
            MAX_QUEUE_CAPACITY, config.queue_capacity
        )));
    }

    if config.max_backoff_ms < config.retry_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= retry-backoff-ms ({})",
            config.max_backoff_ms, config.retry_backoff_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates catalog endpoints
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    Url::parse(&config.sitemap_index_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap-index-url: {}", e)))?;

    if !config.listings_endpoint.contains("{product_id}") {
        return Err(ConfigError::Validation(format!(
            "listings-endpoint must contain a {{product_id}} placeholder, got '{}'",
            config.listings_endpoint
        )));
    }

    Url::parse(&config.listings_endpoint.replace("{product_id}", "0"))
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listings-endpoint: {}", e)))?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_category_config(config: &CategoryConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.min_match_score) {
        return Err(ConfigError::Validation(format!(
            "min-match-score must be between 0.0 and 1.0, got {}",
            config.min_match_score
        )));
    }

    if let Some(term) = &config.search_term {
        if term.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search-term cannot be blank".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}
