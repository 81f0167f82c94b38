//! Work discovery: from a sitemap index to a list of product identifiers
//!
//! This module contains:
//! - Sitemap fetching (retried once) and category index parsing
//! - Fuzzy matching of a search term against category names
//! - Product identifier extraction from a category sitemap

mod extractor;
mod matcher;
mod sitemap;

pub use extractor::extract_product_ids;
pub use matcher::{find_best_match, match_category, similarity, CategoryMatch};
pub use sitemap::{fetch_sitemap, parse_sitemap_index};

use crate::model::CategoryDescriptor;
use crate::HarvestError;
use reqwest::Client;

/// Fetches the sitemap index and parses it into categories
///
/// Returns the raw document alongside the categories so callers can keep a snapshot.
pub async fn resolve_categories(
    client: &Client,
    index_url: &str,
) -> Result<(String, Vec<CategoryDescriptor>), HarvestError> {
    let xml = fetch_sitemap(client, index_url).await?;
    let categories = parse_sitemap_index(&xml)?;
    Ok((xml, categories))
}
