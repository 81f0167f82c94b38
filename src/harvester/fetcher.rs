//! Catalog listings client
//!
//! This module handles the per-product catalog call:
//! - Building the HTTP client with identity headers and timeouts
//! - Issuing the listings search (live English sellers, in stock, cheapest first)
//! - Classifying failures into HTTP status, transport and decode errors
//! - Decoding the first result page into product, listing and seller records

use crate::config::{CatalogConfig, Config, HarvesterConfig};
use crate::model::{
    AggregateRecord, DetailRecord, FailureReason, FetchOutcome, ItemId, ItemRecords,
    SellerRecord,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Something that can fetch one product's listings
///
/// The worker pool only sees this trait, so tests can drive the pool with
/// scripted outcomes instead of a live catalog.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// Performs one fetch attempt. Never panics on remote errors; every
    /// failure is reported as [`FetchOutcome::Failure`].
    async fn fetch(&self, item_id: &ItemId) -> FetchOutcome;
}

/// Builds the HTTP client shared by sitemap and listings requests
pub fn build_http_client(
    catalog: &CatalogConfig,
    harvester: &HarvesterConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(catalog.user_agent.as_str())
        .default_headers(headers)
        .timeout(harvester.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Listings client for the catalog search API
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    endpoint: String,
    origin: String,
    referer: String,
    page_size: u32,
    courtesy_delay: Duration,
}

impl CatalogClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: config.catalog.listings_endpoint.clone(),
            origin: config.catalog.origin.clone(),
            referer: config.catalog.referer.clone(),
            page_size: config.harvester.page_size,
            courtesy_delay: config.harvester.courtesy_delay(),
        }
    }

    /// Listings URL for one product
    pub fn listings_url(&self, item_id: &ItemId) -> String {
        self.endpoint.replace("{product_id}", item_id.as_str())
    }

    /// Search payload: live English sellers with stock, sorted by price
    pub fn search_body(&self) -> Value {
        json!({
            "filters": {
                "term": {
                    "sellerStatus": "Live",
                    "channelId": 0,
                    "language": ["English"]
                },
                "range": { "quantity": { "gte": 1 } },
                "exclude": { "channelExclusion": 0 }
            },
            "from": 0,
            "size": self.page_size,
            "sort": { "field": "price", "order": "asc" },
            "context": { "shippingCountry": "US", "cart": {} },
            "aggregations": ["listingType"]
        })
    }
}

#[async_trait]
impl ListingFetcher for CatalogClient {
    async fn fetch(&self, item_id: &ItemId) -> FetchOutcome {
        let url = self.listings_url(item_id);

        let response = match self
            .client
            .post(&url)
            .header(ORIGIN, self.origin.as_str())
            .header(REFERER, self.referer.as_str())
            .json(&self.search_body())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return FetchOutcome::failure(
                    item_id.clone(),
                    FailureReason::Transport(describe_transport_error(&e)),
                )
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Listings request for {} returned {}", item_id, status);
            return FetchOutcome::failure(
                item_id.clone(),
                FailureReason::HttpStatus(status.as_u16()),
            );
        }

        tokio::time::sleep(self.courtesy_delay).await;

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return FetchOutcome::failure(
                    item_id.clone(),
                    FailureReason::Transport(describe_transport_error(&e)),
                )
            }
        };

        match decode_listings(item_id, &body, Utc::now().date_naive()) {
            Ok(records) => FetchOutcome::Success(records),
            Err(message) => FetchOutcome::failure(item_id.clone(), FailureReason::Decode(message)),
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<ResultPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultPage {
    #[serde(deserialize_with = "lenient::count")]
    total_results: u64,
    #[serde(default)]
    aggregations: Aggregations,
    #[serde(default)]
    results: Vec<Listing>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Aggregations {
    #[serde(default)]
    condition: Vec<Bucket>,
    #[serde(default)]
    listing_type: Vec<Bucket>,
    #[serde(default)]
    printing: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    #[serde(deserialize_with = "lenient::text")]
    value: String,
    #[serde(deserialize_with = "lenient::count")]
    count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    seller_key: String,
    #[serde(deserialize_with = "lenient::count")]
    product_condition_id: u64,
    printing: String,
    condition: String,
    #[serde(deserialize_with = "lenient::count")]
    direct_inventory: u64,
    #[serde(deserialize_with = "lenient::count")]
    quantity: u64,
    price: f64,
    seller_shipping_price: f64,
    #[serde(deserialize_with = "lenient::text")]
    seller_id: String,
    seller_name: String,
    seller_rating: f64,
    #[serde(deserialize_with = "lenient::count")]
    seller_sales: u64,
    verified_seller: bool,
    gold_seller: bool,
}

fn bucket_counts(buckets: Vec<Bucket>) -> BTreeMap<String, u64> {
    buckets
        .into_iter()
        .map(|bucket| (bucket.value, bucket.count))
        .collect()
}

/// Decodes a listings search response body
///
/// Only the first result page is used. Sellers are keyed by `sellerKey`;
/// when a seller appears on several listings the last one wins.
///
/// # Returns
///
/// * `Ok(ItemRecords)` - The decoded product, listing and seller records
/// * `Err(String)` - The body is not JSON or lacks a required field
pub fn decode_listings(
    item_id: &ItemId,
    body: &[u8],
    listing_date: NaiveDate,
) -> Result<ItemRecords, String> {
    let response: SearchResponse = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let page = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| "response contained no result pages".to_string())?;

    let aggregate = AggregateRecord {
        item_id: item_id.clone(),
        total_results: page.total_results,
        condition_counts: bucket_counts(page.aggregations.condition),
        listing_type_counts: bucket_counts(page.aggregations.listing_type),
        printing_counts: bucket_counts(page.aggregations.printing),
    };

    let mut details = Vec::with_capacity(page.results.len());
    let mut sellers = BTreeMap::new();

    for listing in page.results {
        details.push(DetailRecord {
            item_id: item_id.clone(),
            seller_key: listing.seller_key.clone(),
            condition_sku_id: listing.product_condition_id,
            printing: listing.printing,
            condition: listing.condition,
            direct_quantity: listing.direct_inventory,
            quantity: listing.quantity,
            price: listing.price,
            shipping_price: listing.seller_shipping_price,
            listing_date,
        });

        sellers.insert(
            listing.seller_key.clone(),
            SellerRecord {
                seller_key: listing.seller_key,
                seller_id: listing.seller_id,
                seller_name: listing.seller_name,
                rating: listing.seller_rating,
                sales_count: listing.seller_sales,
                verified: listing.verified_seller,
                gold_status: listing.gold_seller,
            },
        );
    }

    Ok(ItemRecords {
        aggregate,
        details,
        sellers,
    })
}

/// Field decoders for values the API sends as either numbers or strings
mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    /// Non-negative count: `4`, `4.0`, `"4"` or `"10,000+"`
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|value| value.is_finite() && *value >= 0.0 && value.fract() == 0.0)
                        .map(|value| value as u64)
                })
                .ok_or_else(|| D::Error::custom(format!("expected a count, got {}", number))),
            Value::String(text) => parse_count(&text)
                .ok_or_else(|| D::Error::custom(format!("expected a count, got '{}'", text))),
            other => Err(D::Error::custom(format!("expected a count, got {}", other))),
        }
    }

    /// Digits with optional `,` group separators and one trailing `+`
    pub(super) fn parse_count(text: &str) -> Option<u64> {
        let text = text.trim();
        let body = text.strip_suffix('+').unwrap_or(text);
        let well_formed = body
            .split(',')
            .all(|group| !group.is_empty() && group.bytes().all(|b| b.is_ascii_digit()));
        if !well_formed {
            return None;
        }
        body.replace(',', "").parse().ok()
    }

    /// Identifier or label: strings pass through, integers are formatted
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(text),
            Value::Number(number) => Ok(match number.as_u64() {
                Some(integer) => integer.to_string(),
                None => number.to_string(),
            }),
            Value::Bool(flag) => Ok(flag.to_string()),
            other => Err(D::Error::custom(format!("expected text, got {}", other))),
        }
    }
}
