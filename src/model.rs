//! Record types flowing through the harvest pipeline
//!
//! Serialized field names match the layout of the existing output files and
//! warehouse tables (`product_id`, `tcg_id`, `gold_star`, ...), so downstream
//! loaders keep working unchanged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of one catalog product
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A named category and the sitemap that lists its products
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDescriptor {
    pub name: String,
    pub source_url: String,
}

/// Per-product rollup of the listing search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    #[serde(rename = "product_id")]
    pub item_id: ItemId,
    #[serde(rename = "totalResults")]
    pub total_results: u64,
    #[serde(rename = "conditions")]
    pub condition_counts: BTreeMap<String, u64>,
    #[serde(rename = "listingTypes")]
    pub listing_type_counts: BTreeMap<String, u64>,
    #[serde(rename = "printings")]
    pub printing_counts: BTreeMap<String, u64>,
}

/// One seller listing for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    #[serde(rename = "product_id")]
    pub item_id: ItemId,
    pub seller_key: String,
    #[serde(rename = "tcg_id")]
    pub condition_sku_id: u64,
    pub printing: String,
    pub condition: String,
    pub direct_quantity: u64,
    pub quantity: u64,
    pub price: f64,
    pub shipping_price: f64,
    pub listing_date: NaiveDate,
}

/// Seller profile referenced by listings; persisted once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerRecord {
    pub seller_key: String,
    pub seller_id: String,
    pub seller_name: String,
    #[serde(rename = "seller_rating")]
    pub rating: f64,
    #[serde(rename = "seller_sales")]
    pub sales_count: u64,
    pub verified: bool,
    #[serde(rename = "gold_star")]
    pub gold_status: bool,
}

/// Everything decoded from one successful product fetch
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecords {
    pub aggregate: AggregateRecord,
    pub details: Vec<DetailRecord>,
    /// One entry per distinct seller key in the response (last seen wins)
    pub sellers: BTreeMap<String, SellerRecord>,
}

impl ItemRecords {
    pub fn item_id(&self) -> &ItemId {
        &self.aggregate.item_id
    }
}

/// Why a single fetch attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The catalog answered with a non-success status
    HttpStatus(u16),
    /// Timeout, connection reset, or another transport-level error
    Transport(String),
    /// The response body did not have the expected shape
    Decode(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(status) => write!(f, "HTTP {}", status),
            Self::Transport(error) => write!(f, "transport error: {}", error),
            Self::Decode(error) => write!(f, "decode error: {}", error),
        }
    }
}

/// A failed fetch attempt for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub item_id: ItemId,
    pub reason: FailureReason,
}

/// Result of one fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(ItemRecords),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn failure(item_id: ItemId, reason: FailureReason) -> Self {
        Self::Failure(FetchFailure { item_id, reason })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// A product that exhausted its retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermanentFailure {
    pub item_id: ItemId,
    /// Total attempts made, including the first
    pub attempts: u32,
    pub last_reason: FailureReason,
}
