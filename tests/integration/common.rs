//! Shared fixtures: mock catalog documents and a test configuration

use listing_harvester::config::{Config, OutputFormat};
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration pointing at the mock server and writing into `output_dir`
pub fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    let mut config = Config::default();

    config.catalog.sitemap_index_url = format!("{}/sitemap/index.xml", base_url);
    config.catalog.listings_endpoint = format!("{}/v1/product/{{product_id}}/listings", base_url);
    config.catalog.origin = "https://shop.example.com".to_string();
    config.catalog.referer = "https://shop.example.com/".to_string();

    config.harvester.workers = 4;
    config.harvester.fetch_permits = 2;
    config.harvester.page_size = 10;
    config.harvester.queue_capacity = 16;
    config.harvester.max_retries = 2;
    config.harvester.retry_backoff_ms = 5;
    config.harvester.max_backoff_ms = 20;
    config.harvester.courtesy_delay_ms = 0;
    config.harvester.request_timeout_secs = 5;

    config.output.directory = output_dir.to_string_lossy().into_owned();
    config.output.format = OutputFormat::Jsonl;
    config
}

pub fn sitemap_index(base_url: &str, categories: &[&str]) -> String {
    let entries: String = categories
        .iter()
        .map(|name| {
            format!(
                "  <sitemap><loc>{}/sitemap/{}.xml</loc></sitemap>\n",
                base_url, name
            )
        })
        .collect();

    format!(
        "\u{feff}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>",
        entries
    )
}

pub fn category_sitemap(base_url: &str, product_ids: &[u64]) -> String {
    let entries: String = product_ids
        .iter()
        .map(|id| {
            format!(
                "  <url><loc>{}/product/{}/card-{}</loc></url>\n",
                base_url, id, id
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

/// One listing entry as the search API returns it
pub fn listing(seller_key: &str, price: f64) -> Value {
    json!({
        "sellerKey": seller_key,
        "productConditionId": 9000,
        "printing": "Holofoil",
        "condition": "Near Mint",
        "directInventory": 1,
        "quantity": 4,
        "price": price,
        "sellerShippingPrice": 1.31,
        "sellerId": format!("id-{}", seller_key),
        "sellerName": format!("Shop {}", seller_key),
        "sellerRating": 99.7,
        "sellerSales": "2,500",
        "verifiedSeller": true,
        "goldSeller": seller_key == "A"
    })
}

pub fn listings_response(sellers: &[&str]) -> Value {
    let results: Vec<Value> = sellers
        .iter()
        .enumerate()
        .map(|(i, seller)| listing(seller, 1.0 + i as f64))
        .collect();

    json!({
        "errors": [],
        "results": [{
            "totalResults": results.len(),
            "aggregations": {
                "condition": [{"value": "Near Mint", "count": results.len()}],
                "listingType": [{"value": "standard", "count": results.len()}],
                "printing": [{"value": "Holofoil", "count": results.len()}]
            },
            "results": results
        }]
    })
}

/// Mounts the sitemap index and one category sitemap
pub async fn mount_catalog(server: &MockServer, categories: &[&str], category: &str, ids: &[u64]) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_index(&base_url, categories)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sitemap/{}.xml", category)))
        .respond_with(ResponseTemplate::new(200).set_body_string(category_sitemap(&base_url, ids)))
        .mount(server)
        .await;
}

pub async fn mount_listings(server: &MockServer, product_id: u64, sellers: &[&str]) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/product/{}/listings", product_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(listings_response(sellers)))
        .mount(server)
        .await;
}

/// Reads a JSONL file into one value per line
pub fn read_jsonl(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is one JSON object"))
        .collect()
}
