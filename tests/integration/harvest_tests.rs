//! End-to-end harvest runs against a mock catalog

use crate::common::*;
use listing_harvester::config::OutputFormat;
use listing_harvester::output::RunStatus;
use listing_harvester::shutdown::ShutdownCoordinator;
use listing_harvester::storage::{AGGREGATES_FILE, DATABASE_FILE, DETAILS_FILE, SELLERS_FILE};
use listing_harvester::{HarvestError, Harvester};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_harvest_round_trip() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon", "magic", "yugioh"], "pokemon", &[101, 102]).await;
    mount_listings(&mock_server, 101, &["A", "B"]).await;
    mount_listings(&mock_server, 102, &["A"]).await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared())
        .unwrap()
        .with_config_hash("test-hash".to_string());

    let summary = harvester.run("pokeman").await.unwrap();

    assert_eq!(summary.category, "pokemon");
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.items_discovered, 2);
    assert_eq!(summary.items_written, 2);
    assert_eq!(summary.details_written, 3);
    assert_eq!(summary.sellers_written, 2);
    assert_eq!(summary.duplicate_sellers_skipped, 1);
    assert!(summary.failures.is_empty());

    let category_dir = output.path().join("pokemon");

    let aggregates = read_jsonl(&category_dir.join(AGGREGATES_FILE));
    assert_eq!(aggregates.len(), 2);
    let first = aggregates
        .iter()
        .find(|record| record["product_id"] == json!("101"))
        .expect("aggregate for 101");
    assert_eq!(first["totalResults"], json!(2));
    assert_eq!(first["conditions"]["Near Mint"], json!(2));

    let details = read_jsonl(&category_dir.join(DETAILS_FILE));
    assert_eq!(details.len(), 3);
    assert!(details.iter().all(|record| record["tcg_id"] == json!(9000)));
    assert!(details.iter().all(|record| record["listing_date"].is_string()));

    let sellers = read_jsonl(&category_dir.join(SELLERS_FILE));
    let mut keys: Vec<&str> = sellers
        .iter()
        .map(|seller| seller["seller_key"].as_str().unwrap())
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["A", "B"]);
    let seller_a = sellers
        .iter()
        .find(|seller| seller["seller_key"] == json!("A"))
        .unwrap();
    assert_eq!(seller_a["seller_sales"], json!(2500));
    assert_eq!(seller_a["gold_star"], json!(true));

    // Snapshots and report
    assert!(output.path().join("sitemap_index.xml").exists());
    assert!(category_dir.join("pokemon_sitemap.xml").exists());
    let ids: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(category_dir.join("product_ids.json")).unwrap())
            .unwrap();
    assert_eq!(ids, vec!["101", "102"]);

    let report = std::fs::read_to_string(category_dir.join("summary.md")).unwrap();
    assert!(report.contains("- **Category**: pokemon"));
    assert!(report.contains("- **Config Hash**: test-hash"));
}

#[tokio::test]
async fn test_listing_request_shape() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon"], "pokemon", &[7]).await;

    Mock::given(method("POST"))
        .and(path("/v1/product/7/listings"))
        .and(header("origin", "https://shop.example.com"))
        .and(header("referer", "https://shop.example.com/"))
        .and(body_partial_json(json!({
            "from": 0,
            "size": 10,
            "filters": {"term": {"sellerStatus": "Live", "language": ["English"]}},
            "sort": {"field": "price", "order": "asc"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(listings_response(&["Z"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let summary = harvester.run("pokemon").await.unwrap();
    assert_eq!(summary.items_written, 1);
}

#[tokio::test]
async fn test_transient_503_is_retried_and_written_once() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon"], "pokemon", &[103]).await;

    Mock::given(method("POST"))
        .and(path("/v1/product/103/listings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    mount_listings(&mock_server, 103, &["C", "D"]).await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let summary = harvester.run("pokemon").await.unwrap();

    assert_eq!(summary.items_written, 1);
    assert!(summary.failures.is_empty());

    let category_dir = output.path().join("pokemon");
    assert_eq!(read_jsonl(&category_dir.join(AGGREGATES_FILE)).len(), 1);
    assert_eq!(read_jsonl(&category_dir.join(DETAILS_FILE)).len(), 2);
}

#[tokio::test]
async fn test_exhausted_retries_are_reported() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon"], "pokemon", &[104, 105]).await;

    // max-retries = 2, so three attempts in total
    Mock::given(method("POST"))
        .and(path("/v1/product/104/listings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_listings(&mock_server, 105, &["A"]).await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let summary = harvester.run("pokemon").await.unwrap();

    assert_eq!(summary.items_written, 1);
    assert_eq!(summary.items_processed(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].item_id.as_str(), "104");
    assert_eq!(summary.failures[0].attempts, 3);

    let report = std::fs::read_to_string(output.path().join("pokemon").join("summary.md")).unwrap();
    assert!(report.contains("| 104 | 3 | HTTP 500 |"));
}

#[tokio::test]
async fn test_malformed_listing_body_counts_as_failure() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon"], "pokemon", &[106]).await;
    Mock::given(method("POST"))
        .and(path("/v1/product/106/listings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), output.path());
    config.harvester.max_retries = 0;
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let summary = harvester.run("pokemon").await.unwrap();

    assert_eq!(summary.items_written, 0);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].last_reason.to_string().starts_with("decode error"));
}

#[tokio::test]
async fn test_sqlite_output() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon", "magic"], "magic", &[201, 202]).await;
    mount_listings(&mock_server, 201, &["A", "B"]).await;
    mount_listings(&mock_server, 202, &["B", "C"]).await;

    let mut config = create_test_config(&mock_server.uri(), output.path());
    config.output.format = OutputFormat::Sqlite;
    config.output.save_snapshots = false;
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let summary = harvester.run("magic").await.unwrap();
    assert_eq!(summary.sellers_written, 3);

    let category_dir = output.path().join("magic");
    assert!(!category_dir.join("product_ids.json").exists());

    let conn = rusqlite::Connection::open(category_dir.join(DATABASE_FILE)).unwrap();
    let count = |table: &str| -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(count("products"), 2);
    assert_eq!(count("listings"), 4);
    assert_eq!(count("sellers"), 3);
}

#[tokio::test]
async fn test_no_match_with_floor() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon", "magic"], "pokemon", &[1]).await;

    let mut config = create_test_config(&mock_server.uri(), output.path());
    config.category.min_match_score = 0.95;
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let result = harvester.run("xylophone").await;
    assert!(matches!(result, Err(HarvestError::NoMatch { .. })));
}

#[tokio::test]
async fn test_empty_category_fails_fast() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon"], "pokemon", &[]).await;

    // No listings endpoint is mounted; any fetch would be an unmatched request
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    match harvester.run("pokemon").await {
        Err(HarvestError::NoIdentifiers { category }) => assert_eq!(category, "pokemon"),
        other => panic!("expected NoIdentifiers, got {:?}", other.map(|s| s.category)),
    }
}

#[tokio::test]
async fn test_interrupt_before_start_leaves_everything_unprocessed() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(&mock_server, &["pokemon"], "pokemon", &[1, 2, 3]).await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    let harvester = Harvester::new(config, shutdown).unwrap();

    let summary = harvester.run("pokemon").await.unwrap();

    assert_eq!(summary.status, RunStatus::Interrupted);
    assert_eq!(summary.items_written, 0);
    assert_eq!(summary.unprocessed, 3);
}
