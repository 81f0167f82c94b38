//! Category resolution and product discovery against a mock catalog

use crate::common::*;
use listing_harvester::discovery::{fetch_sitemap, resolve_categories};
use listing_harvester::shutdown::ShutdownCoordinator;
use listing_harvester::{HarvestError, Harvester, ItemId};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_list_categories_skips_foreign_entries() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    let base_url = mock_server.uri();

    let index = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/sitemap/pokemon.xml</loc></sitemap>
  <sitemap><loc>{base}/blog/posts.xml</loc></sitemap>
  <sitemap><loc>{base}/sitemap/magic.xml.gz</loc></sitemap>
</sitemapindex>"#,
        base = base_url
    );
    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let categories = harvester.list_categories().await.unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["pokemon", "magic"]);
    assert_eq!(
        categories[0].source_url,
        format!("{}/sitemap/pokemon.xml", base_url)
    );
    let snapshot = std::fs::read_to_string(output.path().join("sitemap_index.xml")).unwrap();
    assert!(snapshot.contains("/blog/posts.xml"));
}

#[tokio::test]
async fn test_list_categories_rejects_truncated_index() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    let index = sitemap_index(&mock_server.uri(), &["pokemon", "magic"]);
    let truncated = &index[..index.len() - "</sitemapindex>".len()];
    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(truncated))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let result = harvester.list_categories().await;
    assert!(matches!(result, Err(HarvestError::ParseError { .. })));
    assert!(!output.path().join("sitemap_index.xml").exists());
}

#[tokio::test]
async fn test_sitemap_fetch_is_retried_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/sitemap/index.xml", mock_server.uri());

    match resolve_categories(&client, &url).await {
        Err(HarvestError::NetworkUnreachable { url: failed, reason }) => {
            assert_eq!(failed, url);
            assert!(reason.contains("502"));
        }
        other => panic!("expected NetworkUnreachable, got {:?}", other.map(|(_, c)| c)),
    }
}

#[tokio::test]
async fn test_sitemap_recovers_on_second_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sitemap_index(&mock_server.uri(), &["yugioh"])),
        )
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let body = fetch_sitemap(&client, &format!("{}/sitemap/index.xml", mock_server.uri()))
        .await
        .unwrap();

    assert!(body.starts_with("<?xml"), "byte order mark is stripped");
    assert!(body.contains("yugioh"));
}

#[tokio::test]
async fn test_malformed_index_is_a_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"xml\"}"))
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/sitemap/index.xml", mock_server.uri());

    let result = resolve_categories(&client, &url).await;
    assert!(matches!(result, Err(HarvestError::ParseError { .. })));
}

#[tokio::test]
async fn test_plan_resolves_fuzzy_term() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_catalog(
        &mock_server,
        &["pokemon", "magic", "yugioh"],
        "pokemon",
        &[101, 102, 101],
    )
    .await;

    let config = create_test_config(&mock_server.uri(), output.path());
    let harvester = Harvester::new(config, ShutdownCoordinator::shared()).unwrap();

    let plan = harvester.plan("pokeman").await.unwrap();

    assert_eq!(plan.category.name, "pokemon");
    assert!(plan.match_score > 0.9);
    // Duplicates in the sitemap are kept
    assert_eq!(
        plan.item_ids,
        vec![ItemId::from("101"), ItemId::from("102"), ItemId::from("101")]
    );
    assert_eq!(
        harvester.category_dir(&plan.category),
        output.path().join("pokemon")
    );
}
