//! Product identifier extraction from category sitemaps

use crate::discovery::sitemap::extract_locs;
use crate::model::ItemId;
use crate::HarvestError;
use url::Url;

/// Extracts product identifiers from a category sitemap
///
/// Every `<url><loc>` whose path contains `/product/<digits>/` contributes
/// one identifier. Order follows the document and duplicates are kept.
///
/// # Example
///
/// ```
/// use listing_harvester::discovery::extract_product_ids;
///
/// let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://example.com/product/101/some-card</loc></url>
/// </urlset>"#;
/// let ids = extract_product_ids(xml).unwrap();
/// assert_eq!(ids[0].as_str(), "101");
/// ```
pub fn extract_product_ids(xml: &str) -> Result<Vec<ItemId>, HarvestError> {
    let locs = extract_locs(xml, Some("url"), "category sitemap")?;
    let ids: Vec<ItemId> = locs.iter().filter_map(|loc| product_id(loc)).collect();

    tracing::info!(
        "Extracted {} product IDs from {} sitemap entries",
        ids.len(),
        locs.len()
    );
    Ok(ids)
}

fn product_id(loc: &str) -> Option<ItemId> {
    let url = Url::parse(loc).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();

    // `/product/<id>/` needs a segment after the id, even an empty one
    segments.windows(3).find_map(|window| {
        let id = window[1];
        let numeric = !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
        (window[0] == "product" && numeric).then(|| ItemId::new(id))
    })
}
