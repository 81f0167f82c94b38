//! Sitemap fetching and index parsing
//!
//! Sitemaps are read as a stream of XML events. Any well-formedness error,
//! a truncated document, or a root other than `<sitemapindex>`/`<urlset>`
//! is a `ParseError`; nothing is salvaged from a broken document.

use crate::model::CategoryDescriptor;
use crate::HarvestError;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::borrow::Cow;
use url::Url;

/// Attempts per sitemap document (the first try plus one retry)
const FETCH_ATTEMPTS: u32 = 2;

/// Accepted document roots, matched by local name
const ROOT_ELEMENTS: [&[u8]; 2] = [b"sitemapindex", b"urlset"];

/// UTF-8 byte order mark, also seen mis-decoded as Latin-1
const BOM_MARKERS: [&str; 2] = ["\u{feff}", "ï»¿"];

/// Fetches a sitemap document, retrying once on failure
///
/// # Returns
///
/// * `Ok(String)` - The document body with any byte order mark stripped
/// * `Err(HarvestError::NetworkUnreachable)` - Both attempts failed
pub async fn fetch_sitemap(client: &Client, url: &str) -> Result<String, HarvestError> {
    let mut attempt = 1;
    loop {
        match fetch_once(client, url).await {
            Ok(body) => {
                tracing::info!("Fetched sitemap {} ({} bytes)", url, body.len());
                return Ok(body);
            }
            Err(e) if attempt < FETCH_ATTEMPTS => {
                tracing::warn!("Sitemap fetch attempt {} failed: {}", attempt, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_once(client: &Client, url: &str) -> Result<String, HarvestError> {
    let unreachable = |reason: String| HarvestError::NetworkUnreachable {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| unreachable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(unreachable(format!("HTTP {}", status.as_u16())));
    }

    let body = response
        .text()
        .await
        .map_err(|e| unreachable(e.to_string()))?;

    Ok(strip_bom(&body))
}

fn strip_bom(body: &str) -> String {
    let mut text = body;
    for marker in BOM_MARKERS {
        text = text.trim_start_matches(marker);
    }
    text.trim().to_string()
}

/// Parses a sitemap index into category descriptors
///
/// Entries whose URL does not follow `.../sitemap/<category>.<ext>` are
/// skipped. An index with no matching entries yields an empty list.
pub fn parse_sitemap_index(xml: &str) -> Result<Vec<CategoryDescriptor>, HarvestError> {
    let locs = extract_locs(xml, None, "sitemap index")?;

    let categories: Vec<CategoryDescriptor> = locs
        .into_iter()
        .filter_map(|loc| match category_name(&loc) {
            Some(name) => Some(CategoryDescriptor {
                name,
                source_url: loc,
            }),
            None => {
                tracing::debug!("Skipping non-category sitemap entry: {}", loc);
                None
            }
        })
        .collect();

    tracing::info!("Parsed sitemap index: {} categories", categories.len());
    Ok(categories)
}

/// Collects the trimmed text of every `<loc>` element
///
/// With `parent` set, only `<loc>` elements directly inside an element of
/// that local name count. Namespace prefixes are ignored. Text and CDATA
/// sections inside a `<loc>` are concatenated.
pub(crate) fn extract_locs(
    xml: &str,
    parent: Option<&str>,
    context: &str,
) -> Result<Vec<String>, HarvestError> {
    let malformed = |message: String| HarvestError::ParseError {
        context: context.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut root_seen = false;
    // Depth of the `<loc>` being read and its text so far
    let mut loc: Option<(usize, String)> = None;
    let mut locs = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(malformed(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        };

        match event {
            Event::Start(element) => {
                let name = element.local_name().as_ref().to_vec();
                if open.is_empty() {
                    check_root(&name, root_seen).map_err(&malformed)?;
                    root_seen = true;
                }
                let wanted = match parent {
                    Some(parent) => open.last().map(Vec::as_slice) == Some(parent.as_bytes()),
                    None => true,
                };
                if loc.is_none() && wanted && name == b"loc" {
                    loc = Some((open.len(), String::new()));
                }
                open.push(name);
            }
            Event::Empty(element) => {
                if open.is_empty() {
                    check_root(element.local_name().as_ref(), root_seen).map_err(&malformed)?;
                    root_seen = true;
                }
            }
            Event::End(_) => {
                open.pop();
                if matches!(loc, Some((depth, _)) if depth == open.len()) {
                    if let Some((_, text)) = loc.take() {
                        let text = text.trim();
                        if !text.is_empty() {
                            locs.push(text.to_string());
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = loc.as_mut() {
                    let unescaped = text.unescape().map_err(|e| malformed(e.to_string()))?;
                    buffer.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some((_, buffer)) = loc.as_mut() {
                    let bytes: Cow<[u8]> = data.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| malformed(format!("invalid UTF-8 in CDATA: {}", e)))?;
                    buffer.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(malformed(format!(
            "document ends inside <{}>",
            String::from_utf8_lossy(unclosed)
        )));
    }
    if !root_seen {
        return Err(malformed(
            "no <sitemapindex> or <urlset> element found".to_string(),
        ));
    }

    Ok(locs)
}

fn check_root(name: &[u8], root_seen: bool) -> Result<(), String> {
    if root_seen {
        return Err("content after the root element".to_string());
    }
    if !ROOT_ELEMENTS.contains(&name) {
        return Err(format!(
            "unexpected root element <{}>",
            String::from_utf8_lossy(name)
        ));
    }
    Ok(())
}

/// Extracts `<category>` from a `.../sitemap/<category>.<ext>` URL
fn category_name(loc: &str) -> Option<String> {
    let url = Url::parse(loc).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();

    segments.windows(2).find_map(|pair| {
        if pair[0] != "sitemap" {
            return None;
        }
        let (name, _extension) = pair[1].split_once('.')?;
        (!name.is_empty()).then(|| name.to_string())
    })
}
