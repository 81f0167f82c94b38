//! Fuzzy category matching
//!
//! Category names are compared with Jaro-Winkler similarity after
//! lowercasing and treating `-`/`_` as spaces, so "Pokemon Japan" scores
//! well against `pokemon-japan`.

use crate::model::CategoryDescriptor;
use crate::HarvestError;
use strsim::jaro_winkler;

/// A category together with its similarity to the search term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMatch<'a> {
    pub category: &'a CategoryDescriptor,
    /// Similarity in `0.0..=1.0`
    pub score: f64,
}

/// Similarity between a search term and a category name
pub fn similarity(search_term: &str, name: &str) -> f64 {
    jaro_winkler(&normalize(search_term), &normalize(name))
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace(['-', '_'], " ")
}

/// Returns the highest-scoring category, or `None` for an empty list
///
/// Ties go to the category that appears first.
///
/// # Example
///
/// ```
/// use listing_harvester::discovery::find_best_match;
/// use listing_harvester::CategoryDescriptor;
///
/// let categories: Vec<CategoryDescriptor> = ["pokemon", "magic", "yugioh"]
///     .iter()
///     .map(|name| CategoryDescriptor {
///         name: name.to_string(),
///         source_url: format!("https://example.com/sitemap/{}.xml", name),
///     })
///     .collect();
///
/// let best = find_best_match(&categories, "pokeman").unwrap();
/// assert_eq!(best.category.name, "pokemon");
/// ```
pub fn find_best_match<'a>(
    categories: &'a [CategoryDescriptor],
    search_term: &str,
) -> Option<CategoryMatch<'a>> {
    let mut best: Option<CategoryMatch<'a>> = None;

    for category in categories {
        let score = similarity(search_term, &category.name);
        if best.map_or(true, |current| score > current.score) {
            best = Some(CategoryMatch { category, score });
        }
    }

    best
}

/// Resolves a search term to a category, enforcing a minimum score
///
/// A `min_score` of `0.0` accepts whatever scores best.
pub fn match_category<'a>(
    categories: &'a [CategoryDescriptor],
    search_term: &str,
    min_score: f64,
) -> Result<&'a CategoryDescriptor, HarvestError> {
    let no_match = || HarvestError::NoMatch {
        search_term: search_term.to_string(),
    };

    let best = find_best_match(categories, search_term).ok_or_else(no_match)?;

    tracing::info!(
        "Best match for '{}' is '{}' with score {:.3}",
        search_term,
        best.category.name,
        best.score
    );

    if best.score < min_score {
        tracing::warn!(
            "Best match '{}' scored {:.3}, below the minimum of {:.3}",
            best.category.name,
            best.score,
            min_score
        );
        return Err(no_match());
    }

    Ok(best.category)
}
