//! Retrieval ranking: cosine similarity with deterministic ordering, plus
//! a display-only relevance adjustment.
//!
//! Selection is always similarity-based: candidates below the threshold are
//! discarded, survivors are sorted by similarity descending with ties broken
//! by document insertion order then chunk ordinal, and the list is truncated
//! to the limit. The relevance score layers bounded keyword boosts on top of
//! similarity for display, but never changes which results are selected —
//! ranking stays reproducible independent of metadata.

use crate::embedding::cosine_similarity;
use crate::store::RetrievalUnit;

/// Boost added per query keyword found in the document title.
pub const TITLE_BOOST: f32 = 0.15;
/// Boost added per query keyword found in the document tags.
pub const TAG_BOOST: f32 = 0.10;
/// Boost added per query keyword found in the chunk text.
pub const BODY_BOOST: f32 = 0.05;
/// Extra boost when two or more keyword hits corroborate each other.
pub const MULTI_MATCH_BONUS: f32 = 0.10;

/// Number of characters shown in a result snippet.
pub const SNIPPET_CHARS: usize = 240;

/// A retrieval unit scored against a query embedding.
#[derive(Debug, Clone)]
pub struct RankedUnit {
    pub unit: RetrievalUnit,
    pub similarity: f32,
}

/// Score every unit against the query embedding and return at most `limit`
/// results with similarity of at least `threshold`, similarity-descending.
///
/// Ties are broken by ascending document insertion sequence, then ascending
/// chunk ordinal, so identical inputs always produce identical orderings.
pub fn rank_units(
    query_vec: &[f32],
    units: Vec<RetrievalUnit>,
    limit: usize,
    threshold: f32,
) -> Vec<RankedUnit> {
    let mut ranked: Vec<RankedUnit> = units
        .into_iter()
        .filter_map(|unit| {
            let similarity = cosine_similarity(query_vec, &unit.embedding);
            if similarity >= threshold {
                Some(RankedUnit { unit, similarity })
            } else {
                None
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.unit.doc_seq.cmp(&b.unit.doc_seq))
            .then(a.unit.ordinal.cmp(&b.unit.ordinal))
    });

    ranked.truncate(limit);
    ranked
}

/// Derive the display relevance score for a ranked unit.
///
/// Starts from the raw similarity and adds bounded keyword boosts for query
/// terms appearing in the title, tags, and chunk text, clamped to `1.0`.
pub fn relevance_score(query: &str, unit: &RetrievalUnit, similarity: f32) -> f32 {
    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        return similarity.min(1.0);
    }

    let title = unit.title.to_lowercase();
    let tags = unit.tags.join(" ").to_lowercase();
    let body = unit.text.to_lowercase();

    let mut score = similarity;
    let mut hits = 0usize;

    for word in &keywords {
        if title.contains(word.as_str()) {
            score += TITLE_BOOST;
            hits += 1;
        }
        if tags.contains(word.as_str()) {
            score += TAG_BOOST;
            hits += 1;
        }
        if body.contains(word.as_str()) {
            score += BODY_BOOST;
            hits += 1;
        }
    }

    if hits >= 2 {
        score += MULTI_MATCH_BONUS;
    }

    score.min(1.0)
}

/// Take a display snippet from the start of a chunk.
pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

/// Lowercased query words worth boosting on: longer than three characters
/// and not interrogative filler.
fn extract_keywords(query: &str) -> Vec<String> {
    const STOPWORDS: [&str; 8] = [
        "what", "where", "when", "how", "that", "this", "with", "from",
    ];

    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}
