//! Free-text semantic search.
//!
//! The query is encoded, the closest rows are over-fetched from the query
//! index and filtered, then `top_n` of them are sampled without replacement.
//! When fewer than `top_n` survive, all of them are returned.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::recommend::{Candidate, CandidateFilter, PoolSizing, Recommendation, RecommendError};
use crate::semantic::{QueryIndex, TextEncoder};

const FEATURE: &str = "Semantic search";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub min_rating: f32,
    pub top_n: usize,
}

/// The trimmed query text, or [`RecommendError::EmptyQuery`].
pub(crate) fn query_text(query: &str) -> Result<&str, RecommendError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RecommendError::EmptyQuery);
    }
    Ok(query)
}

/// Filtered rows closest to the query, most similar first.
pub(crate) fn candidate_pool(
    catalog: &Catalog,
    index: &QueryIndex,
    encoder: &dyn TextEncoder,
    pool: PoolSizing,
    request: &QueryRequest,
) -> Result<Vec<Candidate>, RecommendError> {
    let text = query_text(&request.query)?;

    let unavailable = |reason: String| RecommendError::Unavailable {
        feature: FEATURE,
        reason,
    };

    let vector = encoder.embed(text).map_err(|e| unavailable(e.to_string()))?;

    let pool_n = pool.pool_size(request.top_n);
    let neighbors = index
        .search_vector(&vector, pool_n)
        .map_err(|e| unavailable(e.to_string()))?;

    let filter = CandidateFilter::new()
        .language(request.language.as_deref())
        .min_rating(request.min_rating);

    let candidates = filter.apply(
        neighbors
            .into_iter()
            .filter_map(|neighbor| {
                catalog
                    .get(neighbor.row)
                    .map(|book| Candidate::new(book.clone(), neighbor.score))
            })
            .collect(),
    );

    log::debug!(
        "query '{}': {} of {} rows left after filtering",
        text,
        candidates.len(),
        pool_n
    );

    Ok(candidates)
}

/// Pick `top_n` candidates uniformly without replacement, or all of them
/// when there are not enough.
pub(crate) fn sample<R: Rng + ?Sized>(
    candidates: Vec<Candidate>,
    top_n: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    if candidates.len() < top_n {
        return candidates;
    }

    let picks = rand::seq::index::sample(rng, candidates.len(), top_n);
    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    picks
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}

pub(crate) fn recommend<R: Rng + ?Sized>(
    catalog: &Catalog,
    index: &QueryIndex,
    encoder: &dyn TextEncoder,
    pool: PoolSizing,
    request: &QueryRequest,
    rng: &mut R,
) -> Result<Recommendation, RecommendError> {
    let candidates = candidate_pool(catalog, index, encoder, pool, request)?;

    if candidates.is_empty() {
        return Err(RecommendError::NoResults);
    }

    Ok(Recommendation::found(
        sample(candidates, request.top_n, rng),
        format!("Semantic recommendations for: {}", request.query.trim()),
    ))
}
