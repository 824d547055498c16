//! "Books like this one".
//!
//! The reference book's nearest neighbors are over-fetched, filtered, then
//! shuffled and truncated. Shuffling trades strict rank order for variety
//! across repeated requests: the pool is already made of close neighbors.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{BookRecord, Catalog};
use crate::recommend::{Candidate, CandidateFilter, PoolSizing, Recommendation, RecommendError};
use crate::semantic::ItemIndex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarRequest {
    pub title: String,
    #[serde(default)]
    pub exclude_series: bool,
    #[serde(default)]
    pub exclude_author: bool,
    pub top_n: usize,
}

/// Filtered neighbors of the reference book, closest first.
pub(crate) fn candidate_pool<'a>(
    catalog: &'a Catalog,
    index: &ItemIndex,
    pool: PoolSizing,
    request: &SimilarRequest,
) -> Result<(&'a BookRecord, Vec<Candidate>), RecommendError> {
    let reference = catalog
        .find_by_title(&request.title)
        .ok_or_else(|| RecommendError::NotFound {
            title: request.title.clone(),
        })?;

    let pool_n = pool
        .pool_size(request.top_n)
        .min(catalog.len().saturating_sub(1));

    let neighbors = index
        .search_row(reference.id, pool_n)
        .map_err(|e| RecommendError::Unavailable {
            feature: "Similar-book search",
            reason: e.to_string(),
        })?;

    let mut filter = CandidateFilter::new();
    if request.exclude_series {
        filter = filter.exclude_series_of(reference);
    }
    if request.exclude_author {
        filter = filter.exclude_authors_of(reference);
    }

    let candidates = filter.apply(
        neighbors
            .into_iter()
            .filter(|neighbor| neighbor.row != reference.id)
            .filter_map(|neighbor| {
                catalog
                    .get(neighbor.row)
                    .map(|book| Candidate::new(book.clone(), 1.0 - neighbor.score))
            })
            .collect(),
    );

    log::debug!(
        "'{}': {} of {} neighbors left after filtering",
        reference.title,
        candidates.len(),
        pool_n
    );

    Ok((reference, candidates))
}

pub(crate) fn recommend<R: Rng + ?Sized>(
    catalog: &Catalog,
    index: &ItemIndex,
    pool: PoolSizing,
    request: &SimilarRequest,
    rng: &mut R,
) -> Result<Recommendation, RecommendError> {
    let (reference, mut candidates) = candidate_pool(catalog, index, pool, request)?;

    if candidates.is_empty() {
        return Err(RecommendError::NoRecommendations);
    }

    candidates.shuffle(rng);
    candidates.truncate(request.top_n);

    Ok(Recommendation::found(
        candidates,
        format!("Books similar to: {}", reference.title),
    ))
}
