//! Recommendation engine.
//!
//! - `filter`: series / author / language / rating constraints
//! - `similar`: "books like this one" over the item index
//! - `query`: free-text semantic search over the query index
//! - `engine`: startup wiring and the two public call contracts

mod engine;
mod errors;
pub mod filter;
mod query;
mod similar;

use serde::Serialize;

use crate::catalog::BookRecord;

pub use engine::Engine;
pub use errors::{EngineError, RecommendError};
pub use filter::CandidateFilter;
pub use query::QueryRequest;
pub use similar::SimilarRequest;

/// Pool multiplier applied to `top_n` before filtering
pub const DEFAULT_POOL_FACTOR: usize = 5;
/// Minimum headroom over `top_n` before filtering
pub const DEFAULT_POOL_FLOOR: usize = 10;

/// Over-fetch sizing: candidate pools hold
/// `max(top_n × factor, top_n + floor)` rows so that enough survive the
/// filters and the random selection has room to vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizing {
    pub factor: usize,
    pub floor: usize,
}

impl Default for PoolSizing {
    fn default() -> Self {
        Self {
            factor: DEFAULT_POOL_FACTOR,
            floor: DEFAULT_POOL_FLOOR,
        }
    }
}

impl PoolSizing {
    pub fn pool_size(&self, top_n: usize) -> usize {
        top_n
            .saturating_mul(self.factor)
            .max(top_n.saturating_add(self.floor))
    }
}

/// A catalog row with its similarity to the request (higher is closer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub book: BookRecord,
    pub similarity: f32,
}

impl Candidate {
    pub fn new(book: BookRecord, similarity: f32) -> Self {
        Self { book, similarity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Found,
    NotFound,
    EmptyQuery,
    Unavailable,
    NoMatches,
}

/// What the engine returns for every request: rows plus a status message.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub outcome: Outcome,
    pub message: String,
    pub books: Vec<Candidate>,
}

impl Recommendation {
    pub fn found(books: Vec<Candidate>, message: String) -> Self {
        Self {
            outcome: Outcome::Found,
            message,
            books,
        }
    }
}

impl From<RecommendError> for Recommendation {
    fn from(err: RecommendError) -> Self {
        Self {
            outcome: err.outcome(),
            message: err.to_string(),
            books: vec![],
        }
    }
}
