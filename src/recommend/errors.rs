use crate::catalog::CatalogError;
use crate::recommend::Outcome;

/// Per-request failures. Each one becomes an empty result plus its message;
/// none of them escape the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecommendError {
    #[error("Book not found in the dataset.")]
    NotFound { title: String },

    #[error("Please enter a description or idea for the book you want.")]
    EmptyQuery,

    #[error("{feature} is unavailable: {reason}")]
    Unavailable {
        feature: &'static str,
        reason: String,
    },

    #[error("No recommendations found with the current filters.")]
    NoRecommendations,

    #[error("No results found. Try broadening your query or relaxing filters.")]
    NoResults,
}

impl RecommendError {
    pub fn outcome(&self) -> Outcome {
        match self {
            RecommendError::NotFound { .. } => Outcome::NotFound,
            RecommendError::EmptyQuery => Outcome::EmptyQuery,
            RecommendError::Unavailable { .. } => Outcome::Unavailable,
            RecommendError::NoRecommendations | RecommendError::NoResults => Outcome::NoMatches,
        }
    }
}

/// Startup failures. These abort initialization before any request is served.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("catalog has {catalog} rows but the embedding matrix has {embeddings}")]
    RowCountMismatch { catalog: usize, embeddings: usize },

    #[error("embedding matrix was built for a different catalog order, rebuild it with `shelfwise build-index`")]
    CatalogMismatch,

    #[error("catalog has {catalog} rows but the query index has {index}")]
    IndexRowMismatch { catalog: usize, index: usize },

    #[error("query index has {index} dimensions but the text encoder produces {encoder}")]
    DimensionMismatch { index: usize, encoder: usize },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
