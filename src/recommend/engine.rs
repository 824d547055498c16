//! Startup wiring and the public request entry points.
//!
//! An [`Engine`] is built once and then only read: share it by reference or
//! behind an `Arc`. Requests take their randomness from the caller, so the
//! engine itself holds no mutable state.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::recommend::{
    query, similar, Candidate, EngineError, PoolSizing, QueryRequest, Recommendation,
    RecommendError, SimilarRequest,
};
use crate::semantic::{
    payload_crc, ArtifactKind, EmbeddingMatrix, ItemIndex, MatrixArtifact, MatrixStorage,
    QueryIndex, TextEncoder,
};

/// A retrieval path that is either ready or explains why it is not.
enum Retrieval<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Retrieval<T> {
    fn get(&self, feature: &'static str) -> Result<&T, RecommendError> {
        match self {
            Retrieval::Ready(value) => Ok(value),
            Retrieval::Unavailable(reason) => Err(RecommendError::Unavailable {
                feature,
                reason: reason.clone(),
            }),
        }
    }

    fn is_ready(&self) -> bool {
        matches!(self, Retrieval::Ready(_))
    }
}

struct SemanticRetrieval {
    index: QueryIndex,
    encoder: Arc<dyn TextEncoder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub books: usize,
    pub similar_available: bool,
    pub semantic_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

pub struct Engine {
    catalog: Catalog,
    items: Retrieval<ItemIndex>,
    semantic: Retrieval<SemanticRetrieval>,
    pool: PoolSizing,
}

const SIMILAR_FEATURE: &str = "Similar-book search";
const SEMANTIC_FEATURE: &str = "Semantic search";

impl Engine {
    /// Assemble an engine from already-loaded parts.
    ///
    /// Fails when the embedding matrix or query index is not row-aligned with
    /// the catalog, or when the encoder disagrees with the query index on
    /// dimensions. Missing parts only disable the retrieval path they feed.
    pub fn new(
        catalog: Catalog,
        embeddings: Option<EmbeddingMatrix>,
        query_index: Option<QueryIndex>,
        encoder: Option<Arc<dyn TextEncoder>>,
    ) -> Result<Self, EngineError> {
        let items = match embeddings {
            Some(matrix) if matrix.rows() != catalog.len() => {
                return Err(EngineError::RowCountMismatch {
                    catalog: catalog.len(),
                    embeddings: matrix.rows(),
                });
            }
            Some(matrix) => Retrieval::Ready(ItemIndex::build(matrix)),
            None => Retrieval::Unavailable("no embedding matrix is loaded".to_string()),
        };

        let semantic = match (query_index, encoder) {
            (Some(index), _) if index.len() != catalog.len() => {
                return Err(EngineError::IndexRowMismatch {
                    catalog: catalog.len(),
                    index: index.len(),
                });
            }
            (Some(index), Some(encoder)) if index.dimensions() != encoder.dimensions() => {
                return Err(EngineError::DimensionMismatch {
                    index: index.dimensions(),
                    encoder: encoder.dimensions(),
                });
            }
            (Some(index), Some(encoder)) => Retrieval::Ready(SemanticRetrieval { index, encoder }),
            (None, _) => Retrieval::Unavailable("the query index has not been built".to_string()),
            (Some(_), None) => Retrieval::Unavailable("no text encoder is loaded".to_string()),
        };

        Ok(Self {
            catalog,
            items,
            semantic,
            pool: PoolSizing::default(),
        })
    }

    pub fn with_pool_sizing(mut self, pool: PoolSizing) -> Self {
        self.pool = pool;
        self
    }

    /// Load the catalog and artifacts named by `config`.
    ///
    /// Absent or unreadable artifacts disable the matching retrieval path and
    /// are logged. A catalog that cannot be read, or artifacts that are not
    /// row-aligned with it (wrong row count, or rows reordered or retitled
    /// since the build), abort startup.
    pub fn open(config: &Config, encoder: Option<Arc<dyn TextEncoder>>) -> Result<Self, EngineError> {
        let now = Instant::now();
        let catalog = Catalog::load_csv(config.catalog_path())?;

        let embeddings = load_artifact(&config.embeddings_path(), ArtifactKind::Embeddings);
        if let Some(artifact) = &embeddings {
            if artifact.matrix.rows() == catalog.len()
                && artifact.catalog_crc != catalog.fingerprint()
            {
                return Err(EngineError::CatalogMismatch);
            }
        }
        let query_index = match &embeddings {
            Some(embeddings) => load_artifact(&config.query_index_path(), ArtifactKind::QueryIndex)
                .filter(|index| is_fresh(index, embeddings, encoder.as_deref())),
            None => None,
        };

        let engine = Self::new(
            catalog,
            embeddings.map(|artifact| artifact.matrix),
            query_index.map(|artifact| QueryIndex::from_normalized(artifact.matrix)),
            encoder,
        )?
        .with_pool_sizing(config.recommend.pool_sizing());

        let status = engine.status();
        log::info!(
            "Engine ready in {}ms: {} books, similar search {}, semantic search {}",
            now.elapsed().as_millis(),
            status.books,
            availability(status.similar_available),
            availability(status.semantic_available),
        );

        Ok(engine)
    }

    pub fn status(&self) -> EngineStatus {
        let dimensions = match &self.items {
            Retrieval::Ready(index) => Some(index.dimensions()),
            Retrieval::Unavailable(_) => None,
        };

        EngineStatus {
            books: self.catalog.len(),
            similar_available: self.items.is_ready(),
            semantic_available: self.semantic.is_ready(),
            dimensions,
        }
    }

    /// Books similar to `title`, with a fresh random source.
    pub fn recommend_similar(
        &self,
        title: &str,
        exclude_series: bool,
        exclude_author: bool,
        top_n: usize,
    ) -> Recommendation {
        let request = SimilarRequest {
            title: title.to_string(),
            exclude_series,
            exclude_author,
            top_n,
        };
        self.recommend_similar_with(&request, &mut StdRng::from_os_rng())
    }

    pub fn recommend_similar_with<R: Rng + ?Sized>(
        &self,
        request: &SimilarRequest,
        rng: &mut R,
    ) -> Recommendation {
        let _span = tracing::debug_span!("recommend_similar", top_n = request.top_n).entered();

        let result = self
            .items
            .get(SIMILAR_FEATURE)
            .and_then(|index| similar::recommend(&self.catalog, index, self.pool, request, rng));

        finish(result)
    }

    /// The filtered neighbor pool `recommend_similar` samples from, closest first.
    pub fn similar_pool(&self, request: &SimilarRequest) -> Result<Vec<Candidate>, RecommendError> {
        let index = self.items.get(SIMILAR_FEATURE)?;
        similar::candidate_pool(&self.catalog, index, self.pool, request)
            .map(|(_, candidates)| candidates)
    }

    /// Books matching a free-text description, with a fresh random source.
    pub fn recommend_by_query(
        &self,
        query: &str,
        language: Option<&str>,
        min_rating: f32,
        top_n: usize,
    ) -> Recommendation {
        let request = QueryRequest {
            query: query.to_string(),
            language: language.map(str::to_string),
            min_rating,
            top_n,
        };
        self.recommend_by_query_with(&request, &mut StdRng::from_os_rng())
    }

    pub fn recommend_by_query_with<R: Rng + ?Sized>(
        &self,
        request: &QueryRequest,
        rng: &mut R,
    ) -> Recommendation {
        let _span = tracing::debug_span!("recommend_by_query", top_n = request.top_n).entered();

        let result = query::query_text(&request.query)
            .and_then(|_| self.semantic.get(SEMANTIC_FEATURE))
            .and_then(|semantic| {
                query::recommend(
                    &self.catalog,
                    &semantic.index,
                    semantic.encoder.as_ref(),
                    self.pool,
                    request,
                    rng,
                )
            });

        finish(result)
    }

    /// The filtered pool `recommend_by_query` samples from, most similar first.
    pub fn query_pool(&self, request: &QueryRequest) -> Result<Vec<Candidate>, RecommendError> {
        query::query_text(&request.query)?;
        let semantic = self.semantic.get(SEMANTIC_FEATURE)?;
        query::candidate_pool(
            &self.catalog,
            &semantic.index,
            semantic.encoder.as_ref(),
            self.pool,
            request,
        )
    }
}

fn finish(result: Result<Recommendation, RecommendError>) -> Recommendation {
    match result {
        Ok(recommendation) => recommendation,
        Err(err) => {
            log::debug!("request ended without results: {err}");
            Recommendation::from(err)
        }
    }
}

fn availability(ready: bool) -> &'static str {
    if ready {
        "available"
    } else {
        "unavailable"
    }
}

/// Load an artifact, logging instead of failing when it is absent or broken.
fn load_artifact(path: &Path, kind: ArtifactKind) -> Option<MatrixArtifact> {
    let storage = MatrixStorage::new(path.to_path_buf());
    if !storage.exists() {
        log::warn!("{kind:?} artifact not found at {}", path.display());
        return None;
    }

    match storage.load(kind) {
        Ok(artifact) => {
            log::info!(
                "Loaded {kind:?} artifact: {} rows x {} dimensions",
                artifact.matrix.rows(),
                artifact.matrix.dimensions()
            );
            Some(artifact)
        }
        Err(e) => {
            log::error!("Failed to load {kind:?} artifact from {}: {e}", path.display());
            None
        }
    }
}

/// A persisted query index is usable when it was derived from exactly this
/// embedding matrix and built with the loaded encoder's model.
fn is_fresh(
    index: &MatrixArtifact,
    embeddings: &MatrixArtifact,
    encoder: Option<&dyn TextEncoder>,
) -> bool {
    if index.matrix.rows() != embeddings.matrix.rows()
        || index.matrix.dimensions() != embeddings.matrix.dimensions()
        || index.source_crc != payload_crc(&embeddings.matrix)
    {
        log::warn!("Query index is stale, rebuild it with `shelfwise build-index --reuse-embeddings`");
        return false;
    }

    if let Some(encoder) = encoder {
        if encoder.model_id() != index.model_id {
            log::warn!("Query index was built with a different model, rebuild it with `shelfwise build-index`");
            return false;
        }
    }

    true
}
