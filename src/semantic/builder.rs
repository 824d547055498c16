//! Building the embedding and query-index artifacts for a catalog.

use indicatif::ProgressBar;

use crate::catalog::Catalog;
use crate::semantic::embeddings::{EmbeddingError, TextEncoder};
use crate::semantic::index::{EmbeddingMatrix, IndexError, QueryIndex};
use crate::semantic::preprocess::embedding_text;
use crate::semantic::storage::{payload_crc, ArtifactKind, MatrixArtifact, MatrixStorage, MatrixStorageError};

/// Books embedded per encoder call
const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Matrix error: {0}")]
    Matrix(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] MatrixStorageError),

    #[error("embedding matrix has {embeddings} rows but the catalog has {catalog}")]
    RowCountMismatch { catalog: usize, embeddings: usize },

    #[error("embedding matrix was built for a different catalog order, re-embed the catalog")]
    CatalogMismatch,
}

/// Embed every catalog row, in row order.
pub fn embed_catalog(
    encoder: &dyn TextEncoder,
    catalog: &Catalog,
    max_content_length: usize,
    progress: &ProgressBar,
) -> Result<EmbeddingMatrix, BuildError> {
    progress.set_length(catalog.len() as u64);

    let dimensions = encoder.dimensions();
    let mut data = Vec::with_capacity(catalog.len() * dimensions);

    for chunk in catalog.books().chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = chunk
            .iter()
            .map(|book| embedding_text(book, max_content_length))
            .collect();

        let vectors = encoder.embed_batch(&texts)?;
        if vectors.len() != chunk.len() {
            return Err(BuildError::RowCountMismatch {
                catalog: catalog.len(),
                embeddings: catalog.len() - chunk.len() + vectors.len(),
            });
        }

        for vector in vectors {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: vector.len(),
                }
                .into());
            }
            data.extend(vector);
        }

        progress.inc(chunk.len() as u64);
    }

    progress.finish_and_clear();
    Ok(EmbeddingMatrix::new(dimensions, data)?)
}

/// Embed the catalog and persist the embedding matrix.
pub fn build_embeddings(
    encoder: &dyn TextEncoder,
    catalog: &Catalog,
    max_content_length: usize,
    storage: &MatrixStorage,
    progress: &ProgressBar,
) -> Result<MatrixArtifact, BuildError> {
    log::info!("Embedding {} books", catalog.len());
    let matrix = embed_catalog(encoder, catalog, max_content_length, progress)?;

    let artifact = MatrixArtifact {
        kind: ArtifactKind::Embeddings,
        model_id: encoder.model_id(),
        source_crc: payload_crc(&matrix),
        catalog_crc: catalog.fingerprint(),
        matrix,
    };
    storage.save(
        artifact.kind,
        &artifact.model_id,
        artifact.source_crc,
        artifact.catalog_crc,
        &artifact.matrix,
    )?;

    Ok(artifact)
}

/// Load an existing embedding matrix, checking it is still row-aligned with
/// the catalog.
pub fn load_embeddings(
    catalog: &Catalog,
    storage: &MatrixStorage,
) -> Result<MatrixArtifact, BuildError> {
    let artifact = storage.load(ArtifactKind::Embeddings)?;
    if artifact.matrix.rows() != catalog.len() {
        return Err(BuildError::RowCountMismatch {
            catalog: catalog.len(),
            embeddings: artifact.matrix.rows(),
        });
    }
    if artifact.catalog_crc != catalog.fingerprint() {
        return Err(BuildError::CatalogMismatch);
    }
    Ok(artifact)
}

/// Derive the query index from an embedding matrix and persist it.
pub fn build_query_index(
    embeddings: &MatrixArtifact,
    storage: &MatrixStorage,
) -> Result<QueryIndex, BuildError> {
    let index = QueryIndex::from_embeddings(&embeddings.matrix);
    storage.save(
        ArtifactKind::QueryIndex,
        &embeddings.model_id,
        payload_crc(&embeddings.matrix),
        embeddings.catalog_crc,
        index.matrix(),
    )?;
    Ok(index)
}
