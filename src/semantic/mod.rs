//! Embedding infrastructure for book similarity.
//!
//! # Architecture
//!
//! - `embeddings`: the `TextEncoder` seam and its fastembed implementation
//! - `index`: in-memory cosine indexes (item-to-item and query-to-item)
//! - `storage`: binary file I/O for embedding / query-index artifacts
//! - `preprocess`: text preprocessing for embedding input
//! - `builder`: embeds a catalog and writes both artifacts

pub mod builder;
pub mod embeddings;
mod index;
mod preprocess;
mod storage;

pub use embeddings::{EmbeddingModel, TextEncoder};
pub use index::{EmbeddingMatrix, ItemIndex, QueryIndex};
pub use preprocess::DEFAULT_MAX_CONTENT_LENGTH;
pub use storage::{payload_crc, ArtifactKind, MatrixArtifact, MatrixStorage};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
