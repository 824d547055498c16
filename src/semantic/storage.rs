//! Binary storage for embedding matrices.
//!
//! Two artifacts share one format: the raw embedding matrix
//! (`embeddings.bin`) and the query index derived from it
//! (`query_index.bin`, unit-length rows).
//!
//! Header (56 bytes):
//! - version: u8 (2)
//! - kind: u8 (0 = embeddings, 1 = query index)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - row_count: u64 (little-endian)
//! - source_crc: u32 (CRC32 of the embedding payload this artifact derives from)
//! - catalog_crc: u32 (fingerprint of the catalog rows, in order)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Payload: row_count × dimensions f32 (little-endian), row-major.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::semantic::index::{EmbeddingMatrix, IndexError};

/// Current file format version
const FORMAT_VERSION: u8 = 2;

/// version(1) + kind(1) + model_id(32) + dimensions(2) + row_count(8) + source_crc(4)
/// + catalog_crc(4) + checksum(4)
const HEADER_SIZE: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Embeddings,
    QueryIndex,
}

impl ArtifactKind {
    fn to_byte(self) -> u8 {
        match self {
            ArtifactKind::Embeddings => 0,
            ArtifactKind::QueryIndex => 1,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ArtifactKind::Embeddings),
            1 => Some(ArtifactKind::QueryIndex),
            _ => None,
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum MatrixStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Artifact kind mismatch: expected {expected:?}, file holds {got:?}")]
    KindMismatch {
        expected: ArtifactKind,
        got: ArtifactKind,
    },

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Matrix error: {0}")]
    Matrix(#[from] IndexError),
}

/// A matrix together with the metadata stored in its header.
#[derive(Debug, Clone)]
pub struct MatrixArtifact {
    pub kind: ArtifactKind,
    pub model_id: [u8; 32],
    pub source_crc: u32,
    pub catalog_crc: u32,
    pub matrix: EmbeddingMatrix,
}

/// Storage manager for one matrix file.
pub struct MatrixStorage {
    path: PathBuf,
}

impl MatrixStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the artifact, checking its header and kind.
    pub fn load(&self, expected_kind: ArtifactKind) -> Result<MatrixArtifact, MatrixStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = Self::read_header(&mut reader)?;
        if header.kind != expected_kind {
            return Err(MatrixStorageError::KindMismatch {
                expected: expected_kind,
                got: header.kind,
            });
        }

        let dimensions = header.dimensions as usize;
        let payload_len = usize::try_from(header.row_count)
            .ok()
            .and_then(|rows| rows.checked_mul(dimensions))
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| {
                MatrixStorageError::InvalidFormat(format!(
                    "{} rows of {} dimensions do not fit in memory",
                    header.row_count, dimensions
                ))
            })?;

        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        let data = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let matrix = EmbeddingMatrix::new(dimensions, data)?;

        Ok(MatrixArtifact {
            kind: header.kind,
            model_id: header.model_id,
            source_crc: header.source_crc,
            catalog_crc: header.catalog_crc,
            matrix,
        })
    }

    /// Save a matrix.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(
        &self,
        kind: ArtifactKind,
        model_id: &[u8; 32],
        source_crc: u32,
        catalog_crc: u32,
        matrix: &EmbeddingMatrix,
    ) -> Result<(), MatrixStorageError> {
        let dimensions = u16::try_from(matrix.dimensions()).map_err(|_| {
            MatrixStorageError::InvalidFormat(format!(
                "{} dimensions exceed the format limit",
                matrix.dimensions()
            ))
        })?;

        let header = Header {
            version: FORMAT_VERSION,
            kind,
            model_id: *model_id,
            dimensions,
            row_count: matrix.rows() as u64,
            source_crc,
            catalog_crc,
        };

        let temp_path = self.path.with_extension("tmp");
        let result = Self::write_to_file(&temp_path, &header, matrix);

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;
        log::info!(
            "Saved {} rows to {}",
            matrix.rows(),
            self.path.display()
        );

        Ok(())
    }

    fn write_to_file(
        path: &Path,
        header: &Header,
        matrix: &EmbeddingMatrix,
    ) -> Result<(), MatrixStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&header.to_bytes())?;
        for &value in matrix.as_slice() {
            writer.write_all(&value.to_le_bytes())?;
        }

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        Ok(())
    }

    fn read_header(reader: &mut impl Read) -> Result<Header, MatrixStorageError> {
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;

        let version = bytes[0];
        if version != FORMAT_VERSION {
            return Err(MatrixStorageError::VersionMismatch(version, FORMAT_VERSION));
        }

        let stored_checksum = u32::from_le_bytes([bytes[52], bytes[53], bytes[54], bytes[55]]);
        if stored_checksum != crc32fast::hash(&bytes[0..52]) {
            return Err(MatrixStorageError::ChecksumMismatch);
        }

        let kind = ArtifactKind::from_byte(bytes[1]).ok_or_else(|| {
            MatrixStorageError::InvalidFormat(format!("unknown artifact kind {}", bytes[1]))
        })?;

        let mut model_id = [0u8; 32];
        model_id.copy_from_slice(&bytes[2..34]);

        let mut row_count = [0u8; 8];
        row_count.copy_from_slice(&bytes[36..44]);

        Ok(Header {
            version,
            kind,
            model_id,
            dimensions: u16::from_le_bytes([bytes[34], bytes[35]]),
            row_count: u64::from_le_bytes(row_count),
            source_crc: u32::from_le_bytes([bytes[44], bytes[45], bytes[46], bytes[47]]),
            catalog_crc: u32::from_le_bytes([bytes[48], bytes[49], bytes[50], bytes[51]]),
        })
    }
}

/// CRC32 over the little-endian payload of a matrix.
pub fn payload_crc(matrix: &EmbeddingMatrix) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for value in matrix.as_slice() {
        hasher.update(&value.to_le_bytes());
    }
    hasher.finalize()
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    kind: ArtifactKind,
    model_id: [u8; 32],
    dimensions: u16,
    row_count: u64,
    source_crc: u32,
    catalog_crc: u32,
}

impl Header {
    fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.version;
        bytes[1] = self.kind.to_byte();
        bytes[2..34].copy_from_slice(&self.model_id);
        bytes[34..36].copy_from_slice(&self.dimensions.to_le_bytes());
        bytes[36..44].copy_from_slice(&self.row_count.to_le_bytes());
        bytes[44..48].copy_from_slice(&self.source_crc.to_le_bytes());
        bytes[48..52].copy_from_slice(&self.catalog_crc.to_le_bytes());

        let checksum = crc32fast::hash(&bytes[0..52]);
        bytes[52..56].copy_from_slice(&checksum.to_le_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    fn test_model_id() -> [u8; 32] {
        let mut id = [0u8; 32];
        id[0] = 0xAB;
        id[31] = 0xCD;
        id
    }

    fn sample_matrix() -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 2.0, 0.0],
            vec![0.5, 0.5, -0.25],
        ])
        .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MatrixStorage::new(dir.path().join("embeddings.bin"));
        let matrix = sample_matrix();
        let crc = payload_crc(&matrix);

        storage
            .save(ArtifactKind::Embeddings, &test_model_id(), crc, 7, &matrix)
            .unwrap();
        assert!(storage.exists());

        let artifact = storage.load(ArtifactKind::Embeddings).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Embeddings);
        assert_eq!(artifact.model_id, test_model_id());
        assert_eq!(artifact.source_crc, crc);
        assert_eq!(artifact.catalog_crc, 7);
        assert_eq!(artifact.matrix, matrix);
        assert_eq!(payload_crc(&artifact.matrix), crc);
    }

    #[test]
    fn test_kind_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MatrixStorage::new(dir.path().join("embeddings.bin"));
        storage
            .save(ArtifactKind::Embeddings, &test_model_id(), 0, 0, &sample_matrix())
            .unwrap();

        let result = storage.load(ArtifactKind::QueryIndex);
        assert!(matches!(
            result,
            Err(MatrixStorageError::KindMismatch {
                expected: ArtifactKind::QueryIndex,
                got: ArtifactKind::Embeddings
            })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MatrixStorage::new(dir.path().join("missing.bin"));
        assert!(!storage.exists());
        assert!(matches!(
            storage.load(ArtifactKind::Embeddings),
            Err(MatrixStorageError::Io(_))
        ));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let storage = MatrixStorage::new(path);
        assert!(matches!(
            storage.load(ArtifactKind::Embeddings),
            Err(MatrixStorageError::Io(_))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");
        let storage = MatrixStorage::new(path.clone());
        storage
            .save(ArtifactKind::Embeddings, &test_model_id(), 0, 0, &sample_matrix())
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(
            storage.load(ArtifactKind::Embeddings),
            Err(MatrixStorageError::Io(_))
        ));
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");
        let storage = MatrixStorage::new(path.clone());
        storage
            .save(ArtifactKind::Embeddings, &test_model_id(), 0, 0, &sample_matrix())
            .unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(10)).unwrap();
        file.write_all(&[0xFF]).unwrap();

        assert!(matches!(
            storage.load(ArtifactKind::Embeddings),
            Err(MatrixStorageError::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_older_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");
        let storage = MatrixStorage::new(path.clone());
        storage
            .save(ArtifactKind::Embeddings, &test_model_id(), 0, 0, &sample_matrix())
            .unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = 1;
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            storage.load(ArtifactKind::Embeddings),
            Err(MatrixStorageError::VersionMismatch(1, FORMAT_VERSION))
        ));
    }

    #[test]
    fn test_atomic_write_cleans_up_on_error() {
        let path = PathBuf::from("/nonexistent/directory/embeddings.bin");
        let storage = MatrixStorage::new(path.clone());

        let result = storage.save(ArtifactKind::Embeddings, &test_model_id(), 0, 0, &sample_matrix());
        assert!(result.is_err());
        assert!(!path.with_extension("tmp").exists());
    }
}
