//! In-memory similarity indexes over the embedding matrix.
//!
//! Two indexes share one row-major matrix type:
//! - [`ItemIndex`]: brute-force cosine distance between catalog rows, used to
//!   find books similar to a book already in the catalog.
//! - [`QueryIndex`]: inner product against unit-length rows, used to rank the
//!   catalog against an encoded free-text query. It is derived once from the
//!   embedding matrix and persisted next to it.
//!
//! Both are immutable after construction and safe to share between threads.

use std::cmp::Ordering;

use serde::Serialize;

/// Floor applied to vector norms before dividing by them.
pub const NORM_FLOOR: f32 = 1e-12;

/// Row-major `rows × dimensions` matrix of f32.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    dimensions: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn new(dimensions: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        if dimensions == 0 || data.len() % dimensions != 0 {
            return Err(IndexError::InvalidShape {
                len: data.len(),
                dimensions,
            });
        }
        Ok(Self { dimensions, data })
    }

    /// Build from one vector per row. Every row must have the same length.
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimensions = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dimensions);

        for row in rows {
            if row.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: row.len(),
                });
            }
            data.extend(row);
        }

        Self::new(dimensions, data)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.dimensions
    }

    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        let start = idx.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimensions)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy of the matrix with every row scaled to unit length.
    pub fn normalized(&self) -> Self {
        let mut data = self.data.clone();
        for row in data.chunks_exact_mut(self.dimensions) {
            l2_normalize(row);
        }
        Self {
            dimensions: self.dimensions,
            data,
        }
    }
}

/// Compute L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place. All-zero vectors stay zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v).max(NORM_FLOOR);
    for x in v.iter_mut() {
        *x /= norm;
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// A search hit. `score` is a cosine distance for [`ItemIndex`] and a cosine
/// similarity for [`QueryIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub row: usize,
    pub score: f32,
}

/// Keep the `keep` best neighbors by `cmp`, sorted.
fn top_k(mut hits: Vec<Neighbor>, keep: usize, cmp: impl Fn(&Neighbor, &Neighbor) -> Ordering) -> Vec<Neighbor> {
    if keep == 0 {
        return vec![];
    }
    if keep < hits.len() {
        hits.select_nth_unstable_by(keep - 1, &cmp);
        hits.truncate(keep);
    }
    hits.sort_by(cmp);
    hits
}

/// Exact cosine-distance neighbors between catalog rows.
pub struct ItemIndex {
    matrix: EmbeddingMatrix,
    norms: Vec<f32>,
}

impl ItemIndex {
    pub fn build(matrix: EmbeddingMatrix) -> Self {
        let norms = matrix
            .iter_rows()
            .map(|row| l2_norm(row).max(NORM_FLOOR))
            .collect();
        Self { matrix, norms }
    }

    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn dimensions(&self) -> usize {
        self.matrix.dimensions()
    }

    /// The `k + 1` rows closest to `row`, the row itself included, by
    /// ascending cosine distance. Ties go to the lower row index.
    ///
    /// `k` is clamped to `len() - 1`.
    pub fn search_row(&self, row: usize, k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let rows = self.len();
        let query = self
            .matrix
            .row(row)
            .ok_or(IndexError::RowOutOfRange { row, rows })?;
        let query_norm = self.norms[row];

        let hits = self
            .matrix
            .iter_rows()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(idx, (target, &norm))| Neighbor {
                row: idx,
                score: 1.0 - dot(query, target) / (query_norm * norm),
            })
            .collect();

        let keep = k.min(rows - 1) + 1;
        Ok(top_k(hits, keep, |a, b| {
            a.score.total_cmp(&b.score).then(a.row.cmp(&b.row))
        }))
    }
}

/// Inner-product search over unit-length rows.
pub struct QueryIndex {
    matrix: EmbeddingMatrix,
}

impl QueryIndex {
    /// Derive the index from raw embeddings.
    pub fn from_embeddings(embeddings: &EmbeddingMatrix) -> Self {
        Self {
            matrix: embeddings.normalized(),
        }
    }

    /// Wrap a matrix whose rows are already unit length (a persisted index).
    pub fn from_normalized(matrix: EmbeddingMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn dimensions(&self) -> usize {
        self.matrix.dimensions()
    }

    /// The `k` rows most similar to `query` by descending cosine similarity.
    /// Ties go to the lower row index. `k` is clamped to `len()`.
    ///
    /// The query is normalized here; an all-zero query scores 0 everywhere.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimensions() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions(),
                got: query.len(),
            });
        }

        let mut query = query.to_vec();
        l2_normalize(&mut query);

        let hits = self
            .matrix
            .iter_rows()
            .enumerate()
            .map(|(idx, target)| Neighbor {
                row: idx,
                score: dot(&query, target),
            })
            .collect();

        Ok(top_k(hits, k.min(self.len()), |a, b| {
            b.score.total_cmp(&a.score).then(a.row.cmp(&b.row))
        }))
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Matrix of {len} values cannot have {dimensions} columns")]
    InvalidShape { len: usize, dimensions: usize },

    #[error("Row {row} out of range for index of {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f32]]) -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    fn rows(hits: &[Neighbor]) -> Vec<usize> {
        hits.iter().map(|n| n.row).collect()
    }

    #[test]
    fn test_matrix_shape() {
        let m = matrix(&[&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.dimensions(), 3);
        assert_eq!(m.row(1), Some(&[0.0, 1.0, 0.0][..]));
        assert_eq!(m.row(2), None);
    }

    #[test]
    fn test_matrix_rejects_ragged_rows() {
        let result = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0], vec![1.0]]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { expected: 2, got: 1 })));

        let result = EmbeddingMatrix::new(3, vec![1.0; 4]);
        assert!(matches!(result, Err(IndexError::InvalidShape { .. })));
    }

    #[test]
    fn test_normalize_guards_zero_vector() {
        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);

        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_row_includes_self_first() {
        let index = ItemIndex::build(matrix(&[
            &[1.0, 0.0],
            &[0.9, 0.1],
            &[0.5, 0.5],
            &[0.0, 1.0],
        ]));

        let hits = index.search_row(0, 2).unwrap();
        assert_eq!(rows(&hits), vec![0, 1, 2]);
        assert!(hits[0].score.abs() < 1e-6);
        assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn test_search_row_clamps_k() {
        let index = ItemIndex::build(matrix(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]]));
        let hits = index.search_row(1, 50).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].row, 1);
    }

    #[test]
    fn test_search_row_ties_break_by_index() {
        let index = ItemIndex::build(matrix(&[&[1.0, 0.0], &[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0]]));
        let hits = index.search_row(0, 3).unwrap();
        assert_eq!(rows(&hits), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_search_row_out_of_range() {
        let index = ItemIndex::build(matrix(&[&[1.0, 0.0]]));
        assert_eq!(
            index.search_row(5, 1),
            Err(IndexError::RowOutOfRange { row: 5, rows: 1 })
        );
    }

    #[test]
    fn test_search_vector_ranks_by_similarity() {
        let embeddings = matrix(&[&[0.0, 2.0], &[3.0, 0.1], &[1.0, 1.0]]);
        let index = QueryIndex::from_embeddings(&embeddings);

        let hits = index.search_vector(&[10.0, 0.0], 2).unwrap();
        assert_eq!(rows(&hits), vec![1, 2]);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[0].score <= 1.0 + 1e-6);
    }

    #[test]
    fn test_search_vector_zero_query() {
        let index = QueryIndex::from_embeddings(&matrix(&[&[1.0, 0.0], &[0.0, 1.0]]));
        let hits = index.search_vector(&[0.0, 0.0], 5).unwrap();
        assert_eq!(rows(&hits), vec![0, 1]);
        assert!(hits.iter().all(|n| n.score == 0.0));
    }

    #[test]
    fn test_search_vector_dimension_mismatch() {
        let index = QueryIndex::from_embeddings(&matrix(&[&[1.0, 0.0]]));
        assert!(matches!(
            index.search_vector(&[1.0, 0.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_search_vector_k_zero() {
        let index = QueryIndex::from_embeddings(&matrix(&[&[1.0, 0.0]]));
        assert!(index.search_vector(&[1.0, 0.0], 0).unwrap().is_empty());
    }
}
