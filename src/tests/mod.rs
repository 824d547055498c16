
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog::{BookRecord, Catalog};
use crate::semantic::embeddings::{model_id_for, EmbeddingError};
use crate::semantic::{EmbeddingMatrix, TextEncoder};

/// Encoder returning canned vectors, counting every call.
pub struct StubEncoder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    model: &'static str,
    failing: bool,
    short_batches: bool,
    calls: AtomicUsize,
}

impl StubEncoder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback,
            model: "stub-model",
            failing: false,
            short_batches: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `vector` for texts containing `keyword`.
    pub fn with_keyword(mut self, keyword: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(keyword.to_string(), vector);
        self
    }

    pub fn with_model(mut self, model: &'static str) -> Self {
        self.model = model;
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Drop the last vector of every batch.
    pub fn short_batches(mut self) -> Self {
        self.short_batches = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextEncoder for StubEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(EmbeddingError::EmbeddingFailed("stub failure".to_string()));
        }

        let vector = self
            .vectors
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, vector)| vector.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = texts
            .iter()
            .map(|text| self.embed(text))
            .collect::<Result<Vec<_>, _>>()?;
        if self.short_batches {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.fallback.len()
    }

    fn model_id(&self) -> [u8; 32] {
        model_id_for(self.model)
    }
}

/// Six books with hand-placed 2-d embeddings: a fantasy cluster near
/// `[1, 0]` and a second cluster near `[0, 1]`.
pub fn fixture() -> (Catalog, EmbeddingMatrix) {
    let rows = vec![
        (
            BookRecord::new("The Colour of Magic")
                .with_authors(["Terry Pratchett"])
                .with_series("Discworld")
                .with_genres(["Fantasy", "Humor"])
                .with_language("en", "English")
                .with_rating(4.0)
                .with_description("A wizard and a tourist"),
            vec![1.0, 0.0],
        ),
        (
            BookRecord::new("The Light Fantastic")
                .with_authors(["Terry Pratchett"])
                .with_series("Discworld")
                .with_genres(["Fantasy"])
                .with_language("en", "English")
                .with_rating(4.1)
                .with_description("The wizard returns"),
            vec![0.95, 0.05],
        ),
        (
            BookRecord::new("Good Omens")
                .with_authors(["Terry Pratchett", "Neil Gaiman"])
                .with_genres(["Fantasy", "Humor"])
                .with_language("en", "English")
                .with_rating(4.3)
                .with_description("An angel and a demon"),
            vec![0.9, 0.2],
        ),
        (
            BookRecord::new("American Gods")
                .with_authors(["Neil Gaiman"])
                .with_genres(["Fantasy", "Mythology"])
                .with_language("en", "English")
                .with_rating(4.0)
                .with_description("Old gods in a new country"),
            vec![0.7, 0.4],
        ),
        (
            BookRecord::new("L'Étranger")
                .with_authors(["Albert Camus"])
                .with_genres(["Classics", "Philosophy"])
                .with_language("fr", "French")
                .with_rating(4.2)
                .with_description("Un homme et le soleil"),
            vec![0.1, 1.0],
        ),
        (
            BookRecord::new("Dune")
                .with_authors(["Frank Herbert"])
                .with_series("Dune")
                .with_genres(["Science Fiction"])
                .with_language("en", "English")
                .with_rating(4.5)
                .with_description("Spice and sandworms"),
            vec![0.4, 0.9],
        ),
    ];

    let (books, vectors): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
    let matrix = EmbeddingMatrix::from_rows(vectors).unwrap();
    (Catalog::from_records(books), matrix)
}

/// The fixture as CSV, in the same row order.
pub const FIXTURE_CSV: &str = "\
title,author,rating,description,genres,language,series
The Colour of Magic,['Terry Pratchett'],4.0,A wizard and a tourist,\"['Fantasy', 'Humor']\",English,Discworld
The Light Fantastic,['Terry Pratchett'],4.1,The wizard returns,['Fantasy'],English,Discworld
Good Omens,\"['Terry Pratchett', 'Neil Gaiman']\",4.3,An angel and a demon,\"['Fantasy', 'Humor']\",English,
American Gods,['Neil Gaiman'],4.0,Old gods in a new country,\"['Fantasy', 'Mythology']\",en,
L'Étranger,['Albert Camus'],4.2,Un homme et le soleil,\"['Classics', 'Philosophy']\",fr,
Dune,['Frank Herbert'],4.5,Spice and sandworms,['Science Fiction'],English,Dune
";

pub fn titles(books: &[crate::recommend::Candidate]) -> Vec<&str> {
    books.iter().map(|c| c.book.title.as_str()).collect()
}
