//! Business-rule filters applied to candidate pools.
//!
//! Every constraint is optional; an absent constraint lets everything
//! through. Constraints combine with AND and survivors keep their order.

use crate::catalog::BookRecord;
use crate::recommend::Candidate;

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter<'a> {
    series_of: Option<&'a BookRecord>,
    authors_of: Option<&'a BookRecord>,
    /// lowercased, trimmed
    language: Option<String>,
    min_rating: Option<f32>,
}

impl<'a> CandidateFilter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop books in the same series as `reference`.
    pub fn exclude_series_of(mut self, reference: &'a BookRecord) -> Self {
        self.series_of = Some(reference);
        self
    }

    /// Drop books sharing an author with `reference`.
    pub fn exclude_authors_of(mut self, reference: &'a BookRecord) -> Self {
        self.authors_of = Some(reference);
        self
    }

    /// Keep books whose language code or display name equals `language`.
    /// Blank values are ignored.
    pub fn language(mut self, language: Option<&str>) -> Self {
        self.language = language
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty());
        self
    }

    /// Keep books rated at least `min_rating`. Values ≤ 0 are ignored.
    pub fn min_rating(mut self, min_rating: f32) -> Self {
        self.min_rating = (min_rating > 0.0).then_some(min_rating);
        self
    }

    pub fn matches(&self, book: &BookRecord) -> bool {
        if let Some(reference) = self.series_of {
            if same_series(reference, book) {
                return false;
            }
        }

        if let Some(reference) = self.authors_of {
            if shares_author(reference, book) {
                return false;
            }
        }

        if let Some(language) = &self.language {
            if !matches_language(book, language) {
                return false;
            }
        }

        match self.min_rating {
            Some(min_rating) => book.rating >= min_rating,
            None => true,
        }
    }

    pub fn apply(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|candidate| self.matches(&candidate.book))
            .collect()
    }
}

/// Both books have the same non-empty series, ignoring case and padding.
pub fn same_series(a: &BookRecord, b: &BookRecord) -> bool {
    match (a.series_key(), b.series_key()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// The books have at least one author string in common (exact match).
pub fn shares_author(a: &BookRecord, b: &BookRecord) -> bool {
    a.author.iter().any(|author| b.author.contains(author))
}

/// Code or display name equals `language`, case-insensitively.
pub fn matches_language(book: &BookRecord, language: &str) -> bool {
    let language = language.trim().to_lowercase();
    book.language_code.to_lowercase() == language
        || book.language_display.to_lowercase() == language
}
