//! In-memory book catalog.
//!
//! The catalog is loaded once and never mutated afterwards. Row positions are
//! the contract with the embedding matrix: `books[i]` is described by
//! `embeddings[i]`.

mod browse;
pub mod language;
mod loader;
mod record;
pub mod sorting;

use std::collections::{BTreeSet, HashMap};

pub use browse::{BrowseQuery, SortOrder};
pub use loader::CatalogError;
pub use record::{normalize_title, BookRecord};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<BookRecord>,
    /// normalized title -> row (first row wins on duplicates)
    by_title: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from records. Ids are reassigned to row positions.
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        let mut books = records;
        let mut by_title = HashMap::with_capacity(books.len());

        for (idx, book) in books.iter_mut().enumerate() {
            book.id = idx;
            book.normalized_title = normalize_title(&book.title);
            by_title.entry(book.normalized_title.clone()).or_insert(idx);
        }

        Self { books, by_title }
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&BookRecord> {
        self.books.get(id)
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    /// CRC32 over the normalized titles in row order. Artifacts built for
    /// this catalog carry it, so a reordered or edited catalog is detected
    /// even when its row count is unchanged.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for book in &self.books {
            hasher.update(book.normalized_title.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize()
    }

    /// Exact, case-insensitive title lookup.
    pub fn find_by_title(&self, title: &str) -> Option<&BookRecord> {
        self.by_title
            .get(&normalize_title(title))
            .and_then(|&idx| self.books.get(idx))
    }

    /// Titles containing `fragment` (case-insensitive), in catalog order.
    pub fn suggest_titles(&self, fragment: &str, limit: usize) -> Vec<&str> {
        let fragment = normalize_title(fragment);
        if fragment.is_empty() {
            return vec![];
        }

        self.books
            .iter()
            .filter(|book| book.normalized_title.contains(&fragment))
            .map(|book| book.title.as_str())
            .take(limit)
            .collect()
    }

    /// Distinct display languages.
    pub fn languages(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .books
            .iter()
            .map(|book| book.language_display.as_str())
            .filter(|lang| !lang.is_empty())
            .collect();

        let mut languages: Vec<String> = set.into_iter().map(str::to_string).collect();
        sorting::sort_titles(&mut languages);
        languages
    }

    /// Distinct genres.
    pub fn genres(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .books
            .iter()
            .flat_map(|book| book.genres.iter().map(|g| g.trim()))
            .filter(|genre| !genre.is_empty())
            .collect();

        let mut genres: Vec<String> = set.into_iter().map(str::to_string).collect();
        sorting::sort_titles(&mut genres);
        genres
    }
}
