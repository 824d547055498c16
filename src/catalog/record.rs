use serde::Serialize;

/// One book of the catalog.
///
/// `id` is the row position inside the owning [`Catalog`](super::Catalog) and
/// doubles as the row of the book's embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRecord {
    pub id: usize,

    pub title: String,
    pub author: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub genres: Vec<String>,

    pub language_code: String,
    pub language_display: String,

    pub rating: f32,
    pub description: String,

    #[serde(skip)]
    pub normalized_title: String,
}

impl BookRecord {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let normalized_title = normalize_title(&title);
        Self {
            id: 0,
            title,
            author: vec![],
            series: None,
            genres: vec![],
            language_code: String::new(),
            language_display: String::new(),
            rating: 0.0,
            description: String::new(),
            normalized_title,
        }
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.author = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        let series = series.into();
        self.series = if series.trim().is_empty() {
            None
        } else {
            Some(series)
        };
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, code: impl Into<String>, display: impl Into<String>) -> Self {
        self.language_code = code.into();
        self.language_display = display.into();
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Series name used for same-series comparisons, `None` when blank.
    pub fn series_key(&self) -> Option<String> {
        self.series
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// Lowercased, trimmed title used for exact lookups.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_title() {
        let book = BookRecord::new("  The Hobbit ");
        assert_eq!(book.normalized_title, "the hobbit");
        assert_eq!(book.title, "  The Hobbit ");
    }

    #[test]
    fn test_blank_series_is_none() {
        let book = BookRecord::new("A").with_series("   ");
        assert!(book.series.is_none());
        assert!(book.series_key().is_none());
    }

    #[test]
    fn test_series_key_is_case_insensitive() {
        let a = BookRecord::new("A").with_series(" Discworld ");
        let b = BookRecord::new("B").with_series("discworld");
        assert_eq!(a.series_key(), b.series_key());
    }
}
