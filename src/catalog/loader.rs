//! CSV catalog loading.
//!
//! Columns are located by header name. `series` is optional, every other
//! column listed in [`REQUIRED_COLUMNS`] must be present.

use std::path::Path;
use std::time::Instant;

use super::{language, BookRecord, Catalog};

const REQUIRED_COLUMNS: [&str; 6] = [
    "title",
    "author",
    "rating",
    "description",
    "genres",
    "language",
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required column '{0}'")]
    MissingColumn(&'static str),
}

struct Columns {
    title: usize,
    author: usize,
    rating: usize,
    description: usize,
    genres: usize,
    language: usize,
    series: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, CatalogError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &'static str| find(name).ok_or(CatalogError::MissingColumn(name));

        let [title, author, rating, description, genres, lang] = REQUIRED_COLUMNS;
        Ok(Self {
            title: required(title)?,
            author: required(author)?,
            rating: required(rating)?,
            description: required(description)?,
            genres: required(genres)?,
            language: required(lang)?,
            series: find("series"),
        })
    }

    fn parse(&self, record: &csv::StringRecord) -> BookRecord {
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let (code, display) = language::normalize(field(self.language));
        let mut book = BookRecord::new(field(self.title))
            .with_authors(parse_authors(field(self.author)))
            .with_genres(parse_genres(field(self.genres)))
            .with_language(code, display)
            .with_rating(parse_rating(field(self.rating)))
            .with_description(field(self.description));

        if let Some(series) = self.series.map(field) {
            book = book.with_series(series);
        }

        book
    }
}

impl Catalog {
    /// Load the catalog from a CSV file.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let now = Instant::now();

        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let columns = Columns::locate(csv_reader.headers()?)?;

        let mut books = vec![];
        for record in csv_reader.records() {
            books.push(columns.parse(&record?));
        }

        log::debug!(
            "took {}ms to read catalog csv",
            now.elapsed().as_micros() as f64 / 1000.0
        );
        log::info!("Loaded {} books from {}", books.len(), path.display());

        Ok(Catalog::from_records(books))
    }
}

/// Authors come either as a list literal (`['A', 'B']`) or comma separated.
pub fn parse_authors(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return split_list_literal(raw);
    }

    raw.split(',')
        .map(str::trim)
        .filter(|author| !author.is_empty())
        .map(str::to_string)
        .collect()
}

/// Genres come either as a list literal or separated by `,`, `;` or `|`.
pub fn parse_genres(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return split_list_literal(raw);
    }

    raw.split([',', ';', '|'])
        .map(|genre| genre.trim().trim_matches(['\'', '"']).trim())
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect()
}

/// Missing, non-numeric or negative ratings count as 0.
pub fn parse_rating(raw: &str) -> f32 {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|rating| rating.is_finite())
        .map(|rating| rating.max(0.0))
        .unwrap_or(0.0)
}

/// Split a Python-style list literal. Commas inside quotes are kept.
fn split_list_literal(raw: &str) -> Vec<String> {
    let inner = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    let mut items = vec![];
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in inner.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                ',' => items.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_authors_list_literal() {
        assert_eq!(
            parse_authors("['Terry Pratchett', \"Neil Gaiman\"]"),
            vec!["Terry Pratchett", "Neil Gaiman"]
        );
        assert_eq!(parse_authors("['Smith, John']"), vec!["Smith, John"]);
        assert_eq!(parse_authors("[\"Flann O'Brien\"]"), vec!["Flann O'Brien"]);
    }

    #[test]
    fn test_parse_authors_comma_separated() {
        assert_eq!(parse_authors("A. Author, B. Author ,"), vec!["A. Author", "B. Author"]);
        assert!(parse_authors("").is_empty());
    }

    #[test]
    fn test_parse_genres_separators() {
        assert_eq!(parse_genres("Fantasy; Humor|Fiction"), vec!["Fantasy", "Humor", "Fiction"]);
        assert_eq!(parse_genres("['Fantasy', 'Young Adult']"), vec!["Fantasy", "Young Adult"]);
    }

    #[test]
    fn test_parse_rating_coercion() {
        assert_eq!(parse_rating("4.25"), 4.25);
        assert_eq!(parse_rating(""), 0.0);
        assert_eq!(parse_rating("n/a"), 0.0);
        assert_eq!(parse_rating("NaN"), 0.0);
        assert_eq!(parse_rating("-3"), 0.0);
    }

    #[test]
    fn test_load_csv() {
        let file = write_csv(
            "title,series,author,rating,description,language,genres\n\
             Guards! Guards!,Discworld #8,Terry Pratchett,4.3,The watch.,English,\"['Fantasy', 'Humor']\"\n\
             El Aleph,,Jorge Luis Borges,,Cuentos.,spa,Short Stories\n",
        );

        let catalog = Catalog::load_csv(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = catalog.get(0).unwrap();
        assert_eq!(first.title, "Guards! Guards!");
        assert_eq!(first.series.as_deref(), Some("Discworld #8"));
        assert_eq!(first.author, vec!["Terry Pratchett"]);
        assert_eq!(first.genres, vec!["Fantasy", "Humor"]);
        assert_eq!(first.language_code, "en");
        assert_eq!(first.language_display, "English");
        assert_eq!(first.rating, 4.3);

        let second = catalog.get(1).unwrap();
        assert_eq!(second.id, 1);
        assert!(second.series.is_none());
        assert_eq!(second.rating, 0.0);
        assert_eq!(second.language_code, "es");
        assert_eq!(second.normalized_title, "el aleph");
    }

    #[test]
    fn test_series_column_is_optional() {
        let file = write_csv(
            "title,author,rating,description,language,genres\n\
             Dune,Frank Herbert,4.2,Spice.,English,Science Fiction\n",
        );
        let catalog = Catalog::load_csv(file.path()).unwrap();
        assert!(catalog.get(0).unwrap().series.is_none());
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv("title,author,rating,description,genres\nDune,Frank Herbert,4.2,Spice.,SF\n");
        let result = Catalog::load_csv(file.path());
        assert!(matches!(result, Err(CatalogError::MissingColumn("language"))));
    }

    #[test]
    fn test_missing_file() {
        let result = Catalog::load_csv("/nonexistent/books.csv");
        assert!(matches!(result, Err(CatalogError::Csv(_))));
    }
}
