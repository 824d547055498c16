//! Filtered, sorted and paginated catalog listing.

use serde::{Deserialize, Serialize};

use super::{sorting, BookRecord, Catalog};

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Highest rating first
    #[default]
    Rating,
    /// Title, letters before digits before symbols
    Title,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Matches books carrying any of these genres
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub order: SortOrder,

    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for BrowseQuery {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            genres: vec![],
            language: None,
            order: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BrowsePage<'a> {
    pub books: Vec<&'a BookRecord>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

/// Lowercased keyword, `None` when blank.
fn keyword(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

impl BrowseQuery {
    fn matches(&self, book: &BookRecord) -> bool {
        if let Some(title) = keyword(&self.title) {
            if !book.title.to_lowercase().contains(&title) {
                return false;
            }
        }

        if let Some(author) = keyword(&self.author) {
            if !book
                .author
                .iter()
                .any(|a| a.to_lowercase().contains(&author))
            {
                return false;
            }
        }

        let genres: Vec<String> = self
            .genres
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        if !genres.is_empty()
            && !book
                .genres
                .iter()
                .map(|g| g.to_lowercase())
                .any(|g| genres.iter().any(|wanted| g.contains(wanted)))
        {
            return false;
        }

        if let Some(language) = keyword(&self.language) {
            if book.language_code != language
                && !book.language_display.to_lowercase().contains(&language)
            {
                return false;
            }
        }

        true
    }
}

impl Catalog {
    pub fn browse(&self, query: &BrowseQuery) -> BrowsePage<'_> {
        let mut books: Vec<&BookRecord> = self
            .books()
            .iter()
            .filter(|book| query.matches(book))
            .collect();

        match query.order {
            SortOrder::Rating => books.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortOrder::Title => books.sort_by(|a, b| sorting::compare_titles(&a.title, &b.title)),
        }

        let total = books.len();
        let page_size = query.page_size.max(1);
        let pages = total.div_ceil(page_size).max(1);
        let page = query.page.clamp(1, pages);

        let books = books
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        BrowsePage {
            books,
            total,
            page,
            pages,
        }
    }
}
