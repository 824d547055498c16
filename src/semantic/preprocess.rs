//! Text preprocessing for embedding generation.
//!
//! A book is embedded as `"<description>. Genres: <g1, g2, ...>"`, trimmed and
//! truncated to a maximum length with an ellipsis.

use crate::catalog::BookRecord;

/// Default maximum content length for embedding input (characters, not tokens)
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 1024;

/// Ellipsis suffix when content is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Build the embedding input for a book.
pub fn embedding_text(book: &BookRecord, max_length: usize) -> String {
    let genres = book
        .genres
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let content = format!("{}. Genres: {}", book.description.trim(), genres);
    truncate_content(content.trim(), max_length)
}

/// Truncate content to `max_length` characters, adding ellipsis if truncated.
fn truncate_content(content: &str, max_length: usize) -> String {
    if content.chars().count() <= max_length {
        return content.to_string();
    }

    let max_chars = max_length.saturating_sub(TRUNCATION_SUFFIX.len());
    let truncated: String = content.chars().take(max_chars).collect();

    format!("{}{}", truncated, TRUNCATION_SUFFIX)
}
