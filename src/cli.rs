use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog::SortOrder;

#[derive(Parser, Debug)]
#[command(version, about = "Book recommendations from a catalog of embeddings", long_about = None)]
pub struct Args {
    /// Directory holding config.yaml and the data files
    /// (defaults to $SHELFWISE_BASE_PATH or ~/.local/share/shelfwise)
    #[clap(long, global = true)]
    pub base_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Books similar to a title from the catalog
    Similar {
        /// Exact title of the reference book (case-insensitive)
        title: String,

        /// Skip books in the same series
        #[clap(long, default_value = "false")]
        exclude_series: bool,

        /// Skip books sharing an author
        #[clap(long, default_value = "false")]
        exclude_author: bool,

        /// Number of books to return
        #[clap(short = 'n', long)]
        top_n: Option<usize>,

        /// Seed for reproducible picks
        #[clap(long)]
        seed: Option<u64>,

        /// Print the whole filtered candidate pool instead of a random pick
        #[clap(long, default_value = "false")]
        pool: bool,
    },

    /// Books matching a free-text description
    Search {
        /// What the book should be about
        query: String,

        /// Language code or name (e.g. "en", "English")
        #[clap(short, long)]
        language: Option<String>,

        /// Minimum average rating
        #[clap(short = 'r', long, default_value = "0")]
        min_rating: f32,

        /// Number of books to return
        #[clap(short = 'n', long)]
        top_n: Option<usize>,

        /// Seed for reproducible picks
        #[clap(long)]
        seed: Option<u64>,

        /// Print the whole filtered candidate pool instead of a random pick
        #[clap(long, default_value = "false")]
        pool: bool,
    },

    /// Page through the catalog
    Browse {
        /// Title contains
        #[clap(short, long)]
        title: Option<String>,

        /// Author contains
        #[clap(short, long)]
        author: Option<String>,

        /// Genre contains (repeatable, any of)
        #[clap(short, long = "genre")]
        genres: Vec<String>,

        /// Language code or name contains
        #[clap(short, long)]
        language: Option<String>,

        #[clap(long, value_enum, default_value_t = SortOrder::Rating)]
        order: SortOrder,

        #[clap(long, default_value = "1")]
        page: usize,

        #[clap(long, default_value = "20")]
        page_size: usize,
    },

    /// Catalog titles containing a fragment
    Titles {
        fragment: String,

        #[clap(long, default_value = "20")]
        limit: usize,
    },

    /// Distinct languages in the catalog
    Languages,

    /// Distinct genres in the catalog
    Genres,

    /// Catalog size and which searches are available
    Status,

    /// Embed the catalog and write the embedding and query-index files
    BuildIndex {
        /// Keep the existing embedding file and only rebuild the query index
        #[clap(long, default_value = "false")]
        reuse_embeddings: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_similar() {
        let args = Args::try_parse_from([
            "shelfwise",
            "similar",
            "Dune",
            "--exclude-author",
            "-n",
            "3",
            "--seed",
            "9",
        ])
        .unwrap();

        match args.command {
            Command::Similar {
                title,
                exclude_series,
                exclude_author,
                top_n,
                seed,
                pool,
            } => {
                assert_eq!(title, "Dune");
                assert!(!exclude_series);
                assert!(exclude_author);
                assert_eq!(top_n, Some(3));
                assert_eq!(seed, Some(9));
                assert!(!pool);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_browse_with_global_base_path() {
        let args = Args::try_parse_from([
            "shelfwise",
            "browse",
            "--genre",
            "fantasy",
            "--genre",
            "horror",
            "--order",
            "title",
            "--base-path",
            "/tmp/books",
        ])
        .unwrap();

        assert_eq!(args.base_path, Some(PathBuf::from("/tmp/books")));
        match args.command {
            Command::Browse { genres, order, page, .. } => {
                assert_eq!(genres, vec!["fantasy", "horror"]);
                assert_eq!(order, SortOrder::Title);
                assert_eq!(page, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
