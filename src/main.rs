use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use homedir::my_home;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod catalog;
mod cli;
mod config;
mod recommend;
mod semantic;
#[cfg(test)]
mod tests;

use catalog::{BrowseQuery, Catalog};
use cli::Command;
use config::Config;
use recommend::{Engine, QueryRequest, SimilarRequest};
use semantic::builder::{build_embeddings, build_query_index, load_embeddings};
use semantic::{EmbeddingModel, MatrixStorage, TextEncoder};

const BASE_PATH_ENV: &str = "SHELFWISE_BASE_PATH";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let base_path = match args.base_path {
        Some(base_path) => base_path,
        None => default_base_path()?,
    };
    let config = Config::load_with(&base_path)?;

    match args.command {
        Command::Similar {
            title,
            exclude_series,
            exclude_author,
            top_n,
            seed,
            pool,
        } => {
            let engine = Engine::open(&config, None)?;
            let request = SimilarRequest {
                title,
                exclude_series,
                exclude_author,
                top_n: top_n.unwrap_or(config.recommend.default_top_n),
            };

            if pool {
                match engine.similar_pool(&request) {
                    Ok(candidates) => print_json(&candidates),
                    Err(err) => print_json(&recommend::Recommendation::from(err)),
                }
            } else {
                let rec = match seed {
                    Some(seed) => {
                        engine.recommend_similar_with(&request, &mut StdRng::seed_from_u64(seed))
                    }
                    None => engine.recommend_similar(
                        &request.title,
                        request.exclude_series,
                        request.exclude_author,
                        request.top_n,
                    ),
                };
                print_json(&rec)
            }
        }

        Command::Search {
            query,
            language,
            min_rating,
            top_n,
            seed,
            pool,
        } => {
            let engine = Engine::open(&config, load_encoder(&config))?;
            let request = QueryRequest {
                query,
                language,
                min_rating,
                top_n: top_n.unwrap_or(config.recommend.default_top_n),
            };

            if pool {
                match engine.query_pool(&request) {
                    Ok(candidates) => print_json(&candidates),
                    Err(err) => print_json(&recommend::Recommendation::from(err)),
                }
            } else {
                let rec = match seed {
                    Some(seed) => {
                        engine.recommend_by_query_with(&request, &mut StdRng::seed_from_u64(seed))
                    }
                    None => engine.recommend_by_query(
                        &request.query,
                        request.language.as_deref(),
                        request.min_rating,
                        request.top_n,
                    ),
                };
                print_json(&rec)
            }
        }

        Command::Browse {
            title,
            author,
            genres,
            language,
            order,
            page,
            page_size,
        } => {
            let catalog = Catalog::load_csv(config.catalog_path())?;
            let query = BrowseQuery {
                title,
                author,
                genres,
                language,
                order,
                page,
                page_size,
            };
            print_json(&catalog.browse(&query))
        }

        Command::Titles { fragment, limit } => {
            let catalog = Catalog::load_csv(config.catalog_path())?;
            print_json(&catalog.suggest_titles(&fragment, limit))
        }

        Command::Languages => {
            let catalog = Catalog::load_csv(config.catalog_path())?;
            print_json(&catalog.languages())
        }

        Command::Genres => {
            let catalog = Catalog::load_csv(config.catalog_path())?;
            print_json(&catalog.genres())
        }

        Command::Status => {
            let engine = Engine::open(&config, load_encoder(&config))?;
            print_json(&engine.status())
        }

        Command::BuildIndex { reuse_embeddings } => build_index(&config, reuse_embeddings),
    }
}

fn default_base_path() -> Result<PathBuf> {
    if let Ok(base_path) = std::env::var(BASE_PATH_ENV) {
        return Ok(PathBuf::from(base_path));
    }

    let home = my_home()
        .context("could not determine home directory")?
        .context("home directory path is empty")?;
    Ok(home.join(".local/share/shelfwise"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_encoder(config: &Config) -> Result<EmbeddingModel> {
    let sem = &config.semantic_search;
    let model = EmbeddingModel::new(
        &sem.model,
        config.model_cache_dir(),
        Some(sem.download_timeout()),
    )?;
    Ok(model)
}

/// The configured encoder, or `None` (logged) when it cannot be loaded.
fn load_encoder(config: &Config) -> Option<Arc<dyn TextEncoder>> {
    match open_encoder(config) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            log::error!("Failed to load embedding model: {e}");
            None
        }
    }
}

#[derive(Serialize)]
struct BuildSummary {
    books: usize,
    dimensions: usize,
    model: String,
    embeddings_path: PathBuf,
    query_index_path: PathBuf,
}

fn build_index(config: &Config, reuse_embeddings: bool) -> Result<()> {
    let catalog = Catalog::load_csv(config.catalog_path())?;
    if catalog.is_empty() {
        anyhow::bail!("{} has no books to index", config.catalog_path().display());
    }
    let embeddings_storage = MatrixStorage::new(config.embeddings_path());
    let index_storage = MatrixStorage::new(config.query_index_path());

    let (embeddings, model) = if reuse_embeddings {
        let embeddings = load_embeddings(&catalog, &embeddings_storage).with_context(|| {
            format!(
                "failed to reuse embeddings from {}",
                embeddings_storage.path().display()
            )
        })?;
        (embeddings, config.semantic_search.model.clone())
    } else {
        let encoder = open_encoder(config)?;

        let progress = ProgressBar::new(catalog.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} books ({eta})")?,
        );

        let embeddings = build_embeddings(
            &encoder,
            &catalog,
            config.semantic_search.max_content_length,
            &embeddings_storage,
            &progress,
        )?;
        (embeddings, encoder.name().to_string())
    };

    let index = build_query_index(&embeddings, &index_storage)?;
    log::info!(
        "Wrote query index for {} books to {}",
        index.len(),
        index_storage.path().display()
    );

    print_json(&BuildSummary {
        books: catalog.len(),
        dimensions: index.dimensions(),
        model,
        embeddings_path: embeddings_storage.path().to_path_buf(),
        query_index_path: index_storage.path().to_path_buf(),
    })
}
