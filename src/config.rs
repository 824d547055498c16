use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::recommend::{PoolSizing, DEFAULT_POOL_FACTOR, DEFAULT_POOL_FLOOR};
use crate::semantic::{EmbeddingModel, DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_MODEL};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_CATALOG_PATH: &str = "books.csv";
const DEFAULT_EMBEDDINGS_PATH: &str = "embeddings.bin";
const DEFAULT_QUERY_INDEX_PATH: &str = "query_index.bin";

/// Number of books returned when the caller does not ask for a count
const DEFAULT_TOP_N: usize = 5;
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Candidate pool sizing and request defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Pool multiplier applied to `top_n` before filtering
    #[serde(default = "default_pool_factor")]
    pub pool_factor: usize,

    /// Minimum number of extra candidates fetched over `top_n`
    #[serde(default = "default_pool_floor")]
    pub pool_floor: usize,

    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            pool_factor: DEFAULT_POOL_FACTOR,
            pool_floor: DEFAULT_POOL_FLOOR,
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

impl RecommendConfig {
    pub fn pool_sizing(&self) -> PoolSizing {
        PoolSizing {
            factor: self.pool_factor,
            floor: self.pool_floor,
        }
    }
}

fn default_pool_factor() -> usize {
    DEFAULT_POOL_FACTOR
}

fn default_pool_floor() -> usize {
    DEFAULT_POOL_FLOOR
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// Configuration for the text encoder used by semantic search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticSearchConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Characters of book text fed to the encoder
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl SemanticSearchConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn default_semantic_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_max_content_length() -> usize {
    DEFAULT_MAX_CONTENT_LENGTH
}

fn default_catalog_path() -> String {
    DEFAULT_CATALOG_PATH.to_string()
}

fn default_embeddings_path() -> String {
    DEFAULT_EMBEDDINGS_PATH.to_string()
}

fn default_query_index_path() -> String {
    DEFAULT_QUERY_INDEX_PATH.to_string()
}

/// `config.yaml` under the base directory. Relative paths are resolved
/// against the base directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: String,
    #[serde(default = "default_query_index_path")]
    pub query_index_path: String,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            embeddings_path: default_embeddings_path(),
            query_index_path: default_query_index_path(),
            recommend: RecommendConfig::default(),
            semantic_search: SemanticSearchConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let rec = &self.recommend;
        if rec.pool_factor == 0 {
            bail!("recommend.pool_factor must be greater than 0");
        }
        if rec.default_top_n == 0 {
            bail!("recommend.default_top_n must be greater than 0");
        }

        let sem = &self.semantic_search;
        if sem.download_timeout_secs == 0 {
            bail!("semantic_search.download_timeout_secs must be greater than 0");
        }
        if sem.max_content_length == 0 {
            bail!("semantic_search.max_content_length must be greater than 0");
        }
        if !EmbeddingModel::is_supported(&sem.model) {
            bail!("semantic_search.model '{}' is not supported", sem.model);
        }

        Ok(())
    }

    pub fn load_with(base_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_path)
            .with_context(|| format!("failed to create {}", base_path.display()))?;

        let config_path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !config_path.exists() {
            let config = Self {
                base_path: base_path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("{} is malformed", config_path.display()))?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.base_path.join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&config_path, config_str)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        Ok(())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.catalog_path)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.resolve(&self.embeddings_path)
    }

    pub fn query_index_path(&self) -> PathBuf {
        self.resolve(&self.query_index_path)
    }

    /// Where downloaded encoder models are cached.
    pub fn model_cache_dir(&self) -> PathBuf {
        self.base_path.clone()
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}
