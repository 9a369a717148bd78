//! Typed application settings.
//!
//! Loaded from `config.yml` in the project root (or the path named by
//! `MANUALBOT_CONFIG_PATH`), with environment-variable overrides for
//! provider endpoints and credentials. Missing sections fall back to
//! defaults.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:8501".to_string(),
                "http://127.0.0.1:8501".to_string(),
            ],
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target parent chunk size in characters.
    pub parent_chunk_size: usize,
    /// Target child chunk size in characters.
    pub child_chunk_size: usize,
    /// Overlap carried between adjacent child chunks, in characters.
    pub child_chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            parent_chunk_size: 2000,
            child_chunk_size: 300,
            child_chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of parent chunks delivered to the generator.
    pub top_k: usize,
    /// Child-hit oversampling factor: `k' = top_k * candidate_multiplier`.
    pub candidate_multiplier: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            candidate_multiplier: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub max_batch_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            api_key: None,
            model: "all-mpnet-base-v2".to_string(),
            dimension: 768,
            max_batch_size: 32,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8088".to_string(),
            api_key: None,
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl Settings {
    pub fn load(paths: &AppPaths) -> Result<Self, ApiError> {
        let mut settings = match config_path(paths) {
            Some(path) => Self::read_config(&path)?,
            None => Settings::default(),
        };

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn read_config(path: &std::path::Path) -> Result<Self, ApiError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ApiError::internal(format!("failed to read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ApiError::internal(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("MANUALBOT_EMBEDDING_BASE_URL") {
            self.embedding.base_url = url;
        }
        if let Ok(key) = env::var("MANUALBOT_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Ok(url) = env::var("MANUALBOT_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(key) = env::var("MANUALBOT_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.chunking.parent_chunk_size == 0 || self.chunking.child_chunk_size == 0 {
            return Err(ApiError::invalid_input("chunk sizes must be positive"));
        }
        if self.chunking.child_chunk_size > self.chunking.parent_chunk_size {
            return Err(ApiError::invalid_input(
                "child_chunk_size must not exceed parent_chunk_size",
            ));
        }
        if self.chunking.child_chunk_overlap >= self.chunking.child_chunk_size {
            return Err(ApiError::invalid_input(
                "child_chunk_overlap must be smaller than child_chunk_size",
            ));
        }
        if self.retrieval.top_k == 0 || self.retrieval.candidate_multiplier == 0 {
            return Err(ApiError::invalid_input(
                "top_k and candidate_multiplier must be positive",
            ));
        }
        if self.embedding.dimension == 0 || self.embedding.max_batch_size == 0 {
            return Err(ApiError::invalid_input(
                "embedding dimension and batch size must be positive",
            ));
        }
        Ok(())
    }
}

fn config_path(paths: &AppPaths) -> Option<PathBuf> {
    if let Ok(path) = env::var("MANUALBOT_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }

    let user_config = paths.user_data_dir.join("config.yml");
    if user_config.exists() {
        return Some(user_config);
    }

    let project_config = paths.project_root.join("config.yml");
    if project_config.exists() {
        return Some(project_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunking.parent_chunk_size, 2000);
        assert_eq!(settings.chunking.child_chunk_size, 300);
        assert_eq!(settings.chunking.child_chunk_overlap, 50);
        assert_eq!(settings.retrieval.top_k, 5);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let settings: Settings =
            serde_yaml::from_str("retrieval:\n  top_k: 3\n").expect("partial config parses");
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.candidate_multiplier, 4);
        assert_eq!(settings.chunking.parent_chunk_size, 2000);
    }

    #[test]
    fn overlap_must_stay_below_child_size() {
        let mut settings = Settings::default();
        settings.chunking.child_chunk_overlap = settings.chunking.child_chunk_size;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn reads_config_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "server:\n  port: 9100\nchunking:\n  child_chunk_size: 400\n").unwrap();

        let settings = Settings::read_config(&path).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.chunking.child_chunk_size, 400);

        fs::write(&path, "chunking: [not, a, mapping]\n").unwrap();
        assert!(Settings::read_config(&path).is_err());
        assert!(Settings::read_config(&dir.path().join("missing.yml")).is_err());
    }
}
