use anyhow::{Context, Result};
use bankline_import::DEFAULT_SAMPLE_ROWS;
use bankline_oracle::LlmConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATABASE_ENV: &str = "BANKLINE_DATABASE";
pub const DEFAULT_KEY_ENV: &str = "BANKLINE_ORACLE_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults to `bankline.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
    pub log_filter: String,
    pub oracle: OracleSection,
    pub import: ImportSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    /// Bound on one categorization call.
    pub categorize_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub sample_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: "info".to_string(),
            oracle: OracleSection::default(),
            import: ImportSection::default(),
        }
    }
}

impl Default for OracleSection {
    fn default() -> Self {
        let llm = LlmConfig::default();
        Self {
            base_url: llm.base_url,
            model: llm.model,
            api_key_env: DEFAULT_KEY_ENV.to_string(),
            timeout_secs: llm.timeout.as_secs(),
            max_tokens: llm.max_tokens,
            categorize_timeout_secs: 20,
        }
    }
}

impl Default for ImportSection {
    fn default() -> Self {
        Self { sample_rows: DEFAULT_SAMPLE_ROWS }
    }
}

impl OracleSection {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(self.timeout_secs),
            max_tokens: self.max_tokens,
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "bankline", "Bankline").context("no home directory for bankline")
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("bankline.toml"))
}

/// Reads the config file if present, then applies environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    let mut config = if path.exists() {
        let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        parse_config(&s).with_context(|| format!("parse {}", path.display()))?
    } else {
        Config::default()
    };
    if let Ok(db) = std::env::var(DATABASE_ENV) {
        if !db.trim().is_empty() {
            config.database_path = Some(PathBuf::from(db));
        }
    }
    Ok(config)
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

impl Config {
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(project_dirs()?.data_dir().join("bankline.db")),
        }
    }
}
