//! Settings for every stage, layered with Figment, plus path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__TOP_K=5`). Provides helpers to expand `~` and `${VAR}` and to
//! resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load with `base` as the directory holding the TOML files.
    pub fn load_from(base: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Config key '{key}' unreadable: {e}"))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if settings.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be a positive integer".into()).into());
        }
        if settings.retrieval.min_alpha_chars == 0 {
            return Err(Error::InvalidConfig("retrieval.min_alpha_chars must be at least 1".into()).into());
        }
        if settings.retrieval.source_columns.is_empty() {
            return Err(Error::InvalidConfig("retrieval.source_columns must name at least one column".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub models: ModelSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Raw Jira export.
    pub input_csv: String,
    /// Output of the prepare stage, input of the indexer.
    pub cleaned_csv: String,
    /// Rows aligned with the vector index.
    pub reference_csv: String,
    pub rewritten_csv: String,
    pub index_dir: String,
    pub index_table: String,
    pub insights_csv: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            input_csv: "apt_tickets_complete_cleaned.csv".into(),
            cleaned_csv: "data/jira_cleaned_ready.csv".into(),
            reference_csv: "data/jira_reference.csv".into(),
            rewritten_csv: "data/jira_reference_rewritten.csv".into(),
            index_dir: "data/jira_index.lance".into(),
            index_table: "tickets".into(),
            insights_csv: "data/generated_insights.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub chat_top_k: usize,
    pub max_top_k: usize,
    pub min_alpha_chars: usize,
    pub min_context_length: usize,
    pub preview_chars: usize,
    /// Source text columns, most preferred first.
    pub source_columns: Vec<String>,
    pub fallback_context: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            chat_top_k: 3,
            max_top_k: 50,
            min_alpha_chars: 10,
            min_context_length: 100,
            preview_chars: 800,
            source_columns: vec!["Rewritten_Text".into(), "Cleaned_Text".into(), "text".into()],
            fallback_context: crate::context::DEFAULT_FALLBACK_CONTEXT.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_dir: String,
    pub generator_dir: String,
    pub max_input_tokens: usize,
    pub insight_max_length: usize,
    pub answer_max_length: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding_dir: "models/all-MiniLM-L6-v2".into(),
            generator_dir: "models/flan-t5-base".into(),
            max_input_tokens: 512,
            insight_max_length: 700,
            answer_max_length: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub top_k: usize,
    /// Optional full export used to enrich search results.
    pub original_csv: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 5000, top_k: 5, original_csv: Some("apt_tickets_complete_cleaned.csv".into()) }
    }
}

/// `~` and `$VAR` / `${VAR}` expanded; unknown variables are left as written.
/// The result is not canonicalized.
pub fn expand_path<S: AsRef<str>>(raw: S) -> PathBuf {
    let raw = raw.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}

/// A configured path, expanded, and joined onto `base` unless absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, configured: S) -> PathBuf {
    let path = expand_path(configured);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
