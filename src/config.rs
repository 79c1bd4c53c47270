// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::batch::FailurePolicy;
use crate::lang::Language;
use crate::normalize::DEFAULT_STEM_TOKEN_LIMIT;
use crate::report::DEFAULT_TOP_TRIGGERS;
use crate::scorer::{Backend, ModelSpec};

pub const DEFAULT_CONFIG_PATH: &str = "config/absa.toml";
pub const ENV_CONFIG_PATH: &str = "ABSA_CONFIG_PATH";
pub const ENV_BIND: &str = "ABSA_BIND";
pub const ENV_STEMMING: &str = "ABSA_STEMMING";
pub const ENV_SCORER: &str = "ABSA_SCORER";
pub const ENV_STEM_TOKEN_LIMIT: &str = "ABSA_STEM_TOKEN_LIMIT";
pub const ENV_MODEL_API_KEY: &str = "ABSA_MODEL_API_KEY";

const STEM_TOKEN_LIMIT_RANGE: (usize, usize) = (1, 512);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub use_stemming: bool,
    #[serde(default = "default_stem_token_limit")]
    pub stem_token_limit: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_top_triggers")]
    pub top_triggers: usize,
}

fn default_true() -> bool {
    true
}
fn default_stem_token_limit() -> usize {
    DEFAULT_STEM_TOKEN_LIMIT
}
fn default_top_triggers() -> usize {
    DEFAULT_TOP_TRIGGERS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_stemming: true,
            stem_token_limit: DEFAULT_STEM_TOKEN_LIMIT,
            failure_policy: FailurePolicy::SkipRow,
            top_triggers: DEFAULT_TOP_TRIGGERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_id_model")]
    pub id: ModelSpec,
    #[serde(default = "default_en_model")]
    pub en: ModelSpec,
}

fn default_id_model() -> ModelSpec {
    ModelSpec::default_for(Language::Id)
}
fn default_en_model() -> ModelSpec {
    ModelSpec::default_for(Language::En)
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            id: default_id_model(),
            en: default_en_model(),
        }
    }
}

impl ModelsConfig {
    pub fn get(&self, lang: Language) -> &ModelSpec {
        match lang {
            Language::Id => &self.id,
            Language::En => &self.en,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing app config")?;
        cfg.resolve_api_keys()?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $ABSA_CONFIG_PATH
    /// 2) config/absa.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var(ENV_BIND) {
            if !bind.trim().is_empty() {
                self.server.bind = bind.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var(ENV_STEMMING) {
            match parse_flag(&v) {
                Some(on) => self.pipeline.use_stemming = on,
                None => warn!(target: "absa", value = %v, "ignoring unparsable {ENV_STEMMING}"),
            }
        }
        if let Ok(v) = std::env::var(ENV_STEM_TOKEN_LIMIT) {
            match v.trim().parse::<usize>() {
                Ok(n) => self.pipeline.stem_token_limit = n,
                Err(_) => warn!(target: "absa", value = %v, "ignoring unparsable {ENV_STEM_TOKEN_LIMIT}"),
            }
        }
        if let Ok(v) = std::env::var(ENV_SCORER) {
            let backend: Backend = v.parse().map_err(|e: String| anyhow!(e))?;
            self.models.id.backend = backend;
            self.models.en.backend = backend;
        }
        self.sanitize();
        Ok(())
    }

    /// "ENV" means: read the key from $ABSA_MODEL_API_KEY.
    fn resolve_api_keys(&mut self) -> Result<()> {
        for spec in [&mut self.models.id, &mut self.models.en] {
            let wants_env = spec
                .api_key
                .as_deref()
                .is_some_and(|k| k.trim().eq_ignore_ascii_case("env"));
            if wants_env {
                match std::env::var(ENV_MODEL_API_KEY) {
                    Ok(key) => spec.api_key = Some(key),
                    Err(_) => bail!("Missing {ENV_MODEL_API_KEY} env var"),
                }
            }
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        let (lo, hi) = STEM_TOKEN_LIMIT_RANGE;
        self.pipeline.stem_token_limit = self.pipeline.stem_token_limit.clamp(lo, hi);
        if self.pipeline.top_triggers == 0 {
            self.pipeline.top_triggers = DEFAULT_TOP_TRIGGERS;
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
