// src/scorer.rs
//! Sentiment scoring backends.
//!
//! Every backend answers one question: the probability that a text is
//! positive. Models that emit per-class probabilities are mapped to that
//! number here, using the positive class index configured for each model,
//! so nothing downstream ever deals with class layouts.

use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AbsaError, Result};
use crate::lang::Language;
use crate::resources;

/// Positive-class probability for `text`. Must stay within `[0, 1]`.
pub trait SentimentScorer: Send + Sync {
    fn score_positive(&self, text: &str, lang: Language) -> Result<f64>;

    /// Short backend name for logs and error messages.
    fn name(&self) -> &str;
}

pub type DynScorer = Arc<dyn SentimentScorer>;

/* ----------------------------
Model configuration
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Lexicon,
    Http,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(Backend::Lexicon),
            "http" => Ok(Backend::Http),
            other => Err(format!("unknown scorer backend '{other}'")),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// One per-language classifier. `positive_index` is a calibration fact of the
/// model (which output class means "positive") and is never guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub positive_index: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ModelSpec {
    /// Defaults mirror the two reference models: the Indonesian classifier
    /// puts "positive" at index 0, the English one at index 1.
    pub fn default_for(lang: Language) -> Self {
        Self {
            backend: Backend::Lexicon,
            endpoint: None,
            api_key: None,
            positive_index: match lang {
                Language::Id => 0,
                Language::En => 1,
            },
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Pick the positive-class probability out of a class distribution.
pub fn probs_to_positive(probs: &[f64], positive_index: usize) -> Result<f64> {
    let p = probs.get(positive_index).copied().ok_or_else(|| {
        AbsaError::scorer(
            "probs",
            format!(
                "positive index {positive_index} out of range for {} classes",
                probs.len()
            ),
        )
    })?;
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(AbsaError::scorer("probs", format!("probability {p} outside [0, 1]")));
    }
    Ok(p)
}

/* ----------------------------
Offline lexicon scorer
---------------------------- */

static WORD_WEIGHTS: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../data/sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// How many preceding tokens a negator reaches.
const NEGATION_WINDOW: usize = 3;

/// Bilingual word-weight scorer with a short negation window, squashed to a
/// probability by a logistic curve. Needs no network and never fails.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    steepness: f64,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self { steepness: 0.8 }
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw polarity sum and token count.
    pub fn raw_score(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score = 0;
        for (i, w) in tokens.iter().enumerate() {
            let base = WORD_WEIGHTS.get(w.as_str()).copied().unwrap_or(0);
            if base == 0 {
                continue;
            }
            let negated = (1..=NEGATION_WINDOW)
                .any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }
        (score, tokens.len())
    }
}

impl SentimentScorer for LexiconScorer {
    fn score_positive(&self, text: &str, _lang: Language) -> Result<f64> {
        let (score, _) = self.raw_score(text);
        Ok(1.0 / (1.0 + (-self.steepness * f64::from(score)).exp()))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

// Mixed-language reviews are common, so both negator sets apply.
fn is_negator(tok: &str) -> bool {
    Language::ALL.iter().any(|l| resources::is_negation(*l, tok))
}

/* ----------------------------
Remote classifier over HTTP
---------------------------- */

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Accepts the common text-classification response shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Probs { probs: Vec<f64> },
}

impl ClassifyResponse {
    /// Class probabilities in class-index order.
    fn into_probs(self) -> Vec<f64> {
        let mut labelled = match self {
            ClassifyResponse::Probs { probs } => return probs,
            ClassifyResponse::Nested(mut v) => {
                if v.is_empty() {
                    Vec::new()
                } else {
                    v.swap_remove(0)
                }
            }
            ClassifyResponse::Flat(v) => v,
        };
        // "LABEL_1" style labels carry the class index; sort on it when all do.
        let indexed: Option<Vec<usize>> = labelled.iter().map(|l| label_index(&l.label)).collect();
        if let Some(idx) = indexed {
            let mut pairs: Vec<(usize, LabelScore)> = idx.into_iter().zip(labelled.drain(..)).collect();
            pairs.sort_by_key(|(i, _)| *i);
            return pairs.into_iter().map(|(_, l)| l.score).collect();
        }
        labelled.into_iter().map(|l| l.score).collect()
    }
}

fn label_index(label: &str) -> Option<usize> {
    label
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .ok()
}

/// Blocking client for a hosted classifier (e.g. a transformer behind an
/// inference endpoint). POSTs `{"inputs": text}` and reads class scores.
#[derive(Debug)]
pub struct HttpScorer {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    positive_index: usize,
    label: String,
}

impl HttpScorer {
    pub fn new(lang: Language, spec: &ModelSpec) -> Result<Self> {
        let endpoint = spec
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AbsaError::ModelUnavailable {
                language: lang,
                reason: "http backend needs an endpoint".into(),
            })?;
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_millis(spec.timeout_ms))
            .build()
            .map_err(|e| AbsaError::ModelUnavailable {
                language: lang,
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint,
            api_key: spec.api_key.clone(),
            positive_index: spec.positive_index,
            label: format!("http:{lang}"),
        })
    }
}

impl SentimentScorer for HttpScorer {
    fn score_positive(&self, text: &str, _lang: Language) -> Result<f64> {
        let mut req = self.http.post(&self.endpoint).json(&ClassifyRequest { inputs: text });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AbsaError::scorer(&self.label, e.to_string()))?;
        let body: ClassifyResponse = resp
            .json()
            .map_err(|e| AbsaError::scorer(&self.label, format!("bad response body: {e}")))?;
        let probs = body.into_probs();
        debug!(target: "absa", scorer = %self.label, classes = probs.len(), "classifier responded");
        probs_to_positive(&probs, self.positive_index).map_err(|e| match e {
            AbsaError::ScorerInvocation { reason, .. } => AbsaError::scorer(&self.label, reason),
            other => other,
        })
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/* ----------------------------
Registry (one scorer per language)
---------------------------- */

#[derive(Clone)]
pub struct ScorerRegistry {
    id: DynScorer,
    en: DynScorer,
}

impl std::fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("id", &self.id.name())
            .field("en", &self.en.name())
            .finish()
    }
}

impl ScorerRegistry {
    pub fn new(id: DynScorer, en: DynScorer) -> Self {
        Self { id, en }
    }

    /// Same scorer for both languages.
    pub fn uniform(scorer: DynScorer) -> Self {
        Self {
            id: scorer.clone(),
            en: scorer,
        }
    }

    /// Offline default: the lexicon scorer everywhere.
    pub fn offline() -> Self {
        Self::uniform(Arc::new(LexiconScorer::new()))
    }

    /// Build both scorers up front; any failure is `ModelUnavailable`.
    pub fn from_specs(id: &ModelSpec, en: &ModelSpec) -> Result<Self> {
        Ok(Self {
            id: build_scorer(Language::Id, id)?,
            en: build_scorer(Language::En, en)?,
        })
    }

    pub fn get(&self, lang: Language) -> &DynScorer {
        match lang {
            Language::Id => &self.id,
            Language::En => &self.en,
        }
    }
}

fn build_scorer(lang: Language, spec: &ModelSpec) -> Result<DynScorer> {
    let scorer: DynScorer = match spec.backend {
        Backend::Lexicon => Arc::new(LexiconScorer::new()),
        Backend::Http => Arc::new(HttpScorer::new(lang, spec)?),
    };
    info!(
        target: "absa",
        %lang,
        scorer = scorer.name(),
        positive_index = spec.positive_index,
        "sentiment scorer ready"
    );
    Ok(scorer)
}

static SHARED: OnceCell<ScorerRegistry> = OnceCell::new();

/// Process-wide registry, built once on first use. A failed build is not
/// cached: the next call tries again.
pub fn shared_registry(id: &ModelSpec, en: &ModelSpec) -> Result<&'static ScorerRegistry> {
    SHARED.get_or_try_init(|| ScorerRegistry::from_specs(id, en))
}
