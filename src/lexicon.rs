// src/lexicon.rs
//! Aspect lexicon: language → ordered aspects → ordered trigger keywords.
//!
//! Loaded from TOML (`config/lexicon.toml` shape, embedded as the builtin
//! default) and mutable at runtime through `add_keyword` / `add_aspect`.
//! Keywords are stored trimmed and lowercase, each with a precompiled
//! whole-word matcher. `LexiconHandle` is the shared session context.

use anyhow::{anyhow, Context};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::error::{AbsaError, Result};
use crate::lang::Language;
use crate::normalize::KeywordSet;

pub const DEFAULT_LEXICON_PATH: &str = "config/lexicon.toml";
pub const ENV_LEXICON_PATH: &str = "ABSA_LEXICON_PATH";

const BUILTIN_LEXICON: &str = include_str!("../config/lexicon.toml");

/// Minimum normalized Levenshtein similarity for a "did you mean" hint.
const SUGGESTION_MIN_SIMILARITY: f64 = 0.5;

/* ----------------------------
File schema (TOML / JSON)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconFile {
    #[serde(default)]
    pub id: Vec<AspectSpec>,
    #[serde(default)]
    pub en: Vec<AspectSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectSpec {
    pub aspect: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/* ----------------------------
Compiled structures
---------------------------- */

#[derive(Debug, Clone)]
pub struct Keyword {
    text: String,
    matcher: Regex,
}

impl Keyword {
    fn compile(raw: &str) -> Result<Self> {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return Err(AbsaError::InvalidKeyword {
                keyword: raw.to_string(),
                reason: "keyword is empty".into(),
            });
        }
        let pattern = format!(r"(?i)\b{}\b", regex::escape(&text));
        let matcher = Regex::new(&pattern).map_err(|e| AbsaError::InvalidKeyword {
            keyword: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { text, matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whole-word, case-insensitive occurrence in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

#[derive(Debug, Clone)]
pub struct Aspect {
    name: String,
    keywords: Vec<Keyword>,
}

impl Aspect {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    fn contains(&self, kw: &str) -> bool {
        let needle = kw.trim().to_lowercase();
        self.keywords.iter().any(|k| k.text == needle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    by_lang: HashMap<Language, Vec<Aspect>>,
}

impl Lexicon {
    /// The embedded default lexicon.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_LEXICON).expect("valid builtin lexicon")
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: LexiconFile =
            toml::from_str(s).map_err(|e| AbsaError::config(format!("lexicon toml: {e}")))?;
        Self::from_file(file)
    }

    pub fn from_file(file: LexiconFile) -> Result<Self> {
        let mut lex = Lexicon::default();
        for (lang, specs) in [(Language::Id, file.id), (Language::En, file.en)] {
            for spec in specs {
                let mut keywords = spec.keywords.into_iter();
                let first = keywords.next().ok_or_else(|| {
                    AbsaError::config(format!("aspect '{}' ({lang}) has no keywords", spec.aspect))
                })?;
                lex.add_aspect(lang, &spec.aspect, &first)?;
                for kw in keywords {
                    lex.add_keyword(lang, &spec.aspect, &kw)?;
                }
            }
        }
        Ok(lex)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        let lex = Self::from_toml_str(&content)
            .with_context(|| format!("parsing lexicon {}", path.display()))?;
        info!(target: "absa", path = %path.display(), aspects = lex.aspect_count(), "lexicon loaded");
        Ok(lex)
    }

    /// Load using env var + fallbacks:
    /// 1) $ABSA_LEXICON_PATH
    /// 2) config/lexicon.toml
    /// 3) builtin default
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_LEXICON_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_LEXICON_PATH} points to non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_LEXICON_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::builtin())
    }

    pub fn aspects(&self, lang: Language) -> &[Aspect] {
        self.by_lang.get(&lang).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn aspect(&self, lang: Language, name: &str) -> Option<&Aspect> {
        self.aspects(lang).iter().find(|a| a.name == name)
    }

    pub fn aspect_names(&self, lang: Language) -> Vec<&str> {
        self.aspects(lang).iter().map(Aspect::name).collect()
    }

    pub fn keywords(&self, lang: Language, aspect: &str) -> Option<Vec<&str>> {
        self.aspect(lang, aspect)
            .map(|a| a.keywords.iter().map(Keyword::as_str).collect())
    }

    pub fn aspect_count(&self) -> usize {
        self.by_lang.values().map(Vec::len).sum()
    }

    /// Union of both languages' keywords (prefix normalization draws from it).
    pub fn combined_keywords(&self) -> KeywordSet {
        self.by_lang
            .values()
            .flatten()
            .flat_map(|a| a.keywords.iter().map(|k| k.text.clone()))
            .collect()
    }

    /// Append `keyword` to an existing aspect. Returns `false` when it is
    /// already present (case-insensitive), leaving the lexicon unchanged.
    pub fn add_keyword(&mut self, lang: Language, aspect: &str, keyword: &str) -> Result<bool> {
        let suggestion = self.suggest_aspect(lang, aspect);
        let entry = self
            .by_lang
            .get_mut(&lang)
            .and_then(|v| v.iter_mut().find(|a| a.name == aspect))
            .ok_or_else(|| AbsaError::UnknownAspect {
                language: lang,
                aspect: aspect.to_string(),
                suggestion,
            })?;
        if entry.contains(keyword) {
            return Ok(false);
        }
        entry.keywords.push(Keyword::compile(keyword)?);
        Ok(true)
    }

    /// Create a new aspect bucket seeded with one keyword.
    pub fn add_aspect(&mut self, lang: Language, aspect: &str, first_keyword: &str) -> Result<()> {
        let name = aspect.trim();
        if name.is_empty() {
            return Err(AbsaError::config("aspect name is empty"));
        }
        if self.aspect(lang, name).is_some() {
            return Err(AbsaError::DuplicateAspect {
                language: lang,
                aspect: name.to_string(),
            });
        }
        let kw = Keyword::compile(first_keyword)?;
        self.by_lang.entry(lang).or_default().push(Aspect {
            name: name.to_string(),
            keywords: vec![kw],
        });
        Ok(())
    }

    fn suggest_aspect(&self, lang: Language, wanted: &str) -> Option<String> {
        let wanted = wanted.to_lowercase();
        self.aspects(lang)
            .iter()
            .map(|a| (a.name.as_str(), strsim::normalized_levenshtein(&wanted, &a.name.to_lowercase())))
            .filter(|(_, sim)| *sim >= SUGGESTION_MIN_SIMILARITY)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name.to_string())
    }

    /// Plain-data view, in lexicon order.
    pub fn to_file(&self) -> LexiconFile {
        let spec = |lang| {
            self.aspects(lang)
                .iter()
                .map(|a| AspectSpec {
                    aspect: a.name.clone(),
                    keywords: a.keywords.iter().map(|k| k.text.clone()).collect(),
                })
                .collect()
        };
        LexiconFile {
            id: spec(Language::Id),
            en: spec(Language::En),
        }
    }

    /// Export the live lexicon in the same TOML shape it is loaded from.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(&self.to_file()).map_err(|e| AbsaError::config(format!("lexicon toml: {e}")))
    }
}

/// Shared, lock-protected lexicon. Analyses take a read lock (or a snapshot);
/// mutations take the write lock, so they never interleave with a read.
#[derive(Clone, Debug)]
pub struct LexiconHandle {
    inner: Arc<RwLock<Lexicon>>,
}

impl LexiconHandle {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            inner: Arc::new(RwLock::new(lexicon)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Lexicon) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Clone the current lexicon (e.g. to pin it for a whole batch run).
    pub fn snapshot(&self) -> Lexicon {
        self.read(Lexicon::clone)
    }

    pub fn add_keyword(&self, lang: Language, aspect: &str, keyword: &str) -> Result<bool> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let added = guard.add_keyword(lang, aspect, keyword)?;
        if added {
            info!(target: "absa", %lang, aspect, keyword, "keyword added");
        }
        Ok(added)
    }

    pub fn add_aspect(&self, lang: Language, aspect: &str, first_keyword: &str) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.add_aspect(lang, aspect, first_keyword)?;
        info!(target: "absa", %lang, aspect, "aspect created");
        Ok(())
    }
}
