// src/normalize.rs
//! Review text cleaning.
//!
//! `Normalizer::clean` is a fixed, ordered pipeline:
//!  1) lowercase
//!  2) strip URLs, @mentions and #hashtags
//!  3) drop standalone numbers (fused ones like "4g" stay)
//!  4) pad `. , ! ?` with spaces so they become tokens
//!  5) replace anything outside `[a-z0-9 .,!?]` with a space
//!  6) cap character runs at two ("baaanget" -> "baanget")
//!  7) collapse whitespace and trim
//!  8) prefix-normalize tokens against the bilingual keyword set
//!  9) tokenize
//! 10) Indonesian only: slang map, then stemming for short texts
//! 11) drop stopwords, keeping negators
//!
//! The order is part of the contract: moving a step changes outputs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::lang::Language;
use crate::resources;
use crate::stem::{IndonesianStemmer, StemError, Stemmer};

/// Texts with this many tokens or more skip stemming.
pub const DEFAULT_STEM_TOKEN_LIMIT: usize = 30;

/// Repetition cap used by step 6.
pub const MAX_REPEAT: usize = 2;

/// Lowercased keywords of every aspect in both languages.
pub type KeywordSet = HashSet<String>;

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+|www\S+|https\S+").expect("url regex"));
static RE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+|#\w+").expect("mention regex"));
static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").expect("number regex"));
static RE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.,!?])").expect("punct regex"));
static RE_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s.,!?]").expect("symbol regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

pub struct Normalizer {
    stemmer: Box<dyn Stemmer>,
    stem_token_limit: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Box::new(IndonesianStemmer::new()), DEFAULT_STEM_TOKEN_LIMIT)
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("stem_token_limit", &self.stem_token_limit)
            .finish_non_exhaustive()
    }
}

impl Normalizer {
    pub fn new(stemmer: Box<dyn Stemmer>, stem_token_limit: usize) -> Self {
        Self {
            stemmer,
            stem_token_limit,
        }
    }

    pub fn stem_token_limit(&self) -> usize {
        self.stem_token_limit
    }

    /// Clean `text` into space-joined tokens. May return an empty string.
    pub fn clean(
        &self,
        text: &str,
        lang: Language,
        keywords: &KeywordSet,
        use_stemming: bool,
    ) -> String {
        let surface = clean_surface(text);

        let mut tokens: Vec<String> = surface
            .split_whitespace()
            .map(|t| normalize_by_prefix(t, keywords))
            .collect();

        if lang == Language::Id {
            let slang = resources::slang_id();
            tokens = tokens
                .iter()
                .flat_map(|t| {
                    slang
                        .get(t)
                        .map_or(t.as_str(), String::as_str)
                        .split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect();

            if use_stemming && tokens.len() < self.stem_token_limit {
                match self.stem_tokens(&tokens, keywords) {
                    Ok(stemmed) => tokens = stemmed,
                    Err(e) => {
                        debug!(target: "absa", error = %e, "stemming failed, keeping unstemmed tokens");
                    }
                }
            }
        }

        let stops = resources::stopwords(lang);
        tokens.retain(|t| !stops.contains(t) || resources::is_negation(lang, t));
        tokens.join(" ")
    }

    /// Lexicon keywords count as roots: they are never reduced further.
    fn stem_tokens(&self, tokens: &[String], keywords: &KeywordSet) -> Result<Vec<String>, StemError> {
        let mut out = Vec::with_capacity(tokens.len());
        for t in tokens {
            if keywords.contains(t) {
                out.push(t.clone());
            } else {
                out.extend(self.stemmer.stem_text(t)?.split_whitespace().map(str::to_string));
            }
        }
        Ok(out)
    }
}

/// Steps 1–7: character-level cleanup, no lexicon involved.
pub fn clean_surface(text: &str) -> String {
    let mut out = text.to_lowercase();
    out = RE_URL.replace_all(&out, "").into_owned();
    out = RE_MENTION.replace_all(&out, "").into_owned();
    out = RE_NUMBER.replace_all(&out, "").into_owned();
    out = RE_PUNCT.replace_all(&out, " $1 ").into_owned();
    out = RE_SYMBOL.replace_all(&out, " ").into_owned();
    out = reduce_repeating_chars(&out, MAX_REPEAT);
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Cap every run of one character at `max_repeat` occurrences.
pub fn reduce_repeating_chars(text: &str, max_repeat: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for ch in text.chars() {
        if Some(ch) == prev {
            run += 1;
        } else {
            prev = Some(ch);
            run = 1;
        }
        if run <= max_repeat {
            out.push(ch);
        }
    }
    out
}

/// Replace `token` with the longest keyword that is a strict prefix of it.
/// A token that already is a keyword stays as it is.
pub fn normalize_by_prefix(token: &str, keywords: &KeywordSet) -> String {
    if keywords.contains(token) {
        return token.to_string();
    }
    (1..token.len())
        .rev()
        .filter(|&i| token.is_char_boundary(i))
        .map(|i| &token[..i])
        .find(|prefix| keywords.contains(*prefix))
        .unwrap_or(token)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> KeywordSet {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn prefix_rule_picks_longest_strict_prefix() {
        let k = kw(&["ui", "fitur", "lag", "lagu"]);
        assert_eq!(normalize_by_prefix("uinya", &k), "ui");
        assert_eq!(normalize_by_prefix("fiturnya", &k), "fitur");
        assert_eq!(normalize_by_prefix("lagunya", &k), "lagu");
        assert_eq!(normalize_by_prefix("lagu", &k), "lagu");
        assert_eq!(normalize_by_prefix("bagus", &k), "bagus");
    }

    #[test]
    fn prefix_rule_respects_char_boundaries() {
        let k = kw(&["caf", "café"]);
        assert_eq!(normalize_by_prefix("cafénya", &k), "café");
        assert_eq!(normalize_by_prefix("é", &k), "é");
        assert_eq!(normalize_by_prefix("", &k), "");
    }

    #[test]
    fn repeats_over_two_collapse_to_two() {
        assert_eq!(reduce_repeating_chars("baaaangeeeeet", 2), "baangeet");
        assert_eq!(reduce_repeating_chars("keren", 2), "keren");
        assert_eq!(reduce_repeating_chars("mantaapp", 2), "mantaapp");
        assert_eq!(reduce_repeating_chars("!!!!", 2), "!!");
    }

    #[test]
    fn surface_strips_noise_and_spaces_punctuation() {
        let s = clean_surface("Cek https://x.co/abc @spotify #music Bagus!! 100 kali, 4G oke");
        assert_eq!(s, "cek bagus ! ! kali , 4g oke");
    }

    #[test]
    fn symbols_become_separators() {
        assert_eq!(clean_surface("good/bad :) ok"), "good bad ok");
    }

    #[test]
    fn english_stopwords_go_negators_stay() {
        let n = Normalizer::default();
        let out = n.clean("This is not the app I wanted", Language::En, &kw(&[]), true);
        assert_eq!(out, "not app wanted");
    }

    #[test]
    fn indonesian_negator_survives() {
        let n = Normalizer::default();
        let out = n.clean("lagunya tidak bagus yang ini", Language::Id, &kw(&["lagu"]), true);
        assert_eq!(out, "lagu tidak bagus");
    }

    #[test]
    fn empty_and_all_stopword_inputs_give_empty() {
        let n = Normalizer::default();
        assert_eq!(n.clean("", Language::En, &kw(&[]), true), "");
        assert_eq!(n.clean("the and of", Language::En, &kw(&[]), true), "");
    }

    struct FailingStemmer;

    impl Stemmer for FailingStemmer {
        fn stem_word(&self, word: &str) -> Result<String, StemError> {
            Err(StemError::NonAscii(word.to_string()))
        }
    }

    #[test]
    fn stemming_failure_keeps_unstemmed_tokens() {
        let n = Normalizer::new(Box::new(FailingStemmer), DEFAULT_STEM_TOKEN_LIMIT);
        let out = n.clean("pembayarannya mahal", Language::Id, &kw(&[]), true);
        assert_eq!(out, "pembayarannya mahal");
    }

    #[test]
    fn long_texts_skip_stemming() {
        let n = Normalizer::default();
        let long = vec!["pembayaran"; 30].join(" ");
        let out = n.clean(&long, Language::Id, &kw(&[]), true);
        assert!(out.split(' ').all(|t| t == "pembayaran"));

        let short = n.clean("pembayaran", Language::Id, &kw(&[]), true);
        assert_eq!(short, "bayar");
    }

    #[test]
    fn stemming_can_be_disabled() {
        let n = Normalizer::default();
        assert_eq!(n.clean("pembayaran", Language::Id, &kw(&[]), false), "pembayaran");
    }

    #[test]
    fn keywords_are_not_stemmed() {
        let n = Normalizer::default();
        let out = n.clean("tampilan bagus", Language::Id, &kw(&["tampilan"]), true);
        assert_eq!(out, "tampilan bagus");
    }
}
