// src/resources.rs
//! Static language resources embedded at compile time: slang map, stopword
//! lists, negation sets, and the Indonesian root dictionary used by the stemmer.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::lang::Language;

static SLANG_ID: Lazy<HashMap<String, String>> = Lazy::new(|| {
    let raw = include_str!("../data/slang_id.json");
    serde_json::from_str::<HashMap<String, String>>(raw).expect("valid slang map")
});

static STOPWORDS_ID: Lazy<HashSet<String>> =
    Lazy::new(|| word_list(include_str!("../data/stopwords_id.txt")));

static STOPWORDS_EN: Lazy<HashSet<String>> =
    Lazy::new(|| word_list(include_str!("../data/stopwords_en.txt")));

static ROOTS_ID: Lazy<HashSet<String>> =
    Lazy::new(|| word_list(include_str!("../data/roots_id.txt")));

/// Negators survive stopword removal: they flip the polarity of what follows.
const NEGATION_ID: &[&str] = &[
    "tidak", "bukan", "jangan", "belum", "tak", "tiada", "enggak", "nggak", "gak", "ga",
    "kurang", "tanpa",
];

// Contractions arrive split ("don't" -> "don t") after symbol stripping.
const NEGATION_EN: &[&str] = &[
    "not", "no", "nor", "never", "without", "cannot", "don", "don't", "didn", "didn't",
    "doesn", "doesn't", "isn", "isn't", "wasn", "wasn't", "aren", "aren't", "weren",
    "weren't", "won", "won't", "wouldn", "wouldn't", "couldn", "couldn't", "shouldn",
    "shouldn't", "hasn", "hasn't", "haven", "haven't", "hadn", "hadn't", "mustn",
    "mustn't", "needn", "needn't", "ain",
];

/// One word per line; `#` starts a comment line; stored lowercase.
fn word_list(raw: &str) -> HashSet<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

/// Indonesian slang → standard word. Values may hold several words.
pub fn slang_id() -> &'static HashMap<String, String> {
    &SLANG_ID
}

pub fn stopwords(lang: Language) -> &'static HashSet<String> {
    match lang {
        Language::Id => &STOPWORDS_ID,
        Language::En => &STOPWORDS_EN,
    }
}

pub fn negation_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Id => NEGATION_ID,
        Language::En => NEGATION_EN,
    }
}

pub fn is_negation(lang: Language, word: &str) -> bool {
    negation_words(lang).contains(&word)
}

pub fn roots_id() -> &'static HashSet<String> {
    &ROOTS_ID
}
