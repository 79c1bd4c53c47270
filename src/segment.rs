// src/segment.rs
//! Clause segmentation on punctuation and contrastive connectives.
//!
//! Delimiters are consumed, never emitted. Connectives are matched as whole
//! words, longest phrase first ("akan tetapi" before "tetapi").

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lang::Language;

/// Fragments with fewer tokens than this are dropped.
pub const MIN_SEGMENT_TOKENS: usize = 2;

pub const CONNECTIVES_ID: &[&str] = &[
    "tapi", "tp", "tetapi", "namun", "melainkan", "akan tetapi", "padahal", "sedangkan",
    "sebaliknya", "justru", "walaupun", "walau", "meskipun", "meski", "kendati", "biarpun",
    "cuma", "cman", "cma", "cm", "hanya", "hanya saja", "sayang", "sayangnya", "syg",
    "disayangkan", "kecuali", "selain itu",
];

pub const CONNECTIVES_EN: &[&str] = &[
    "but", "however", "yet", "nevertheless", "nonetheless", "although", "though",
    "even though", "albeit", "despite", "in spite of", "regardless", "while", "whereas",
    "on the other hand", "except", "exception", "unless", "barring", "unfortunately",
    "sadly", "regrettably", "pity",
];

static SPLIT_ID: Lazy<Regex> = Lazy::new(|| delimiter_regex(CONNECTIVES_ID));
static SPLIT_EN: Lazy<Regex> = Lazy::new(|| delimiter_regex(CONNECTIVES_EN));

fn delimiter_regex(connectives: &[&str]) -> Regex {
    let mut words: Vec<&str> = connectives.to_vec();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"[.!?;]|,\s|\b(?:{alternation})\b")).expect("segment delimiter regex")
}

fn splitter(lang: Language) -> &'static Regex {
    match lang {
        Language::Id => &SPLIT_ID,
        Language::En => &SPLIT_EN,
    }
}

/// Split a review into lowercase clauses of at least two tokens each.
/// Falls back to the whole (trimmed) text when nothing qualifies.
pub fn segment(text: &str, lang: Language) -> Vec<String> {
    let lower = text.to_lowercase();
    let segments: Vec<String> = splitter(lang)
        .split(&lower)
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() >= MIN_SEGMENT_TOKENS)
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        vec![text.trim().to_string()]
    } else {
        segments
    }
}
