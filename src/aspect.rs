// src/aspect.rs
//! Keyword-based aspect detection over a cleaned segment.

use serde::Serialize;

use crate::lang::Language;
use crate::lexicon::Lexicon;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AspectMatch {
    pub aspect: String,
    pub trigger: String,
}

/// One match per aspect, in lexicon order. Within an aspect the first keyword
/// (lexicon order) found as a whole word wins.
pub fn match_aspects(segment: &str, lang: Language, lexicon: &Lexicon) -> Vec<AspectMatch> {
    lexicon
        .aspects(lang)
        .iter()
        .filter_map(|aspect| {
            aspect
                .keywords()
                .iter()
                .find(|kw| kw.is_match(segment))
                .map(|kw| AspectMatch {
                    aspect: aspect.name().to_string(),
                    trigger: kw.as_str().to_string(),
                })
        })
        .collect()
}
