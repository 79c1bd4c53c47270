// src/lang.rs
//! Language handling: the two supported review languages and detection.
//!
//! Detection runs whatlang first and trusts its top guess when that guess is
//! Indonesian or English, reliable or not. When it returns nothing or picks
//! some other language, a substring check for a few Indonesian function words
//! decides. Detection never fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Indonesian function words used by the fallback rule (substring match).
pub const FALLBACK_ID_MARKERS: [&str; 4] = ["yang", "dan", "di", "aku"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "en")]
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Id, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Id => "id",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "in" | "ind" | "indonesian" | "indonesia" => Ok(Language::Id),
            "en" | "eng" | "english" => Ok(Language::En),
            other => Err(format!("unsupported language '{other}' (expected 'id' or 'en')")),
        }
    }
}

/// Which rule produced the detected language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Statistical,
    Fallback,
}

/// Detect the review language; always resolves to `Id` or `En`.
pub fn detect_language(text: &str) -> Language {
    detect_with_source(text).0
}

pub fn detect_with_source(text: &str) -> (Language, DetectionSource) {
    let guess = whatlang::detect(text);
    match guess.as_ref().map(|i| i.lang()) {
        // Unreliable top guesses count too.
        Some(whatlang::Lang::Ind) => (Language::Id, DetectionSource::Statistical),
        Some(whatlang::Lang::Eng) => (Language::En, DetectionSource::Statistical),
        other => {
            debug!(
                target: "absa",
                guess = ?other,
                confidence = guess.as_ref().map(|i| i.confidence()),
                "language detection inconclusive, using marker fallback"
            );
            (fallback_language(text), DetectionSource::Fallback)
        }
    }
}

/// Marker heuristic: any Indonesian function word as a substring → `Id`.
pub fn fallback_language(text: &str) -> Language {
    let lower = text.to_lowercase();
    if FALLBACK_ID_MARKERS.iter().any(|m| lower.contains(m)) {
        Language::Id
    } else {
        Language::En
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_and_aliases() {
        assert_eq!("id".parse::<Language>().unwrap(), Language::Id);
        assert_eq!(" EN ".parse::<Language>().unwrap(), Language::En);
        assert_eq!("in".parse::<Language>().unwrap(), Language::Id);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn serde_uses_short_codes() {
        let s = serde_json::to_string(&Language::Id).unwrap();
        assert_eq!(s, "\"id\"");
        let l: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(l, Language::En);
    }

    #[test]
    fn fallback_finds_markers_case_insensitively() {
        assert_eq!(fallback_language("Aku suka"), Language::Id);
        assert_eq!(fallback_language("YANG penting"), Language::Id);
        assert_eq!(fallback_language("great app"), Language::En);
    }

    #[test]
    fn empty_text_resolves_without_error() {
        let (lang, src) = detect_with_source("");
        assert_eq!(lang, Language::En);
        assert_eq!(src, DetectionSource::Fallback);
    }

    #[test]
    fn short_indonesian_reviews_without_markers_stay_indonesian() {
        for text in ["iklan terus, males banget", "premium kemahalan buat pelajar"] {
            assert!(FALLBACK_ID_MARKERS.iter().all(|m| !text.contains(m)));
            assert_eq!(
                detect_with_source(text),
                (Language::Id, DetectionSource::Statistical),
                "{text}"
            );
        }
    }

    #[test]
    fn long_indonesian_text_is_detected() {
        let text = "Aplikasi ini sangat bagus dan saya suka sekali dengan fitur yang \
                    disediakan, tetapi iklannya terlalu banyak sehingga mengganggu \
                    pengalaman mendengarkan musik setiap hari.";
        assert_eq!(detect_language(text), Language::Id);
    }

    #[test]
    fn long_english_text_is_detected() {
        let text = "This application is really great and I enjoy listening to music \
                    every single day, although the advertisements are far too frequent \
                    and the subscription price keeps going up.";
        assert_eq!(detect_language(text), Language::En);
    }
}
