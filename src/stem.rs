// src/stem.rs
//! Indonesian stemming.
//!
//! Dictionary-backed confix stripping in the Nazief–Adriani / ECS family:
//! inflectional suffixes first (`-lah -kah -tah -pun`, then `-ku -mu -nya`),
//! then one derivational suffix (`-kan -an -i`), then up to three prefix layers
//! with the usual morphophonemic restorations (`meny- → s`, `meng- → k`,
//! `mem- → p`, `men- → t`). A word is only reduced when some candidate is a
//! known root; otherwise it comes back unchanged, so coverage is bounded by
//! `data/roots_id.txt`.

use std::collections::HashSet;

use crate::resources;

/// Fallible stemming contract. Callers decide the fallback on error.
pub trait Stemmer: Send + Sync {
    fn stem_word(&self, word: &str) -> Result<String, StemError>;

    /// Stem each whitespace-separated word; any failure fails the whole text.
    fn stem_text(&self, text: &str) -> Result<String, StemError> {
        let words = text
            .split_whitespace()
            .map(|w| self.stem_word(w))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StemError {
    #[error("cannot stem non-ASCII token '{0}'")]
    NonAscii(String),
}

const PARTICLES: [&str; 4] = ["lah", "kah", "tah", "pun"];
const POSSESSIVES: [&str; 3] = ["nya", "ku", "mu"];
const DERIVATIONAL: [&str; 3] = ["kan", "an", "i"];
const MAX_PREFIX_LAYERS: usize = 3;
const MIN_STEM_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct IndonesianStemmer {
    roots: HashSet<String>,
}

impl Default for IndonesianStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl IndonesianStemmer {
    /// Stemmer over the embedded root dictionary.
    pub fn new() -> Self {
        Self {
            roots: resources::roots_id().clone(),
        }
    }

    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            roots: roots.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    fn is_root(&self, w: &str) -> bool {
        self.roots.contains(w)
    }

    fn find_root(&self, word: &str) -> Option<String> {
        if self.is_root(word) {
            return Some(word.to_string());
        }

        // w0 = word, then progressively stripped forms.
        let mut chain = vec![word.to_string()];
        let mut current = word.to_string();
        for group in [&PARTICLES[..], &POSSESSIVES[..], &DERIVATIONAL[..]] {
            if let Some(stripped) = strip_suffix_any(&current, group) {
                if self.is_root(&stripped) {
                    return Some(stripped);
                }
                chain.push(stripped.clone());
                current = stripped;
            }
        }

        // Most stripped form first, then give suffixes back one at a time.
        chain
            .iter()
            .rev()
            .find_map(|form| self.strip_prefixes(form, MAX_PREFIX_LAYERS))
    }

    fn strip_prefixes(&self, word: &str, depth: usize) -> Option<String> {
        if depth == 0 {
            return None;
        }
        for cand in prefix_candidates(word) {
            if self.is_root(&cand) {
                return Some(cand);
            }
            if let Some(found) = self.strip_prefixes(&cand, depth - 1) {
                return Some(found);
            }
        }
        None
    }
}

impl Stemmer for IndonesianStemmer {
    fn stem_word(&self, word: &str) -> Result<String, StemError> {
        if !word.is_ascii() {
            return Err(StemError::NonAscii(word.to_string()));
        }
        // Digits, punctuation and short words pass through.
        if word.len() <= 3 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return Ok(word.to_string());
        }
        Ok(self.find_root(word).unwrap_or_else(|| word.to_string()))
    }
}

fn strip_suffix_any(word: &str, suffixes: &[&str]) -> Option<String> {
    suffixes.iter().find_map(|s| {
        word.strip_suffix(s)
            .filter(|rest| rest.len() >= MIN_STEM_LEN)
            .map(str::to_string)
    })
}

fn starts_with_vowel(s: &str) -> bool {
    matches!(s.as_bytes().first(), Some(b'a' | b'e' | b'i' | b'o' | b'u'))
}

fn starts_with_any(s: &str, letters: &[u8]) -> bool {
    s.as_bytes().first().is_some_and(|b| letters.contains(b))
}

/// Root candidates after removing one prefix layer, most specific rule first.
fn prefix_candidates(word: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for p in ["meny", "peny"] {
        if let Some(r) = word.strip_prefix(p) {
            if starts_with_vowel(r) {
                out.push(format!("s{r}"));
            }
        }
    }
    for p in ["meng", "peng"] {
        if let Some(r) = word.strip_prefix(p) {
            out.push(r.to_string());
            if starts_with_vowel(r) {
                out.push(format!("k{r}"));
            }
        }
    }
    for p in ["mem", "pem"] {
        if let Some(r) = word.strip_prefix(p) {
            if starts_with_any(r, b"bpf") {
                out.push(r.to_string());
            }
            if starts_with_vowel(r) {
                out.push(format!("p{r}"));
                out.push(format!("m{r}"));
            }
        }
    }
    for p in ["men", "pen"] {
        if let Some(r) = word.strip_prefix(p) {
            if starts_with_any(r, b"cdjzt") {
                out.push(r.to_string());
            }
            if starts_with_vowel(r) {
                out.push(format!("t{r}"));
                out.push(format!("n{r}"));
            }
        }
    }
    for p in ["me", "pe"] {
        if let Some(r) = word.strip_prefix(p) {
            if starts_with_any(r, b"lrwymn") {
                out.push(r.to_string());
            }
        }
    }
    for p in ["ber", "ter", "per", "be", "te", "di", "ke", "se"] {
        if let Some(r) = word.strip_prefix(p) {
            out.push(r.to_string());
        }
    }

    out.retain(|c| c.len() >= MIN_STEM_LEN);
    out.dedup();
    out
}
