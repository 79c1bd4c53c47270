// src/pipeline.rs
//! End-to-end review analysis.
//!
//! detect language → segment → clean each segment → match aspects → score
//! the segments that matched → aggregate per aspect; the global verdict comes
//! from one extra score of the whole cleaned review.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::{self, AspectVerdict, Label, Observation};
use crate::aspect::{match_aspects, AspectMatch};
use crate::error::Result;
use crate::lang::{self, DetectionSource, Language};
use crate::lexicon::Lexicon;
use crate::normalize::{KeywordSet, Normalizer};
use crate::scorer::ScorerRegistry;
use crate::segment::segment;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub global_label: Label,
    pub global_confidence: f64,
    pub aspect_verdicts: BTreeMap<String, AspectVerdict>,
    #[serde(rename = "detected_language")]
    pub language: Language,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentTrace {
    pub segment: String,
    pub cleaned: String,
    pub matches: Vec<AspectMatch>,
    /// Only segments with at least one match are scored.
    pub prob: Option<f64>,
}

/// Intermediate values of one analysis, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisTrace {
    pub language: Language,
    pub language_forced: bool,
    pub statistical_detection: bool,
    pub segments: Vec<SegmentTrace>,
    pub cleaned_text: String,
    pub global_prob: f64,
}

#[derive(Debug)]
pub struct Analyzer {
    normalizer: Normalizer,
    scorers: ScorerRegistry,
    use_stemming: bool,
}

impl Analyzer {
    pub fn new(scorers: ScorerRegistry) -> Self {
        Self {
            normalizer: Normalizer::default(),
            scorers,
            use_stemming: true,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_stemming(mut self, on: bool) -> Self {
        self.use_stemming = on;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn scorers(&self) -> &ScorerRegistry {
        &self.scorers
    }

    pub fn use_stemming(&self) -> bool {
        self.use_stemming
    }

    /// Clean `text` the way segments and the global text are cleaned.
    pub fn clean(&self, lexicon: &Lexicon, text: &str, lang: Language) -> String {
        self.normalizer
            .clean(text, lang, &lexicon.combined_keywords(), self.use_stemming)
    }

    pub fn analyze(
        &self,
        lexicon: &Lexicon,
        text: &str,
        language: Option<Language>,
    ) -> Result<AnalysisResult> {
        self.analyze_traced(lexicon, text, language).map(|(r, _)| r)
    }

    pub fn analyze_traced(
        &self,
        lexicon: &Lexicon,
        text: &str,
        language: Option<Language>,
    ) -> Result<(AnalysisResult, AnalysisTrace)> {
        let keywords = lexicon.combined_keywords();
        self.run(lexicon, &keywords, text, language)
    }

    /// Same as `analyze`, with the keyword set computed once by the caller.
    pub(crate) fn analyze_with_keywords(
        &self,
        lexicon: &Lexicon,
        keywords: &KeywordSet,
        text: &str,
        language: Option<Language>,
    ) -> Result<AnalysisResult> {
        self.run(lexicon, keywords, text, language).map(|(r, _)| r)
    }

    fn run(
        &self,
        lexicon: &Lexicon,
        keywords: &KeywordSet,
        text: &str,
        language: Option<Language>,
    ) -> Result<(AnalysisResult, AnalysisTrace)> {
        run(
            &self.normalizer,
            &self.scorers,
            self.use_stemming,
            lexicon,
            keywords,
            text,
            language,
        )
    }
}

fn run(
    normalizer: &Normalizer,
    scorers: &ScorerRegistry,
    use_stemming: bool,
    lexicon: &Lexicon,
    keywords: &KeywordSet,
    text: &str,
    language: Option<Language>,
) -> Result<(AnalysisResult, AnalysisTrace)> {
    let started = Instant::now();
    let digest = review_digest(text);

    let (lang, statistical) = match language {
        Some(l) => (l, false),
        None => {
            let (l, src) = lang::detect_with_source(text);
            (l, src == DetectionSource::Statistical)
        }
    };
    let scorer = scorers.get(lang);

    let mut traces = Vec::new();
    let mut hits = 0usize;
    for seg in segment(text, lang) {
        let cleaned = normalizer.clean(&seg, lang, keywords, use_stemming);
        let matches = match_aspects(&cleaned, lang, lexicon);
        let prob = if matches.is_empty() {
            None
        } else {
            hits += matches.len();
            // Segments are scored in their raw (lowercased) form.
            Some(scorer.score_positive(&seg, lang).inspect_err(|e| {
                crate::metrics::record_scorer_error(lang);
                warn!(target: "absa", review = %digest, %lang, error = %e, "segment scoring failed");
            })?)
        };
        debug!(target: "absa", review = %digest, matches = matches.len(), ?prob, "segment analysed");
        traces.push(SegmentTrace {
            segment: seg,
            cleaned,
            matches,
            prob,
        });
    }

    let observations = traces.iter().flat_map(|t| {
        t.matches.iter().filter_map(move |m| {
            t.prob.map(|prob| Observation {
                aspect: &m.aspect,
                trigger: &m.trigger,
                prob,
            })
        })
    });
    let aspect_verdicts = aggregate::aggregate_aspects(observations);

    let cleaned_text = normalizer.clean(text, lang, keywords, use_stemming);
    let global_input = if cleaned_text.is_empty() {
        text.to_lowercase()
    } else {
        cleaned_text.clone()
    };
    let global_prob = scorer.score_positive(&global_input, lang).inspect_err(|e| {
        crate::metrics::record_scorer_error(lang);
        warn!(target: "absa", review = %digest, %lang, error = %e, "global scoring failed");
    })?;

    let result = AnalysisResult {
        global_label: aggregate::label_for(global_prob),
        global_confidence: aggregate::confidence_for(global_prob),
        aspect_verdicts,
        language: lang,
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    crate::metrics::record_review(traces.len(), hits, elapsed_ms);
    info!(
        target: "absa",
        review = %digest,
        %lang,
        segments = traces.len(),
        aspects = result.aspect_verdicts.len(),
        global = %result.global_label,
        elapsed_ms,
        "review analysed"
    );

    let trace = AnalysisTrace {
        language: lang,
        language_forced: language.is_some(),
        statistical_detection: statistical,
        segments: traces,
        cleaned_text,
        global_prob,
    };
    Ok((result, trace))
}

static DEFAULT_NORMALIZER: Lazy<Normalizer> = Lazy::new(Normalizer::default);

/// One-shot analysis with the default normalizer and stemming on.
pub fn analyze(
    lexicon: &Lexicon,
    scorers: &ScorerRegistry,
    text: &str,
    language: Option<Language>,
) -> Result<AnalysisResult> {
    let keywords = lexicon.combined_keywords();
    run(&DEFAULT_NORMALIZER, scorers, true, lexicon, &keywords, text, language).map(|(r, _)| r)
}

/// Short SHA-256 prefix identifying a review in logs without its text.
pub(crate) fn review_digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbsaError;
    use crate::scorer::SentimentScorer;
    use std::sync::Arc;

    struct Fixed(f64);

    impl SentimentScorer for Fixed {
        fn score_positive(&self, _text: &str, _lang: Language) -> Result<f64> {
            Ok(self.0)
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    impl SentimentScorer for Broken {
        fn score_positive(&self, _text: &str, _lang: Language) -> Result<f64> {
            Err(AbsaError::scorer("broken", "offline"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    fn analyzer(p: f64) -> Analyzer {
        Analyzer::new(ScorerRegistry::uniform(Arc::new(Fixed(p))))
    }

    #[test]
    fn aspects_come_from_matching_segments() {
        let lex = Lexicon::builtin();
        let r = analyzer(0.9)
            .analyze(&lex, "suaranya jernih tapi iklannya banyak sekali", Some(Language::Id))
            .unwrap();
        let names: Vec<_> = r.aspect_verdicts.keys().cloned().collect();
        assert_eq!(names, vec!["Audio", "Iklan"]);
        assert_eq!(r.aspect_verdicts["Audio"].trigger, "suara");
        assert_eq!(r.global_label, Label::Positive);
        assert!((r.global_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn trace_skips_scoring_without_matches() {
        let lex = Lexicon::builtin();
        let (_, trace) = analyzer(0.7)
            .analyze_traced(&lex, "great experience overall, the ads are too loud", Some(Language::En))
            .unwrap();
        assert_eq!(trace.segments.len(), 2);
        assert_eq!(trace.segments[0].prob, None);
        assert_eq!(trace.segments[1].prob, Some(0.7));
        assert!(trace.language_forced);
    }

    #[test]
    fn scorer_failure_aborts_the_review() {
        let lex = Lexicon::builtin();
        let a = Analyzer::new(ScorerRegistry::uniform(Arc::new(Broken)));
        let err = a.analyze(&lex, "the ads are everywhere", Some(Language::En)).unwrap_err();
        assert!(matches!(err, AbsaError::ScorerInvocation { .. }));
    }

    #[test]
    fn free_function_agrees_with_analyzer() {
        let lex = Lexicon::builtin();
        let reg = ScorerRegistry::uniform(Arc::new(Fixed(0.3)));
        let text = "the song selection is great but the price is too expensive";
        let a = analyze(&lex, &reg, text, Some(Language::En)).unwrap();
        let b = Analyzer::new(reg).analyze(&lex, text, Some(Language::En)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn result_json_uses_public_field_names() {
        let lex = Lexicon::builtin();
        let r = analyzer(0.8)
            .analyze(&lex, "the ads are everywhere", Some(Language::En))
            .unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["detected_language"], "en");
        assert!(v.get("language").is_none());
        assert_eq!(v["global_label"], "Positive");
        assert!(v["aspect_verdicts"]["Ads"].is_object());
    }

    #[test]
    fn digest_is_short_and_stable() {
        assert_eq!(review_digest("abc").len(), 12);
        assert_eq!(review_digest("abc"), review_digest("abc"));
        assert_ne!(review_digest("abc"), review_digest("abd"));
    }
}
