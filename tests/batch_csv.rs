// tests/batch_csv.rs
//
// CSV batch flow: column detection, per-row failures, export layout, report.

use std::sync::Arc;

use review_absa::batch::{self, FailurePolicy};
use review_absa::error::{AbsaError, Result};
use review_absa::lang::Language;
use review_absa::lexicon::Lexicon;
use review_absa::pipeline::Analyzer;
use review_absa::report::BatchReport;
use review_absa::scorer::{ScorerRegistry, SentimentScorer};

/// Fails on any text mentioning "boom", otherwise positive above 0.5
/// when the text mentions a liked word.
struct Picky;

impl SentimentScorer for Picky {
    fn score_positive(&self, text: &str, _lang: Language) -> Result<f64> {
        if text.contains("boom") {
            return Err(AbsaError::scorer("picky", "refused"));
        }
        Ok(if text.contains("bagus") || text.contains("great") {
            0.9
        } else {
            0.2
        })
    }

    fn name(&self) -> &str {
        "picky"
    }
}

fn analyzer() -> Analyzer {
    Analyzer::new(ScorerRegistry::uniform(Arc::new(Picky)))
}

const INPUT: &str = "\
reviewId,userName,Content,score
1,budi,\"lagunya bagus dan lengkap, tapi iklannya yang muncul terlalu banyak setiap hari\",4
2,ann,the ads boom every minute,1
3,sri,the sound quality is great and the playlist feature works well,5
";

#[test]
fn skip_policy_reports_failed_rows_and_keeps_going() {
    let table = batch::read_reviews(INPUT.as_bytes(), "input.csv").unwrap();
    assert_eq!(table.text_column, "Content");
    assert_eq!(table.texts.len(), 3);

    let lex = Lexicon::builtin();
    let outcome = batch::run_batch(&analyzer(), &lex, &table.texts, FailurePolicy::SkipRow).unwrap();
    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert_eq!(outcome.failures[0].error.kind(), "scorer_invocation");
    assert_eq!(outcome.rows[1].index, 2);

    // The failed row is neither positive nor negative in the report.
    let report = BatchReport::from_outcome(&outcome, 10);
    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.global.total(), 2);
}

#[test]
fn abort_policy_returns_the_row_error() {
    let table = batch::read_reviews(INPUT.as_bytes(), "input.csv").unwrap();
    let err = batch::run_batch(&analyzer(), &Lexicon::builtin(), &table.texts, FailurePolicy::Abort)
        .unwrap_err();
    assert!(matches!(err, AbsaError::ScorerInvocation { .. }));
}

#[test]
fn export_has_fixed_columns_then_aspect_columns() {
    let table = batch::read_reviews(INPUT.as_bytes(), "input.csv").unwrap();
    let outcome = batch::run_batch(
        &analyzer(),
        &Lexicon::builtin(),
        &table.texts,
        FailurePolicy::SkipRow,
    )
    .unwrap();

    let mut buf = Vec::new();
    batch::write_csv(&mut buf, &outcome.rows).unwrap();

    let mut rdr = csv::Reader::from_reader(buf.as_slice());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(
        &headers[..5],
        &["Original Text", "Language", "Global Sentiment", "Confidence", "Aspects JSON"]
    );
    let aspect_cols: Vec<&str> = headers[5..].iter().map(String::as_str).collect();
    assert_eq!(
        aspect_cols,
        vec!["Audio_Sentiment", "Iklan_Sentiment", "Features_Sentiment"]
    );

    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);

    // Row 1 (Indonesian): both aspects filled, JSON parses back.
    let first = &records[0];
    assert_eq!(
        &first[0],
        "lagunya bagus dan lengkap, tapi iklannya yang muncul terlalu banyak setiap hari"
    );
    assert_eq!(&first[1], "id");
    assert_eq!(&first[5], "Positive");
    assert_eq!(&first[6], "Negative");
    assert_eq!(&first[7], "");
    let aspects: serde_json::Value = serde_json::from_str(&first[4]).unwrap();
    assert_eq!(aspects["Audio"]["trigger"], "lagu");

    // Row 3 (English): shares the Audio column, leaves Iklan empty.
    let second = &records[1];
    assert_eq!(&second[1], "en");
    assert_eq!(&second[5], "Positive");
    assert_eq!(&second[6], "");
    assert_eq!(&second[7], "Positive");
}

#[test]
fn unreadable_and_columnless_inputs_stop_before_processing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.csv");
    assert!(matches!(
        batch::read_reviews_from_path(&missing),
        Err(AbsaError::UnreadableFile { .. })
    ));

    let numeric = dir.path().join("numbers.csv");
    std::fs::write(&numeric, "a,b\n1,2\n3,4.5\n").unwrap();
    assert!(matches!(
        batch::read_reviews_from_path(&numeric),
        Err(AbsaError::NoTextColumnFound { .. })
    ));
}

#[test]
fn first_text_column_is_used_without_a_known_header() {
    let csv = "id,rating,body\n1,5,great sound\n2,1,too many ads\n";
    let table = batch::read_reviews(csv.as_bytes(), "mem").unwrap();
    assert_eq!(table.text_column, "body");
    assert_eq!(table.texts, vec!["great sound", "too many ads"]);
}
