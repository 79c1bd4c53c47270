// src/batch.rs
//! Batch analysis of tabular review files (CSV in, CSV out).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{AbsaError, Result};
use crate::lexicon::Lexicon;
use crate::pipeline::{review_digest, AnalysisResult, Analyzer};

/// Header names recognised as the review text column (case-insensitive).
pub const TEXT_COLUMN_CANDIDATES: [&str; 7] = [
    "content",
    "review",
    "text",
    "ulasan",
    "komentar",
    "feedback",
    "reviewText",
];

pub const COL_ORIGINAL_TEXT: &str = "Original Text";
pub const COL_LANGUAGE: &str = "Language";
pub const COL_GLOBAL_SENTIMENT: &str = "Global Sentiment";
pub const COL_CONFIDENCE: &str = "Confidence";
pub const COL_ASPECTS_JSON: &str = "Aspects JSON";
pub const ASPECT_COLUMN_SUFFIX: &str = "_Sentiment";

/// Review texts pulled out of one input table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTable {
    pub headers: Vec<String>,
    pub text_column: String,
    pub texts: Vec<String>,
}

/// Pick the review text column: a known header name first, otherwise the
/// first column whose sampled values are not all numeric.
pub fn find_text_column(headers: &[String], sample: &[Vec<String>]) -> Option<usize> {
    if let Some(i) = headers.iter().position(|h| {
        TEXT_COLUMN_CANDIDATES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(h.trim()))
    }) {
        return Some(i);
    }
    (0..headers.len()).find(|&i| is_text_column(sample, i))
}

fn is_text_column(sample: &[Vec<String>], col: usize) -> bool {
    let mut values = sample
        .iter()
        .filter_map(|row| row.get(col))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .peekable();
    if values.peek().is_none() {
        // No evidence either way: an all-empty column is not text, an empty table is.
        return sample.is_empty();
    }
    values.any(|v| v.parse::<f64>().is_err())
}

/// Number of leading rows inspected when no header name matches.
const SAMPLE_ROWS: usize = 20;

pub fn read_reviews<R: Read>(reader: R, source: &str) -> Result<ReviewTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let unreadable = |reason: String| AbsaError::UnreadableFile {
        path: source.to_string(),
        reason,
    };

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| unreadable(format!("failed to read headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| unreadable(format!("row {}: {e}", line + 2)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let sample_len = rows.len().min(SAMPLE_ROWS);
    let col = find_text_column(&headers, &rows[..sample_len]).ok_or_else(|| {
        AbsaError::NoTextColumnFound {
            headers: headers.clone(),
        }
    })?;

    let texts = rows
        .into_iter()
        .map(|mut r| if col < r.len() { r.swap_remove(col) } else { String::new() })
        .collect();

    Ok(ReviewTable {
        text_column: headers[col].clone(),
        headers,
        texts,
    })
}

pub fn read_reviews_from_path(path: &Path) -> Result<ReviewTable> {
    let file = std::fs::File::open(path).map_err(|e| AbsaError::UnreadableFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    read_reviews(file, &path.display().to_string())
}

/* ----------------------------
Running
---------------------------- */

/// What to do when one row fails to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure, keep going; failed rows are left out of the output.
    #[default]
    SkipRow,
    /// Stop at the first failure and return its error.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    /// Zero-based position in the input table.
    pub index: usize,
    pub text: String,
    pub result: AnalysisResult,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub error: AbsaError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rows: Vec<BatchRow>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.rows.len() + self.failures.len()
    }
}

/// Analyse every text against one pinned lexicon.
pub fn run_batch(
    analyzer: &Analyzer,
    lexicon: &Lexicon,
    texts: &[String],
    policy: FailurePolicy,
) -> Result<BatchOutcome> {
    let keywords = lexicon.combined_keywords();
    let mut outcome = BatchOutcome::default();

    for (index, text) in texts.iter().enumerate() {
        match analyzer.analyze_with_keywords(lexicon, &keywords, text, None) {
            Ok(result) => outcome.rows.push(BatchRow {
                index,
                text: text.clone(),
                result,
            }),
            Err(error) => {
                warn!(target: "absa", row = index, review = %review_digest(text), kind = error.kind(), "row failed");
                if policy == FailurePolicy::Abort {
                    return Err(error);
                }
                outcome.failures.push(BatchFailure { index, error });
            }
        }
    }

    info!(
        target: "absa",
        rows = outcome.total(),
        ok = outcome.rows.len(),
        failed = outcome.failures.len(),
        "batch finished"
    );
    Ok(outcome)
}

/* ----------------------------
Export
---------------------------- */

/// `<Aspect>_Sentiment` columns, in first-seen order across rows.
pub fn aspect_columns(rows: &[BatchRow]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in rows {
        for aspect in row.result.aspect_verdicts.keys() {
            if !out.iter().any(|a| a == aspect) {
                out.push(aspect.clone());
            }
        }
    }
    out
}

/// UTF-8, comma-separated, header row, no index column.
pub fn write_csv<W: Write>(writer: W, rows: &[BatchRow]) -> Result<()> {
    let export = |e: csv::Error| AbsaError::Export(e.to_string());
    let aspects = aspect_columns(rows);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = [
        COL_ORIGINAL_TEXT,
        COL_LANGUAGE,
        COL_GLOBAL_SENTIMENT,
        COL_CONFIDENCE,
        COL_ASPECTS_JSON,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(aspects.iter().map(|a| format!("{a}{ASPECT_COLUMN_SUFFIX}")));
    wtr.write_record(&header).map_err(export)?;

    for row in rows {
        let r = &row.result;
        let aspects_json = serde_json::to_string(&r.aspect_verdicts)
            .map_err(|e| AbsaError::Export(e.to_string()))?;
        let mut record = vec![
            row.text.clone(),
            r.language.code().to_string(),
            r.global_label.to_string(),
            r.global_confidence.to_string(),
            aspects_json,
        ];
        record.extend(aspects.iter().map(|a| {
            r.aspect_verdicts
                .get(a)
                .map(|v| v.label.to_string())
                .unwrap_or_default()
        }));
        wtr.write_record(&record).map_err(export)?;
    }
    wtr.flush().map_err(|e| AbsaError::Export(e.to_string()))?;
    Ok(())
}

/// Download name for an export made at `now`: `result_<unix seconds>.csv`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("result_{}.csv", now.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn known_header_wins_case_insensitively() {
        let h = s(&["id", "score", "ReviewText"]);
        assert_eq!(find_text_column(&h, &[]), Some(2));
        let h = s(&["Ulasan", "content"]);
        assert_eq!(find_text_column(&h, &[]), Some(0));
    }

    #[test]
    fn falls_back_to_first_non_numeric_column() {
        let h = s(&["id", "rating", "body"]);
        let rows = vec![s(&["1", "5", "great app"]), s(&["2", "4.5", "slow"])];
        assert_eq!(find_text_column(&h, &rows), Some(2));
    }

    #[test]
    fn all_numeric_table_has_no_text_column() {
        let h = s(&["a", "b"]);
        let rows = vec![s(&["1", "2"])];
        assert_eq!(find_text_column(&h, &rows), None);
    }

    #[test]
    fn read_reviews_picks_column_and_pads_short_rows() {
        let csv = "userName,content,score\nbudi,lagunya bagus,5\nani\n";
        let t = read_reviews(csv.as_bytes(), "mem").unwrap();
        assert_eq!(t.text_column, "content");
        assert_eq!(t.texts, vec!["lagunya bagus".to_string(), String::new()]);
    }

    #[test]
    fn missing_text_column_is_reported() {
        let csv = "a,b\n1,2\n3,4\n";
        let err = read_reviews(csv.as_bytes(), "mem").unwrap_err();
        assert!(matches!(err, AbsaError::NoTextColumnFound { .. }));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = read_reviews_from_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, AbsaError::UnreadableFile { .. }));
    }

    #[test]
    fn export_name_uses_unix_seconds() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(export_file_name(now), "result_1700000000.csv");
    }
}
