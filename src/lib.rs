// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod aspect;
pub mod batch;
pub mod config;
pub mod error;
pub mod lang;
pub mod lexicon;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod resources;
pub mod scorer;
pub mod segment;
pub mod stem;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{AspectVerdict, Label};
pub use crate::api::create_router;
pub use crate::error::{AbsaError, Result};
pub use crate::lang::Language;
pub use crate::lexicon::{Lexicon, LexiconHandle};
pub use crate::pipeline::{analyze, AnalysisResult, Analyzer};
pub use crate::scorer::{ScorerRegistry, SentimentScorer};
