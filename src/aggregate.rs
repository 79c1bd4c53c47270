// src/aggregate.rs
//! Thresholding and per-aspect aggregation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Probabilities strictly above this are positive; exactly 0.5 is negative.
pub const POSITIVE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Positive => "Positive",
            Label::Negative => "Negative",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn label_for(p: f64) -> Label {
    if p > POSITIVE_THRESHOLD {
        Label::Positive
    } else {
        Label::Negative
    }
}

/// Confidence in the winning label.
pub fn confidence_for(p: f64) -> f64 {
    match label_for(p) {
        Label::Positive => p,
        Label::Negative => 1.0 - p,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectVerdict {
    pub label: Label,
    pub score: f64,
    /// Distinct triggers, first-seen order, joined with ", ".
    pub trigger: String,
}

/// One scored trigger: the segment's positive probability and what fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a> {
    pub aspect: &'a str,
    pub trigger: &'a str,
    pub prob: f64,
}

/// Average each aspect's probabilities and threshold the mean.
pub fn aggregate_aspects<'a, I>(observations: I) -> BTreeMap<String, AspectVerdict>
where
    I: IntoIterator<Item = Observation<'a>>,
{
    let mut store: BTreeMap<&str, (Vec<f64>, Vec<&str>)> = BTreeMap::new();
    for obs in observations {
        let (probs, triggers) = store.entry(obs.aspect).or_default();
        probs.push(obs.prob);
        if !triggers.contains(&obs.trigger) {
            triggers.push(obs.trigger);
        }
    }

    store
        .into_iter()
        .map(|(aspect, (probs, triggers))| {
            let avg = probs.iter().sum::<f64>() / probs.len() as f64;
            let verdict = AspectVerdict {
                label: label_for(avg),
                score: confidence_for(avg),
                trigger: triggers.join(", "),
            };
            (aspect.to_string(), verdict)
        })
        .collect()
}
