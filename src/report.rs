// src/report.rs
//! Summary figures for a finished batch. Failed rows are counted apart and
//! never enter the sentiment tallies.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::aggregate::Label;
use crate::batch::BatchOutcome;
use crate::lang::Language;

pub const DEFAULT_TOP_TRIGGERS: usize = 25;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
}

impl LabelCounts {
    fn add(&mut self, label: Label) {
        match label {
            Label::Positive => self.positive += 1,
            Label::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerStat {
    pub keyword: String,
    pub positive: usize,
    pub negative: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Rows that were scored.
    pub total: usize,
    pub failed: usize,
    pub global: LabelCounts,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub languages: BTreeMap<Language, usize>,
    pub aspects: BTreeMap<String, LabelCounts>,
    /// Most frequent trigger keywords, split by the verdict they fed.
    pub top_triggers: Vec<TriggerStat>,
}

impl BatchReport {
    pub fn from_outcome(outcome: &BatchOutcome, top_n: usize) -> Self {
        let mut global = LabelCounts::default();
        let mut languages: BTreeMap<Language, usize> = BTreeMap::new();
        let mut aspects: BTreeMap<String, LabelCounts> = BTreeMap::new();
        let mut triggers: HashMap<&str, LabelCounts> = HashMap::new();

        for row in &outcome.rows {
            let r = &row.result;
            global.add(r.global_label);
            *languages.entry(r.language).or_default() += 1;
            for (aspect, verdict) in &r.aspect_verdicts {
                aspects.entry(aspect.clone()).or_default().add(verdict.label);
                for kw in verdict.trigger.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                    triggers.entry(kw).or_default().add(verdict.label);
                }
            }
        }

        let total = global.total();
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 / total as f64 * 100.0
            }
        };

        let mut top_triggers: Vec<TriggerStat> = triggers
            .into_iter()
            .map(|(kw, c)| TriggerStat {
                keyword: kw.to_string(),
                positive: c.positive,
                negative: c.negative,
                total: c.total(),
            })
            .collect();
        top_triggers.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.keyword.cmp(&b.keyword)));
        top_triggers.truncate(top_n);

        Self {
            total,
            failed: outcome.failures.len(),
            positive_pct: pct(global.positive),
            negative_pct: pct(global.negative),
            global,
            languages,
            aspects,
            top_triggers,
        }
    }
}
