//! Turns untrusted model output into typed records.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Reverse;

use crate::error::DecodeFailure;
use crate::grounding::{GroundingAdapter, filter_sources};
use crate::models::{ChatAnswer, ComparisonRecord, OpponentPerformance, PlayerReport};
use crate::prompt::{TIME_WINDOW_YEARS, TOP_DISMISSALS, TOP_OPPONENTS};
use crate::schema::{self, Contract};
use crate::synth::GroundedText;

/// A record produced by schema-constrained synthesis.
pub trait Contracted: DeserializeOwned {
    fn contract() -> &'static Contract;

    /// Apply local cardinality bounds after a successful decode.
    fn enforce_bounds(&mut self) {}
}

impl Contracted for PlayerReport {
    fn contract() -> &'static Contract {
        &schema::PLAYER_REPORT
    }

    fn enforce_bounds(&mut self) {
        self.performance_over_time.sort_by_key(|p| p.year);
        if self.performance_over_time.len() > TIME_WINDOW_YEARS {
            let excess = self.performance_over_time.len() - TIME_WINDOW_YEARS;
            self.performance_over_time.drain(..excess);
            tracing::warn!(excess, "Trimmed performance-over-time to the most recent years");
        }

        if self.dismissal_analysis.len() > TOP_DISMISSALS {
            self.dismissal_analysis.sort_by_key(|d| Reverse(d.count));
            tracing::warn!(
                returned = self.dismissal_analysis.len(),
                "Trimmed dismissal analysis to the most frequent methods"
            );
            self.dismissal_analysis.truncate(TOP_DISMISSALS);
        }

        keep_most_frequent(&mut self.performance_vs_country, "country");
        keep_most_frequent(&mut self.performance_vs_opponent, "opponent");
    }
}

impl Contracted for ComparisonRecord {
    fn contract() -> &'static Contract {
        &schema::COMPARISON
    }
}

fn keep_most_frequent(rows: &mut Vec<OpponentPerformance>, label: &str) {
    if rows.len() <= TOP_OPPONENTS {
        return;
    }
    rows.sort_by_key(|r| Reverse(r.matches));
    tracing::warn!(
        returned = rows.len(),
        breakdown = label,
        "Trimmed breakdown to the most frequent rows"
    );
    rows.truncate(TOP_OPPONENTS);
}

fn parse_document(raw: &str) -> Result<Value, DecodeFailure> {
    serde_json::from_str(raw.trim()).map_err(|e| DecodeFailure::MalformedDocument(e.to_string()))
}

/// Parse, validate against `T`'s contract, then deserialize. Never returns a partial record.
pub fn decode<T: Contracted>(raw: &str) -> Result<T, DecodeFailure> {
    let contract = T::contract();
    let doc = parse_document(raw)?;
    contract.validate(&doc)?;
    let mut record: T = serde_json::from_value(doc)
        .map_err(|e| DecodeFailure::violation(contract.name, e.to_string()))?;
    record.enforce_bounds();
    Ok(record)
}

pub fn decode_report(raw: &str) -> Result<PlayerReport, DecodeFailure> {
    decode(raw)
}

pub fn decode_comparison(raw: &str) -> Result<ComparisonRecord, DecodeFailure> {
    decode(raw)
}

/// Free text is taken as-is; citations are filtered from the grounding metadata.
pub fn decode_chat(grounded: &GroundedText) -> Result<ChatAnswer, DecodeFailure> {
    let sources = match &grounded.metadata {
        Some(metadata) => filter_sources(metadata.source_candidates()),
        None => Vec::new(),
    };
    let answer = ChatAnswer {
        text: grounded.text.clone(),
        sources,
    };
    let doc = serde_json::to_value(&answer)
        .map_err(|e| DecodeFailure::MalformedDocument(e.to_string()))?;
    schema::CHAT_ANSWER.validate(&doc)?;
    Ok(answer)
}
