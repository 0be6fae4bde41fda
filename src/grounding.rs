//! Citation extraction from retrieval-grounding metadata.

use std::collections::HashSet;

use crate::models::{GroundingMetadata, Source};

/// A citation as reported by the backend, before any validity check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCandidate {
    pub uri: Option<String>,
    pub title: Option<String>,
}

impl SourceCandidate {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            title: Some(title.into()),
        }
    }
}

/// Narrow view over a provider's grounding payload.
pub trait GroundingAdapter {
    fn source_candidates(&self) -> Vec<SourceCandidate>;
}

impl GroundingAdapter for GroundingMetadata {
    fn source_candidates(&self) -> Vec<SourceCandidate> {
        self.grounding_chunks
            .iter()
            .map(|chunk| match &chunk.web {
                Some(web) => SourceCandidate {
                    uri: web.uri.clone(),
                    title: web.title.clone(),
                },
                None => SourceCandidate::default(),
            })
            .collect()
    }
}

/// Keep candidates carrying both a non-empty uri and title, first occurrence per uri wins.
pub fn filter_sources<I>(candidates: I) -> Vec<Source>
where
    I: IntoIterator<Item = SourceCandidate>,
{
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    let mut dropped = 0usize;

    for candidate in candidates {
        let (Some(uri), Some(title)) = (candidate.uri, candidate.title) else {
            dropped += 1;
            continue;
        };
        if uri.trim().is_empty() || title.trim().is_empty() || !seen.insert(uri.clone()) {
            dropped += 1;
            continue;
        }
        sources.push(Source { uri, title });
    }

    if dropped > 0 {
        tracing::warn!(
            kept = sources.len(),
            dropped,
            "Filtered grounding citations"
        );
    }
    sources
}
