use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AnalystError, Result};
use crate::models::{
    GeminiRequest, GeminiResponse, GenerationConfig, GoogleSearch, GroundingMetadata,
    ThinkingConfig, Tool,
};
use crate::prompt::{Prompt, TargetKind};
use crate::transport::Transport;

const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Raw free-text answer plus whatever the backend reported about its web lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedText {
    pub text: String,
    pub metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub report: String,
    pub comparison: String,
    pub chat: String,
    /// Thinking budget for report extraction; `None` leaves the model default.
    pub report_thinking_budget: Option<u32>,
}

impl ModelSelection {
    fn for_kind(&self, kind: TargetKind) -> &str {
        match kind {
            TargetKind::Report => &self.report,
            TargetKind::Comparison => &self.comparison,
            TargetKind::Chat => &self.chat,
        }
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Schema-constrained call. Returns the raw, unvalidated document text.
    async fn structured(&self, prompt: &Prompt) -> Result<String>;

    /// Tool-augmented call with live search enabled.
    async fn grounded(&self, prompt: &Prompt) -> Result<GroundedText>;
}

pub struct GeminiSynth {
    tx: Arc<dyn Transport>,
    models: ModelSelection,
}

impl GeminiSynth {
    pub fn new(tx: Arc<dyn Transport>, models: ModelSelection) -> Self {
        Self { tx, models }
    }

    fn structured_request(&self, prompt: &Prompt) -> GeminiRequest {
        let thinking_config = match prompt.kind {
            TargetKind::Report => self
                .models
                .report_thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            _ => None,
        };
        let mut request = GeminiRequest::from_instruction(&prompt.instruction);
        request.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(prompt.contract.response_schema()),
            thinking_config,
        });
        request
    }

    fn grounded_request(&self, prompt: &Prompt) -> GeminiRequest {
        let mut request = GeminiRequest::from_instruction(&prompt.instruction);
        request.tools.push(Tool {
            google_search: GoogleSearch {},
        });
        request
    }
}

/// Reject blocked or empty responses; otherwise return text and grounding metadata.
fn accept(response: GeminiResponse) -> Result<GroundedText> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(AnalystError::backend(format!("Prompt was blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalystError::backend("Gemini API returned no candidates"))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            return Err(AnalystError::backend(format!(
                "Response withheld by the backend: {reason}"
            )));
        }
    }

    let text = candidate.text();
    if text.trim().is_empty() {
        return Err(AnalystError::backend("Gemini API returned an empty payload"));
    }

    Ok(GroundedText {
        text,
        metadata: candidate.grounding_metadata,
    })
}

#[async_trait]
impl Synthesizer for GeminiSynth {
    async fn structured(&self, prompt: &Prompt) -> Result<String> {
        let model = self.models.for_kind(prompt.kind);
        tracing::info!(
            target_kind = prompt.kind.as_str(),
            model,
            "Requesting schema-constrained synthesis"
        );
        let response = self
            .tx
            .generate(model, &self.structured_request(prompt))
            .await?;
        Ok(accept(response)?.text)
    }

    async fn grounded(&self, prompt: &Prompt) -> Result<GroundedText> {
        let model = self.models.for_kind(prompt.kind);
        tracing::info!(model, "Requesting search-grounded answer");
        let response = self.tx.generate(model, &self.grounded_request(prompt)).await?;
        let grounded = accept(response)?;
        if let Some(metadata) = &grounded.metadata {
            tracing::debug!(
                queries = ?metadata.web_search_queries,
                chunks = metadata.grounding_chunks.len(),
                "Search grounding used"
            );
        }
        Ok(grounded)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Candidate, GeminiContent, GroundingChunk, Part, PromptFeedback, WebChunk};
    use crate::prompt::{self, Locator, Target};
    use crate::transport::MockTransport;

    pub(crate) fn models() -> ModelSelection {
        ModelSelection {
            report: "report-model".to_string(),
            comparison: "comparison-model".to_string(),
            chat: "chat-model".to_string(),
            report_thinking_budget: Some(8192),
        }
    }

    pub(crate) fn text_response(text: &str) -> GeminiResponse {
        GeminiResponse {
            candidates: vec![Candidate {
                content: Some(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![Part::text(text)],
                }),
                finish_reason: Some("STOP".to_string()),
                grounding_metadata: None,
            }],
            prompt_feedback: None,
        }
    }

    #[tokio::test]
    async fn structured_report_request_carries_schema_and_budget() {
        let mut mock = MockTransport::new();
        mock.expect_generate()
            .withf(|model, req| {
                let config = req.generation_config.as_ref().unwrap();
                model.to_string() == "report-model"
                    && req.tools.is_empty()
                    && config.response_mime_type.as_deref() == Some("application/json")
                    && config.response_schema.as_ref().unwrap()["required"]
                        .as_array()
                        .unwrap()
                        .len()
                        == 11
                    && config.thinking_config == Some(ThinkingConfig { thinking_budget: 8192 })
            })
            .times(1)
            .returning(|_, _| Ok(text_response("  {\"ok\": true}  ")));

        let synth = GeminiSynth::new(Arc::new(mock), models());
        let locator = Locator::parse("Kane Williamson");
        let prompt = prompt::build(Target::Report { locator: &locator });
        let raw = synth.structured(&prompt).await.unwrap();
        assert_eq!(raw, "  {\"ok\": true}  ");
    }

    #[tokio::test]
    async fn comparison_request_has_no_thinking_budget() {
        let mut mock = MockTransport::new();
        mock.expect_generate()
            .withf(|model, req| {
                model.to_string() == "comparison-model"
                    && req.generation_config.as_ref().unwrap().thinking_config.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(text_response("{}")));

        let synth = GeminiSynth::new(Arc::new(mock), models());
        let prompt = prompt::build(Target::Comparison {
            player_name: "Babar Azam",
        });
        assert!(synth.structured(&prompt).await.is_ok());
    }

    #[tokio::test]
    async fn grounded_request_enables_search_and_returns_metadata() {
        let mut mock = MockTransport::new();
        mock.expect_generate()
            .withf(|model, req| {
                model.to_string() == "chat-model" && req.tools.len() == 1 && req.generation_config.is_none()
            })
            .times(1)
            .returning(|_, _| {
                let mut resp = text_response("He scored a century.");
                resp.candidates[0].grounding_metadata = Some(GroundingMetadata {
                    grounding_chunks: vec![GroundingChunk {
                        web: Some(WebChunk {
                            uri: Some("https://a.com".into()),
                            title: Some("A".into()),
                        }),
                    }],
                    web_search_queries: vec![],
                });
                Ok(resp)
            });

        let synth = GeminiSynth::new(Arc::new(mock), models());
        let prompt = prompt::build(Target::Chat {
            player_name: "Steve Smith",
            question: "Latest score?",
        });
        let grounded = synth.grounded(&prompt).await.unwrap();
        assert_eq!(grounded.text, "He scored a century.");
        assert_eq!(grounded.metadata.unwrap().grounding_chunks.len(), 1);
    }

    #[tokio::test]
    async fn blocked_prompt_is_a_backend_failure() {
        let mut mock = MockTransport::new();
        mock.expect_generate().returning(|_, _| {
            Ok(GeminiResponse {
                candidates: vec![],
                prompt_feedback: Some(PromptFeedback {
                    block_reason: Some("SAFETY".to_string()),
                }),
            })
        });
        let synth = GeminiSynth::new(Arc::new(mock), models());
        let prompt = prompt::build(Target::Comparison { player_name: "X" });
        let err = synth.structured(&prompt).await.unwrap_err();
        assert!(matches!(err, AnalystError::Backend { .. }));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn empty_payload_and_safety_finish_are_backend_failures() {
        let mut mock = MockTransport::new();
        let mut responses = vec![
            {
                let mut resp = text_response("partial");
                resp.candidates[0].finish_reason = Some("SAFETY".to_string());
                resp
            },
            text_response("   "),
            GeminiResponse::default(),
        ];
        mock.expect_generate()
            .times(3)
            .returning(move |_, _| Ok(responses.remove(0)));

        let synth = GeminiSynth::new(Arc::new(mock), models());
        let prompt = prompt::build(Target::Comparison { player_name: "X" });
        for _ in 0..3 {
            let err = synth.structured(&prompt).await.unwrap_err();
            assert!(matches!(err, AnalystError::Backend { .. }), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn transport_errors_pass_through_without_retry() {
        let mut mock = MockTransport::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Err(AnalystError::Network("connection reset".to_string())));
        let synth = GeminiSynth::new(Arc::new(mock), models());
        let prompt = prompt::build(Target::Comparison { player_name: "X" });
        let err = synth.structured(&prompt).await.unwrap_err();
        assert!(matches!(err, AnalystError::Network(_)));
    }
}
