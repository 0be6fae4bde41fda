pub mod chat;
pub mod config;
pub mod decode;
pub mod error;
pub mod grounding;
pub mod models;
pub mod prompt;
pub mod schema;
pub mod service;
pub mod sessions;
pub mod synth;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{AnalystError, Result};
use crate::models::{ChatTurn, ComparisonRecord, PlayerReport};
use crate::prompt::{Locator, Target};
use crate::sessions::{SessionRegistry, parse_session_id};
use crate::synth::{GeminiSynth, Synthesizer};
use crate::transport::{GeminiTransport, Transport};

/// Report, comparison and chat operations over one synthesis backend.
pub struct CricketAnalyst {
    synth: Arc<dyn Synthesizer>,
    sessions: SessionRegistry,
}

/// A freshly opened chat session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpenedChat {
    pub session_id: String,
    pub transcript: Vec<ChatTurn>,
}

impl CricketAnalyst {
    pub fn new(cfg: &Config) -> Result<Self> {
        let transport = Arc::new(GeminiTransport::new(
            cfg.gemini.api_key.clone(),
            cfg.gemini.base_url.clone(),
            cfg.request_timeout(),
        )?);
        let synth = GeminiSynth::new(transport as Arc<dyn Transport>, cfg.model_selection());
        Ok(Self::with_synthesizer(Arc::new(synth)))
    }

    pub fn with_synthesizer(synth: Arc<dyn Synthesizer>) -> Self {
        Self {
            sessions: SessionRegistry::new(Arc::clone(&synth)),
            synth,
        }
    }

    pub async fn synthesize_report(&self, locator: &str) -> Result<PlayerReport> {
        if locator.trim().is_empty() {
            return Err(AnalystError::Validation(
                "A profile URL or player name is required".to_string(),
            ));
        }
        let locator = Locator::parse(locator);
        tracing::info!(locator = locator.as_str(), "Synthesizing player report");
        let prompt = prompt::build(Target::Report { locator: &locator });
        let raw = self.synth.structured(&prompt).await?;
        let report = decode::decode_report(&raw).inspect_err(|e| {
            tracing::warn!(locator = locator.as_str(), "Report failed to decode: {}", e);
        })?;
        tracing::info!(player = %report.player_name, "Player report ready");
        Ok(report)
    }

    pub async fn synthesize_comparison(&self, player_name: &str) -> Result<ComparisonRecord> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(AnalystError::Validation(
                "A player name is required for comparison".to_string(),
            ));
        }
        tracing::info!(player = player_name, "Synthesizing comparison record");
        let prompt = prompt::build(Target::Comparison { player_name });
        let raw = self.synth.structured(&prompt).await?;
        let record = decode::decode_comparison(&raw).inspect_err(|e| {
            tracing::warn!(player = player_name, "Comparison failed to decode: {}", e);
        })?;
        Ok(record)
    }

    pub async fn start_chat(&self, player_name: &str) -> Result<OpenedChat> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(AnalystError::Validation(
                "A player name is required to start a chat".to_string(),
            ));
        }
        let (id, session) = self.sessions.open(player_name).await;
        Ok(OpenedChat {
            session_id: id.to_string(),
            transcript: session.transcript(),
        })
    }

    pub async fn submit_chat_turn(&self, session_id: &str, text: &str) -> Result<ChatTurn> {
        let id = parse_session_id(session_id)?;
        let session = self.sessions.get(&id).await?;
        session.submit(text).await
    }

    pub async fn chat_transcript(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
        let id = parse_session_id(session_id)?;
        Ok(self.sessions.get(&id).await?.transcript())
    }

    pub async fn end_chat(&self, session_id: &str) -> Result<bool> {
        let id = parse_session_id(session_id)?;
        Ok(self.sessions.close(&id).await)
    }
}
