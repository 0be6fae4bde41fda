use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::CricketAnalyst;
use crate::config::Config;
use crate::error::AnalystError;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GenerateReportParams {
    /// Profile URL (e.g. an ESPNcricinfo player page) or the player's name
    pub locator: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ComparePlayerParams {
    /// Name of the player to summarise for a side-by-side comparison
    pub player_name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct StartChatParams {
    /// Player the conversation is about
    pub player_name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SendChatParams {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SessionParams {
    pub session_id: String,
}

/// MCP front end for [`CricketAnalyst`]
#[derive(Clone)]
pub struct AnalystService {
    tool_router: ToolRouter<Self>,
    analyst: Arc<CricketAnalyst>,
    config: Arc<Config>,
}

impl AnalystService {
    pub fn new(analyst: Arc<CricketAnalyst>, config: Arc<Config>) -> Self {
        tracing::info!(server = %config.server.name, "Analyst service initialized");
        Self {
            tool_router: Self::tool_router(),
            analyst,
            config,
        }
    }
}

/// Caller mistakes become invalid-params; everything else is an internal error carrying `summary`.
fn to_error_data(tool: &str, e: AnalystError, summary: &str) -> ErrorData {
    match &e {
        AnalystError::Validation(_)
        | AnalystError::SessionNotFound { .. }
        | AnalystError::SessionBusy { .. } => {
            tracing::warn!("{} rejected: {}", tool, e);
            ErrorData::invalid_params(e.to_string(), None)
        }
        _ => {
            tracing::error!("{} error: {}", tool, e);
            ErrorData::internal_error(format!("{summary} ({e})"), None)
        }
    }
}

fn json_result<T: Serialize>(value: T) -> Result<CallToolResult, ErrorData> {
    let content = Content::json(value).map_err(|e| {
        ErrorData::internal_error(format!("Failed to create JSON content: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![content]))
}

#[tool_router]
impl AnalystService {
    #[tool(description = "Generate a full analytics report for a cricketer from a profile URL or name")]
    pub async fn generate_report(
        &self,
        params: Parameters<GenerateReportParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.analyst.synthesize_report(&params.0.locator).await {
            Ok(report) => json_result(report),
            Err(e) => {
                let summary = e.report_message();
                Err(to_error_data("generate_report", e, summary))
            }
        }
    }

    #[tool(description = "Fetch a career summary for a second player to compare against")]
    pub async fn compare_player(
        &self,
        params: Parameters<ComparePlayerParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.analyst.synthesize_comparison(&params.0.player_name).await {
            Ok(record) => json_result(record),
            Err(e) => {
                let summary = e.comparison_message();
                Err(to_error_data("compare_player", e, summary))
            }
        }
    }

    #[tool(description = "Open a grounded chat session about a player; returns the session id and greeting")]
    pub async fn start_chat(
        &self,
        params: Parameters<StartChatParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.analyst.start_chat(&params.0.player_name).await {
            Ok(opened) => json_result(opened),
            Err(e) => Err(to_error_data("start_chat", e, "Failed to start chat")),
        }
    }

    #[tool(description = "Ask a question in an open chat session; returns the assistant turn with sources")]
    pub async fn send_chat(
        &self,
        params: Parameters<SendChatParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let SendChatParams {
            session_id,
            message,
        } = params.0;
        match self.analyst.submit_chat_turn(&session_id, &message).await {
            Ok(turn) => json_result(turn),
            Err(e) => Err(to_error_data("send_chat", e, "Failed to send chat message")),
        }
    }

    #[tool(description = "Return the full transcript of a chat session")]
    pub async fn chat_transcript(
        &self,
        params: Parameters<SessionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.analyst.chat_transcript(&params.0.session_id).await {
            Ok(transcript) => json_result(transcript),
            Err(e) => Err(to_error_data("chat_transcript", e, "Failed to read transcript")),
        }
    }

    #[tool(description = "Close a chat session and discard its transcript")]
    pub async fn end_chat(
        &self,
        params: Parameters<SessionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.analyst.end_chat(&params.0.session_id).await {
            Ok(closed) => json_result(serde_json::json!({ "closed": closed })),
            Err(e) => Err(to_error_data("end_chat", e, "Failed to end chat")),
        }
    }
}

#[tool_handler]
impl ServerHandler for AnalystService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Cricket analyst MCP server: player reports, comparisons and search-grounded chat"
                    .into(),
            ),
        }
    }
}
