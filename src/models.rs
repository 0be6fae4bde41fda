use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────────────────────
// Player report records
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub role: String,
    pub batting_style: String,
    pub bowling_style: String,
}

/// Career totals shared by the full report and the comparison record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerSummary {
    pub matches: u32,
    pub runs: u32,
    pub wickets: u32,
    pub batting_average: f64,
    pub strike_rate: f64,
    pub hundreds: u32,
    pub fifties: u32,
    pub best_bowling: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub year: i32,
    pub runs: u32,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DismissalBreakdown {
    pub method: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSlice {
    pub name: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentPerformance {
    pub name: String,
    pub matches: u32,
    pub runs: u32,
    pub average: f64,
    /// Absent for pure batters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wickets: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatBowlingStats {
    pub format: String,
    pub matches: u32,
    pub wickets: u32,
    pub economy: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReport {
    pub player_name: String,
    pub player_image: String,
    pub profile: PlayerProfile,
    pub career_summary: CareerSummary,
    pub performance_over_time: Vec<TimeSeriesPoint>,
    pub dismissal_analysis: Vec<DismissalBreakdown>,
    pub runs_distribution: Vec<DistributionSlice>,
    pub executive_summary: String,
    pub performance_vs_country: Vec<OpponentPerformance>,
    pub performance_vs_opponent: Vec<OpponentPerformance>,
    pub bowling_stats: Vec<FormatBowlingStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRecord {
    pub player_name: String,
    pub player_image: String,
    pub career_summary: CareerSummary,
}

impl From<&PlayerReport> for ComparisonRecord {
    fn from(report: &PlayerReport) -> Self {
        Self {
            player_name: report.player_name.clone(),
            player_image: report.player_image.clone(),
            career_summary: report.career_summary.clone(),
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Chat records
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A web citation backing a chat answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    pub created_at: DateTime<Utc>,
}

/// Decoded answer to one grounded chat query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub text: String,
    pub sources: Vec<Source>,
}

// ───────────────────────────────────────────────────────────────────────────────
// Gemini generateContent wire format
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on thought-summary parts when thinking is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct GoogleSearch {}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

// Gemini API request format
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl GeminiRequest {
    /// Single user turn carrying `instruction`.
    pub fn from_instruction(instruction: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![Part::text(instruction)],
            }],
            generation_config: None,
            tools: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    pub web_search_queries: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

impl Candidate {
    /// Concatenated answer text, skipping thought parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

// Gemini API response format
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiErrorBody {
    pub error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct GeminiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_in_gemini_shape() {
        let mut req = GeminiRequest::from_instruction("Analyze");
        req.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(serde_json::json!({"type": "OBJECT"})),
            thinking_config: Some(ThinkingConfig {
                thinking_budget: 8192,
            }),
        });
        req.tools.push(Tool {
            google_search: GoogleSearch {},
        });

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Analyze");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            8192
        );
        assert_eq!(json["tools"][0]["googleSearch"], serde_json::json!({}));
    }

    #[test]
    fn plain_request_omits_optional_sections() {
        let json = serde_json::to_value(GeminiRequest::from_instruction("hi")).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn candidate_text_skips_thoughts() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "planning...", "thought": true},
                    {"text": "Kohli scored "},
                    {"text": "82."}
                ]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [{"web": {"uri": "https://a.com", "title": "A"}}],
                    "webSearchQueries": ["kohli last innings"]
                }
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        let candidate = &resp.candidates[0];
        assert_eq!(candidate.text(), "Kohli scored 82.");
        let metadata = candidate.grounding_metadata.as_ref().unwrap();
        assert_eq!(metadata.grounding_chunks.len(), 1);
        assert_eq!(metadata.web_search_queries, vec!["kohli last innings"]);
    }

    #[test]
    fn chat_turn_serializes_camel_case() {
        let turn = ChatTurn {
            id: "assistant-2".to_string(),
            role: Role::Assistant,
            text: "He made 183 against Pakistan.".to_string(),
            sources: Some(vec![]),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
        assert_eq!(json["role"], "assistant");
        let back: ChatTurn = serde_json::from_value(json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn opponent_wickets_are_optional() {
        let row: OpponentPerformance = serde_json::from_str(
            r#"{"name": "Australia", "matches": 12, "runs": 900, "average": 45.5}"#,
        )
        .unwrap();
        assert_eq!(row.wickets, None);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("wickets").is_none());
    }
}
