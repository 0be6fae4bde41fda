use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::error::{AnalystError, Result};
use crate::models::{GeminiErrorBody, GeminiRequest, GeminiResponse};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One request, one response. Implementations never retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, model: &str, req: &GeminiRequest) -> Result<GeminiResponse>;
}

pub struct GeminiTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalystError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, model: &str, req: &GeminiRequest) -> Result<GeminiResponse> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| AnalystError::Network(format!("Failed to send request to Gemini: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalystError::Network(format!("Failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorBody>(&body)
                .map(|b| match b.error.status {
                    Some(code) => format!("{code}: {}", b.error.message),
                    None => b.error.message,
                })
                .unwrap_or(body);
            tracing::error!(status = status.as_u16(), model, "Gemini API error: {}", message);
            return Err(AnalystError::Backend {
                status: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            AnalystError::backend(format!("Failed to parse Gemini API response: {e}"))
        })
    }
}
