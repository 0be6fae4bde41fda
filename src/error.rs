use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalystError>;

/// Why a model response could not be turned into a typed record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeFailure {
    #[error("malformed-document: {0}")]
    MalformedDocument(String),

    #[error("schema-violation at '{field}': {reason}")]
    SchemaViolation { field: String, reason: String },
}

impl DecodeFailure {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeFailure::MalformedDocument(_) => "malformed-document",
            DecodeFailure::SchemaViolation { .. } => "schema-violation",
        }
    }

    /// Path of the offending field, when the failure is a schema violation.
    pub fn field(&self) -> Option<&str> {
        match self {
            DecodeFailure::SchemaViolation { field, .. } => Some(field),
            DecodeFailure::MalformedDocument(_) => None,
        }
    }

    pub(crate) fn violation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeFailure::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Network failure talking to the model backend: {0}")]
    Network(String),

    #[error("Model backend error{}: {message}", status_suffix(.status))]
    Backend {
        status: Option<u16>,
        message: String,
    },

    #[error("Decode failure: {0}")]
    Decode(#[from] DecodeFailure),

    #[error("Chat session {session_id} already has a turn in flight")]
    SessionBusy { session_id: String },

    #[error("Chat session {session_id} not found")]
    SessionNotFound { session_id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AnalystError {
    pub fn backend(message: impl Into<String>) -> Self {
        AnalystError::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// Network and backend failures are transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalystError::Network(_) | AnalystError::Backend { .. }
        )
    }

    /// Message suitable for an end user after a failed report request.
    pub fn report_message(&self) -> &'static str {
        match self {
            AnalystError::Validation(_) => "Please enter a URL or a player name.",
            _ => {
                "Failed to generate report. The player might not be well-known, or there was an API error. Please check the URL and try again."
            }
        }
    }

    /// Message suitable for an end user after a failed comparison request.
    pub fn comparison_message(&self) -> &'static str {
        match self {
            AnalystError::Validation(_) => "Please enter a player's name to compare.",
            _ => {
                "Could not fetch data for this player. They might not be well-known enough for a comparison."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failure_codes() {
        let malformed = DecodeFailure::MalformedDocument("eof".to_string());
        assert_eq!(malformed.code(), "malformed-document");
        assert_eq!(malformed.field(), None);

        let violation = DecodeFailure::violation("careerSummary.runs", "missing");
        assert_eq!(violation.code(), "schema-violation");
        assert_eq!(violation.field(), Some("careerSummary.runs"));
    }

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(AnalystError::Network("reset".into()).is_retryable());
        assert!(AnalystError::backend("blocked").is_retryable());
        assert!(!AnalystError::Decode(DecodeFailure::MalformedDocument("x".into())).is_retryable());
        assert!(!AnalystError::Validation("empty".into()).is_retryable());
    }

    #[test]
    fn backend_display_includes_status() {
        let err = AnalystError::Backend {
            status: Some(503),
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "Model backend error (HTTP 503): unavailable");
        assert_eq!(
            AnalystError::backend("empty payload").to_string(),
            "Model backend error: empty payload"
        );
    }
}
