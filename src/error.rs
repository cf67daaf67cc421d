// Error type shared by the whole client. Every failure a caller can see
// is one of these variants, so the front-end can match on the shape
// instead of parsing strings.

use reqwest::StatusCode;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, MemeError>;

#[derive(Debug, thiserror::Error)]
pub enum MemeError {
    /// The service answered with a JSON error body carrying a `code`.
    #[error("{message} (code {code})")]
    Service {
        code: i64,
        message: String,
        data: Value,
    },

    /// The service answered with a failure status and no usable body.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Upload rejected; carries the service message or a status line.
    #[error("{0}")]
    Upload(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MemeError {
    /// Translate a non-success response body. A body that is not JSON, or
    /// JSON without a `code` field, falls back to the status line.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<Value>(body).ok();
        match parsed {
            Some(Value::Object(mut map)) if map.contains_key("code") => {
                let code = map.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let data = map.remove("data").unwrap_or(Value::Null);
                MemeError::Service {
                    code,
                    message,
                    data,
                }
            }
            _ => MemeError::Http {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status.as_u16(), status_text(status)),
            },
        }
    }

    /// Plain upload failure: the body's `message` if any, else the status text.
    pub(crate) fn upload_failed(status: StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Upload failed: {}", status_text(status)));
        MemeError::Upload(message)
    }

    /// Service error code; 0 for any failure without a structured body.
    pub fn code(&self) -> i64 {
        match self {
            MemeError::Service { code, .. } => *code,
            _ => 0,
        }
    }

    /// Structured payload attached to a service error, if any.
    pub fn data(&self) -> Option<&Value> {
        match self {
            MemeError::Service { data, .. } if !data.is_null() => Some(data),
            _ => None,
        }
    }
}

fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}
