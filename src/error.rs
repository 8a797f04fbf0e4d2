// Error types module

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body category for every 500 response
pub const TRANSFORM_FAILED: &str = "Image transformation failed";

/// Outcome categories of a failed on-demand request
///
/// Every variant maps to exactly one HTTP status and one JSON body; the
/// request handler converts these into responses and never lets them escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Signature missing, wrong, tampered with or expired (403)
    InvalidSignature,

    /// Route carried no content key (400)
    MissingKey,

    /// A query parameter is malformed or out of range (400)
    InvalidParameter(String),

    /// Source has no original for the key (404)
    NotFound,

    /// Transform capability reported a failure (500, message exposed)
    TransformFailure(String),

    /// Anything else: source/cache backend failures, panics (500, message hidden)
    Unknown(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::InvalidSignature => write!(f, "Invalid signature"),
            ServiceError::MissingKey => write!(f, "No image key provided"),
            ServiceError::InvalidParameter(msg) => write!(f, "{}", msg),
            ServiceError::NotFound => write!(f, "Image not found"),
            ServiceError::TransformFailure(msg) => {
                write!(f, "{}: {}", TRANSFORM_FAILED, msg)
            }
            ServiceError::Unknown(detail) => write!(f, "Unknown error: {}", detail),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServiceError::InvalidSignature => 403,
            ServiceError::MissingKey | ServiceError::InvalidParameter(_) => 400,
            ServiceError::NotFound => 404,
            ServiceError::TransformFailure(_) | ServiceError::Unknown(_) => 500,
        }
    }

    /// Body sent to the client; `Unknown` details stay in the logs
    pub fn to_body(&self) -> ErrorBody {
        match self {
            ServiceError::InvalidSignature | ServiceError::MissingKey | ServiceError::NotFound => {
                ErrorBody::new(self.to_string())
            }
            ServiceError::InvalidParameter(msg) => ErrorBody::new(msg.clone()),
            ServiceError::TransformFailure(msg) => {
                ErrorBody::with_message(TRANSFORM_FAILED, msg.clone())
            }
            ServiceError::Unknown(_) => ErrorBody::with_message(TRANSFORM_FAILED, "Unknown error"),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.to_http_status() >= 500
    }
}

/// JSON error payload: `{"error": ..., "message"?: ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.error))
    }
}
