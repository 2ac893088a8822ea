use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Human readable failure detail carried by an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ErrorBody {
    pub message: String,
}

/// Envelope returned by every registry endpoint.
///
/// Serializes as `{"result":"success","value":...}` or
/// `{"result":"error","error":{"message":...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<T>,
    },
    Error {
        error: ErrorBody,
    },
}

impl<T> ApiResponse<T> {
    pub fn success(value: T) -> Self {
        Self::Success { value: Some(value) }
    }

    /// A success acknowledgement without a payload, e.g. for deletes.
    pub fn acknowledged() -> Self {
        Self::Success { value: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorBody {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value } => value.as_ref(),
            Self::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error } => Some(error.message.as_str()),
        }
    }
}
