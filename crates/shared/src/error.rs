use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    StorageUnavailable,
    UploadFailed,
    DeleteFailed,
    MethodNotAllowed,
    NotFound,
    Internal,
}

/// Error body returned by every proxy route on failure.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_uses_snake_case_code_and_skips_empty_details() {
        let body = serde_json::to_value(ApiError::new(ErrorCode::DeleteFailed, "boom"))
            .expect("json");
        assert_eq!(body["code"], "delete_failed");
        assert_eq!(body["message"], "boom");
        assert!(body.get("details").is_none());
    }
}
