//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{info, warn};

/// Everything that can go wrong between an upload arriving and an image URL going back.
#[derive(Debug)]
pub enum MemeError {
    /// The API credential isn't configured
    Configuration(String),
    /// The caller sent something we can't use
    Validation(String),
    /// Submitting the job failed, timed out, or was rejected
    UpstreamSubmit(String),
    /// A single status check failed; the poll loop swallows these
    UpstreamPollTransient(String),
    /// Upstream reported the job as failed
    UpstreamJobFailed,
    /// The job didn't finish within the poll budget
    UpstreamTimeout {
        /// status checks made before giving up
        attempts: u32,
    },
    /// The result envelope had no usable image
    ResultParse(String),
    /// Staging the upload on disk failed
    LocalIo(String),
}

impl MemeError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for MemeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "{msg}"),
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::UpstreamSubmit(msg) => write!(f, "{msg}"),
            Self::UpstreamPollTransient(msg) => write!(f, "Status check failed: {msg}"),
            Self::UpstreamJobFailed => write!(f, "fal.ai processing failed. Try again."),
            Self::UpstreamTimeout { attempts } => write!(
                f,
                "Timed out waiting for fal.ai after {attempts} status checks. Try again, it may have been a busy moment."
            ),
            Self::ResultParse(msg) => write!(f, "{msg}"),
            Self::LocalIo(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for MemeError {}

impl From<std::io::Error> for MemeError {
    fn from(err: std::io::Error) -> Self {
        MemeError::LocalIo(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for MemeError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        MemeError::Validation(format!("Malformed upload: {}", err.body_text()))
    }
}

impl IntoResponse for MemeError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        match &self {
            MemeError::Validation(msg) => info!("Rejected upload: {}", msg),
            MemeError::UpstreamPollTransient(msg) => {
                warn!("Transient poll error reached a response: {}", msg)
            }
            other => tracing::error!("Generation failed: {}", other),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(
            MemeError::Validation("nope".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MemeError::UpstreamJobFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            MemeError::Configuration("missing".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn timeout_message_mentions_attempts() {
        let err = MemeError::UpstreamTimeout { attempts: 50 };
        assert!(err.to_string().contains("50 status checks"));
    }
}
