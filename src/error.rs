//! Error types for the CBI proxy

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for the CBI proxy
pub type Result<T> = std::result::Result<T, Error>;

/// CBI proxy errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing credentials, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream identity endpoint returned a non-success status
    #[error("Authentication failed ({status}): {body}")]
    Auth {
        /// Upstream HTTP status code
        status: u16,
        /// Raw upstream response body
        body: String,
    },

    /// Malformed or missing client input, rejected before any I/O
    #[error("{0}")]
    Validation(String),

    /// Upstream chat endpoint returned a non-success status
    #[error("Request failed: {body}")]
    Upstream {
        /// Upstream HTTP status code
        status: u16,
        /// Raw upstream response body (may be plain text, never parsed)
        body: String,
    },

    /// Network-level failure talking to the upstream
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error maps to at the front door.
    ///
    /// Upstream failures echo the upstream status; everything else is a
    /// client error (400) or an internal error (500).
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth { status, .. } | Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let err = Error::Validation("Message is required".to_string());
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Message is required");
    }

    #[test]
    fn upstream_errors_echo_status() {
        let err = Error::Auth {
            status: 401,
            body: "bad credentials".to_string(),
        };
        assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED);
        assert!(err.to_string().contains("bad credentials"));

        let err = Error::Upstream {
            status: 503,
            body: "try later".to_string(),
        };
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_upstream_status_falls_back_to_502() {
        let err = Error::Upstream {
            status: 99,
            body: String::new(),
        };
        assert_eq!(err.http_status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn config_maps_to_500() {
        let err = Error::Config("missing credentials".to_string());
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
