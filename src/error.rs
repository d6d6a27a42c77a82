//! Error taxonomy for synchronization and the HTTP API.
//!
//! | Variant | Meaning | HTTP |
//! |---------|---------|------|
//! | [`SyncError::NotFound`] | blog, post, or log scope does not resolve | 404 |
//! | [`SyncError::Configuration`] | missing or invalid WordPress settings | 400 |
//! | [`SyncError::Validation`] | malformed request payload | 400 |
//! | [`SyncError::Unauthorized`] | webhook signature missing or wrong | 401 |
//! | [`SyncError::RemoteUnavailable`] | WordPress or workflow engine unreachable / non-2xx | 500 |
//! | [`SyncError::Store`] | content database failure | 500 |
//!
//! Failures of a single item inside a pass are not errors at this level:
//! they are recorded as [`ItemOutcome`](crate::sync::ItemOutcome)s with
//! action `error` and never abort the pass.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// One invalid field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("remote unavailable: {endpoint}{}: {body}", status.map(|s| format!(" returned {}", s)).unwrap_or_default())]
    RemoteUnavailable {
        endpoint: String,
        status: Option<u16>,
        body: String,
    },

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl SyncError {
    pub fn not_found(message: impl Into<String>) -> Self {
        SyncError::NotFound(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>, fields: Vec<FieldError>) -> Self {
        SyncError::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Shorthand for a validation failure on a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        SyncError::Validation {
            message: format!("invalid {}: {}", field, message),
            fields: vec![FieldError::new(field, message)],
        }
    }

    pub fn remote(endpoint: impl Into<String>, status: Option<u16>, body: impl Into<String>) -> Self {
        SyncError::RemoteUnavailable {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::Configuration(_) | SyncError::Validation { .. } => StatusCode::BAD_REQUEST,
            SyncError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SyncError::RemoteUnavailable { .. } | SyncError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable tag used in logs and sync-log details.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::NotFound(_) => "not_found",
            SyncError::Configuration(_) => "configuration",
            SyncError::Validation { .. } => "validation",
            SyncError::Unauthorized(_) => "unauthorized",
            SyncError::RemoteUnavailable { .. } => "remote_unavailable",
            SyncError::Store(_) => "store",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SyncError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            SyncError::configuration("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SyncError::remote("GET /posts", Some(502), "bad gateway").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_remote_message_includes_status_and_body() {
        let err = SyncError::remote("GET https://wp.example.com/posts", Some(503), "down");
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("down"));
    }

    #[test]
    fn test_invalid_field_carries_field_name() {
        match SyncError::invalid_field("limit", "must be between 1 and 200") {
            SyncError::Validation { fields, .. } => assert_eq!(fields[0].field, "limit"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
