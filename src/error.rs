//! Error taxonomy for the session orchestrator
//!
//! Transport and provisioning failures are caught at the dispatcher boundary
//! and logged. Spawn failures go back to whoever asked for the helper.
//! Notification failures are logged only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;

/// Communication failure with OBS
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("OBS request `{request}` failed: {source}")]
    Request {
        request: &'static str,
        #[source]
        source: obws::error::Error,
    },

    #[error("OBS connection unavailable: {0}")]
    Unavailable(String),
}

/// Scene or source creation failure
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("failed to create scene '{scene}'")]
    Scene {
        scene: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to query sources of scene '{scene}'")]
    Inventory {
        scene: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to create source '{source_name}'")]
    Source {
        source_name: String,
        #[source]
        source: TransportError,
    },

    #[error("no source type configured for {0} capture on this platform")]
    NoSourceKind(&'static str),
}

/// Helper process launch failure
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to launch helper {path:?}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no helper executable configured")]
    NotConfigured,

    #[error("helper request dropped before a reply was sent")]
    Dropped,
}

/// Request arrived without the `game` header
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("Invalid game parameter.")]
pub struct MissingContextError;

impl IntoResponse for MissingContextError {
    fn into_response(self) -> Response {
        // 404 kept for compatibility with existing clients
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": self.to_string() })),
        )
            .into_response()
    }
}

/// Readiness or game-change signal failure
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_error_renders_full_chain() {
        let err = ProvisioningError::Scene {
            scene: "KOF XIII".to_string(),
            source: TransportError::Unavailable("currently not connected".to_string()),
        };
        assert_eq!(
            format!("{:#}", anyhow::Error::new(err)),
            "failed to create scene 'KOF XIII': OBS connection unavailable: currently not connected"
        );
    }

    #[test]
    fn test_missing_context_is_404() {
        let response = MissingContextError.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
