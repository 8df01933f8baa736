//! JSON response types for the HTTP gateway.

use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Export mode (`periodic` or `pull`).
    pub mode: String,
    /// Lifecycle state of the periodic exporter, absent in pull mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exporter_state: Option<String>,
}
