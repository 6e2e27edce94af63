// src/error.rs
//! Error taxonomy for backend calls.

use std::fmt;

/// Backend endpoints consumed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    News,
    Stats,
    ScanStatus,
    TriggerScan,
    ToggleSave,
    Chat,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::News,
        Endpoint::Stats,
        Endpoint::ScanStatus,
        Endpoint::TriggerScan,
        Endpoint::ToggleSave,
        Endpoint::Chat,
    ];

    /// Short label used for metrics and log fields.
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::News => "news",
            Endpoint::Stats => "stats",
            Endpoint::ScanStatus => "scan_status",
            Endpoint::TriggerScan => "trigger_scan",
            Endpoint::ToggleSave => "toggle_save",
            Endpoint::Chat => "chat",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = match self {
            Endpoint::News => "GET /news",
            Endpoint::Stats => "GET /stats",
            Endpoint::ScanStatus => "GET /scan-status",
            Endpoint::TriggerScan => "POST /trigger-scan",
            Endpoint::ToggleSave => "POST /news/{id}/toggle-save",
            Endpoint::Chat => "POST /chat",
        };
        f.write_str(route)
    }
}

/// Failure of a single backend call. Callers treat every variant as "no change".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: Endpoint, message: String },

    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    #[error("malformed {endpoint} payload: {message}")]
    Malformed { endpoint: Endpoint, message: String },
}

impl ApiError {
    pub fn network(endpoint: Endpoint, message: impl Into<String>) -> Self {
        ApiError::Network {
            endpoint,
            message: message.into(),
        }
    }

    pub fn malformed(endpoint: Endpoint, message: impl Into<String>) -> Self {
        ApiError::Malformed {
            endpoint,
            message: message.into(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApiError::Network { endpoint, .. }
            | ApiError::Status { endpoint, .. }
            | ApiError::Malformed { endpoint, .. } => *endpoint,
        }
    }

    /// Transport failures and non-success statuses both count as network errors.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Status { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
