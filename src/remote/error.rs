//! Classified connection failures.

use thiserror::Error;

/// Why a remote session could not be opened.
///
/// Validation failures are caught before any I/O; the remaining variants are
/// translated from transport failures into the short messages shown to the
/// user. Classification exists for message translation, not control flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication failed.")]
    Auth,

    /// Host lookup or reachability failure; carries the short summary
    /// ("Host not found." or "Unable to reach SSH server.").
    #[error("{0}")]
    Unreachable(String),

    #[error("Connection failed: {0}")]
    Other(String),
}

impl ConnectError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Translate a transport failure message into a classified error.
pub fn classify_connect_failure(message: &str) -> ConnectError {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return ConnectError::Other("Connection failed.".into());
    }

    let lower = trimmed.to_lowercase();
    if lower.contains("auth fail")
        || lower.contains("authentication")
        || lower.contains("permission denied")
    {
        return ConnectError::Auth;
    }
    if lower.contains("unknown host")
        || lower.contains("name or service not known")
        || lower.contains("failed to lookup")
        || lower.contains("no addresses resolved")
    {
        return ConnectError::Unreachable("Host not found.".into());
    }
    if lower.contains("refused")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection reset")
        || lower.contains("unreachable")
    {
        return ConnectError::Unreachable("Unable to reach SSH server.".into());
    }
    ConnectError::Other(trimmed.to_string())
}
