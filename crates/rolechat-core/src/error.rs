// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Rolechat chat pipeline.
//!
//! Every failure a turn can hit is one [`RolechatError`] variant. What the
//! client sees is only the closed [`ErrorCategory`] string; the `Display`
//! form of the error (including any source) stays in the logs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across the collaborator traits and the turn pipeline.
#[derive(Debug, Error)]
pub enum RolechatError {
    /// Request input rejected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The inference provider refused the request before any fragment was produced.
    #[error("provider rejected request: {message}")]
    ProviderRejected {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider stream broke after it was opened.
    #[error("provider stream error: {message}")]
    ProviderStream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation exceeded its wall-clock budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The turn was withdrawn by the client or by shutdown.
    #[error("operation cancelled")]
    Cancelled,

    /// The user exceeded the turn budget for the current window.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The safety checker refused the user text.
    #[error("content rejected by safety check: {reason}")]
    UnsafeContent { reason: String },

    /// Referenced character does not exist.
    #[error("character not found: {0}")]
    CharacterNotFound(i64),

    /// Referenced conversation does not exist or was deleted.
    #[error("conversation not found: {0}")]
    ConversationNotFound(i64),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RolechatError {
    /// Maps the error to the category string sent to clients.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::CharacterNotFound(_) | Self::ConversationNotFound(_) => {
                ErrorCategory::ValidationError
            }
            Self::Storage { .. } => ErrorCategory::StoreUnavailable,
            Self::ProviderRejected { .. } => ErrorCategory::ProviderRejected,
            Self::ProviderStream { .. } => ErrorCategory::ProviderStreamError,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::UnsafeContent { .. } => ErrorCategory::UnsafeContent,
            Self::Config(_) | Self::Internal(_) => ErrorCategory::InternalError,
        }
    }

    /// True for errors that should reach the client as an `error` event.
    ///
    /// Cancellation is the only failure that is not surfaced.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Convenience constructor for storage failures.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

/// Closed set of failure categories visible on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ValidationError,
    StoreUnavailable,
    ProviderRejected,
    ProviderStreamError,
    Timeout,
    Cancelled,
    RateLimited,
    UnsafeContent,
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn categories_render_snake_case() {
        assert_eq!(ErrorCategory::StoreUnavailable.to_string(), "store_unavailable");
        assert_eq!(
            ErrorCategory::ProviderStreamError.to_string(),
            "provider_stream_error"
        );
        assert_eq!(
            ErrorCategory::from_str("validation_error").unwrap(),
            ErrorCategory::ValidationError
        );
        let json = serde_json::to_string(&ErrorCategory::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
    }

    #[test]
    fn lookup_failures_are_validation_errors() {
        assert_eq!(
            RolechatError::CharacterNotFound(7).category(),
            ErrorCategory::ValidationError
        );
        assert_eq!(
            RolechatError::ConversationNotFound(3).category(),
            ErrorCategory::ValidationError
        );
    }

    #[test]
    fn storage_errors_map_to_store_unavailable() {
        let err = RolechatError::storage(std::io::Error::other("disk gone"));
        assert_eq!(err.category(), ErrorCategory::StoreUnavailable);
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn only_cancellation_is_silent() {
        assert!(!RolechatError::Cancelled.is_reportable());
        assert!(
            RolechatError::Timeout {
                duration: Duration::from_secs(60)
            }
            .is_reportable()
        );
        assert!(RolechatError::Internal("x".into()).is_reportable());
    }

    #[test]
    fn config_and_internal_do_not_leak_detail() {
        let err = RolechatError::Config("secret path /etc/x".into());
        assert_eq!(err.category().to_string(), "internal_error");
    }
}
