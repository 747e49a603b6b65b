// ABOUTME: Structured error type for remote fitness provider calls
// ABOUTME: Distinguishes transport, API rejection, cancellation, data shape, and auth failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use thiserror::Error;

/// Errors raised while talking to a fitness data provider
///
/// - `Transport`: connectivity or timeout, retryable on a later sync run
/// - `ApiError`: the provider answered with a non-2xx status
/// - `Cancelled`: the caller raised the cancellation signal
/// - `DataError`: the response body did not have the expected shape
/// - `AuthenticationFailed`: no usable credential could be obtained
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or HTTP-layer failure
    #[error("{provider} transport error: {message}")]
    Transport {
        /// Provider name
        provider: String,
        /// Underlying failure description
        message: String,
    },

    /// Provider rejected the request
    #[error("{provider} API error {status_code}: {body}")]
    ApiError {
        /// Provider name
        provider: String,
        /// HTTP status code returned
        status_code: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Operation aborted by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Response could not be decoded into the expected shape
    #[error("{provider} returned malformed data: {message}")]
    DataError {
        /// Provider name
        provider: String,
        /// Decode failure description
        message: String,
    },

    /// Credential could not be obtained or refreshed
    #[error("{provider} authentication failed: {reason}")]
    AuthenticationFailed {
        /// Provider name
        provider: String,
        /// Failure reason
        reason: String,
    },
}

impl ProviderError {
    /// Whether a later sync run may succeed where this one failed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::Cancelled | Self::DataError { .. } | Self::AuthenticationFailed { .. } => false,
        }
    }

    /// HTTP status code for API errors
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Attribute a provider-agnostic error to `name`
    #[must_use]
    pub fn for_provider(self, name: &str) -> Self {
        match self {
            Self::Transport { message, .. } => Self::Transport {
                provider: name.to_owned(),
                message,
            },
            Self::ApiError {
                status_code, body, ..
            } => Self::ApiError {
                provider: name.to_owned(),
                status_code,
                body,
            },
            Self::DataError { message, .. } => Self::DataError {
                provider: name.to_owned(),
                message,
            },
            Self::AuthenticationFailed { reason, .. } => Self::AuthenticationFailed {
                provider: name.to_owned(),
                reason,
            },
            Self::Cancelled => Self::Cancelled,
        }
    }

    /// Whether this error is the cancellation signal
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Decode failures become `DataError`, status errors `ApiError`, the rest
/// `Transport`; callers attach their provider name with [`ProviderError::for_provider`]
#[cfg(feature = "provider-errors")]
impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::DataError {
                provider: "http".to_owned(),
                message: error.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::ApiError {
                provider: "http".to_owned(),
                status_code: status.as_u16(),
                body: error.to_string(),
            }
        } else {
            Self::Transport {
                provider: "http".to_owned(),
                message: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let transport = ProviderError::Transport {
            provider: "strava".to_owned(),
            message: "timeout".to_owned(),
        };
        assert!(transport.is_retryable());

        let not_found = ProviderError::ApiError {
            provider: "strava".to_owned(),
            status_code: 404,
            body: "Record Not Found".to_owned(),
        };
        assert!(!not_found.is_retryable());
        assert_eq!(not_found.status_code(), Some(404));

        let throttled = ProviderError::ApiError {
            provider: "strava".to_owned(),
            status_code: 429,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
    }

    #[test]
    fn test_display_includes_status_and_body() {
        let err = ProviderError::ApiError {
            provider: "strava".to_owned(),
            status_code: 404,
            body: "Record Not Found".to_owned(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("404"));
        assert!(rendered.contains("Record Not Found"));
    }

    #[test]
    fn test_for_provider_keeps_variant() {
        let err = ProviderError::Transport {
            provider: "http".to_owned(),
            message: "connection refused".to_owned(),
        }
        .for_provider("strava");
        assert_eq!(
            err,
            ProviderError::Transport {
                provider: "strava".to_owned(),
                message: "connection refused".to_owned(),
            }
        );
        assert!(ProviderError::Cancelled.for_provider("strava").is_cancelled());
    }
}
