//! Error types for the client crate.
//!
//! `ApiError` is the single failure type callers of the transport see. The
//! variants separate "this request failed" (`Network`, `Http`,
//! `InvalidResponse`) from "the session ended" (`AuthExpired`) so callers
//! can decide between retrying, showing the server's message, and sending
//! the user back to the login page.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use storefront_access::AuthorizationError;

/// Field-level validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message shown for connectivity failures.
pub const NETWORK_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

/// Message shown when the session can no longer be refreshed.
pub const AUTH_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Errors from API calls and client-side authorization.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    Network { reason: String },
    /// The backend answered with a non-success status or a failed envelope.
    Http {
        status: u16,
        message: String,
        data: Option<JsonValue>,
        errors: Option<FieldErrors>,
    },
    /// A 401 survived one refresh attempt, or the refresh itself failed.
    AuthExpired { reason: String },
    /// A client-side role check rejected the action.
    PermissionDenied { reason: String },
    /// A success response could not be decoded into the expected type.
    InvalidResponse { status: u16, reason: String },
}

/// Error produced by an [`HttpBackend`](crate::HttpBackend) when no response
/// was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError {
    /// Description from the underlying HTTP stack.
    pub reason: String,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network failure: {}", self.reason)
    }
}

impl std::error::Error for NetworkError {}

impl From<NetworkError> for ApiError {
    fn from(err: NetworkError) -> Self {
        Self::Network { reason: err.reason }
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::NotAuthenticated => Self::AuthExpired {
                reason: err.to_string(),
            },
            AuthorizationError::PermissionDenied { .. } => Self::PermissionDenied {
                reason: err.to_string(),
            },
        }
    }
}

impl ApiError {
    /// Returns the HTTP-style status for this error.
    ///
    /// `Network` is 0, `AuthExpired` is 401, and `PermissionDenied` is 403.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Network { .. } => 0,
            Self::Http { status, .. } | Self::InvalidResponse { status, .. } => *status,
            Self::AuthExpired { .. } => 401,
            Self::PermissionDenied { .. } => 403,
        }
    }

    /// Returns a message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Network { .. } => NETWORK_MESSAGE,
            Self::Http { message, .. } => message,
            Self::AuthExpired { .. } => AUTH_EXPIRED_MESSAGE,
            Self::PermissionDenied { .. } => "You do not have permission to do that.",
            Self::InvalidResponse { .. } => "The server sent an unexpected response.",
        }
    }

    /// Returns the raw response body for `Http` errors.
    #[must_use]
    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            Self::Http { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Returns the validation messages for `field`, if the server sent any.
    #[must_use]
    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        match self {
            Self::Http {
                errors: Some(errors),
                ..
            } => errors.get(field).map(Vec::as_slice),
            _ => None,
        }
    }

    /// Returns true if the session ended.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "network failure: {reason}"),
            Self::Http {
                status, message, ..
            } => write!(f, "HTTP {status}: {message}"),
            Self::AuthExpired { reason } => write!(f, "session expired: {reason}"),
            Self::PermissionDenied { reason } => write!(f, "permission denied: {reason}"),
            Self::InvalidResponse { status, reason } => {
                write!(f, "invalid response (HTTP {status}): {reason}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
