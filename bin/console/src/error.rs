//! Console error types.

use std::fmt;
use storefront_client::ApiError;

/// Errors that end a console run.
#[derive(Debug)]
pub enum ConsoleError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The HTTP client could not be built.
    Transport { details: String },
    /// Sign-in was rejected.
    Login { status: u16, message: String },
    /// The route guard redirected instead of rendering.
    Redirected { route: String },
    /// A backend call failed.
    Request { path: String, source: ApiError },
    /// Output could not be written.
    Output { details: String },
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Transport { details } => write!(f, "failed to create HTTP client: {details}"),
            Self::Login { status, message } => {
                write!(f, "sign-in failed (status {status}): {message}")
            }
            Self::Redirected { route } => write!(f, "access denied; redirected to {route}"),
            Self::Request { path, source } => write!(f, "request to {path} failed: {source}"),
            Self::Output { details } => write!(f, "failed to write output: {details}"),
        }
    }
}

impl std::error::Error for ConsoleError {}

impl ConsoleError {
    /// Wraps a failed sign-in.
    #[must_use]
    pub fn login(err: &ApiError) -> Self {
        Self::Login {
            status: err.status(),
            message: err.user_message().to_string(),
        }
    }
}
