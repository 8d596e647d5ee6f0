//! Error types for the access crate.

use std::fmt;

use crate::role::Role;
use crate::user::UserId;

/// Errors from client-side authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No user is signed in.
    NotAuthenticated,
    /// The signed-in user's role does not satisfy the requirement.
    PermissionDenied {
        user_id: UserId,
        role: Role,
        required: String,
    },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::PermissionDenied {
                user_id,
                role,
                required,
            } => {
                write!(
                    f,
                    "user {user_id} with role '{role}' lacks required role '{required}'"
                )
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}
