//! Session state as seen by the UI.

use serde::Serialize;
use storefront_access::User;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No authentication decision yet; protected content must not render.
    Unknown,
    /// A user is signed in.
    Authenticated,
    /// Checked, and nobody is signed in.
    Anonymous,
}

/// Snapshot of the current session.
///
/// `user` is set if and only if `is_authenticated` is true, and once the
/// first check has resolved an authenticated session is never loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    user: Option<User>,
    is_authenticated: bool,
    is_loading: bool,
    error: Option<String>,
}

impl SessionState {
    /// The state before the first check: loading, no user.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
        }
    }

    /// A signed-in session.
    #[must_use]
    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
        }
    }

    /// A resolved session with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: false,
            error: None,
        }
    }

    /// Returns the state with `error` set.
    #[must_use]
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Returns the state with the loading flag set, unless a user is signed in.
    #[must_use]
    pub fn with_loading(mut self, loading: bool) -> Self {
        self.is_loading = loading && !self.is_authenticated;
        self
    }

    /// Returns the signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Returns true if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Returns true while a check or login is in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Returns the last user-facing error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.is_authenticated {
            SessionPhase::Authenticated
        } else if self.is_loading {
            SessionPhase::Unknown
        } else {
            SessionPhase::Anonymous
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_access::Role;

    fn vendor() -> User {
        User::new("7".into(), "v@x.com".to_string(), Role::Vendor)
    }

    #[test]
    fn initial_state_is_unknown() {
        let state = SessionState::initial();
        assert!(state.is_loading());
        assert!(!state.is_authenticated());
        assert!(state.user().is_none());
        assert_eq!(state.phase(), SessionPhase::Unknown);
        assert_eq!(SessionState::default(), state);
    }

    #[test]
    fn authenticated_state_has_user_and_is_not_loading() {
        let state = SessionState::authenticated(vendor());
        assert_eq!(state.phase(), SessionPhase::Authenticated);
        assert_eq!(state.user().map(User::email), Some("v@x.com"));
        assert!(!state.is_loading());
    }

    #[test]
    fn authenticated_session_ignores_loading() {
        let state = SessionState::authenticated(vendor()).with_loading(true);
        assert!(!state.is_loading());
        assert_eq!(state.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn anonymous_loading_is_unknown_again() {
        let state = SessionState::anonymous();
        assert_eq!(state.phase(), SessionPhase::Anonymous);
        assert_eq!(state.with_loading(true).phase(), SessionPhase::Unknown);
    }

    #[test]
    fn error_is_kept() {
        let state = SessionState::anonymous().with_error(Some("Invalid credentials".to_string()));
        assert_eq!(state.error(), Some("Invalid credentials"));
        assert_eq!(state.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn serializes_for_the_ui() {
        let json = serde_json::to_value(SessionState::initial()).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "user": null,
                "is_authenticated": false,
                "is_loading": true,
                "error": null
            })
        );
    }
}
