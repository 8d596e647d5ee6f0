//! Route guard.
//!
//! A guard decides, from a session snapshot, whether a protected subtree may
//! render. While the session is unknown the answer is always "not yet":
//! protected content is never produced before the first check resolves.

use serde::{Deserialize, Serialize};
use storefront_access::permission::require;
use storefront_access::{Role, RoleRequirement};
use tracing::debug;

use crate::context::SessionContext;
use crate::state::{SessionPhase, SessionState};

/// Redirect targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Where anonymous users are sent. Default: "/vendor/login"
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Where users with the wrong role are sent. Default: "/unauthorized"
    #[serde(default = "default_unauthorized_route")]
    pub unauthorized_route: String,
}

fn default_login_route() -> String {
    "/vendor/login".to_string()
}

fn default_unauthorized_route() -> String {
    "/unauthorized".to_string()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
            unauthorized_route: default_unauthorized_route(),
        }
    }
}

/// What the guard does for a given session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved; show the loading placeholder.
    Pending,
    /// Navigate elsewhere and render nothing.
    Redirect(String),
    /// Render the protected subtree.
    Render,
}

/// Performs client-side navigation.
pub trait Navigator {
    /// Navigates to `route`, replacing the current entry.
    fn navigate(&self, route: &str);
}

/// Gates a protected subtree on a role requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    requirement: RoleRequirement,
    config: GuardConfig,
}

impl RouteGuard {
    /// Creates a guard with default redirect targets.
    #[must_use]
    pub fn new(requirement: impl Into<RoleRequirement>) -> Self {
        Self {
            requirement: requirement.into(),
            config: GuardConfig::default(),
        }
    }

    /// A guard admitting any signed-in user.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::new(RoleRequirement::Authenticated)
    }

    /// A guard for the vendor dashboard: vendors and admins.
    #[must_use]
    pub fn vendor_routes() -> Self {
        Self::new(RoleRequirement::AnyOf(vec![Role::Vendor, Role::Admin]))
    }

    /// Replaces the redirect targets.
    #[must_use]
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the role requirement.
    #[must_use]
    pub fn requirement(&self) -> &RoleRequirement {
        &self.requirement
    }

    /// Decides what to do for `state`.
    #[must_use]
    pub fn decide(&self, state: &SessionState) -> GuardDecision {
        match state.phase() {
            SessionPhase::Unknown => GuardDecision::Pending,
            SessionPhase::Anonymous => GuardDecision::Redirect(self.config.login_route.clone()),
            SessionPhase::Authenticated => match require(state.user(), &self.requirement) {
                Ok(_) => GuardDecision::Render,
                Err(err) => {
                    debug!(error = %err, "route denied");
                    GuardDecision::Redirect(self.config.unauthorized_route.clone())
                }
            },
        }
    }

    /// Renders `children` only if the guard admits `state`.
    ///
    /// Redirects go through `navigator`; `None` means "render nothing or the
    /// loading placeholder".
    pub fn render<N, T, F>(&self, state: &SessionState, navigator: &N, children: F) -> Option<T>
    where
        N: Navigator + ?Sized,
        F: FnOnce() -> T,
    {
        match self.decide(state) {
            GuardDecision::Pending => None,
            GuardDecision::Redirect(route) => {
                navigator.navigate(&route);
                None
            }
            GuardDecision::Render => Some(children()),
        }
    }

    /// Waits for the session's first resolution, then renders or redirects.
    pub async fn resolve<N, T, F>(
        &self,
        session: &SessionContext,
        navigator: &N,
        children: F,
    ) -> Option<T>
    where
        N: Navigator + ?Sized,
        F: FnOnce() -> T,
    {
        let state = session.wait_until_resolved().await;
        self.render(&state, navigator, children)
    }
}
