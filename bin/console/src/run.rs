//! The console flow.
//!
//! Restores the session (or signs in with configured credentials), passes
//! the vendor route guard, fetches the profile, and optionally signs out.

use std::sync::{Arc, Mutex, PoisonError};
use storefront_access::User;
use storefront_client::{ApiTransport, HttpBackend};
use storefront_core::Result;
use storefront_session::{Navigator, RouteGuard, SessionContext, SessionPhase, VendorAuthApi};
use tracing::{info, instrument};

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;

/// Remembers the last redirect the guard asked for.
#[derive(Default)]
struct RedirectLog {
    last: Mutex<Option<String>>,
}

impl RedirectLog {
    fn last(&self) -> Option<String> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RedirectLog {
    fn navigate(&self, route: &str) {
        info!(route, "guard redirect");
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(route.to_string());
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    /// The signed-in vendor's profile.
    pub user: User,
    /// True if an existing session was restored without signing in.
    pub restored: bool,
}

/// Runs the console flow against `backend`.
///
/// # Errors
///
/// Returns `Login` if sign-in is rejected, `Redirected` if the guard does
/// not admit the session, and `Request` if the profile fetch fails.
#[instrument(skip_all, fields(base_url = %config.client.base_url()))]
pub async fn run(
    config: &ConsoleConfig,
    backend: Arc<dyn HttpBackend>,
) -> Result<RunSummary, ConsoleError> {
    let session = SessionContext::new(ApiTransport::new(config.client.clone(), backend));

    let restored = session.restore().await.phase() == SessionPhase::Authenticated;
    if !restored {
        if let Some(login) = &config.login {
            session
                .login(&login.credentials())
                .await
                .map_err(|e| ConsoleError::login(&e))?;
        }
    }

    let guard = RouteGuard::vendor_routes().with_config(config.guard.clone());
    let redirects = RedirectLog::default();
    if guard.resolve(&session, &redirects, || ()).await.is_none() {
        let route = redirects
            .last()
            .unwrap_or_else(|| config.guard.login_route.clone());
        return Err(ConsoleError::Redirected { route }.into());
    }

    let path = config.client.endpoints().profile.clone();
    let user = VendorAuthApi::new(session.transport())
        .profile()
        .await
        .map_err(|source| ConsoleError::Request { path, source })?;
    info!(user_id = %user.id(), "profile fetched");

    if config.logout_on_exit {
        session.logout().await;
    }

    Ok(RunSummary { user, restored })
}
