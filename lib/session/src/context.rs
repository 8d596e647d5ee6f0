//! The session context: sole writer of the current user.
//!
//! State is published on a `watch` channel so any number of readers can
//! observe transitions. The context registers itself with the transport so
//! that a failed credential refresh moves the session to anonymous without
//! any further network call.

use std::sync::Arc;
use storefront_access::User;
use storefront_client::error::AUTH_EXPIRED_MESSAGE;
use storefront_client::{ApiError, ApiTransport, Credential, ExpiryListener};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::{LoginCredentials, VendorAuthApi};
use crate::state::{SessionPhase, SessionState};

/// Moves the session to anonymous when the transport gives up on the credential.
struct ExpireSession {
    state: Arc<watch::Sender<SessionState>>,
}

impl ExpiryListener for ExpireSession {
    fn session_expired(&self) {
        info!("session expired; signing out locally");
        self.state.send_replace(
            SessionState::anonymous().with_error(Some(AUTH_EXPIRED_MESSAGE.to_string())),
        );
    }
}

/// Process-wide session, constructed once at startup.
#[derive(Clone)]
pub struct SessionContext {
    transport: ApiTransport,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionContext {
    /// Creates the context in the initial (unknown) state.
    #[must_use]
    pub fn new(transport: ApiTransport) -> Self {
        let (sender, _) = watch::channel(SessionState::initial());
        let state = Arc::new(sender);
        transport.add_expiry_listener(Arc::new(ExpireSession {
            state: Arc::clone(&state),
        }));
        Self { transport, state }
    }

    /// Returns the transport this session authenticates.
    #[must_use]
    pub fn transport(&self) -> &ApiTransport {
        &self.transport
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Waits until the session is authenticated or anonymous.
    pub async fn wait_until_resolved(&self) -> SessionState {
        let mut receiver = self.subscribe();
        match receiver
            .wait_for(|state| state.phase() != SessionPhase::Unknown)
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Runs the silent "who am I" check.
    ///
    /// Any failure, network failures included, resolves to anonymous.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionState {
        self.set_loading(true);
        match VendorAuthApi::new(&self.transport).profile().await {
            Ok(user) => {
                info!(user_id = %user.id(), role = %user.role(), "session restored");
                self.state.send_replace(SessionState::authenticated(user));
            }
            Err(err) => {
                debug!(error = %err, "no session to restore");
                self.state.send_replace(SessionState::anonymous());
            }
        }
        self.snapshot()
    }

    /// Signs in and stores the returned access credential.
    ///
    /// # Errors
    ///
    /// Returns the transport error; the session is left anonymous with the
    /// error's user-facing message set.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, ApiError> {
        self.state
            .send_replace(SessionState::anonymous().with_loading(true));

        match VendorAuthApi::new(&self.transport).login(credentials).await {
            Ok(response) => {
                let credential = Credential::from_access_token(
                    response.access,
                    self.transport.config().default_access_ttl(),
                );
                self.transport.credentials().set(credential);
                info!(user_id = %response.user.id(), role = %response.user.role(), "signed in");
                self.state
                    .send_replace(SessionState::authenticated(response.user.clone()));
                Ok(response.user)
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                self.state.send_replace(
                    SessionState::anonymous().with_error(Some(err.user_message().to_string())),
                );
                Err(err)
            }
        }
    }

    /// Signs out. The logout call is best-effort; local state is always cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(err) = VendorAuthApi::new(&self.transport).logout().await {
            warn!(error = %err, "logout call failed; clearing local session anyway");
        }
        self.transport.credentials().clear();
        self.state.send_replace(SessionState::anonymous());
        info!("signed out");
    }

    /// Sets or clears the current user.
    pub fn set_user(&self, user: Option<User>) {
        self.state.send_replace(match user {
            Some(user) => SessionState::authenticated(user),
            None => SessionState::anonymous(),
        });
    }

    /// Sets the loading flag; ignored while a user is signed in.
    pub fn set_loading(&self, loading: bool) {
        self.state
            .send_modify(|state| *state = state.clone().with_loading(loading));
    }

    /// Sets a user-facing error.
    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.state
            .send_modify(|state| *state = state.clone().with_error(Some(error)));
    }

    /// Clears the user-facing error.
    pub fn clear_error(&self) {
        self.state
            .send_modify(|state| *state = state.clone().with_error(None));
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &*self.state.borrow())
            .field("transport", &self.transport)
            .finish()
    }
}
