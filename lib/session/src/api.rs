//! Vendor authentication endpoints.

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::fmt;
use storefront_access::User;
use storefront_client::{ApiError, ApiTransport, HttpMethod, RequestOptions};

/// Email and password submitted to the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl LoginCredentials {
    /// Creates login credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Payload of a successful login.
///
/// The refresh credential is set as an HTTP-only cookie and never appears here.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// The new access token.
    #[serde(alias = "access_token")]
    pub access: String,
    /// The signed-in user.
    pub user: User,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Typed wrappers around the vendor auth endpoints.
#[derive(Debug, Clone, Copy)]
pub struct VendorAuthApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> VendorAuthApi<'a> {
    /// Wraps `transport`.
    #[must_use]
    pub fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    /// `POST login` with `{email, password}`.
    ///
    /// # Errors
    ///
    /// Returns `Http` with status 401 for rejected credentials.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, ApiError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        self.transport
            .post(&self.transport.config().endpoints().login, body)
            .await
    }

    /// `POST logout`, invalidating the refresh cookie server-side.
    ///
    /// # Errors
    ///
    /// Returns any transport error; callers treat logout as best-effort.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _: JsonValue = self
            .transport
            .request(
                &self.transport.config().endpoints().logout,
                RequestOptions::new(HttpMethod::Post),
            )
            .await?;
        Ok(())
    }

    /// `GET profile`: the "who am I" call.
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` when no session can be established.
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.transport
            .get(&self.transport.config().endpoints().profile)
            .await
    }
}
