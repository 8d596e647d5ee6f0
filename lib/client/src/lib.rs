//! Authenticated API transport for the vendor storefront.
//!
//! This crate owns the access credential and everything that touches it:
//!
//! - [`CredentialStore`]: in-memory holder of the short-lived access credential
//! - [`ApiTransport`]: attaches the credential, unwraps response envelopes, and
//!   turns failures into typed [`ApiError`]s
//! - a refresh coordinator task that guarantees at most one refresh call is
//!   outstanding and replays requests that hit a 401 while it ran
//!
//! The long-lived refresh credential is an HTTP-only cookie. It lives only
//! in the HTTP backend's cookie jar and is never visible here.
//!
//! # Example
//!
//! ```no_run
//! use storefront_client::{ApiTransport, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = ApiTransport::with_reqwest(ClientConfig::new("https://api.example.com/api"))?;
//! let orders: serde_json::Value = api.get("/vendor/orders").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod credential;
pub mod envelope;
pub mod error;
mod refresh;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use backend::{HttpBackend, HttpMethod, HttpRequest, HttpResponse, ReqwestBackend};
pub use config::{ApiEndpoints, ClientConfig, ClientConfigBuilder};
pub use credential::{Credential, CredentialStore};
pub use envelope::Envelope;
pub use error::{ApiError, FieldErrors, NetworkError};
pub use transport::{ApiTransport, ExpiryListener, RequestOptions};
