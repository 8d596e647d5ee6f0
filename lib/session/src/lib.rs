//! Vendor session context and route guard.
//!
//! [`SessionContext`] is the only writer of "who is signed in". It restores
//! the session on startup, signs in and out, and drops to anonymous when the
//! transport reports that the credential could not be renewed.
//! [`RouteGuard`] reads session snapshots and decides whether a protected
//! subtree renders, waits, or redirects.
//!
//! # Example
//!
//! ```no_run
//! use storefront_client::{ApiTransport, ClientConfig};
//! use storefront_session::{GuardDecision, RouteGuard, SessionContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ApiTransport::with_reqwest(ClientConfig::new("https://api.example.com/api"))?;
//! let session = SessionContext::new(transport);
//!
//! let state = session.restore().await;
//! if RouteGuard::vendor_routes().decide(&state) == GuardDecision::Render {
//!     // show the dashboard
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod context;
pub mod guard;
pub mod state;

pub use api::{LoginCredentials, LoginResponse, VendorAuthApi};
pub use context::SessionContext;
pub use guard::{GuardConfig, GuardDecision, Navigator, RouteGuard};
pub use state::{SessionPhase, SessionState};
