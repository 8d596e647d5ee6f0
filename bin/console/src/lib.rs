//! Command-line driver for the vendor session core.
//!
//! Wires [`ApiTransport`](storefront_client::ApiTransport),
//! [`SessionContext`](storefront_session::SessionContext), and
//! [`RouteGuard`](storefront_session::RouteGuard) together from environment
//! configuration.

pub mod config;
pub mod error;
pub mod run;
