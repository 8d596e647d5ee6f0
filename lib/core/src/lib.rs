//! Core types shared by the storefront session crates.
//!
//! This crate provides the error-handling foundation and the correlation
//! identifiers used to tie log lines for a single request or refresh attempt
//! together.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{RefreshId, RequestId};
