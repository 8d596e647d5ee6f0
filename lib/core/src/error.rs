//! Error handling foundation for the storefront crates.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Library crates define their own typed error enums in their `error`
//! modules; binaries wrap them in a `Report` with `.into()` or `?` as they
//! propagate to the top level.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
