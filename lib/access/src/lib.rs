//! Users, roles, and the client-side permission evaluator.
//!
//! This crate provides:
//! - The `User` snapshot returned by the backend at login/restore time
//! - The `Role` a user holds (`customer`, `vendor`, `admin`)
//! - Pure permission functions used by the route guard and business actions
//!
//! # Trust Model
//!
//! Everything in [`permission`] is a UX optimization. Whether a vendor owns a
//! given store, or may see a given order, is decided by the backend on every
//! request; the functions here only decide what to show.
//!
//! # Example
//!
//! ```
//! use storefront_access::{Role, User, permission};
//!
//! let user = User::new("42".into(), "v@x.com".to_string(), Role::Vendor);
//!
//! assert!(permission::is_vendor(Some(&user)));
//! assert!(permission::can_access_vendor_routes(Some(&user)));
//! assert!(!permission::has_any_role(None, &[Role::Vendor, Role::Admin]));
//! ```

pub mod error;
pub mod permission;
pub mod role;
pub mod user;

pub use error::AuthorizationError;
pub use permission::RoleRequirement;
pub use role::Role;
pub use user::{User, UserId};
