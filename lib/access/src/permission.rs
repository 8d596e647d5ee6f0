//! Client-side permission evaluation.
//!
//! Pure functions over `Option<&User>`. Every check returns false for
//! `None`. Composite checks are role-based approximations: resource
//! ownership is re-validated by the backend, and these functions must not
//! be treated as an enforcement point.

use serde::{Deserialize, Serialize};

use crate::error::AuthorizationError;
use crate::role::Role;
use crate::user::User;

/// Returns true if the user holds `role`.
#[must_use]
pub fn has_role(user: Option<&User>, role: Role) -> bool {
    user.is_some_and(|u| u.role() == role)
}

/// Returns true if the user holds any of `roles`.
///
/// An empty role list never matches.
#[must_use]
pub fn has_any_role(user: Option<&User>, roles: &[Role]) -> bool {
    user.is_some_and(|u| roles.contains(&u.role()))
}

/// Returns true if the user is an admin.
#[must_use]
pub fn is_admin(user: Option<&User>) -> bool {
    has_role(user, Role::Admin)
}

/// Returns true if the user is a vendor.
#[must_use]
pub fn is_vendor(user: Option<&User>) -> bool {
    has_role(user, Role::Vendor)
}

/// Returns true if the user is a customer.
#[must_use]
pub fn is_customer(user: Option<&User>) -> bool {
    has_role(user, Role::Customer)
}

/// Returns true if the user may open the vendor dashboard.
#[must_use]
pub fn can_access_vendor_routes(user: Option<&User>) -> bool {
    has_any_role(user, &[Role::Vendor, Role::Admin])
}

/// Returns true if the user may open the admin dashboard.
#[must_use]
pub fn can_access_admin_routes(user: Option<&User>) -> bool {
    is_admin(user)
}

/// Returns true if the user may show management controls for a vendor store.
///
/// Role-only: any vendor passes regardless of `_vendor_id`. The backend
/// rejects edits to stores the vendor does not own.
#[must_use]
pub fn can_manage_vendor(user: Option<&User>, _vendor_id: &str) -> bool {
    has_any_role(user, &[Role::Vendor, Role::Admin])
}

/// Returns true if the user may open an order's detail view.
///
/// Role-only: any authenticated role passes regardless of `_order_id`.
#[must_use]
pub fn can_view_order(user: Option<&User>, _order_id: &str) -> bool {
    has_any_role(user, &Role::ALL)
}

/// Role requirement attached to a protected route or action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RoleRequirement {
    /// Any authenticated user.
    Authenticated,
    /// Exactly this role.
    Role(Role),
    /// Any of these roles.
    AnyOf(Vec<Role>),
}

impl RoleRequirement {
    /// Returns true if `user` satisfies the requirement.
    #[must_use]
    pub fn is_satisfied_by(&self, user: Option<&User>) -> bool {
        match self {
            Self::Authenticated => user.is_some(),
            Self::Role(role) => has_role(user, *role),
            Self::AnyOf(roles) => has_any_role(user, roles),
        }
    }

    /// Human-readable description used in denial messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Authenticated => "authenticated".to_string(),
            Self::Role(role) => role.to_string(),
            Self::AnyOf(roles) => roles.iter().map(Role::as_str).collect::<Vec<_>>().join("|"),
        }
    }
}

impl From<Role> for RoleRequirement {
    fn from(role: Role) -> Self {
        Self::Role(role)
    }
}

/// Checks `requirement` and returns the user on success.
///
/// # Errors
///
/// Returns `NotAuthenticated` for `None` and `PermissionDenied` when the
/// user's role does not satisfy the requirement.
pub fn require<'a>(
    user: Option<&'a User>,
    requirement: &RoleRequirement,
) -> Result<&'a User, AuthorizationError> {
    let user = user.ok_or(AuthorizationError::NotAuthenticated)?;
    if requirement.is_satisfied_by(Some(user)) {
        Ok(user)
    } else {
        Err(AuthorizationError::PermissionDenied {
            user_id: user.id().clone(),
            role: user.role(),
            required: requirement.describe(),
        })
    }
}
