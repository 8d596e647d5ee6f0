//! The authenticated user snapshot.
//!
//! A `User` is owned by the backend. The client receives it from the login
//! response or the profile endpoint and treats it as immutable until the
//! next login or restore replaces it wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::role::Role;

/// Backend-assigned user identifier.
///
/// The backend may send ids as JSON numbers or strings; both are accepted
/// and held as their decimal/string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawUserId", into = "String")]
pub struct UserId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(u64),
    Text(String),
}

impl From<RawUserId> for UserId {
    fn from(raw: RawUserId) -> Self {
        match raw {
            RawUserId::Number(n) => Self(n.to_string()),
            RawUserId::Text(s) => Self(s),
        }
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl UserId {
    /// Creates a user id from its string form.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An authenticated storefront user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id.
    id: UserId,
    /// Login email address.
    email: String,
    /// The account's role.
    role: Role,
    /// Whether the account is enabled on the backend.
    #[serde(default = "default_is_active", alias = "isActive")]
    is_active: bool,
    /// Human-readable name, if the backend sends one.
    #[serde(default, alias = "displayName", alias = "name")]
    display_name: Option<String>,
    /// The vendor store this account operates, for vendor accounts.
    #[serde(default, alias = "vendorId")]
    vendor_id: Option<String>,
    /// When the account was created.
    #[serde(default, alias = "createdAt", alias = "date_joined")]
    created_at: Option<DateTime<Utc>>,
}

fn default_is_active() -> bool {
    true
}

impl User {
    /// Creates an active user with no optional profile fields.
    #[must_use]
    pub fn new(id: UserId, email: String, role: Role) -> Self {
        Self {
            id,
            email,
            role,
            is_active: true,
            display_name: None,
            vendor_id: None,
            created_at: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Sets the vendor store id.
    #[must_use]
    pub fn with_vendor_id(mut self, vendor_id: Option<String>) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    /// Sets whether the account is active.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns the backend user id.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the login email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the account role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns true if the backend reports the account as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the vendor store id, if any.
    #[must_use]
    pub fn vendor_id(&self) -> Option<&str> {
        self.vendor_id.as_deref()
    }

    /// Returns when the account was created, if known.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_without_profile_fields() {
        let user = User::new("7".into(), "v@x.com".to_string(), Role::Vendor);

        assert_eq!(user.id().as_str(), "7");
        assert_eq!(user.email(), "v@x.com");
        assert_eq!(user.role(), Role::Vendor);
        assert!(user.is_active());
        assert!(user.display_name().is_none());
        assert!(user.vendor_id().is_none());
        assert!(user.created_at().is_none());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let user = User::new("7".into(), "v@x.com".to_string(), Role::Vendor)
            .with_display_name(Some("Vera".to_string()))
            .with_vendor_id(Some("store-9".to_string()))
            .with_active(false);

        assert_eq!(user.display_name(), Some("Vera"));
        assert_eq!(user.vendor_id(), Some("store-9"));
        assert!(!user.is_active());
    }

    #[test]
    fn deserializes_numeric_id_and_snake_case() {
        let json = r#"{
            "id": 42,
            "email": "v@x.com",
            "role": "vendor",
            "is_active": true,
            "vendor_id": "store-1",
            "created_at": "2024-03-01T12:00:00Z"
        }"#;

        let user: User = serde_json::from_str(json).expect("deserialize");
        assert_eq!(user.id().as_str(), "42");
        assert_eq!(user.role(), Role::Vendor);
        assert_eq!(user.vendor_id(), Some("store-1"));
        assert!(user.created_at().is_some());
    }

    #[test]
    fn deserializes_camel_case_aliases() {
        let json = r#"{
            "id": "u-1",
            "email": "a@x.com",
            "role": "admin",
            "isActive": false,
            "displayName": "Ada"
        }"#;

        let user: User = serde_json::from_str(json).expect("deserialize");
        assert_eq!(user.id().as_str(), "u-1");
        assert!(!user.is_active());
        assert_eq!(user.display_name(), Some("Ada"));
    }

    #[test]
    fn missing_is_active_defaults_to_true() {
        let json = r#"{"id": 1, "email": "c@x.com", "role": "customer"}"#;
        let user: User = serde_json::from_str(json).expect("deserialize");
        assert!(user.is_active());
    }

    #[test]
    fn user_id_serializes_as_string() {
        let user = User::new(
            UserId::new("9".to_string()),
            "c@x.com".to_string(),
            Role::Customer,
        );
        let value = serde_json::to_value(&user).expect("serialize");
        assert_eq!(value["id"], "9");
    }
}
