//! Strongly-typed correlation ids.
//!
//! Ids are generated client-side and only ever appear in logs, so they use
//! ULID for uniqueness plus creation ordering.

use std::fmt;
use ulid::Ulid;

/// Declares a log correlation id displayed as `<prefix>_<ulid>`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a fresh id.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Correlation id for one logical API request, including its replay.
    RequestId,
    "req"
);

define_id!(
    /// Correlation id for one refresh network call.
    RefreshId,
    "rfs"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_their_prefix() {
        assert!(RequestId::new().to_string().starts_with("req_"));
        assert!(RefreshId::new().to_string().starts_with("rfs_"));
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let first = RefreshId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = RefreshId::new();
        assert!(first.to_string() < second.to_string());
    }
}
