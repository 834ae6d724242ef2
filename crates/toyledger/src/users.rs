//! The fixed set of child profiles.
//!
//! Profiles are statically enumerated; there is no way to create or delete
//! one at runtime.

use serde::Serialize;

use crate::error::{Error, Result};

/// A child profile records are filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct User {
    /// Stable identifier used in URLs and storage.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
}

/// Every known profile, in display order.
pub const USERS: &[User] = &[
    User {
        id: "xiaoyuan",
        name: "小元",
    },
    User {
        id: "xiaoman",
        name: "小满",
    },
];

/// Look up a profile by id.
#[must_use]
pub fn find(id: &str) -> Option<&'static User> {
    USERS.iter().find(|u| u.id == id)
}

/// Look up a profile by id, failing with [`Error::UnknownUser`].
///
/// # Errors
///
/// Returns an error if no profile has this id.
pub fn require(id: &str) -> Result<&'static User> {
    find(id).ok_or_else(|| Error::UnknownUser(id.to_string()))
}

/// The profile selected when none has been chosen.
#[must_use]
pub fn default_user() -> &'static User {
    &USERS[0]
}
