//! Caller authorization classes.
//!
//! `UserAuth` carries a site user's bearer credential and is checked against
//! the site before anything else happens. `Internal` is used by relays
//! talking about themselves (task polling, cert refresh, data ingestion) and
//! only ever consults the local registry.

use std::fmt;

/// Bearer credential of a site user.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAuth(String);

impl UserAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Parse an `Authorization: Bearer <token>` header value.
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Self::new)
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserAuth([REDACTED])")
    }
}

/// Authorization class of a lifecycle query.
#[derive(Debug, Clone)]
pub enum Auth {
    User(UserAuth),
    Internal,
}
