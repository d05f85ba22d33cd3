//! The site's authoritative relay list.
//!
//! The lifecycle manager consults it for `UserAuth` callers to tell `ACTIVE`
//! relays from those removed on the site but not yet activated.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::UserAuth;
use crate::types::RelayId;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod rest;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemorySiteDirectory;
pub use rest::RestSiteDirectory;

/// Kind of a not-yet-activated change on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Add,
    Del,
}

/// One pending relay change, in the order the site recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayChange {
    pub relay_id: RelayId,
    pub op: ChangeOp,
}

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("site rejected the credentials")]
    Unauthorized,

    #[error("site unavailable: {0}")]
    Unavailable(String),

    #[error("malformed site response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SiteRelayDirectory: Send + Sync {
    /// Check that `auth` is accepted by the site.
    async fn authenticate(&self, auth: &UserAuth) -> Result<(), SiteError>;

    /// Relays currently configured on the site.
    async fn list_relays(&self, auth: &UserAuth) -> Result<HashSet<RelayId>, SiteError>;

    /// Relay changes made on the site since the last activation, oldest first.
    async fn list_relay_changes(&self, auth: &UserAuth) -> Result<Vec<RelayChange>, SiteError>;

    /// Configure `relay_id` on the site. The site records a pending `ADD`
    /// change. A relay the site already lists is left as it is.
    async fn create_relay(
        &self,
        auth: &UserAuth,
        relay_id: &RelayId,
        alias: &str,
    ) -> Result<(), SiteError>;
}
