//! Relay registration and certificate refresh.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::auth::{Auth, UserAuth};
use crate::error::RelayError;
use crate::lifecycle::RelayLifecycle;
use crate::types::RelayId;

use super::issuer::CertificateIssuer;

/// Certificates handed back to a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateBundle {
    pub client_cert: String,
    pub root_cert: String,
}

#[derive(Clone)]
pub struct RegistrationService {
    lifecycle: RelayLifecycle,
    issuer: Arc<dyn CertificateIssuer>,
    is_remote_site: bool,
}

impl RegistrationService {
    pub fn new(
        lifecycle: RelayLifecycle,
        issuer: Arc<dyn CertificateIssuer>,
        is_remote_site: bool,
    ) -> Self {
        Self {
            lifecycle,
            issuer,
            is_remote_site,
        }
    }

    /// Register a new relay and issue its first client certificate.
    ///
    /// The relay is configured on the site before it is stored locally, so
    /// the site always lists a registered relay until someone removes it
    /// there. Nothing is written unless the caller is authenticated and the
    /// CSR was signed. Remote sites refuse before doing anything else.
    #[instrument(skip(self, auth, csr_pem), fields(relay_id = %relay_id))]
    pub async fn register_relay(
        &self,
        auth: &UserAuth,
        relay_id: &RelayId,
        alias: &str,
        csr_pem: &str,
    ) -> Result<CertificateBundle, RelayError> {
        if self.is_remote_site {
            return Err(RelayError::RemoteSite);
        }
        self.lifecycle.authenticate(auth).await?;

        let registry = self.lifecycle.registry();
        if registry.find(relay_id).await?.is_some() {
            return Err(RelayError::AlreadyRegistered(relay_id.clone()));
        }

        let issued = self.issuer.sign(csr_pem, relay_id).await?;
        self.lifecycle.create_on_site(auth, relay_id, alias).await?;
        registry.register(relay_id, alias, &issued).await?;

        Ok(CertificateBundle {
            client_cert: issued.cert_pem,
            root_cert: issued.root_cert_pem,
        })
    }

    /// Issue a fresh client certificate to a relay known locally, including
    /// one in `PENDING_DELETION`.
    #[instrument(skip(self, csr_pem), fields(relay_id = %relay_id))]
    pub async fn refresh_cert(
        &self,
        relay_id: &RelayId,
        csr_pem: &str,
    ) -> Result<CertificateBundle, RelayError> {
        let state = self
            .lifecycle
            .get_relay_state(&Auth::Internal, relay_id)
            .await?;

        let issued = self.issuer.sign(csr_pem, relay_id).await?;
        self.lifecycle
            .registry()
            .record_certificate(relay_id, &issued)
            .await?;

        info!(state = %state, serial_number = %issued.serial_number, "Relay certificate refreshed");
        Ok(CertificateBundle {
            client_cert: issued.cert_pem,
            root_cert: issued.root_cert_pem,
        })
    }
}
