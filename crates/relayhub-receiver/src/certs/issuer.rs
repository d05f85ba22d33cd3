//! Certificate issuer seam and the local CA implementation.

use std::path::Path;

use async_trait::async_trait;
use relayhub_crypto::{CaBundle, CertError, IssuedCertificate};
use thiserror::Error;

use crate::types::RelayId;

const CA_ORGANIZATION: &str = "RelayHub Agent Receiver";

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("invalid CSR: {0}")]
    CsrInvalid(String),

    #[error("issuer unavailable: {0}")]
    Unavailable(String),
}

impl From<CertError> for IssuerError {
    fn from(err: CertError) -> Self {
        match err {
            CertError::InvalidCsr(msg) => Self::CsrInvalid(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Signs relay CSRs into client certificates.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Sign `csr_pem` for `relay_id`. The issued certificate identifies the
    /// relay by its id.
    async fn sign(&self, csr_pem: &str, relay_id: &RelayId)
    -> Result<IssuedCertificate, IssuerError>;
}

/// Issuer backed by a CA kept on local disk.
#[derive(Debug)]
pub struct LocalCa {
    ca: CaBundle,
}

impl LocalCa {
    pub const fn new(ca: CaBundle) -> Self {
        Self { ca }
    }

    /// Load `ca.pem`/`ca-key.pem` from `dir`, creating a CA on first start.
    pub fn load_or_generate(dir: &Path) -> Result<Self, CertError> {
        CaBundle::load_or_generate(dir, CA_ORGANIZATION).map(Self::new)
    }

    pub fn root_cert_pem(&self) -> &str {
        &self.ca.ca_cert_pem
    }
}

#[async_trait]
impl CertificateIssuer for LocalCa {
    async fn sign(
        &self,
        csr_pem: &str,
        relay_id: &RelayId,
    ) -> Result<IssuedCertificate, IssuerError> {
        Ok(self.ca.sign_csr(csr_pem, relay_id.as_str())?)
    }
}
