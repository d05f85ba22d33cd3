//! Certificate error types.

/// Errors from CA handling and certificate issuance.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    /// An error occurred during certificate generation or signing.
    #[error("Certificate generation error: {0}")]
    Generation(String),

    /// The signing request could not be parsed or does not match its subject.
    #[error("Invalid CSR: {0}")]
    InvalidCsr(String),

    /// A PEM document could not be decoded.
    #[error("Invalid PEM: {0}")]
    InvalidPem(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
