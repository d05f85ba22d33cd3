//! Certificate fingerprints.
//!
//! The receiver keeps only fingerprints and serials of issued relay
//! certificates, never key material. A fingerprint is the lowercase hex
//! SHA-256 digest of the certificate's DER encoding.

use sha2::{Digest, Sha256};

use crate::error::CertError;

/// Fingerprint of a DER-encoded certificate.
pub fn fingerprint_of_der(der: &[u8]) -> String {
    hex::encode(Sha256::digest(der))
}

/// Fingerprint of a PEM-encoded certificate.
pub fn fingerprint_of_pem(pem: &str) -> Result<String, CertError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| CertError::InvalidPem(e.to_string()))?;
    Ok(fingerprint_of_der(&pem.contents))
}
