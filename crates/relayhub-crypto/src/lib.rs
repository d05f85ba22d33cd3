//! `RelayHub` Certificate Library
//!
//! Certificate authority primitives used by the agent receiver to hand out
//! relay client certificates:
//!
//! - **CA**: self-signed CA generation, PEM persistence and reload
//! - **CSR**: parsing and subject validation of relay signing requests
//! - **Issuance**: `ClientAuth` certificates with the relay id as CN
//! - **Fingerprints**: SHA-256 over the DER encoding, used for audit

pub mod ca;
pub mod csr;
pub mod error;
pub mod fingerprint;

pub use ca::{CaBundle, IssuedCertificate};
pub use csr::{common_name_of_certificate, common_name_of_csr};
pub use error::CertError;
pub use fingerprint::fingerprint_of_pem;
