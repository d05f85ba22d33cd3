//! Certificate flows: relay registration and certificate refresh.

mod issuer;
mod service;

#[cfg(test)]
mod tests;

pub use issuer::{CertificateIssuer, IssuerError, LocalCa};
pub use service::{CertificateBundle, RegistrationService};
