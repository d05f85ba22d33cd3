//! Subject inspection for relay CSRs and issued certificates.

use x509_parser::prelude::{FromDer, X509CertificationRequest};

use crate::error::CertError;

const CSR_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// Common Name of a PEM-encoded certificate signing request, if it has one.
pub fn common_name_of_csr(csr_pem: &str) -> Result<Option<String>, CertError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(csr_pem.as_bytes())
        .map_err(|e| CertError::InvalidCsr(e.to_string()))?;
    if !CSR_LABELS.contains(&pem.label.as_str()) {
        return Err(CertError::InvalidCsr(format!(
            "unexpected PEM label {:?}",
            pem.label
        )));
    }
    let (_, csr) = X509CertificationRequest::from_der(&pem.contents)
        .map_err(|e| CertError::InvalidCsr(e.to_string()))?;

    let cn = csr
        .certification_request_info
        .subject
        .iter_common_name()
        .next()
        .map(|attr| {
            attr.as_str()
                .map(str::to_owned)
                .map_err(|e| CertError::InvalidCsr(e.to_string()))
        })
        .transpose()?;
    Ok(cn)
}

/// Common Name of a PEM-encoded certificate.
pub fn common_name_of_certificate(cert_pem: &str) -> Result<Option<String>, CertError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| CertError::InvalidPem(e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| CertError::InvalidPem(e.to_string()))?;
    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned);
    Ok(cn)
}
