//! Relay certificate authority.
//!
//! Generates or reloads the CA that signs relay client certificates and
//! turns relay CSRs into `ClientAuth` certificates whose Common Name is the
//! relay id. The relay keeps its private key; only the CSR crosses the wire.

use std::path::Path;

use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SerialNumber,
};

use crate::csr::common_name_of_csr;
use crate::error::CertError;
use crate::fingerprint::fingerprint_of_der;

const CA_CERT_FILE: &str = "ca.pem";
const CA_KEY_FILE: &str = "ca-key.pem";

/// CA material for signing relay certificates.
pub struct CaBundle {
    /// Issuer identity and signing key, owned so the bundle can outlive the
    /// parameters it was generated or parsed from.
    issuer: Issuer<'static, KeyPair>,
    /// PEM-encoded CA certificate, handed to relays as root of trust.
    pub ca_cert_pem: String,
}

impl std::fmt::Debug for CaBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaBundle")
            .field("ca_cert_pem", &self.ca_cert_pem)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// A freshly signed relay client certificate.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// PEM-encoded client certificate.
    pub cert_pem: String,
    /// PEM-encoded CA certificate.
    pub root_cert_pem: String,
    /// Hex SHA-256 of the certificate DER.
    pub fingerprint: String,
    /// Hex certificate serial number.
    pub serial_number: String,
}

impl CaBundle {
    /// Generate a self-signed CA suitable for signing client certificates.
    pub fn generate(org_name: &str) -> Result<Self, CertError> {
        let mut params = CertificateParams::default();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, format!("{org_name} CA"));
        params
            .distinguished_name
            .push(DnType::OrganizationName, org_name);
        params.key_usages.push(KeyUsagePurpose::KeyCertSign);
        params.key_usages.push(KeyUsagePurpose::CrlSign);

        let key_pair = KeyPair::generate().map_err(|e| CertError::Generation(e.to_string()))?;
        let ca_cert = params
            .self_signed(&key_pair)
            .map_err(|e| CertError::Generation(e.to_string()))?;

        Ok(Self {
            ca_cert_pem: ca_cert.pem(),
            issuer: Issuer::new(params, key_pair),
        })
    }

    /// Rebuild a CA from its PEM certificate and PEM private key.
    pub fn from_pem(ca_cert_pem: &str, ca_key_pem: &str) -> Result<Self, CertError> {
        let key_pair =
            KeyPair::from_pem(ca_key_pem).map_err(|e| CertError::InvalidPem(e.to_string()))?;
        let issuer = Issuer::from_ca_cert_pem(ca_cert_pem, key_pair)
            .map_err(|e| CertError::InvalidPem(e.to_string()))?;
        Ok(Self {
            issuer,
            ca_cert_pem: ca_cert_pem.to_string(),
        })
    }

    /// Load the CA from `dir`, or generate one and persist it there.
    pub fn load_or_generate(dir: &Path, org_name: &str) -> Result<Self, CertError> {
        let cert_path = dir.join(CA_CERT_FILE);
        let key_path = dir.join(CA_KEY_FILE);
        if cert_path.exists() && key_path.exists() {
            let cert_pem = std::fs::read_to_string(&cert_path)?;
            let key_pem = std::fs::read_to_string(&key_path)?;
            return Self::from_pem(&cert_pem, &key_pem);
        }

        let ca = Self::generate(org_name)?;
        ca.save(dir)?;
        Ok(ca)
    }

    /// Write `ca.pem` and `ca-key.pem` into `dir`; the key is owner-only.
    pub fn save(&self, dir: &Path) -> Result<(), CertError> {
        std::fs::create_dir_all(dir)?;
        let key_path = dir.join(CA_KEY_FILE);
        std::fs::write(dir.join(CA_CERT_FILE), &self.ca_cert_pem)?;
        std::fs::write(&key_path, self.issuer.key().serialize_pem())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Sign a relay CSR.
    ///
    /// The CSR's subject is replaced by `CN=<relay_id>`. A CSR that names a
    /// different CN is rejected so a relay cannot obtain another relay's
    /// identity.
    pub fn sign_csr(&self, csr_pem: &str, relay_id: &str) -> Result<IssuedCertificate, CertError> {
        if let Some(cn) = common_name_of_csr(csr_pem)? {
            if cn != relay_id {
                return Err(CertError::InvalidCsr(format!(
                    "CSR common name {cn:?} does not match relay id {relay_id:?}"
                )));
            }
        }

        let mut csr = CertificateSigningRequestParams::from_pem(csr_pem)
            .map_err(|e| CertError::InvalidCsr(e.to_string()))?;

        let mut subject = DistinguishedName::new();
        subject.push(DnType::CommonName, relay_id);
        csr.params.distinguished_name = subject;
        csr.params.subject_alt_names.clear();
        csr.params.is_ca = IsCa::ExplicitNoCa;
        csr.params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        csr.params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        csr.params.use_authority_key_identifier_extension = true;

        let serial = random_serial();
        csr.params.serial_number = Some(SerialNumber::from(serial.clone()));

        let cert = csr
            .signed_by(&self.issuer)
            .map_err(|e| CertError::Generation(e.to_string()))?;

        Ok(IssuedCertificate {
            cert_pem: cert.pem(),
            root_cert_pem: self.ca_cert_pem.clone(),
            fingerprint: fingerprint_of_der(cert.der()),
            serial_number: hex::encode(serial),
        })
    }
}

/// 16 random bytes with the sign bit cleared, so the DER integer stays positive.
fn random_serial() -> Vec<u8> {
    let mut bytes = uuid::Uuid::new_v4().into_bytes();
    bytes[0] &= 0x7f;
    bytes.to_vec()
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::needless_pass_by_value
)]
mod tests {
    use super::*;
    use crate::csr::common_name_of_certificate;
    use crate::csr::tests::relay_csr;

    #[test]
    fn generate_ca_produces_valid_pem() {
        let ca = CaBundle::generate("RelayHub Test").unwrap();
        assert!(ca.ca_cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(ca.ca_cert_pem.contains("END CERTIFICATE"));
    }

    #[test]
    fn signed_certificate_carries_relay_id_as_cn() {
        let ca = CaBundle::generate("RelayHub Test").unwrap();
        let issued = ca
            .sign_csr(&relay_csr(Some("relay-001")), "relay-001")
            .unwrap();

        assert!(issued.cert_pem.contains("BEGIN CERTIFICATE"));
        assert_eq!(issued.root_cert_pem, ca.ca_cert_pem);
        assert_eq!(
            common_name_of_certificate(&issued.cert_pem)
                .unwrap()
                .as_deref(),
            Some("relay-001")
        );
        assert_eq!(issued.fingerprint.len(), 64);
    }

    #[test]
    fn csr_without_cn_gets_relay_id() {
        let ca = CaBundle::generate("RelayHub Test").unwrap();
        let issued = ca.sign_csr(&relay_csr(None), "relay-002").unwrap();
        assert_eq!(
            common_name_of_certificate(&issued.cert_pem)
                .unwrap()
                .as_deref(),
            Some("relay-002")
        );
    }

    #[test]
    fn csr_for_other_relay_is_rejected() {
        let ca = CaBundle::generate("RelayHub Test").unwrap();
        let err = ca
            .sign_csr(&relay_csr(Some("relay-a")), "relay-b")
            .unwrap_err();
        assert!(matches!(err, CertError::InvalidCsr(_)));
    }

    #[test]
    fn malformed_csr_is_rejected() {
        let ca = CaBundle::generate("RelayHub Test").unwrap();
        let err = ca.sign_csr("not a csr", "relay-a").unwrap_err();
        assert!(matches!(err, CertError::InvalidCsr(_)));
    }

    #[test]
    fn refreshed_certificates_differ() {
        let ca = CaBundle::generate("RelayHub Test").unwrap();
        let csr = relay_csr(Some("relay-r"));
        let first = ca.sign_csr(&csr, "relay-r").unwrap();
        let second = ca.sign_csr(&csr, "relay-r").unwrap();

        assert_ne!(first.serial_number, second.serial_number);
        assert_ne!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn load_or_generate_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let first = CaBundle::load_or_generate(dir.path(), "RelayHub Test").unwrap();
        let second = CaBundle::load_or_generate(dir.path(), "RelayHub Test").unwrap();
        assert_eq!(first.ca_cert_pem, second.ca_cert_pem);

        // The reloaded CA can still sign.
        let issued = second
            .sign_csr(&relay_csr(Some("relay-d")), "relay-d")
            .unwrap();
        assert_eq!(issued.root_cert_pem, first.ca_cert_pem);

        // Leaves issued after the reload name the stored CA as issuer.
        let (_, ca_pem) = x509_parser::pem::parse_x509_pem(first.ca_cert_pem.as_bytes()).unwrap();
        let ca = ca_pem.parse_x509().unwrap();
        let (_, leaf_pem) = x509_parser::pem::parse_x509_pem(issued.cert_pem.as_bytes()).unwrap();
        let leaf = leaf_pem.parse_x509().unwrap();
        assert_eq!(leaf.issuer().as_raw(), ca.subject().as_raw());
    }

    #[cfg(unix)]
    #[test]
    fn saved_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        CaBundle::load_or_generate(dir.path(), "RelayHub Test").unwrap();
        let mode = std::fs::metadata(dir.path().join(CA_KEY_FILE))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }
}
