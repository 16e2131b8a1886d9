//! rustls client configuration built from a [`TlsIdentity`].

use amqpsend_core::{PeerVerification, TlsIdentity};
use pkcs8::EncryptedPrivateKeyInfo;
use pkcs8::der::Document;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const LEGACY_ENCRYPTION_HEADER: &str = "Proc-Type: 4,ENCRYPTED";

#[derive(Debug, thiserror::Error)]
pub enum TlsSetupError {
    #[error("failed to read {role} {}: {source}", .path.display())]
    Read {
        role: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {role} {}: {reason}", .path.display())]
    Pem {
        role: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("no certificates in {}", .0.display())]
    NoCertificates(PathBuf),
    #[error("failed to decrypt private key {}: {reason}", .path.display())]
    Decrypt { path: PathBuf, reason: String },
    #[error("no usable trust anchor in {}: {reason}", .path.display())]
    TrustAnchor { path: PathBuf, reason: String },
    #[error("invalid server name {0:?}")]
    ServerName(String),
    #[error("rustls rejected the configuration: {0}")]
    Rustls(#[from] rustls::Error),
    #[error("failed to build certificate verifier: {0}")]
    Verifier(String),
}

/// The crypto provider every TLS object in this crate is built with.
pub fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Builds the client configuration: trust anchors from the CA bundle, the
/// client certificate always presented, and the identity's verification
/// policy.
pub fn client_config(identity: &TlsIdentity) -> Result<ClientConfig, TlsSetupError> {
    let provider = provider();

    let roots = load_roots(identity.trusted_ca())?;
    let chain = load_chain(identity.certificate())?;
    let key = load_private_key(identity.private_key(), identity.passphrase())?;

    let webpki = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| TlsSetupError::Verifier(e.to_string()))?;
    let verifier: Arc<dyn ServerCertVerifier> = match identity.peer_verification() {
        PeerVerification::VerifyPeerName => webpki,
        PeerVerification::VerifyPeer => Arc::new(ChainOnlyVerifier { inner: webpki }),
    };

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_auth_cert(chain, key)?;
    Ok(config)
}

/// SNI and verification name for a URL host.
pub fn server_name(host: &str) -> Result<ServerName<'static>, TlsSetupError> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    ServerName::try_from(host.to_string()).map_err(|_| TlsSetupError::ServerName(host.to_string()))
}

fn read(role: &'static str, path: &Path) -> Result<Vec<u8>, TlsSetupError> {
    std::fs::read(path).map_err(|source| TlsSetupError::Read {
        role,
        path: path.to_path_buf(),
        source,
    })
}

fn load_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
    let pem = read("certificate", path)?;
    let chain = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsSetupError::Pem {
            role: "certificate",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if chain.is_empty() {
        return Err(TlsSetupError::NoCertificates(path.to_path_buf()));
    }
    Ok(chain)
}

fn load_roots(path: &Path) -> Result<RootCertStore, TlsSetupError> {
    let pem = read("CA bundle", path)?;
    let certs = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsSetupError::Pem {
            role: "CA bundle",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(TlsSetupError::TrustAnchor {
            path: path.to_path_buf(),
            reason: format!("{ignored} certificate(s) rejected"),
        });
    }
    if ignored > 0 {
        tracing::warn!("Ignored {} unusable CA certificate(s) in {}", ignored, path.display());
    }
    Ok(roots)
}

/// Loads a PEM private key. Encrypted PKCS#8 keys are decrypted with the
/// passphrase; any other key form ignores it. Keys encrypted with the legacy
/// OpenSSL PEM headers are refused.
fn load_private_key(path: &Path, passphrase: &str) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
    let pem = read("private key", path)?;
    let text = String::from_utf8_lossy(&pem);
    if text.contains(&format!("-----BEGIN {ENCRYPTED_KEY_LABEL}-----")) {
        return decrypt_private_key(path, &text, passphrase);
    }
    if text.contains(LEGACY_ENCRYPTION_HEADER) {
        return Err(TlsSetupError::Decrypt {
            path: path.to_path_buf(),
            reason: format!(
                "legacy \"{LEGACY_ENCRYPTION_HEADER}\" keys are not supported, \
                 only encrypted PKCS#8 (convert with `openssl pkcs8 -topk8`)"
            ),
        });
    }
    PrivateKeyDer::from_pem_slice(&pem).map_err(|e| TlsSetupError::Pem {
        role: "private key",
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn decrypt_private_key(
    path: &Path,
    text: &str,
    passphrase: &str,
) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
    let decrypt_err = |reason: String| TlsSetupError::Decrypt {
        path: path.to_path_buf(),
        reason,
    };
    let (label, document) = Document::from_pem(text).map_err(|e| decrypt_err(e.to_string()))?;
    if label != ENCRYPTED_KEY_LABEL {
        return Err(decrypt_err(format!("unexpected PEM label {label}")));
    }
    let info = EncryptedPrivateKeyInfo::try_from(document.as_bytes())
        .map_err(|e| decrypt_err(e.to_string()))?;
    let secret = info
        .decrypt(passphrase.as_bytes())
        .map_err(|e| decrypt_err(e.to_string()))?;
    Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        secret.as_bytes().to_vec(),
    )))
}

/// Verifies the certificate chain against the trust anchors but accepts a
/// certificate whose names do not cover the connection host.
#[derive(Debug)]
struct ChainOnlyVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        // webpki checks the chain before the name, so a name error implies a
        // trusted chain.
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) => {
                tracing::debug!("Accepting peer certificate not issued for {:?}", server_name);
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use amqpsend_core::{CredentialPaths, PeerVerification, TlsIdentity};
    use rcgen::{CertificateParams, DnType, IsCa, BasicConstraints, KeyPair};
    use std::path::Path;

    pub struct TestPki {
        pub ca_pem: String,
        pub server_cert_pem: String,
        pub server_key_pem: String,
        pub client_cert_pem: String,
        pub client_key_pem: String,
    }

    /// A CA plus a server certificate issued for `server_name` and a client
    /// certificate.
    pub fn generate(server_name: &str) -> TestPki {
        let mut ca_params = CertificateParams::default();
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "amqpsend test CA");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let server_params = CertificateParams::new(vec![server_name.to_string()]).unwrap();
        let server_key = KeyPair::generate().unwrap();
        let server_cert = server_params
            .signed_by(&server_key, &ca_cert, &ca_key)
            .unwrap();

        let mut client_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        client_params
            .distinguished_name
            .push(DnType::CommonName, "amqpsend-client");
        let client_key = KeyPair::generate().unwrap();
        let client_cert = client_params
            .signed_by(&client_key, &ca_cert, &ca_key)
            .unwrap();

        TestPki {
            ca_pem: ca_cert.pem(),
            server_cert_pem: server_cert.pem(),
            server_key_pem: server_key.serialize_pem(),
            client_cert_pem: client_cert.pem(),
            client_key_pem: client_key.serialize_pem(),
        }
    }

    /// Writes the client side of `pki` into `dir` and configures an identity.
    pub fn client_identity(pki: &TestPki, dir: &Path, policy: PeerVerification) -> TlsIdentity {
        let paths = CredentialPaths {
            certificate: dir.join("cert.pem"),
            private_key: dir.join("key.pem"),
            trusted_ca: dir.join("ca.pem"),
        };
        std::fs::write(&paths.certificate, &pki.client_cert_pem).unwrap();
        std::fs::write(&paths.private_key, &pki.client_key_pem).unwrap();
        std::fs::write(&paths.trusted_ca, &pki.ca_pem).unwrap();
        TlsIdentity::configure(paths, "", policy).unwrap()
    }
}
