//! TLS credential preconditions.
//!
//! A [`TlsIdentity`] can only be built once all three credential files are
//! present and readable, so certificate problems surface locally before any
//! socket is opened. Turning the identity into a rustls configuration is the
//! client crate's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Locations of the client certificate, its private key and the CA bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPaths {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
    pub trusted_ca: PathBuf,
}

impl Default for CredentialPaths {
    fn default() -> Self {
        Self {
            certificate: PathBuf::from("./ssl/cert.pem"),
            private_key: PathBuf::from("./ssl/key.pem"),
            trusted_ca: PathBuf::from("./ssl/ca.pem"),
        }
    }
}

impl CredentialPaths {
    /// `(role, path)` pairs in check order.
    pub fn entries(&self) -> [(&'static str, &Path); 3] {
        [
            ("client certificate", self.certificate.as_path()),
            ("private key", self.private_key.as_path()),
            ("trusted CA certificate", self.trusted_ca.as_path()),
        ]
    }
}

/// How the broker's certificate is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeerVerification {
    /// Chain must lead to the trusted CA; the hostname is not compared.
    #[default]
    #[serde(alias = "peer")]
    VerifyPeer,
    /// Chain and hostname are both checked.
    #[serde(alias = "peer-name")]
    VerifyPeerName,
}

impl fmt::Display for PeerVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerVerification::VerifyPeer => f.write_str("VERIFY_PEER"),
            PeerVerification::VerifyPeerName => f.write_str("VERIFY_PEER_NAME"),
        }
    }
}

impl FromStr for PeerVerification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "peer" | "verify-peer" => Ok(PeerVerification::VerifyPeer),
            "peer-name" | "verify-peer-name" => Ok(PeerVerification::VerifyPeerName),
            other => Err(format!(
                "unknown peer verification {other:?}, expected peer or peer-name"
            )),
        }
    }
}

/// Client credentials plus trust policy. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsIdentity {
    paths: CredentialPaths,
    passphrase: String,
    peer_verification: PeerVerification,
}

impl TlsIdentity {
    /// Check that every credential file exists and can be opened, then build
    /// the identity.
    pub fn configure(
        paths: CredentialPaths,
        passphrase: impl Into<String>,
        peer_verification: PeerVerification,
    ) -> Result<Self, PreconditionError> {
        for (role, path) in paths.entries() {
            check_readable(role, path)?;
        }
        Ok(Self {
            paths,
            passphrase: passphrase.into(),
            peer_verification,
        })
    }

    #[cfg(test)]
    pub(crate) fn unchecked(
        paths: CredentialPaths,
        passphrase: String,
        peer_verification: PeerVerification,
    ) -> Self {
        Self {
            paths,
            passphrase,
            peer_verification,
        }
    }

    pub fn paths(&self) -> &CredentialPaths {
        &self.paths
    }

    pub fn certificate(&self) -> &Path {
        &self.paths.certificate
    }

    pub fn private_key(&self) -> &Path {
        &self.paths.private_key
    }

    pub fn trusted_ca(&self) -> &Path {
        &self.paths.trusted_ca
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn peer_verification(&self) -> PeerVerification {
        self.peer_verification
    }
}

impl fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("paths", &self.paths)
            .field("passphrase", &"<redacted>")
            .field("peer_verification", &self.peer_verification)
            .finish()
    }
}

fn check_readable(role: &'static str, path: &Path) -> Result<(), PreconditionError> {
    if !path.is_file() {
        return Err(PreconditionError::MissingFile {
            role,
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|source| PreconditionError::Unreadable {
        role,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Raised before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    #[error("SSL certificate file not found: {} ({role})", .path.display())]
    MissingFile { role: &'static str, path: PathBuf },
    #[error("cannot read {role} {}: {source}", .path.display())]
    Unreadable {
        role: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PreconditionError {
    pub fn path(&self) -> &Path {
        match self {
            PreconditionError::MissingFile { path, .. } => path,
            PreconditionError::Unreadable { path, .. } => path,
        }
    }
}
