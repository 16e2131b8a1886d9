//! SASL mode negotiation.
//!
//! Turns a requested [`AuthMode`] into the parameters handed to the engine's
//! open call. The mapping is a fixed table; there is no fallback between
//! mechanisms.

use crate::TlsIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

pub const MECH_EXTERNAL: &str = "EXTERNAL";
pub const MECH_PLAIN: &str = "PLAIN";
pub const MECH_ANONYMOUS: &str = "ANONYMOUS";

/// Username carried by password-less PLAIN. The broker maps the certificate
/// CN to this principal out-of-band.
pub const PLAIN_PLACEHOLDER_USER: &str = "jcsmp-client";

/// Requested authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthMode {
    /// Identity taken from the TLS client certificate.
    External,
    /// Username (and empty password) over the encrypted channel.
    Plain,
    /// Encrypted channel without a client identity.
    Anonymous,
    /// Let the peer's mechanism list decide.
    Auto,
}

impl AuthMode {
    pub const ALL: [AuthMode; 4] = [
        AuthMode::External,
        AuthMode::Plain,
        AuthMode::Anonymous,
        AuthMode::Auto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::External => "EXTERNAL",
            AuthMode::Plain => "PLAIN",
            AuthMode::Anonymous => "ANONYMOUS",
            AuthMode::Auto => "AUTO",
        }
    }

    /// Mechanisms the client may offer for this mode. Empty means "whatever
    /// the peer offers".
    pub fn allowed_mechanisms(&self) -> Vec<String> {
        match self {
            AuthMode::External => vec![MECH_EXTERNAL.to_string()],
            AuthMode::Plain => vec![MECH_PLAIN.to_string()],
            AuthMode::Anonymous => vec![MECH_ANONYMOUS.to_string()],
            AuthMode::Auto => Vec::new(),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = AuthModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AuthModeParseError(s.to_string()))
    }
}

impl TryFrom<String> for AuthMode {
    type Error = AuthModeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AuthMode> for String {
    fn from(mode: AuthMode) -> Self {
        mode.as_str().to_string()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown auth mode {0:?}, expected one of EXTERNAL, PLAIN, ANONYMOUS, AUTO")]
pub struct AuthModeParseError(String);

/// SASL credentials sent with PLAIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything the engine needs to open the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionParameters {
    pub target_url: Url,
    pub tls_identity: Arc<TlsIdentity>,
    pub auth_mode: AuthMode,
    /// Ordered; empty lets the peer negotiate.
    pub allowed_mechanisms: Vec<String>,
    pub principal: Option<Principal>,
    /// Sent as the open frame's connection properties.
    pub vendor_properties: BTreeMap<String, String>,
}

impl ConnectionParameters {
    /// Host part of the target URL, used for SNI and the open frame hostname.
    pub fn host(&self) -> Option<&str> {
        self.target_url.host_str()
    }

    /// Port from the URL, or the scheme default.
    pub fn port(&self) -> u16 {
        self.target_url.port().unwrap_or(match self.target_url.scheme() {
            "amqp" => crate::AMQP_PORT,
            _ => crate::AMQPS_PORT,
        })
    }
}

/// Derive connection parameters from the requested mode.
///
/// Pure: identical inputs always produce identical output.
pub fn negotiate(
    mode: AuthMode,
    tls_identity: Arc<TlsIdentity>,
    target_url: &Url,
    vendor_properties: &BTreeMap<String, String>,
) -> ConnectionParameters {
    let principal = match mode {
        AuthMode::Plain => Some(Principal {
            username: PLAIN_PLACEHOLDER_USER.to_string(),
            password: String::new(),
        }),
        AuthMode::External | AuthMode::Anonymous | AuthMode::Auto => None,
    };

    ConnectionParameters {
        target_url: target_url.clone(),
        tls_identity,
        auth_mode: mode,
        allowed_mechanisms: mode.allowed_mechanisms(),
        principal,
        vendor_properties: vendor_properties.clone(),
    }
}
