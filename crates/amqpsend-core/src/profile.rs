//! Broker profiles.
//!
//! Each profile bundles the per-broker quirks: diagnostics label, default
//! auth mode, target capabilities and the extra properties sent on the
//! connection and the message.

use crate::AuthMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const PRODUCT: &str = "amqpsend";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerProfile {
    /// Any AMQP 1.0 broker.
    #[default]
    Generic,
    /// Solace PubSub+.
    Solace,
    /// Generic broker with verbose diagnostics.
    Debug,
}

impl BrokerProfile {
    pub const ALL: [BrokerProfile; 3] = [
        BrokerProfile::Generic,
        BrokerProfile::Solace,
        BrokerProfile::Debug,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BrokerProfile::Generic => "generic",
            BrokerProfile::Solace => "solace",
            BrokerProfile::Debug => "debug",
        }
    }

    /// Prefix for lifecycle log lines.
    pub fn label(&self) -> &'static str {
        match self {
            BrokerProfile::Generic => "SECURE-SEND",
            BrokerProfile::Solace => "SOLACE-SEND",
            BrokerProfile::Debug => "DEBUG-SEND",
        }
    }

    pub fn default_auth_mode(&self) -> AuthMode {
        match self {
            BrokerProfile::Generic => AuthMode::Anonymous,
            BrokerProfile::Solace | BrokerProfile::Debug => AuthMode::External,
        }
    }

    /// Capabilities placed on the sender's target.
    pub fn target_capabilities(&self) -> &'static [&'static str] {
        match self {
            BrokerProfile::Solace => &["queue", "topic"],
            BrokerProfile::Generic | BrokerProfile::Debug => &["queue"],
        }
    }

    /// Properties for the open frame.
    pub fn connection_properties(&self) -> BTreeMap<String, String> {
        match self {
            BrokerProfile::Solace => BTreeMap::from([
                ("product".to_string(), PRODUCT.to_string()),
                ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
                ("platform".to_string(), "Rust".to_string()),
            ]),
            BrokerProfile::Generic | BrokerProfile::Debug => BTreeMap::new(),
        }
    }

    /// Application properties stamped on the message. `now` is the time since
    /// the Unix epoch.
    pub fn message_properties(&self, now: Duration) -> BTreeMap<String, String> {
        match self {
            BrokerProfile::Solace => BTreeMap::from([
                ("sender".to_string(), PRODUCT.to_string()),
                (
                    "timestamp".to_string(),
                    format!("{}.{:03}", now.as_secs(), now.subsec_millis()),
                ),
            ]),
            BrokerProfile::Generic | BrokerProfile::Debug => BTreeMap::new(),
        }
    }

    pub fn verbose(&self) -> bool {
        matches!(self, BrokerProfile::Debug)
    }
}

impl fmt::Display for BrokerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrokerProfile {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BrokerProfile::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProfileParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown broker profile {0:?}, expected generic, solace or debug")]
pub struct ProfileParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_profile() {
        assert_eq!(BrokerProfile::Generic.default_auth_mode(), AuthMode::Anonymous);
        assert_eq!(BrokerProfile::Solace.default_auth_mode(), AuthMode::External);
        assert_eq!(BrokerProfile::Debug.default_auth_mode(), AuthMode::External);
    }

    #[test]
    fn solace_marks_topic_capability() {
        assert_eq!(BrokerProfile::Generic.target_capabilities(), ["queue"]);
        assert_eq!(BrokerProfile::Solace.target_capabilities(), ["queue", "topic"]);
    }

    #[test]
    fn solace_properties() {
        let conn = BrokerProfile::Solace.connection_properties();
        assert_eq!(conn.get("product").map(String::as_str), Some("amqpsend"));
        assert_eq!(conn.get("platform").map(String::as_str), Some("Rust"));
        assert!(BrokerProfile::Generic.connection_properties().is_empty());

        let msg = BrokerProfile::Solace.message_properties(Duration::from_millis(1_700_000_000_250));
        assert_eq!(msg.get("timestamp").map(String::as_str), Some("1700000000.250"));
        assert_eq!(msg.get("sender").map(String::as_str), Some("amqpsend"));
        assert!(BrokerProfile::Debug
            .message_properties(Duration::ZERO)
            .is_empty());
    }

    #[test]
    fn parse_profile() {
        assert_eq!("Solace".parse::<BrokerProfile>().unwrap(), BrokerProfile::Solace);
        assert!("rabbit".parse::<BrokerProfile>().is_err());
    }
}
