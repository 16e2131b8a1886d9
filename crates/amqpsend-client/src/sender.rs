//! Sender link setup and the one-shot send policy.

use crate::engine::{Endpoint, TargetSpec};
use amqpsend_core::{BrokerProfile, OutboundMessage};
use std::time::Duration;

/// Target for `address` carrying the profile's capability annotations.
pub fn target_for(profile: BrokerProfile, address: &str) -> TargetSpec {
    TargetSpec {
        address: address.to_string(),
        capabilities: profile
            .target_capabilities()
            .iter()
            .map(|c| c.to_string())
            .collect(),
    }
}

/// Requests the sender link. Called once, when the connection opens.
pub fn attach(endpoint: &mut dyn Endpoint, target: TargetSpec) {
    tracing::debug!(
        "Attaching sender to {} with capabilities {:?}",
        target.address,
        target.capabilities
    );
    endpoint.attach_sender(target);
}

/// The message for this run. `now` is the time since the Unix epoch.
pub fn build_message(profile: BrokerProfile, body: &str, now: Duration) -> OutboundMessage {
    OutboundMessage::with_properties(body, profile.message_properties(now))
}

/// Sends at most one message, then closes the link and the connection.
#[derive(Debug, Default)]
pub struct OneShot {
    fired: bool,
}

impl OneShot {
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Sends `message` unless already fired. Returns whether it sent.
    pub fn fire(&mut self, endpoint: &mut dyn Endpoint, message: OutboundMessage) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        endpoint.send(message);
        endpoint.close_link();
        endpoint.close_connection();
        true
    }
}
