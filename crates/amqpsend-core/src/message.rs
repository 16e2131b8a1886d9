//! The single outbound message.

use std::collections::BTreeMap;

/// Text body plus optional application properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    body: String,
    properties: BTreeMap<String, String>,
}

impl OutboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_properties(body: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        Self {
            body: body.into(),
            properties,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}
