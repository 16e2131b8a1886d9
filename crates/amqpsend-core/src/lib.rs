//! Core types for amqpsend.
//!
//! This crate holds everything that is independent of the wire: credential
//! preconditions, SASL mode negotiation, failure classification, broker
//! profiles and the connection/link state enums. The protocol engine lives in
//! `amqpsend-client`.

mod auth;
mod failure;
mod message;
mod profile;
mod state;
mod tls;

pub use auth::{
    AuthMode, AuthModeParseError, ConnectionParameters, MECH_ANONYMOUS, MECH_EXTERNAL, MECH_PLAIN,
    PLAIN_PLACEHOLDER_USER, Principal, negotiate,
};
pub use failure::{ErrorCondition, FailureRecord, Scope};
pub use message::OutboundMessage;
pub use profile::{BrokerProfile, ProfileParseError};
pub use state::{ConnectionState, IllegalTransition, LinkState};
pub use tls::{CredentialPaths, PeerVerification, PreconditionError, TlsIdentity};

/// Default port for `amqps://` URLs.
pub const AMQPS_PORT: u16 = 5671;

/// Default port for `amqp://` URLs.
pub const AMQP_PORT: u16 = 5672;
