//! Minimal AMQP 1.0 client engine.
//!
//! The engine owns the socket and the protocol; a [`LifecycleHandler`] sees
//! only lifecycle events and answers them by recording requests on an
//! [`Endpoint`]. Requests are executed after the handler returns, so handlers
//! never block and never re-enter the engine.

mod connector;
mod io;
mod reactor;
mod sasl;

pub use connector::{Connected, Connector, TcpTlsConnector};
pub use reactor::Reactor;
pub use sasl::{SUPPORTED_MECHANISMS, initial_response, select_mechanism};

use crate::codec::{CodecError, DeliveryState};
use crate::tls::TlsSetupError;
use amqpsend_core::{ConnectionParameters, ErrorCondition, OutboundMessage};
use std::time::Duration;

/// Condition reported when SASL authentication fails.
pub const UNAUTHORIZED_ACCESS: &str = "amqp:unauthorized-access";
/// Condition reported for malformed or unexpected frames.
pub const FRAMING_ERROR: &str = "amqp:connection:framing-error";
/// Condition reported for socket failures and unexpected end of stream.
pub const IO_ERROR: &str = "amqpsend:io";
/// Condition reported when the peer stops sending within our idle timeout.
pub const IDLE_TIMEOUT: &str = "amqp:resource-limit-exceeded";

/// Negotiated TLS session details, logged once the connection opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsInfo {
    pub protocol_version: String,
    pub cipher_suite: String,
}

/// Lifecycle events in the order the engine emits them for one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    ConnectionInit,
    ConnectionBound,
    ConnectionOpened(Option<TlsInfo>),
    LinkOpened,
    Sendable { credit: u32 },
    DeliveryOutcome(DeliveryState),
    TransportError(ErrorCondition),
    ConnectionError(ErrorCondition),
    SessionError(ErrorCondition),
    LinkError(ErrorCondition),
    /// The peer detached the sender link or ended its session.
    LinkClosed,
    Disconnected,
    ConnectionUnbound,
    TransportClosed,
    Interrupt,
}

/// One method per lifecycle event. Every method has a no-op default.
pub trait LifecycleHandler {
    fn on_start(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_connection_init(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_connection_bound(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_connection_opened(&mut self, _endpoint: &mut dyn Endpoint, _tls: Option<&TlsInfo>) {}
    fn on_link_opened(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_sendable(&mut self, _endpoint: &mut dyn Endpoint, _credit: u32) {}
    fn on_delivery_outcome(&mut self, _endpoint: &mut dyn Endpoint, _outcome: &DeliveryState) {}
    fn on_transport_error(&mut self, _endpoint: &mut dyn Endpoint, _condition: &ErrorCondition) {}
    fn on_connection_error(&mut self, _endpoint: &mut dyn Endpoint, _condition: &ErrorCondition) {}
    fn on_session_error(&mut self, _endpoint: &mut dyn Endpoint, _condition: &ErrorCondition) {}
    fn on_link_error(&mut self, _endpoint: &mut dyn Endpoint, _condition: &ErrorCondition) {}
    fn on_link_closed(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_disconnected(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_connection_unbound(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_transport_closed(&mut self, _endpoint: &mut dyn Endpoint) {}
    fn on_interrupt(&mut self, _endpoint: &mut dyn Endpoint) {}
}

/// Routes an event to its handler method.
pub fn dispatch<H: LifecycleHandler + ?Sized>(
    handler: &mut H,
    event: &Event,
    endpoint: &mut dyn Endpoint,
) {
    match event {
        Event::Start => handler.on_start(endpoint),
        Event::ConnectionInit => handler.on_connection_init(endpoint),
        Event::ConnectionBound => handler.on_connection_bound(endpoint),
        Event::ConnectionOpened(tls) => handler.on_connection_opened(endpoint, tls.as_ref()),
        Event::LinkOpened => handler.on_link_opened(endpoint),
        Event::Sendable { credit } => handler.on_sendable(endpoint, *credit),
        Event::DeliveryOutcome(outcome) => handler.on_delivery_outcome(endpoint, outcome),
        Event::TransportError(c) => handler.on_transport_error(endpoint, c),
        Event::ConnectionError(c) => handler.on_connection_error(endpoint, c),
        Event::SessionError(c) => handler.on_session_error(endpoint, c),
        Event::LinkError(c) => handler.on_link_error(endpoint, c),
        Event::LinkClosed => handler.on_link_closed(endpoint),
        Event::Disconnected => handler.on_disconnected(endpoint),
        Event::ConnectionUnbound => handler.on_connection_unbound(endpoint),
        Event::TransportClosed => handler.on_transport_closed(endpoint),
        Event::Interrupt => handler.on_interrupt(endpoint),
    }
}

/// Where the sender link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub address: String,
    pub capabilities: Vec<String>,
}

/// Work a handler asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Connect(Box<ConnectionParameters>),
    AttachSender(TargetSpec),
    Send(OutboundMessage),
    CloseLink,
    CloseConnection,
}

/// The handler's view of the engine.
pub trait Endpoint {
    fn connect(&mut self, params: ConnectionParameters);
    fn attach_sender(&mut self, target: TargetSpec);
    fn send(&mut self, message: OutboundMessage);
    fn close_link(&mut self);
    fn close_connection(&mut self);
}

/// Records requests in order for the reactor to execute.
#[derive(Debug, Default)]
pub struct RequestQueue {
    requests: Vec<Request>,
}

impl RequestQueue {
    pub fn drain(&mut self) -> std::vec::Drain<'_, Request> {
        self.requests.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl Endpoint for RequestQueue {
    fn connect(&mut self, params: ConnectionParameters) {
        self.requests.push(Request::Connect(Box::new(params)));
    }

    fn attach_sender(&mut self, target: TargetSpec) {
        self.requests.push(Request::AttachSender(target));
    }

    fn send(&mut self, message: OutboundMessage) {
        self.requests.push(Request::Send(message));
    }

    fn close_link(&mut self) {
        self.requests.push(Request::CloseLink);
    }

    fn close_connection(&mut self) {
        self.requests.push(Request::CloseConnection);
    }
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub container_id: String,
    pub max_frame_size: u32,
    /// Advertised to the peer; the peer is considered dead after this long
    /// without traffic.
    pub idle_timeout: Option<Duration>,
    /// Covers TCP connect, TLS, SASL and the open exchange.
    pub handshake_timeout: Duration,
    /// How long to wait for the peer's close after sending ours.
    pub close_timeout: Duration,
    /// Mechanisms AUTO mode may choose from, from the SASL client config.
    pub sasl_mech_list: Option<Vec<String>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            container_id: format!("amqpsend-{}", uuid::Uuid::new_v4()),
            max_frame_size: 64 * 1024,
            idle_timeout: None,
            handshake_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(5),
            sasl_mech_list: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsSetupError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Codec(#[from] CodecError),
    #[error("connection aborted by peer")]
    Eof,
    #[error("timed out during {0}")]
    Timeout(&'static str),
    #[error("unexpected {got} during {phase}")]
    Protocol { phase: &'static str, got: String },
    #[error("{0}")]
    Authentication(String),
    #[error("connection URL has no host")]
    NoHost,
}

impl EngineError {
    /// Setup errors end the run directly; everything else is reported to the
    /// handler as a transport error.
    pub fn is_setup(&self) -> bool {
        matches!(self, EngineError::Tls(_) | EngineError::NoHost)
    }

    pub fn condition(&self) -> ErrorCondition {
        let name = match self {
            EngineError::Authentication(_) => UNAUTHORIZED_ACCESS,
            EngineError::Codec(_) | EngineError::Protocol { .. } => FRAMING_ERROR,
            EngineError::Timeout("idle") => IDLE_TIMEOUT,
            _ => IO_ERROR,
        };
        ErrorCondition::new(name).with_description(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    impl LifecycleHandler for Recorder {
        fn on_start(&mut self, _: &mut dyn Endpoint) {
            self.0.push("start");
        }
        fn on_sendable(&mut self, endpoint: &mut dyn Endpoint, credit: u32) {
            assert_eq!(credit, 3);
            endpoint.close_link();
            self.0.push("sendable");
        }
        fn on_link_error(&mut self, _: &mut dyn Endpoint, condition: &ErrorCondition) {
            assert_eq!(condition.name, "amqp:not-found");
            self.0.push("link-error");
        }
    }

    #[test]
    fn dispatch_routes_and_defaults_are_silent() {
        let mut handler = Recorder::default();
        let mut queue = RequestQueue::default();
        for event in [
            Event::Start,
            Event::ConnectionInit,
            Event::Sendable { credit: 3 },
            Event::LinkError(ErrorCondition::new("amqp:not-found")),
            Event::TransportClosed,
        ] {
            dispatch(&mut handler, &event, &mut queue);
        }
        assert_eq!(handler.0, ["start", "sendable", "link-error"]);
        assert_eq!(queue.drain().collect::<Vec<_>>(), [Request::CloseLink]);
        assert!(queue.is_empty());
    }

    #[test]
    fn error_conditions() {
        assert_eq!(
            EngineError::Authentication("denied".into()).condition().name,
            UNAUTHORIZED_ACCESS
        );
        assert_eq!(EngineError::Eof.condition().name, IO_ERROR);
        assert_eq!(
            EngineError::Codec(CodecError::Truncated).condition().name,
            FRAMING_ERROR
        );
        assert_eq!(EngineError::Timeout("idle").condition().name, IDLE_TIMEOUT);
        assert!(!EngineError::Eof.is_setup());
    }
}
