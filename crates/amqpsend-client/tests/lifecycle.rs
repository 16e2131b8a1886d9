//! End-to-end runs of the engine and controller against a scripted peer over
//! an in-memory duplex stream.

use amqpsend_client::codec::{
    Attach, Begin, Close, Decoder, DeliveryState, Detach, Disposition, End, Flow, Frame, Open,
    Performative, ProtocolHeader, Role, SaslCode, SaslFrame, SaslInit, SaslMechanisms, SaslOutcome,
    Value,
};
use amqpsend_client::engine::{
    Endpoint, FRAMING_ERROR, IDLE_TIMEOUT, IO_ERROR, TargetSpec, UNAUTHORIZED_ACCESS,
};
use amqpsend_client::{
    Connected, Connector, Controller, ControllerConfig, EngineError, EngineSettings,
    LifecycleHandler, Reactor, RunOutcome, TcpTlsConnector,
};
use amqpsend_core::{
    AuthMode, BrokerProfile, ConnectionParameters, ConnectionState, CredentialPaths,
    ErrorCondition, LinkState, OutboundMessage, PeerVerification, Scope, TlsIdentity,
};
use std::collections::BTreeMap;
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Hands out one end of a duplex pipe; a second connect is refused.
struct DuplexConnector {
    stream: Mutex<Option<DuplexStream>>,
}

impl DuplexConnector {
    fn pair() -> (Self, Peer) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        (
            Self {
                stream: Mutex::new(Some(client)),
            },
            Peer {
                stream: server,
                buf: Vec::new(),
            },
        )
    }

    fn refusing() -> Self {
        Self {
            stream: Mutex::new(None),
        }
    }
}

impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(
        &self,
        _params: &ConnectionParameters,
    ) -> Result<Connected<DuplexStream>, EngineError> {
        let stream = self.stream.lock().unwrap().take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused")
        })?;
        Ok(Connected { stream, tls: None })
    }
}

/// The broker side of the pipe, driven step by step by each test.
struct Peer {
    stream: DuplexStream,
    buf: Vec<u8>,
}

impl Peer {
    async fn fill(&mut self) -> usize {
        let mut chunk = [0u8; 4096];
        let n = self.stream.read(&mut chunk).await.unwrap();
        self.buf.extend_from_slice(&chunk[..n]);
        n
    }

    async fn read_header(&mut self) -> ProtocolHeader {
        while self.buf.len() < 8 {
            assert!(self.fill().await > 0, "client hung up before its header");
        }
        let header: [u8; 8] = self.buf[..8].try_into().unwrap();
        self.buf.drain(..8);
        ProtocolHeader::from_bytes(header).unwrap()
    }

    async fn write_header(&mut self, header: ProtocolHeader) {
        self.stream.write_all(&header.to_bytes()).await.unwrap();
    }

    async fn try_frame(&mut self) -> Option<Frame> {
        loop {
            if let Some((frame, used)) = Frame::decode(&self.buf, 1 << 20).unwrap() {
                self.buf.drain(..used);
                return Some(frame);
            }
            if self.fill().await == 0 {
                return None;
            }
        }
    }

    async fn frame(&mut self) -> Frame {
        self.try_frame().await.expect("client hung up")
    }

    async fn sasl(&mut self) -> SaslFrame {
        match self.frame().await {
            Frame::Sasl(sasl) => sasl,
            other => panic!("expected a SASL frame, got {other:?}"),
        }
    }

    async fn performative(&mut self) -> (Performative, Vec<u8>) {
        loop {
            match self.frame().await {
                Frame::Heartbeat => continue,
                Frame::Amqp {
                    performative,
                    payload,
                    ..
                } => return (performative, payload),
                other => panic!("expected an AMQP frame, got {other:?}"),
            }
        }
    }

    async fn write_sasl(&mut self, frame: SaslFrame) {
        let bytes = Frame::Sasl(frame).to_bytes();
        self.stream.write_all(&bytes).await.unwrap();
    }

    async fn send(&mut self, performative: Performative) {
        let bytes = Frame::Amqp {
            channel: 0,
            performative,
            payload: Vec::new(),
        }
        .to_bytes();
        self.stream.write_all(&bytes).await.unwrap();
    }

    /// Runs the SASL exchange. Returns the client's init.
    async fn authenticate(&mut self, offer: &[&str], code: SaslCode) -> SaslInit {
        assert_eq!(self.read_header().await, ProtocolHeader::Sasl);
        self.write_header(ProtocolHeader::Sasl).await;
        self.write_sasl(SaslFrame::Mechanisms(SaslMechanisms {
            mechanisms: offer.iter().map(|m| m.to_string()).collect(),
        }))
        .await;
        let SaslFrame::Init(init) = self.sasl().await else {
            panic!("expected sasl-init");
        };
        self.write_sasl(SaslFrame::Outcome(SaslOutcome {
            code,
            additional_data: None,
        }))
        .await;
        init
    }

    /// SASL with `offer`, then the AMQP header, open and begin exchange.
    /// Returns the client's init and open.
    async fn accept(&mut self, offer: &[&str], max_frame_size: u32) -> (SaslInit, Open) {
        let init = self.authenticate(offer, SaslCode::Ok).await;
        assert_eq!(self.read_header().await, ProtocolHeader::Amqp);
        self.write_header(ProtocolHeader::Amqp).await;

        let (Performative::Open(open), _) = self.performative().await else {
            panic!("expected open");
        };
        let (Performative::Begin(_), _) = self.performative().await else {
            panic!("expected begin");
        };

        let mut reply = Open::new("scripted-broker");
        reply.max_frame_size = max_frame_size;
        self.send(Performative::Open(reply)).await;
        self.send(Performative::Begin(Begin {
            remote_channel: Some(0),
            next_outgoing_id: 0,
            incoming_window: 2048,
            outgoing_window: 2048,
            handle_max: 0,
        }))
        .await;
        (init, open)
    }

    async fn expect_attach(&mut self) -> Attach {
        match self.performative().await {
            (Performative::Attach(attach), _) => attach,
            (other, _) => panic!("expected attach, got {}", other.name()),
        }
    }

    async fn grant(&mut self, attach: &Attach, credit: u32) {
        self.send(Performative::Attach(Attach {
            role: Role::Receiver,
            initial_delivery_count: None,
            ..attach.clone()
        }))
        .await;
        self.send(Performative::Flow(Flow {
            next_incoming_id: Some(0),
            incoming_window: 2048,
            next_outgoing_id: 0,
            outgoing_window: 2048,
            handle: Some(0),
            delivery_count: Some(0),
            link_credit: Some(credit),
            ..Flow::default()
        }))
        .await;
    }

    /// Reassembles one delivery. Returns its payload and the frame count.
    async fn receive_delivery(&mut self) -> (Vec<u8>, usize) {
        let mut payload = Vec::new();
        let mut frames = 0;
        loop {
            let (Performative::Transfer(transfer), chunk) = self.performative().await else {
                panic!("expected transfer");
            };
            frames += 1;
            payload.extend_from_slice(&chunk);
            if !transfer.more {
                return (payload, frames);
            }
        }
    }

    async fn settle(&mut self, state: DeliveryState) {
        self.send(Performative::Disposition(Disposition {
            role: Role::Receiver,
            first: 0,
            last: None,
            settled: true,
            state: Some(state),
        }))
        .await;
    }

    /// Answers the client's teardown: detach, end and close.
    async fn acknowledge_teardown(&mut self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        loop {
            let (performative, _) = self.performative().await;
            seen.push(performative.name());
            match performative {
                Performative::Detach(_) => {
                    self.send(Performative::Detach(Detach {
                        handle: 0,
                        closed: true,
                        error: None,
                    }))
                    .await
                }
                Performative::End(_) => self.send(Performative::End(End::default())).await,
                Performative::Close(_) => {
                    self.send(Performative::Close(Close::default())).await;
                    return seen;
                }
                _ => {}
            }
        }
    }

    /// Reads until the client drops the stream.
    async fn drain_to_eof(&mut self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        while let Some(frame) = self.try_frame().await {
            if let Frame::Amqp { performative, .. } = frame {
                seen.push(performative.name());
            }
        }
        seen
    }
}

/// The application-properties and amqp-value sections of a delivered message.
struct Received {
    body: Option<String>,
    properties: BTreeMap<String, String>,
}

fn read_message(payload: &[u8]) -> Received {
    let mut decoder = Decoder::new(payload);
    let mut message = Received {
        body: None,
        properties: BTreeMap::new(),
    };
    while !decoder.is_empty() {
        let Value::Described(descriptor, section) = decoder.decode_value().unwrap() else {
            panic!("undescribed message section");
        };
        match (descriptor.as_u64(), *section) {
            (Some(0x74), Value::Map(pairs)) => {
                message.properties = pairs
                    .into_iter()
                    .map(|(k, v)| (k.as_str().unwrap().into(), v.as_str().unwrap().into()))
                    .collect();
            }
            (Some(0x77), Value::String(body)) => message.body = Some(body),
            other => panic!("unexpected section {other:?}"),
        }
    }
    message
}

fn identity(dir: &tempfile::TempDir) -> Arc<TlsIdentity> {
    let paths = CredentialPaths {
        certificate: dir.path().join("client.crt"),
        private_key: dir.path().join("client.key"),
        trusted_ca: dir.path().join("ca.pem"),
    };
    for (_, path) in paths.entries() {
        std::fs::write(path, "not a certificate").unwrap();
    }
    Arc::new(TlsIdentity::configure(paths, "", PeerVerification::VerifyPeer).unwrap())
}

fn controller(
    dir: &tempfile::TempDir,
    profile: BrokerProfile,
    mode: AuthMode,
    body: &str,
) -> Controller {
    Controller::new(ControllerConfig {
        profile,
        auth_mode: mode,
        tls_identity: identity(dir),
        url: "amqps://broker.example.com:5671".parse().unwrap(),
        address: "test-queue".into(),
        body: body.into(),
    })
}

#[tokio::test]
async fn anonymous_send_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        let (init, open) = peer.accept(&["PLAIN", "ANONYMOUS"], 64 * 1024).await;
        assert_eq!(init.mechanism, "ANONYMOUS");
        assert_eq!(init.initial_response.as_deref(), Some(&b"anonymous"[..]));
        assert_eq!(init.hostname.as_deref(), Some("broker.example.com"));
        assert_eq!(open.hostname.as_deref(), Some("broker.example.com"));
        assert!(open.properties.is_empty());

        let attach = peer.expect_attach().await;
        assert_eq!(attach.role, Role::Sender);
        let target = attach.target.clone().unwrap();
        assert_eq!(target.address.as_deref(), Some("test-queue"));
        assert_eq!(target.capabilities, ["queue"]);
        peer.grant(&attach, 10).await;

        let (payload, frames) = peer.receive_delivery().await;
        assert_eq!(frames, 1);
        let message = read_message(&payload);
        assert_eq!(message.body.as_deref(), Some("hello"));
        assert!(message.properties.is_empty());

        peer.settle(DeliveryState::Accepted).await;
        peer.acknowledge_teardown().await
    };

    let (result, teardown) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    assert_eq!(teardown, ["detach", "end", "close"]);
    assert_eq!(controller.outcome(), RunOutcome::Sent);
    assert_eq!(controller.outcome().exit_code(), 0);
    assert_eq!(controller.messages_sent(), 1);
    assert_eq!(controller.connection_state(), ConnectionState::Closed);
    assert_eq!(controller.link_state(), LinkState::Closed);
    assert_eq!(controller.delivery_outcomes(), [DeliveryState::Accepted]);
    assert!(controller.failures().is_empty());
}

#[tokio::test]
async fn solace_profile_uses_external_and_stamps_properties() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Solace, AuthMode::External, "payload");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        let (init, open) = peer.accept(&["EXTERNAL", "PLAIN"], 64 * 1024).await;
        assert_eq!(init.mechanism, "EXTERNAL");
        assert!(open.properties.contains_key("product"));
        assert_eq!(open.properties.get("platform").map(String::as_str), Some("Rust"));

        let attach = peer.expect_attach().await;
        assert_eq!(attach.target.as_ref().unwrap().capabilities, ["queue", "topic"]);
        peer.grant(&attach, 1).await;

        let (payload, _) = peer.receive_delivery().await;
        let message = read_message(&payload);
        assert!(message.properties.contains_key("sender"));
        assert!(message.properties.contains_key("timestamp"));

        peer.settle(DeliveryState::Accepted).await;
        peer.acknowledge_teardown().await;
    };

    let (result, ()) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();
    assert_eq!(controller.outcome(), RunOutcome::Sent);
}

#[tokio::test]
async fn large_body_is_split_across_frames() {
    let dir = tempfile::tempdir().unwrap();
    let body = "x".repeat(3000);
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, &body);
    let (connector, mut peer) = DuplexConnector::pair();
    let settings = EngineSettings {
        max_frame_size: 512,
        ..EngineSettings::default()
    };
    let reactor = Reactor::new(connector, settings);

    let expected = body.clone();
    let broker = async move {
        let (_, open) = peer.accept(&["ANONYMOUS"], 512).await;
        assert_eq!(open.max_frame_size, 512);
        let attach = peer.expect_attach().await;
        peer.grant(&attach, 1).await;

        let (payload, frames) = peer.receive_delivery().await;
        assert!(frames > 1, "expected a multi-frame delivery, got {frames}");
        assert_eq!(read_message(&payload).body, Some(expected));

        peer.settle(DeliveryState::Accepted).await;
        peer.acknowledge_teardown().await;
    };

    let (result, ()) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();
    assert_eq!(controller.outcome(), RunOutcome::Sent);
}

#[tokio::test]
async fn no_common_mechanism_is_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        assert_eq!(peer.read_header().await, ProtocolHeader::Sasl);
        peer.write_header(ProtocolHeader::Sasl).await;
        peer.write_sasl(SaslFrame::Mechanisms(SaslMechanisms {
            mechanisms: vec!["EXTERNAL".into()],
        }))
        .await;
        peer.drain_to_eof().await
    };

    let (result, frames) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    assert!(frames.is_empty());
    let RunOutcome::Failed(record) = controller.outcome() else {
        panic!("expected a failure, got {:?}", controller.outcome());
    };
    assert_eq!(record.scope, Scope::Transport);
    assert_eq!(record.condition_name, UNAUTHORIZED_ACCESS);
    assert_eq!(controller.connection_state(), ConnectionState::Failed);
    assert_eq!(controller.messages_sent(), 0);
}

#[tokio::test]
async fn rejected_credentials_are_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Plain, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        let init = peer.authenticate(&["PLAIN"], SaslCode::Auth).await;
        assert_eq!(init.mechanism, "PLAIN");
        assert_eq!(init.initial_response.as_deref(), Some(&b"\0jcsmp-client\0"[..]));
        peer.drain_to_eof().await;
    };

    let (result, ()) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    let RunOutcome::Failed(record) = controller.outcome() else {
        panic!("expected a failure");
    };
    assert_eq!(record.scope, Scope::Transport);
    assert_eq!(record.condition_name, UNAUTHORIZED_ACCESS);
    assert_eq!(controller.outcome().exit_code(), 1);
}

#[tokio::test]
async fn remote_close_with_error_is_a_connection_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        peer.expect_attach().await;
        peer.send(Performative::Close(Close {
            error: Some(
                ErrorCondition::new("amqp:connection:forced").with_description("broker shutting down"),
            ),
        }))
        .await;
        peer.drain_to_eof().await
    };

    let (result, frames) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    assert_eq!(frames, ["end", "close"]);
    let RunOutcome::Failed(record) = controller.outcome() else {
        panic!("expected a failure");
    };
    assert_eq!(record.scope, Scope::Connection);
    assert_eq!(record.condition_name, "amqp:connection:forced");
    assert_eq!(record.description.as_deref(), Some("broker shutting down"));
    assert_eq!(controller.connection_state(), ConnectionState::Failed);
    assert_eq!(controller.messages_sent(), 0);
}

#[tokio::test]
async fn deeply_nested_frame_is_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        peer.expect_attach().await;
        // An AMQP frame whose body is nothing but descriptor constructors.
        let body = [0x00u8; 4096];
        let mut frame = ((8 + body.len()) as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(&[2, 0, 0, 0]);
        frame.extend_from_slice(&body);
        peer.stream.write_all(&frame).await.unwrap();
        peer.drain_to_eof().await
    };

    let (result, _) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    let RunOutcome::Failed(record) = controller.outcome() else {
        panic!("expected a failure");
    };
    assert_eq!(record.scope, Scope::Transport);
    assert_eq!(record.condition_name, FRAMING_ERROR);
    assert_eq!(controller.outcome().exit_code(), 1);
    assert_eq!(controller.messages_sent(), 0);
}

#[tokio::test]
async fn refused_link_closes_the_connection_without_failing_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        let attach = peer.expect_attach().await;
        peer.send(Performative::Attach(Attach {
            role: Role::Receiver,
            target: None,
            initial_delivery_count: None,
            ..attach
        }))
        .await;
        peer.send(Performative::Detach(Detach {
            handle: 0,
            closed: true,
            error: Some(ErrorCondition::new("amqp:not-found").with_description("no such queue")),
        }))
        .await;
        peer.acknowledge_teardown().await
    };

    let (result, teardown) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    assert_eq!(teardown, ["detach", "end", "close"]);
    assert_eq!(controller.failures().len(), 1);
    assert_eq!(controller.failures()[0].scope, Scope::Link);
    assert!(!controller.failures()[0].is_fatal());
    assert_eq!(controller.outcome(), RunOutcome::NotSent);
    assert_eq!(controller.connection_state(), ConnectionState::Closed);
    assert_eq!(controller.link_state(), LinkState::Closed);
}

#[tokio::test]
async fn link_error_after_send_keeps_the_run_successful() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        let attach = peer.expect_attach().await;
        peer.grant(&attach, 1).await;
        peer.receive_delivery().await;
        peer.settle(DeliveryState::Rejected(Some(ErrorCondition::new(
            "amqp:resource-limit-exceeded",
        ))))
        .await;
        peer.send(Performative::Detach(Detach {
            handle: 0,
            closed: true,
            error: Some(ErrorCondition::new("amqp:link:detach-forced")),
        }))
        .await;
        peer.acknowledge_teardown().await;
    };

    let (result, ()) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    assert_eq!(controller.outcome(), RunOutcome::Sent);
    assert_eq!(controller.failures().len(), 1);
    assert_eq!(controller.failures()[0].scope, Scope::Link);
    assert!(matches!(
        controller.delivery_outcomes(),
        [DeliveryState::Rejected(Some(_))]
    ));
}

#[tokio::test]
async fn interrupt_while_open_closes_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());
    let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel::<()>();

    let broker = async move {
        peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        peer.expect_attach().await;
        interrupt_tx.send(()).unwrap();
        peer.acknowledge_teardown().await
    };
    let interrupt = async move {
        let _ = interrupt_rx.await;
    };

    let (result, teardown) = tokio::join!(reactor.run_until(&mut controller, interrupt), broker);
    result.unwrap();

    assert_eq!(teardown, ["end", "close"]);
    assert_eq!(controller.outcome(), RunOutcome::Interrupted);
    assert_eq!(controller.outcome().exit_code(), 0);
    assert_eq!(controller.connection_state(), ConnectionState::Closed);
}

#[tokio::test]
async fn silent_peer_hits_the_idle_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let (connector, mut peer) = DuplexConnector::pair();
    let settings = EngineSettings {
        idle_timeout: Some(Duration::from_millis(200)),
        ..EngineSettings::default()
    };
    let reactor = Reactor::new(connector, settings);

    let broker = async move {
        let (_, open) = peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        assert_eq!(open.idle_time_out, Some(200));
        peer.drain_to_eof().await;
    };

    let (result, ()) = tokio::join!(reactor.run_until(&mut controller, pending()), broker);
    result.unwrap();

    let RunOutcome::Failed(record) = controller.outcome() else {
        panic!("expected a failure");
    };
    assert_eq!(record.scope, Scope::Transport);
    assert_eq!(record.condition_name, IDLE_TIMEOUT);
}

#[tokio::test]
async fn refused_connect_reports_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::Anonymous, "hello");
    let reactor = Reactor::new(DuplexConnector::refusing(), EngineSettings::default());

    reactor.run_until(&mut controller, pending()).await.unwrap();

    let RunOutcome::Failed(record) = controller.outcome() else {
        panic!("expected a failure");
    };
    assert_eq!(record.scope, Scope::Transport);
    assert_eq!(record.condition_name, IO_ERROR);
    assert_eq!(controller.connection_state(), ConnectionState::Failed);
}

#[tokio::test]
async fn unusable_credentials_fail_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(&dir, BrokerProfile::Generic, AuthMode::External, "hello");
    let reactor = Reactor::new(TcpTlsConnector, EngineSettings::default());

    let err = reactor
        .run_until(&mut controller, pending())
        .await
        .unwrap_err();
    assert!(err.is_setup(), "unexpected error {err}");
    assert!(matches!(err, EngineError::Tls(_)));
    assert_eq!(controller.messages_sent(), 0);
}

/// Records event names and plays the sender role without the controller.
struct Recorder {
    params: Option<ConnectionParameters>,
    events: Vec<&'static str>,
}

impl LifecycleHandler for Recorder {
    fn on_start(&mut self, endpoint: &mut dyn Endpoint) {
        self.events.push("start");
        if let Some(params) = self.params.take() {
            endpoint.connect(params);
        }
    }
    fn on_connection_init(&mut self, _: &mut dyn Endpoint) {
        self.events.push("connection-init");
    }
    fn on_connection_bound(&mut self, _: &mut dyn Endpoint) {
        self.events.push("connection-bound");
    }
    fn on_connection_opened(
        &mut self,
        endpoint: &mut dyn Endpoint,
        _: Option<&amqpsend_client::engine::TlsInfo>,
    ) {
        self.events.push("connection-opened");
        endpoint.attach_sender(TargetSpec {
            address: "q".into(),
            capabilities: Vec::new(),
        });
    }
    fn on_link_opened(&mut self, _: &mut dyn Endpoint) {
        self.events.push("link-opened");
    }
    fn on_sendable(&mut self, endpoint: &mut dyn Endpoint, _: u32) {
        self.events.push("sendable");
        endpoint.send(OutboundMessage::new("m"));
        endpoint.close_link();
        endpoint.close_connection();
    }
    fn on_delivery_outcome(&mut self, _: &mut dyn Endpoint, _: &DeliveryState) {
        self.events.push("delivery-outcome");
    }
    fn on_connection_unbound(&mut self, _: &mut dyn Endpoint) {
        self.events.push("connection-unbound");
    }
    fn on_transport_closed(&mut self, _: &mut dyn Endpoint) {
        self.events.push("transport-closed");
    }
}

#[tokio::test]
async fn events_arrive_in_lifecycle_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = Recorder {
        params: Some(amqpsend_core::negotiate(
            AuthMode::Anonymous,
            identity(&dir),
            &"amqps://localhost".parse().unwrap(),
            &Default::default(),
        )),
        events: Vec::new(),
    };
    let (connector, mut peer) = DuplexConnector::pair();
    let reactor = Reactor::new(connector, EngineSettings::default());

    let broker = async move {
        peer.accept(&["ANONYMOUS"], 64 * 1024).await;
        let attach = peer.expect_attach().await;
        peer.grant(&attach, 5).await;
        peer.receive_delivery().await;
        peer.settle(DeliveryState::Accepted).await;
        peer.acknowledge_teardown().await;
    };

    let (result, ()) = tokio::join!(reactor.run_until(&mut recorder, pending()), broker);
    result.unwrap();
    assert_eq!(
        recorder.events,
        [
            "start",
            "connection-init",
            "connection-bound",
            "connection-opened",
            "link-opened",
            "sendable",
            "delivery-outcome",
            "connection-unbound",
            "transport-closed",
        ]
    );
}
