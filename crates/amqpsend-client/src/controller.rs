//! The connection lifecycle controller.
//!
//! One controller drives one run: it opens the connection, attaches the
//! sender once the connection is open, sends the single message on the first
//! credit and tears everything down. Failures are classified by scope;
//! transport and connection failures end the run.

use crate::codec::DeliveryState;
use crate::engine::{Endpoint, LifecycleHandler, TlsInfo};
use crate::sender::{self, OneShot};
use amqpsend_core::{
    AuthMode, BrokerProfile, ConnectionState, ErrorCondition, FailureRecord, LinkState, Scope,
    TlsIdentity, negotiate,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

/// What a run needs to know up front.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub profile: BrokerProfile,
    pub auth_mode: AuthMode,
    pub tls_identity: Arc<TlsIdentity>,
    pub url: Url,
    pub address: String,
    pub body: String,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The message went out and nothing fatal happened.
    Sent,
    /// The first fatal failure.
    Failed(FailureRecord),
    /// The connection ended without the message being sent.
    NotSent,
    /// Ctrl-C before the message was sent. Exits 0: stopping the tool on
    /// request is not a failure.
    Interrupted,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Sent)
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Sent | RunOutcome::Interrupted => 0,
            RunOutcome::Failed(_) | RunOutcome::NotSent => 1,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Sent => f.write_str("message sent"),
            RunOutcome::Failed(record) => write!(f, "{record}"),
            RunOutcome::NotSent => f.write_str("connection ended before the message was sent"),
            RunOutcome::Interrupted => f.write_str("interrupted before the message was sent"),
        }
    }
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

pub struct Controller {
    config: ControllerConfig,
    span: tracing::Span,
    connection: ConnectionState,
    link: LinkState,
    one_shot: OneShot,
    close_requested: bool,
    failures: Vec<FailureRecord>,
    outcomes: Vec<DeliveryState>,
    interrupted: bool,
    clock: fn() -> Duration,
}

impl Controller {
    /// A controller whose log lines carry the profile's label.
    pub fn new(config: ControllerConfig) -> Self {
        let label = config.profile.label();
        Self::with_label(config, label)
    }

    pub fn with_label(config: ControllerConfig, label: &str) -> Self {
        Self {
            config,
            span: tracing::info_span!("lifecycle", label = %label),
            connection: ConnectionState::default(),
            link: LinkState::default(),
            one_shot: OneShot::default(),
            close_requested: false,
            failures: Vec::new(),
            outcomes: Vec::new(),
            interrupted: false,
            clock: unix_now,
        }
    }

    /// Replaces the wall clock used for message timestamps.
    pub fn with_clock(mut self, clock: fn() -> Duration) -> Self {
        self.clock = clock;
        self
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn delivery_outcomes(&self) -> &[DeliveryState] {
        &self.outcomes
    }

    pub fn messages_sent(&self) -> usize {
        usize::from(self.one_shot.fired())
    }

    pub fn outcome(&self) -> RunOutcome {
        if let Some(fatal) = self.failures.iter().find(|f| f.is_fatal()) {
            return RunOutcome::Failed(fatal.clone());
        }
        match (self.one_shot.fired(), self.interrupted) {
            (true, _) => RunOutcome::Sent,
            (false, true) => RunOutcome::Interrupted,
            (false, false) => RunOutcome::NotSent,
        }
    }

    fn move_connection(&mut self, next: ConnectionState) -> bool {
        match self.connection.transition(next) {
            Ok(state) => {
                tracing::debug!("Connection {} -> {}", self.connection, state);
                self.connection = state;
                true
            }
            Err(e) => {
                tracing::warn!("Refused {}", e);
                false
            }
        }
    }

    fn move_link(&mut self, next: LinkState) -> bool {
        match self.link.transition(next) {
            Ok(state) => {
                tracing::debug!("Link {} -> {}", self.link, state);
                self.link = state;
                true
            }
            Err(e) => {
                tracing::warn!("Refused {}", e);
                false
            }
        }
    }

    fn request_close(&mut self, endpoint: &mut dyn Endpoint) {
        if !self.close_requested {
            self.close_requested = true;
            endpoint.close_connection();
        }
    }

    fn record(&mut self, endpoint: &mut dyn Endpoint, scope: Scope, condition: &ErrorCondition) {
        let record = FailureRecord::classify(scope, condition);
        if record.is_fatal() {
            tracing::error!("{}", record);
            if !self.connection.is_terminal() {
                self.move_connection(ConnectionState::Failed);
            }
            self.request_close(endpoint);
        } else {
            tracing::warn!("{}", record);
        }
        self.failures.push(record);
    }

    /// Moves the link to Closed from wherever it is.
    fn link_gone(&mut self) {
        if matches!(
            self.link,
            LinkState::Attaching | LinkState::Open | LinkState::Sending
        ) {
            self.move_link(LinkState::Closing);
        }
        if self.link == LinkState::Closing {
            self.move_link(LinkState::Closed);
        }
    }
}

impl LifecycleHandler for Controller {
    fn on_start(&mut self, endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        if !self.move_connection(ConnectionState::Initializing) {
            return;
        }
        let params = negotiate(
            self.config.auth_mode,
            self.config.tls_identity.clone(),
            &self.config.url,
            &self.config.profile.connection_properties(),
        );
        tracing::info!(
            "Connecting to {} using {} authentication",
            self.config.url,
            self.config.auth_mode
        );
        if self.config.auth_mode == AuthMode::External {
            tracing::info!("EXTERNAL needs a broker that accepts client certificate authentication");
        }
        tracing::debug!(
            "Allowed mechanisms {:?}, peer verification {}",
            params.allowed_mechanisms,
            self.config.tls_identity.peer_verification()
        );
        endpoint.connect(params);
    }

    fn on_connection_init(&mut self, _endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        tracing::info!("Connection initialized");
    }

    fn on_connection_bound(&mut self, _endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        if self.move_connection(ConnectionState::Bound) {
            tracing::info!("Transport bound");
        }
    }

    fn on_connection_opened(&mut self, endpoint: &mut dyn Endpoint, tls: Option<&TlsInfo>) {
        let _guard = self.span.clone().entered();
        if !self.move_connection(ConnectionState::Open) {
            return;
        }
        tracing::info!("Connection opened");
        if let Some(tls) = tls {
            tracing::info!("TLS {} with {}", tls.protocol_version, tls.cipher_suite);
        }
        if self.move_link(LinkState::Attaching) {
            let target = sender::target_for(self.config.profile, &self.config.address);
            sender::attach(endpoint, target);
        }
    }

    fn on_link_opened(&mut self, _endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        if self.move_link(LinkState::Open) {
            tracing::info!("Sender link opened to {}", self.config.address);
        }
    }

    fn on_sendable(&mut self, endpoint: &mut dyn Endpoint, credit: u32) {
        let _guard = self.span.clone().entered();
        tracing::debug!("Sendable with credit {}", credit);
        if self.one_shot.fired()
            || self.connection != ConnectionState::Open
            || self.link != LinkState::Open
        {
            return;
        }
        let message = sender::build_message(self.config.profile, &self.config.body, (self.clock)());
        self.move_link(LinkState::Sending);
        self.one_shot.fire(endpoint, message);
        self.close_requested = true;
        tracing::info!("Message sent to {}", self.config.address);
        self.move_link(LinkState::Closing);
        self.move_connection(ConnectionState::Closing);
    }

    fn on_delivery_outcome(&mut self, _endpoint: &mut dyn Endpoint, outcome: &DeliveryState) {
        let _guard = self.span.clone().entered();
        match outcome {
            DeliveryState::Accepted => tracing::info!("Message accepted"),
            DeliveryState::Rejected(Some(error)) => tracing::warn!("Message rejected: {}", error),
            DeliveryState::Rejected(None) => tracing::warn!("Message rejected"),
            DeliveryState::Released => tracing::warn!("Message released"),
            DeliveryState::Modified { .. } => tracing::warn!("Message modified"),
            DeliveryState::Received { .. } => tracing::debug!("Message partially received"),
        }
        self.outcomes.push(outcome.clone());
    }

    fn on_transport_error(&mut self, endpoint: &mut dyn Endpoint, condition: &ErrorCondition) {
        let _guard = self.span.clone().entered();
        self.record(endpoint, Scope::Transport, condition);
    }

    fn on_connection_error(&mut self, endpoint: &mut dyn Endpoint, condition: &ErrorCondition) {
        let _guard = self.span.clone().entered();
        self.record(endpoint, Scope::Connection, condition);
    }

    fn on_session_error(&mut self, endpoint: &mut dyn Endpoint, condition: &ErrorCondition) {
        let _guard = self.span.clone().entered();
        self.record(endpoint, Scope::Session, condition);
    }

    fn on_link_error(&mut self, endpoint: &mut dyn Endpoint, condition: &ErrorCondition) {
        let _guard = self.span.clone().entered();
        self.record(endpoint, Scope::Link, condition);
    }

    fn on_link_closed(&mut self, endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        tracing::info!("Sender link closed by peer");
        self.link_gone();
        if !self.one_shot.fired() && self.connection == ConnectionState::Open {
            tracing::warn!("Link closed before the message was sent");
            self.request_close(endpoint);
            self.move_connection(ConnectionState::Closing);
        }
    }

    fn on_disconnected(&mut self, _endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        tracing::warn!("Disconnected");
    }

    fn on_connection_unbound(&mut self, _endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        tracing::info!("Connection unbound");
    }

    fn on_transport_closed(&mut self, _endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        match self.connection {
            ConnectionState::Closing => {
                self.move_connection(ConnectionState::Closed);
            }
            ConnectionState::Open => {
                self.move_connection(ConnectionState::Closing);
                self.move_connection(ConnectionState::Closed);
            }
            ConnectionState::Closed | ConnectionState::Failed => {}
            other => tracing::debug!("Transport closed while {}", other),
        }
        if self.link == LinkState::Closing {
            self.move_link(LinkState::Closed);
        }
        tracing::info!("Transport closed");
    }

    fn on_interrupt(&mut self, endpoint: &mut dyn Endpoint) {
        let _guard = self.span.clone().entered();
        self.interrupted = true;
        tracing::warn!("Interrupted");
        if self.connection == ConnectionState::Open {
            self.request_close(endpoint);
            self.move_connection(ConnectionState::Closing);
        }
    }
}
