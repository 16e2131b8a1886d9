//! The single-threaded event loop driving one connection.

use super::io::{FrameReader, FrameWriter};
use super::sasl::{initial_response, select_mechanism};
use super::{
    Connected, Connector, EngineError, EngineSettings, Event, LifecycleHandler, Request,
    RequestQueue, TargetSpec, dispatch,
};
use crate::codec::{
    Attach, Begin, Close, Detach, Disposition, End, FRAME_HEADER_SIZE, Flow, Frame,
    MIN_MAX_FRAME_SIZE, Open, Performative, ProtocolHeader, Role, SaslCode, SaslFrame, SaslInit,
    SenderSettleMode, Source, Target, Transfer, encode_message,
};
use amqpsend_core::{ConnectionParameters, ErrorCondition, OutboundMessage};
use std::future::Future;
use std::pin::pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, sleep_until, timeout};

const SESSION_WINDOW: u32 = 2048;
const SENDER_HANDLE: u32 = 0;

/// Runs the lifecycle of one connection against a [`LifecycleHandler`].
pub struct Reactor<C> {
    connector: C,
    settings: EngineSettings,
}

impl<C: Connector> Reactor<C> {
    pub fn new(connector: C, settings: EngineSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    /// Runs until the connection is gone, treating Ctrl-C as an interrupt.
    pub async fn run<H: LifecycleHandler>(&self, handler: &mut H) -> Result<(), EngineError> {
        self.run_until(handler, async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs until the connection is gone. `interrupt` completing is delivered
    /// to the handler once as [`Event::Interrupt`].
    ///
    /// Only setup errors (TLS configuration, unusable URL) are returned;
    /// everything that happens on the wire reaches the handler as events.
    pub async fn run_until<H, F>(&self, handler: &mut H, interrupt: F) -> Result<(), EngineError>
    where
        H: LifecycleHandler,
        F: Future<Output = ()>,
    {
        let mut interrupt = pin!(interrupt);
        let mut queue = RequestQueue::default();

        dispatch(handler, &Event::Start, &mut queue);
        let Some(params) = take_connect(&mut queue) else {
            tracing::debug!("No connection requested");
            return Ok(());
        };
        dispatch(handler, &Event::ConnectionInit, &mut queue);
        discard(&mut queue, "connection init");

        let connecting = tokio::select! {
            r = timeout(self.settings.handshake_timeout, self.connector.connect(&params)) => Some(r),
            _ = &mut interrupt => None,
        };
        let connected = match connecting {
            None => {
                dispatch(handler, &Event::Interrupt, &mut queue);
                discard(&mut queue, "interrupt");
                dispatch(handler, &Event::TransportClosed, &mut queue);
                return Ok(());
            }
            Some(Ok(Err(e))) if e.is_setup() => return Err(e),
            Some(result) => {
                match result.unwrap_or(Err(EngineError::Timeout("connect"))) {
                    Ok(connected) => connected,
                    Err(e) => {
                        tracing::debug!("Connect failed: {}", e);
                        for event in [Event::TransportError(e.condition()), Event::TransportClosed] {
                            dispatch(handler, &event, &mut queue);
                            discard(&mut queue, "connect failure");
                        }
                        return Ok(());
                    }
                }
            }
        };

        let Connected { stream, tls } = connected;
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = FrameReader::new(read_half, self.settings.max_frame_size);
        let mut driver = Driver::new(handler, &self.settings, params, FrameWriter::new(write_half));

        driver.emit(Event::ConnectionBound).await;

        let handshake = tokio::select! {
            r = timeout(self.settings.handshake_timeout, driver.handshake(&mut reader)) => Some(r),
            _ = &mut interrupt => None,
        };
        match handshake {
            None => {
                driver.interrupted = true;
                driver.emit(Event::Interrupt).await;
                driver.abort().await;
            }
            Some(Err(_)) => driver.fail(EngineError::Timeout("handshake")).await,
            Some(Ok(Err(e))) => driver.fail(e).await,
            Some(Ok(Ok(Handshake::RemoteClosed(error)))) => driver.remote_close(error).await,
            Some(Ok(Ok(Handshake::Opened))) => {
                driver.emit(Event::ConnectionOpened(tls)).await;
                driver.run(&mut reader, interrupt.as_mut()).await;
            }
        }
        Ok(())
    }
}

fn take_connect(queue: &mut RequestQueue) -> Option<ConnectionParameters> {
    let mut params = None;
    for request in queue.drain() {
        match request {
            Request::Connect(p) if params.is_none() => params = Some(*p),
            other => tracing::warn!("Ignoring {:?} before the connection exists", other),
        }
    }
    params
}

fn discard(queue: &mut RequestQueue, phase: &str) {
    for request in queue.drain() {
        tracing::debug!("Ignoring {:?} during {}", request, phase);
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

enum Handshake {
    Opened,
    /// The peer sent close instead of open.
    RemoteClosed(Option<ErrorCondition>),
}

enum Wake {
    Frame(Result<Frame, EngineError>),
    Heartbeat,
    CloseTimeout,
    IdleTimeout,
    Interrupt,
}

struct SenderLink {
    name: String,
    target: TargetSpec,
    credit: u32,
    delivery_count: u32,
    remote_attached: bool,
    detach_sent: bool,
    remote_detached: bool,
}

impl SenderLink {
    fn live(&self) -> bool {
        self.remote_attached && !self.detach_sent && !self.remote_detached
    }
}

struct Driver<'a, H, W> {
    handler: &'a mut H,
    settings: &'a EngineSettings,
    params: ConnectionParameters,
    writer: FrameWriter<W>,
    queue: RequestQueue,
    writable: bool,
    write_error: Option<EngineError>,
    last_sent: Instant,
    last_received: Instant,
    remote_max_frame: u32,
    remote_idle: Option<Duration>,
    next_outgoing_id: u32,
    next_delivery_id: u32,
    end_sent: bool,
    remote_ended: bool,
    link: Option<SenderLink>,
    pending: Option<OutboundMessage>,
    close_sent: bool,
    close_deadline: Option<Instant>,
    interrupted: bool,
}

impl<'a, H, W> Driver<'a, H, W>
where
    H: LifecycleHandler,
    W: AsyncWrite + Unpin,
{
    fn new(
        handler: &'a mut H,
        settings: &'a EngineSettings,
        params: ConnectionParameters,
        writer: FrameWriter<W>,
    ) -> Self {
        let now = Instant::now();
        Self {
            handler,
            settings,
            params,
            writer,
            queue: RequestQueue::default(),
            writable: true,
            write_error: None,
            last_sent: now,
            last_received: now,
            remote_max_frame: u32::MAX,
            remote_idle: None,
            next_outgoing_id: 0,
            next_delivery_id: 0,
            end_sent: false,
            remote_ended: false,
            link: None,
            pending: None,
            close_sent: false,
            close_deadline: None,
            interrupted: false,
        }
    }

    /// Delivers one event and executes whatever the handler asked for.
    async fn emit(&mut self, event: Event) {
        tracing::trace!("Event {:?}", event);
        dispatch(&mut *self.handler, &event, &mut self.queue);
        let requests: Vec<Request> = self.queue.drain().collect();
        for request in requests {
            self.apply(request).await;
        }
    }

    async fn apply(&mut self, request: Request) {
        match request {
            Request::Connect(_) => tracing::warn!("Already connected; ignoring connect"),
            Request::AttachSender(target) => self.attach(target).await,
            Request::Send(message) => self.send_message(message).await,
            Request::CloseLink => self.detach().await,
            Request::CloseConnection => self.close().await,
        }
    }

    async fn write(&mut self, performative: Performative, payload: Vec<u8>) {
        if !self.writable {
            return;
        }
        tracing::trace!("Sending {}", performative.name());
        let frame = Frame::Amqp {
            channel: 0,
            performative,
            payload,
        };
        match self.writer.write_frame(&frame).await {
            Ok(()) => self.last_sent = Instant::now(),
            Err(e) => {
                self.writable = false;
                self.write_error = Some(e);
            }
        }
    }

    async fn handshake<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut FrameReader<R>,
    ) -> Result<Handshake, EngineError> {
        self.authenticate(reader).await?;

        self.writer.write_header(ProtocolHeader::Amqp).await?;
        match reader.read_header().await? {
            ProtocolHeader::Amqp => {}
            other => {
                return Err(EngineError::Protocol {
                    phase: "AMQP header exchange",
                    got: format!("{other:?} header"),
                });
            }
        }

        let mut open = Open::new(self.settings.container_id.clone());
        open.hostname = self.params.host().map(str::to_string);
        open.max_frame_size = self.settings.max_frame_size;
        open.channel_max = 0;
        open.idle_time_out = self
            .settings
            .idle_timeout
            .map(|d| u32::try_from(d.as_millis()).unwrap_or(u32::MAX));
        open.properties = self.params.vendor_properties.clone();
        self.writer
            .write_frame(&Frame::Amqp {
                channel: 0,
                performative: Performative::Open(open),
                payload: Vec::new(),
            })
            .await?;
        self.writer
            .write_frame(&Frame::Amqp {
                channel: 0,
                performative: Performative::Begin(Begin {
                    remote_channel: None,
                    next_outgoing_id: 0,
                    incoming_window: SESSION_WINDOW,
                    outgoing_window: SESSION_WINDOW,
                    handle_max: SENDER_HANDLE,
                }),
                payload: Vec::new(),
            })
            .await?;
        self.last_sent = Instant::now();

        loop {
            match reader.read_frame().await? {
                Frame::Heartbeat => continue,
                Frame::Amqp {
                    performative: Performative::Open(open),
                    ..
                } => {
                    self.remote_max_frame = open.max_frame_size.max(MIN_MAX_FRAME_SIZE);
                    self.remote_idle = open
                        .idle_time_out
                        .filter(|ms| *ms > 0)
                        .map(|ms| Duration::from_millis(u64::from(ms)));
                    self.last_received = Instant::now();
                    tracing::debug!(
                        "Peer {} opened: max-frame-size {}, idle-time-out {:?}",
                        open.container_id,
                        open.max_frame_size,
                        self.remote_idle
                    );
                    return Ok(Handshake::Opened);
                }
                Frame::Amqp {
                    performative: Performative::Close(close),
                    ..
                } => return Ok(Handshake::RemoteClosed(close.error)),
                other => {
                    return Err(EngineError::Protocol {
                        phase: "open",
                        got: frame_name(&other),
                    });
                }
            }
        }
    }

    async fn authenticate<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut FrameReader<R>,
    ) -> Result<(), EngineError> {
        self.writer.write_header(ProtocolHeader::Sasl).await?;
        match reader.read_header().await? {
            ProtocolHeader::Sasl => {}
            other => {
                return Err(EngineError::Protocol {
                    phase: "SASL header exchange",
                    got: format!("{other:?} header"),
                });
            }
        }

        let offered = match reader.read_frame().await? {
            Frame::Sasl(SaslFrame::Mechanisms(m)) => m.mechanisms,
            other => {
                return Err(EngineError::Protocol {
                    phase: "SASL negotiation",
                    got: frame_name(&other),
                });
            }
        };
        tracing::debug!("Peer offers SASL mechanisms {:?}", offered);

        let mechanism = select_mechanism(
            &offered,
            &self.params,
            self.settings.sasl_mech_list.as_deref(),
        )
        .ok_or_else(|| {
            EngineError::Authentication(format!(
                "no acceptable SASL mechanism: peer offers {:?}, client allows {:?}",
                offered, self.params.allowed_mechanisms
            ))
        })?;
        tracing::debug!("Using SASL mechanism {}", mechanism);

        let init = SaslInit {
            initial_response: initial_response(&mechanism, &self.params),
            hostname: self.params.host().map(str::to_string),
            mechanism: mechanism.clone(),
        };
        self.writer.write_frame(&Frame::Sasl(SaslFrame::Init(init))).await?;

        loop {
            match reader.read_frame().await? {
                Frame::Sasl(SaslFrame::Challenge(_)) => {
                    self.writer
                        .write_frame(&Frame::Sasl(SaslFrame::Response(Vec::new())))
                        .await?;
                }
                Frame::Sasl(SaslFrame::Outcome(outcome)) => {
                    return match outcome.code {
                        SaslCode::Ok => Ok(()),
                        code => Err(EngineError::Authentication(format!(
                            "SASL {} {}",
                            mechanism,
                            code.describe()
                        ))),
                    };
                }
                other => {
                    return Err(EngineError::Protocol {
                        phase: "SASL outcome",
                        got: frame_name(&other),
                    });
                }
            }
        }
    }

    async fn run<R, F>(&mut self, reader: &mut FrameReader<R>, mut interrupt: std::pin::Pin<&mut F>)
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        loop {
            if let Some(e) = self.write_error.take() {
                self.fail(e).await;
                return;
            }

            let heartbeat = self.remote_idle.map(|idle| self.last_sent + idle / 2);
            let idle = self.settings.idle_timeout.map(|d| self.last_received + d);
            let close = self.close_deadline;
            let interrupted = self.interrupted;

            let wake = tokio::select! {
                frame = reader.read_frame() => Wake::Frame(frame),
                _ = sleep_until_opt(heartbeat) => Wake::Heartbeat,
                _ = sleep_until_opt(idle) => Wake::IdleTimeout,
                _ = sleep_until_opt(close) => Wake::CloseTimeout,
                _ = interrupt.as_mut(), if !interrupted => Wake::Interrupt,
            };

            match wake {
                Wake::Frame(Ok(frame)) => {
                    self.last_received = Instant::now();
                    if self.on_frame(frame).await {
                        return;
                    }
                }
                Wake::Frame(Err(EngineError::Eof)) if self.close_sent => {
                    tracing::debug!("Peer dropped the connection after our close");
                    self.finish().await;
                    return;
                }
                Wake::Frame(Err(e)) => {
                    self.fail(e).await;
                    return;
                }
                Wake::Heartbeat => {
                    if self.writable {
                        if let Err(e) = self.writer.write_frame(&Frame::Heartbeat).await {
                            self.fail(e).await;
                            return;
                        }
                        self.last_sent = Instant::now();
                    }
                }
                Wake::IdleTimeout => {
                    self.fail(EngineError::Timeout("idle")).await;
                    return;
                }
                Wake::CloseTimeout => {
                    tracing::warn!(
                        "Peer did not answer close within {:?}",
                        self.settings.close_timeout
                    );
                    self.finish().await;
                    return;
                }
                Wake::Interrupt => {
                    self.interrupted = true;
                    self.emit(Event::Interrupt).await;
                    if !self.close_sent {
                        self.abort().await;
                        return;
                    }
                }
            }
        }
    }

    /// Handles one inbound frame. Returns true once the connection is done.
    async fn on_frame(&mut self, frame: Frame) -> bool {
        let performative = match frame {
            Frame::Heartbeat => return false,
            Frame::Amqp { performative, .. } => performative,
            Frame::Sasl(sasl) => {
                self.fail(EngineError::Protocol {
                    phase: "open connection",
                    got: sasl.name().to_string(),
                })
                .await;
                return true;
            }
        };
        tracing::trace!("Received {}", performative.name());

        match performative {
            Performative::Begin(begin) => {
                tracing::debug!(
                    "Session begun, peer incoming-window {}",
                    begin.incoming_window
                );
            }
            Performative::Attach(attach) => self.on_attach(attach).await,
            Performative::Flow(flow) => self.on_flow(flow).await,
            Performative::Disposition(disposition) => self.on_disposition(disposition).await,
            Performative::Detach(detach) => self.on_detach(detach).await,
            Performative::End(end) => self.on_end(end.error).await,
            Performative::Close(close) => {
                self.remote_close(close.error).await;
                return true;
            }
            other @ (Performative::Open(_) | Performative::Transfer(_)) => {
                self.fail(EngineError::Protocol {
                    phase: "open connection",
                    got: other.name().to_string(),
                })
                .await;
                return true;
            }
        }
        false
    }

    async fn on_attach(&mut self, attach: Attach) {
        let Some(link) = self.link.as_mut() else {
            tracing::warn!("Attach for unknown link {}", attach.name);
            return;
        };
        if attach.role != Role::Receiver || attach.name != link.name {
            tracing::warn!("Attach for unknown link {}", attach.name);
            return;
        }
        link.remote_attached = true;
        if attach.target.is_none() {
            // The peer refused the target; a detach with the reason follows.
            tracing::debug!("Peer attached {} without a target", attach.name);
            return;
        }
        self.emit(Event::LinkOpened).await;
        self.offer_credit().await;
    }

    async fn on_flow(&mut self, flow: Flow) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if flow.handle.is_none() {
            return;
        }
        if let Some(link_credit) = flow.link_credit {
            let remote_count = flow.delivery_count.unwrap_or(0);
            link.credit = remote_count
                .wrapping_add(link_credit)
                .wrapping_sub(link.delivery_count);
            if link.credit > link_credit {
                link.credit = 0;
            }
        }
        if flow.echo {
            let reply = Flow {
                next_incoming_id: flow.next_outgoing_id.into(),
                incoming_window: SESSION_WINDOW,
                next_outgoing_id: self.next_outgoing_id,
                outgoing_window: SESSION_WINDOW,
                handle: Some(SENDER_HANDLE),
                delivery_count: Some(link.delivery_count),
                link_credit: Some(link.credit),
                ..Flow::default()
            };
            self.write(Performative::Flow(reply), Vec::new()).await;
        }
        self.offer_credit().await;
    }

    /// Spends credit on a queued message, or tells the handler it may send.
    async fn offer_credit(&mut self) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        if !link.live() || link.credit == 0 {
            return;
        }
        let credit = link.credit;
        match self.pending.take() {
            Some(message) => self.transfer(message).await,
            None => self.emit(Event::Sendable { credit }).await,
        }
    }

    async fn on_disposition(&mut self, disposition: Disposition) {
        if disposition.role != Role::Receiver {
            return;
        }
        if let Some(state) = disposition.state.clone() {
            self.emit(Event::DeliveryOutcome(state)).await;
        }
        if !disposition.settled {
            let settle = Disposition {
                role: Role::Sender,
                settled: true,
                ..disposition
            };
            self.write(Performative::Disposition(settle), Vec::new()).await;
        }
    }

    async fn on_detach(&mut self, detach: Detach) {
        if let Some(error) = detach.error {
            self.emit(Event::LinkError(error)).await;
        }
        let Some(link) = self.link.as_mut() else {
            return;
        };
        link.remote_detached = true;
        if !link.detach_sent {
            link.detach_sent = true;
            self.write(
                Performative::Detach(Detach {
                    handle: SENDER_HANDLE,
                    closed: true,
                    error: None,
                }),
                Vec::new(),
            )
            .await;
            self.emit(Event::LinkClosed).await;
        }
    }

    async fn on_end(&mut self, error: Option<ErrorCondition>) {
        self.remote_ended = true;
        if let Some(error) = error {
            self.emit(Event::SessionError(error)).await;
        }
        if !self.end_sent {
            self.end_sent = true;
            self.write(Performative::End(End::default()), Vec::new()).await;
        }
        let link_was_live = self.link.as_ref().is_some_and(|l| !l.detach_sent && !l.remote_detached);
        if let Some(link) = self.link.as_mut() {
            link.remote_detached = true;
            link.detach_sent = true;
        }
        if link_was_live {
            self.emit(Event::LinkClosed).await;
        }
    }

    async fn remote_close(&mut self, error: Option<ErrorCondition>) {
        if let Some(error) = error {
            self.emit(Event::ConnectionError(error)).await;
        }
        if !self.close_sent {
            self.close_sent = true;
            self.write(Performative::Close(Close::default()), Vec::new())
                .await;
        }
        self.finish().await;
    }

    async fn attach(&mut self, target: TargetSpec) {
        if self.link.is_some() {
            tracing::warn!("Sender link already exists; ignoring attach");
            return;
        }
        if self.close_sent || self.remote_ended {
            tracing::warn!("Connection closing; ignoring attach");
            return;
        }
        let name = format!("{}-sender", self.settings.container_id);
        let attach = Attach {
            name: name.clone(),
            handle: SENDER_HANDLE,
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::Unsettled,
            source: Some(Source::default()),
            target: Some(Target {
                address: Some(target.address.clone()),
                dynamic: false,
                capabilities: target.capabilities.clone(),
            }),
            initial_delivery_count: Some(0),
            max_message_size: None,
        };
        self.link = Some(SenderLink {
            name,
            target,
            credit: 0,
            delivery_count: 0,
            remote_attached: false,
            detach_sent: false,
            remote_detached: false,
        });
        self.write(Performative::Attach(attach), Vec::new()).await;
    }

    async fn send_message(&mut self, message: OutboundMessage) {
        let Some(link) = self.link.as_ref() else {
            tracing::warn!("No sender link; dropping message");
            return;
        };
        if link.detach_sent || link.remote_detached {
            tracing::warn!("Sender link to {} closed; dropping message", link.target.address);
            return;
        }
        if !link.remote_attached || link.credit == 0 {
            self.pending = Some(message);
            return;
        }
        self.transfer(message).await;
    }

    /// Writes one delivery, split into as many transfer frames as the peer's
    /// max-frame-size requires.
    async fn transfer(&mut self, message: OutboundMessage) {
        let payload = encode_message(&message);
        let delivery_id = self.next_delivery_id;
        self.next_delivery_id = self.next_delivery_id.wrapping_add(1);

        let first = Transfer {
            handle: SENDER_HANDLE,
            delivery_id: Some(delivery_id),
            delivery_tag: Some(delivery_id.to_be_bytes().to_vec()),
            message_format: Some(0),
            settled: Some(false),
            more: true,
        };
        let frame_limit = self.remote_max_frame.min(self.settings.max_frame_size) as usize;
        let overhead =
            FRAME_HEADER_SIZE + Performative::Transfer(first.clone()).to_value().to_bytes().len();
        let chunk_size = frame_limit.saturating_sub(overhead).max(1);
        let chunks: Vec<&[u8]> = payload.chunks(chunk_size).collect();
        let count = chunks.len();
        tracing::debug!(
            "Transferring delivery {} ({} bytes, {} frame(s))",
            delivery_id,
            payload.len(),
            count
        );

        for (i, chunk) in chunks.into_iter().enumerate() {
            let more = i + 1 < count;
            let transfer = if i == 0 {
                Transfer {
                    more,
                    ..first.clone()
                }
            } else {
                Transfer {
                    handle: SENDER_HANDLE,
                    delivery_id: None,
                    delivery_tag: None,
                    message_format: None,
                    settled: None,
                    more,
                }
            };
            self.write(Performative::Transfer(transfer), chunk.to_vec())
                .await;
            self.next_outgoing_id = self.next_outgoing_id.wrapping_add(1);
        }

        if let Some(link) = self.link.as_mut() {
            link.credit = link.credit.saturating_sub(1);
            link.delivery_count = link.delivery_count.wrapping_add(1);
        }
    }

    async fn detach(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if link.detach_sent {
            return;
        }
        link.detach_sent = true;
        if self.pending.take().is_some() {
            tracing::warn!("Closing link with an unsent message");
        }
        self.write(
            Performative::Detach(Detach {
                handle: SENDER_HANDLE,
                closed: true,
                error: None,
            }),
            Vec::new(),
        )
        .await;
    }

    async fn close(&mut self) {
        if self.close_sent {
            return;
        }
        if !self.end_sent {
            self.end_sent = true;
            self.write(Performative::End(End::default()), Vec::new()).await;
        }
        self.close_sent = true;
        self.close_deadline = Some(Instant::now() + self.settings.close_timeout);
        self.write(Performative::Close(Close::default()), Vec::new())
            .await;
    }

    /// Orderly end after both closes were exchanged.
    async fn finish(&mut self) {
        if self.writable {
            self.writer.shutdown().await;
        }
        self.writable = false;
        self.emit(Event::ConnectionUnbound).await;
        self.emit(Event::TransportClosed).await;
    }

    /// Transport failure: report, then tear down without touching the socket.
    async fn fail(&mut self, error: EngineError) {
        tracing::debug!("Transport failure: {}", error);
        self.writable = false;
        self.emit(Event::TransportError(error.condition())).await;
        self.emit(Event::Disconnected).await;
        self.emit(Event::ConnectionUnbound).await;
        self.emit(Event::TransportClosed).await;
    }

    /// Drops the connection without the close handshake.
    async fn abort(&mut self) {
        self.writable = false;
        self.emit(Event::TransportClosed).await;
    }
}

fn frame_name(frame: &Frame) -> String {
    match frame {
        Frame::Amqp { performative, .. } => performative.name().to_string(),
        Frame::Sasl(sasl) => sasl.name().to_string(),
        Frame::Heartbeat => "heartbeat".to_string(),
    }
}
