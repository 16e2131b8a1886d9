//! Transport performatives and the composite types they carry.

use super::{CodecError, Value};
use amqpsend_core::ErrorCondition;
use std::collections::BTreeMap;

const OPEN: u64 = 0x10;
const BEGIN: u64 = 0x11;
const ATTACH: u64 = 0x12;
const FLOW: u64 = 0x13;
const TRANSFER: u64 = 0x14;
const DISPOSITION: u64 = 0x15;
const DETACH: u64 = 0x16;
const END: u64 = 0x17;
const CLOSE: u64 = 0x18;
const ERROR: u64 = 0x1d;
const RECEIVED: u64 = 0x23;
const ACCEPTED: u64 = 0x24;
const REJECTED: u64 = 0x25;
const RELEASED: u64 = 0x26;
const MODIFIED: u64 = 0x27;
const SOURCE: u64 = 0x28;
const TARGET: u64 = 0x29;

const SYMBOLIC: &[(&str, u64)] = &[
    ("amqp:open:list", OPEN),
    ("amqp:begin:list", BEGIN),
    ("amqp:attach:list", ATTACH),
    ("amqp:flow:list", FLOW),
    ("amqp:transfer:list", TRANSFER),
    ("amqp:disposition:list", DISPOSITION),
    ("amqp:detach:list", DETACH),
    ("amqp:end:list", END),
    ("amqp:close:list", CLOSE),
    ("amqp:error:list", ERROR),
    ("amqp:received:list", RECEIVED),
    ("amqp:accepted:list", ACCEPTED),
    ("amqp:rejected:list", REJECTED),
    ("amqp:released:list", RELEASED),
    ("amqp:modified:list", MODIFIED),
    ("amqp:source:list", SOURCE),
    ("amqp:target:list", TARGET),
    ("amqp:sasl-mechanisms:list", 0x40),
    ("amqp:sasl-init:list", 0x41),
    ("amqp:sasl-challenge:list", 0x42),
    ("amqp:sasl-response:list", 0x43),
    ("amqp:sasl-outcome:list", 0x44),
];

/// Splits a described list into its numeric descriptor and fields.
pub(super) fn described_list(value: Value) -> Result<(u64, Vec<Value>), CodecError> {
    let Value::Described(descriptor, body) = value else {
        return Err(CodecError::Unexpected {
            expected: "described list",
            got: format!("{value:?}"),
        });
    };
    let code = match *descriptor {
        Value::Symbol(ref name) => SYMBOLIC
            .iter()
            .find(|(s, _)| s == name)
            .map(|(_, code)| *code)
            .ok_or_else(|| CodecError::UnknownDescriptor(name.clone()))?,
        ref other => other.as_u64().ok_or_else(|| CodecError::Unexpected {
            expected: "ulong or symbol descriptor",
            got: format!("{other:?}"),
        })?,
    };
    match *body {
        Value::List(items) => Ok((code, items)),
        other => Err(CodecError::Unexpected {
            expected: "list body",
            got: format!("{other:?}"),
        }),
    }
}

/// Builds a described list, dropping trailing nulls.
pub(super) fn list(descriptor: u64, mut fields: Vec<Value>) -> Value {
    while fields.last().is_some_and(Value::is_null) {
        fields.pop();
    }
    Value::described(descriptor, Value::List(fields))
}

fn opt<T: Into<Value>>(v: Option<T>) -> Value {
    v.map_or(Value::Null, Into::into)
}

fn symbols(items: &[String]) -> Value {
    if items.is_empty() {
        Value::Null
    } else {
        Value::Array(items.iter().map(|s| Value::symbol(s.clone())).collect())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Ulong(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Ushort(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

/// Positional field access with mandatory/optional typing.
pub(super) struct Fields {
    performative: &'static str,
    items: Vec<Value>,
}

impl Fields {
    pub(super) fn new(performative: &'static str, items: Vec<Value>) -> Self {
        Self {
            performative,
            items,
        }
    }

    fn get(&self, i: usize) -> &Value {
        self.items.get(i).unwrap_or(&Value::Null)
    }

    fn mistyped(&self, field: &'static str) -> CodecError {
        CodecError::MissingField {
            performative: self.performative,
            field,
        }
    }

    fn optional<T>(
        &self,
        i: usize,
        field: &'static str,
        f: impl Fn(&Value) -> Option<T>,
    ) -> Result<Option<T>, CodecError> {
        match self.get(i) {
            Value::Null => Ok(None),
            v => f(v).map(Some).ok_or_else(|| self.mistyped(field)),
        }
    }

    fn required<T>(
        &self,
        i: usize,
        field: &'static str,
        f: impl Fn(&Value) -> Option<T>,
    ) -> Result<T, CodecError> {
        self.optional(i, field, f)?
            .ok_or_else(|| self.mistyped(field))
    }

    pub(super) fn req_u32(&self, i: usize, field: &'static str) -> Result<u32, CodecError> {
        self.required(i, field, Value::as_u32)
    }

    pub(super) fn opt_u32(&self, i: usize, field: &'static str) -> Result<Option<u32>, CodecError> {
        self.optional(i, field, Value::as_u32)
    }

    pub(super) fn opt_u16(&self, i: usize, field: &'static str) -> Result<Option<u16>, CodecError> {
        self.optional(i, field, Value::as_u16)
    }

    pub(super) fn opt_u64(&self, i: usize, field: &'static str) -> Result<Option<u64>, CodecError> {
        self.optional(i, field, Value::as_u64)
    }

    pub(super) fn opt_u8(&self, i: usize, field: &'static str) -> Result<Option<u8>, CodecError> {
        self.optional(i, field, Value::as_u8)
    }

    pub(super) fn bool_or(
        &self,
        i: usize,
        field: &'static str,
        default: bool,
    ) -> Result<bool, CodecError> {
        Ok(self.optional(i, field, Value::as_bool)?.unwrap_or(default))
    }

    pub(super) fn opt_bool(&self, i: usize, field: &'static str) -> Result<Option<bool>, CodecError> {
        self.optional(i, field, Value::as_bool)
    }

    pub(super) fn opt_string(
        &self,
        i: usize,
        field: &'static str,
    ) -> Result<Option<String>, CodecError> {
        self.optional(i, field, |v| v.as_str().map(str::to_string))
    }

    pub(super) fn req_string(&self, i: usize, field: &'static str) -> Result<String, CodecError> {
        self.required(i, field, |v| v.as_str().map(str::to_string))
    }

    pub(super) fn opt_binary(
        &self,
        i: usize,
        field: &'static str,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        self.optional(i, field, |v| v.as_binary().map(<[u8]>::to_vec))
    }

    pub(super) fn symbols(&self, i: usize) -> Vec<String> {
        self.get(i)
            .as_multiple()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    fn string_map(&self, i: usize) -> BTreeMap<String, String> {
        match self.get(i) {
            Value::Map(pairs) => pairs
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    fn error(&self, i: usize) -> Result<Option<ErrorCondition>, CodecError> {
        match self.get(i) {
            Value::Null => Ok(None),
            v => decode_error(v.clone()).map(Some),
        }
    }

    fn take(&mut self, i: usize) -> Value {
        self.items
            .get_mut(i)
            .map(|v| std::mem::replace(v, Value::Null))
            .unwrap_or(Value::Null)
    }
}

pub(super) fn encode_error(error: &ErrorCondition) -> Value {
    list(
        ERROR,
        vec![
            Value::symbol(error.name.clone()),
            opt(error.description.clone()),
        ],
    )
}

fn decode_error(value: Value) -> Result<ErrorCondition, CodecError> {
    let (code, items) = described_list(value)?;
    if code != ERROR {
        return Err(CodecError::Unexpected {
            expected: "error",
            got: format!("descriptor 0x{code:x}"),
        });
    }
    let fields = Fields::new("error", items);
    Ok(ErrorCondition {
        name: fields.req_string(0, "condition")?,
        description: fields.opt_string(1, "description")?,
    })
}

fn opt_error(error: &Option<ErrorCondition>) -> Value {
    error.as_ref().map_or(Value::Null, encode_error)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    fn to_value(self) -> Value {
        Value::Bool(self == Role::Receiver)
    }

    fn from_bool(receiver: bool) -> Self {
        if receiver { Role::Receiver } else { Role::Sender }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SenderSettleMode {
    Unsettled,
    Settled,
    #[default]
    Mixed,
}

impl SenderSettleMode {
    fn code(self) -> u8 {
        match self {
            SenderSettleMode::Unsettled => 0,
            SenderSettleMode::Settled => 1,
            SenderSettleMode::Mixed => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => SenderSettleMode::Unsettled,
            1 => SenderSettleMode::Settled,
            _ => SenderSettleMode::Mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Open {
    pub container_id: String,
    pub hostname: Option<String>,
    pub max_frame_size: u32,
    pub channel_max: u16,
    /// Milliseconds.
    pub idle_time_out: Option<u32>,
    pub properties: BTreeMap<String, String>,
}

impl Open {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            hostname: None,
            max_frame_size: u32::MAX,
            channel_max: u16::MAX,
            idle_time_out: None,
            properties: BTreeMap::new(),
        }
    }

    fn to_value(&self) -> Value {
        let properties = if self.properties.is_empty() {
            Value::Null
        } else {
            Value::Map(
                self.properties
                    .iter()
                    .map(|(k, v)| (Value::symbol(k.clone()), Value::string(v.clone())))
                    .collect(),
            )
        };
        list(
            OPEN,
            vec![
                Value::string(self.container_id.clone()),
                opt(self.hostname.clone()),
                Value::Uint(self.max_frame_size),
                Value::Ushort(self.channel_max),
                opt(self.idle_time_out),
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
                properties,
            ],
        )
    }

    fn from_fields(f: Fields) -> Result<Self, CodecError> {
        Ok(Self {
            container_id: f.req_string(0, "container-id")?,
            hostname: f.opt_string(1, "hostname")?,
            max_frame_size: f.opt_u32(2, "max-frame-size")?.unwrap_or(u32::MAX),
            channel_max: f.opt_u16(3, "channel-max")?.unwrap_or(u16::MAX),
            idle_time_out: f.opt_u32(4, "idle-time-out")?,
            properties: f.string_map(9),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Begin {
    pub remote_channel: Option<u16>,
    pub next_outgoing_id: u32,
    pub incoming_window: u32,
    pub outgoing_window: u32,
    pub handle_max: u32,
}

impl Begin {
    fn to_value(&self) -> Value {
        list(
            BEGIN,
            vec![
                opt(self.remote_channel),
                Value::Uint(self.next_outgoing_id),
                Value::Uint(self.incoming_window),
                Value::Uint(self.outgoing_window),
                Value::Uint(self.handle_max),
            ],
        )
    }

    fn from_fields(f: Fields) -> Result<Self, CodecError> {
        Ok(Self {
            remote_channel: f.opt_u16(0, "remote-channel")?,
            next_outgoing_id: f.req_u32(1, "next-outgoing-id")?,
            incoming_window: f.req_u32(2, "incoming-window")?,
            outgoing_window: f.req_u32(3, "outgoing-window")?,
            handle_max: f.opt_u32(4, "handle-max")?.unwrap_or(u32::MAX),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub address: Option<String>,
}

impl Source {
    fn to_value(&self) -> Value {
        list(SOURCE, vec![opt(self.address.clone())])
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        let (_, items) = described_list(value)?;
        let f = Fields::new("source", items);
        Ok(Self {
            address: f.opt_string(0, "address")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub address: Option<String>,
    pub dynamic: bool,
    pub capabilities: Vec<String>,
}

impl Target {
    fn to_value(&self) -> Value {
        list(
            TARGET,
            vec![
                opt(self.address.clone()),
                Value::Null,
                Value::Null,
                Value::Null,
                if self.dynamic { Value::Bool(true) } else { Value::Null },
                Value::Null,
                symbols(&self.capabilities),
            ],
        )
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        let (_, items) = described_list(value)?;
        let f = Fields::new("target", items);
        Ok(Self {
            address: f.opt_string(0, "address")?,
            dynamic: f.bool_or(4, "dynamic", false)?,
            capabilities: f.symbols(6),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attach {
    pub name: String,
    pub handle: u32,
    pub role: Role,
    pub snd_settle_mode: SenderSettleMode,
    pub source: Option<Source>,
    pub target: Option<Target>,
    pub initial_delivery_count: Option<u32>,
    pub max_message_size: Option<u64>,
}

impl Attach {
    fn to_value(&self) -> Value {
        list(
            ATTACH,
            vec![
                Value::string(self.name.clone()),
                Value::Uint(self.handle),
                self.role.to_value(),
                Value::Ubyte(self.snd_settle_mode.code()),
                Value::Ubyte(0),
                self.source.as_ref().map_or(Value::Null, Source::to_value),
                self.target.as_ref().map_or(Value::Null, Target::to_value),
                Value::Null,
                Value::Null,
                opt(self.initial_delivery_count),
                opt(self.max_message_size),
            ],
        )
    }

    fn from_fields(mut f: Fields) -> Result<Self, CodecError> {
        let source = match f.take(5) {
            Value::Null => None,
            v => Some(Source::from_value(v)?),
        };
        let target = match f.take(6) {
            Value::Null => None,
            v => Some(Target::from_value(v)?),
        };
        let receiver = f
            .opt_bool(2, "role")?
            .ok_or(CodecError::MissingField {
                performative: "attach",
                field: "role",
            })?;
        Ok(Self {
            name: f.req_string(0, "name")?,
            handle: f.req_u32(1, "handle")?,
            role: Role::from_bool(receiver),
            snd_settle_mode: f
                .opt_u8(3, "snd-settle-mode")?
                .map_or(SenderSettleMode::Mixed, SenderSettleMode::from_code),
            source,
            target,
            initial_delivery_count: f.opt_u32(9, "initial-delivery-count")?,
            max_message_size: f.opt_u64(10, "max-message-size")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flow {
    pub next_incoming_id: Option<u32>,
    pub incoming_window: u32,
    pub next_outgoing_id: u32,
    pub outgoing_window: u32,
    pub handle: Option<u32>,
    pub delivery_count: Option<u32>,
    pub link_credit: Option<u32>,
    pub available: Option<u32>,
    pub drain: bool,
    pub echo: bool,
}

impl Flow {
    fn to_value(&self) -> Value {
        list(
            FLOW,
            vec![
                opt(self.next_incoming_id),
                Value::Uint(self.incoming_window),
                Value::Uint(self.next_outgoing_id),
                Value::Uint(self.outgoing_window),
                opt(self.handle),
                opt(self.delivery_count),
                opt(self.link_credit),
                opt(self.available),
                if self.drain { Value::Bool(true) } else { Value::Null },
                if self.echo { Value::Bool(true) } else { Value::Null },
            ],
        )
    }

    fn from_fields(f: Fields) -> Result<Self, CodecError> {
        Ok(Self {
            next_incoming_id: f.opt_u32(0, "next-incoming-id")?,
            incoming_window: f.req_u32(1, "incoming-window")?,
            next_outgoing_id: f.req_u32(2, "next-outgoing-id")?,
            outgoing_window: f.req_u32(3, "outgoing-window")?,
            handle: f.opt_u32(4, "handle")?,
            delivery_count: f.opt_u32(5, "delivery-count")?,
            link_credit: f.opt_u32(6, "link-credit")?,
            available: f.opt_u32(7, "available")?,
            drain: f.bool_or(8, "drain", false)?,
            echo: f.bool_or(9, "echo", false)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub handle: u32,
    pub delivery_id: Option<u32>,
    pub delivery_tag: Option<Vec<u8>>,
    pub message_format: Option<u32>,
    pub settled: Option<bool>,
    pub more: bool,
}

impl Transfer {
    fn to_value(&self) -> Value {
        list(
            TRANSFER,
            vec![
                Value::Uint(self.handle),
                opt(self.delivery_id),
                opt(self.delivery_tag.clone()),
                opt(self.message_format),
                opt(self.settled),
                if self.more { Value::Bool(true) } else { Value::Null },
            ],
        )
    }

    fn from_fields(f: Fields) -> Result<Self, CodecError> {
        Ok(Self {
            handle: f.req_u32(0, "handle")?,
            delivery_id: f.opt_u32(1, "delivery-id")?,
            delivery_tag: f.opt_binary(2, "delivery-tag")?,
            message_format: f.opt_u32(3, "message-format")?,
            settled: f.opt_bool(4, "settled")?,
            more: f.bool_or(5, "more", false)?,
        })
    }
}

/// Delivery outcome or intermediate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    Received {
        section_number: u32,
        section_offset: u64,
    },
    Accepted,
    Rejected(Option<ErrorCondition>),
    Released,
    Modified {
        delivery_failed: bool,
        undeliverable_here: bool,
    },
}

impl DeliveryState {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryState::Received { .. } => "received",
            DeliveryState::Accepted => "accepted",
            DeliveryState::Rejected(_) => "rejected",
            DeliveryState::Released => "released",
            DeliveryState::Modified { .. } => "modified",
        }
    }

    fn to_value(&self) -> Value {
        match self {
            DeliveryState::Received {
                section_number,
                section_offset,
            } => list(
                RECEIVED,
                vec![Value::Uint(*section_number), Value::Ulong(*section_offset)],
            ),
            DeliveryState::Accepted => list(ACCEPTED, Vec::new()),
            DeliveryState::Rejected(error) => list(REJECTED, vec![opt_error(error)]),
            DeliveryState::Released => list(RELEASED, Vec::new()),
            DeliveryState::Modified {
                delivery_failed,
                undeliverable_here,
            } => list(
                MODIFIED,
                vec![Value::Bool(*delivery_failed), Value::Bool(*undeliverable_here)],
            ),
        }
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        let (code, items) = described_list(value)?;
        let f = Fields::new("delivery-state", items);
        Ok(match code {
            RECEIVED => DeliveryState::Received {
                section_number: f.req_u32(0, "section-number")?,
                section_offset: f.opt_u64(1, "section-offset")?.unwrap_or(0),
            },
            ACCEPTED => DeliveryState::Accepted,
            REJECTED => DeliveryState::Rejected(f.error(0)?),
            RELEASED => DeliveryState::Released,
            MODIFIED => DeliveryState::Modified {
                delivery_failed: f.bool_or(0, "delivery-failed", false)?,
                undeliverable_here: f.bool_or(1, "undeliverable-here", false)?,
            },
            other => return Err(CodecError::UnknownDescriptor(format!("0x{other:x}"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    pub role: Role,
    pub first: u32,
    pub last: Option<u32>,
    pub settled: bool,
    pub state: Option<DeliveryState>,
}

impl Disposition {
    fn to_value(&self) -> Value {
        list(
            DISPOSITION,
            vec![
                self.role.to_value(),
                Value::Uint(self.first),
                opt(self.last),
                Value::Bool(self.settled),
                self.state
                    .as_ref()
                    .map_or(Value::Null, DeliveryState::to_value),
            ],
        )
    }

    fn from_fields(mut f: Fields) -> Result<Self, CodecError> {
        let state = match f.take(4) {
            Value::Null => None,
            v => Some(DeliveryState::from_value(v)?),
        };
        let receiver = f
            .opt_bool(0, "role")?
            .ok_or(CodecError::MissingField {
                performative: "disposition",
                field: "role",
            })?;
        Ok(Self {
            role: Role::from_bool(receiver),
            first: f.req_u32(1, "first")?,
            last: f.opt_u32(2, "last")?,
            settled: f.bool_or(3, "settled", false)?,
            state,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detach {
    pub handle: u32,
    pub closed: bool,
    pub error: Option<ErrorCondition>,
}

impl Detach {
    fn to_value(&self) -> Value {
        list(
            DETACH,
            vec![
                Value::Uint(self.handle),
                Value::Bool(self.closed),
                opt_error(&self.error),
            ],
        )
    }

    fn from_fields(f: Fields) -> Result<Self, CodecError> {
        Ok(Self {
            handle: f.req_u32(0, "handle")?,
            closed: f.bool_or(1, "closed", false)?,
            error: f.error(2)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct End {
    pub error: Option<ErrorCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Close {
    pub error: Option<ErrorCondition>,
}

/// Frame body of an AMQP (type 0) frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Performative {
    Open(Open),
    Begin(Begin),
    Attach(Attach),
    Flow(Flow),
    Transfer(Transfer),
    Disposition(Disposition),
    Detach(Detach),
    End(End),
    Close(Close),
}

impl Performative {
    pub fn name(&self) -> &'static str {
        match self {
            Performative::Open(_) => "open",
            Performative::Begin(_) => "begin",
            Performative::Attach(_) => "attach",
            Performative::Flow(_) => "flow",
            Performative::Transfer(_) => "transfer",
            Performative::Disposition(_) => "disposition",
            Performative::Detach(_) => "detach",
            Performative::End(_) => "end",
            Performative::Close(_) => "close",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Performative::Open(p) => p.to_value(),
            Performative::Begin(p) => p.to_value(),
            Performative::Attach(p) => p.to_value(),
            Performative::Flow(p) => p.to_value(),
            Performative::Transfer(p) => p.to_value(),
            Performative::Disposition(p) => p.to_value(),
            Performative::Detach(p) => p.to_value(),
            Performative::End(p) => list(END, vec![opt_error(&p.error)]),
            Performative::Close(p) => list(CLOSE, vec![opt_error(&p.error)]),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        let (code, items) = described_list(value)?;
        Ok(match code {
            OPEN => Performative::Open(Open::from_fields(Fields::new("open", items))?),
            BEGIN => Performative::Begin(Begin::from_fields(Fields::new("begin", items))?),
            ATTACH => Performative::Attach(Attach::from_fields(Fields::new("attach", items))?),
            FLOW => Performative::Flow(Flow::from_fields(Fields::new("flow", items))?),
            TRANSFER => {
                Performative::Transfer(Transfer::from_fields(Fields::new("transfer", items))?)
            }
            DISPOSITION => Performative::Disposition(Disposition::from_fields(Fields::new(
                "disposition",
                items,
            ))?),
            DETACH => Performative::Detach(Detach::from_fields(Fields::new("detach", items))?),
            END => Performative::End(End {
                error: Fields::new("end", items).error(0)?,
            }),
            CLOSE => Performative::Close(Close {
                error: Fields::new("close", items).error(0)?,
            }),
            other => return Err(CodecError::UnknownDescriptor(format!("0x{other:x}"))),
        })
    }
}
