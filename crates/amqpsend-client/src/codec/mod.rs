//! AMQP 1.0 wire codec: types, frames, performatives, SASL and message
//! sections. Only the subset a single-shot sender (and a test peer) needs.

mod frame;
mod message;
mod performative;
mod sasl;
mod value;

pub use frame::{FRAME_HEADER_SIZE, Frame, MIN_MAX_FRAME_SIZE, ProtocolHeader};
pub use message::encode_message;
pub use performative::{
    Attach, Begin, Close, DeliveryState, Detach, Disposition, End, Flow, Open, Performative, Role,
    SenderSettleMode, Source, Target, Transfer,
};
pub use sasl::{SaslCode, SaslFrame, SaslInit, SaslMechanisms, SaslOutcome};
pub use value::{Decoder, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("buffer truncated")]
    Truncated,
    #[error("unknown type constructor 0x{0:02x}")]
    UnknownConstructor(u8),
    #[error("invalid UTF-8 in string or symbol")]
    InvalidUtf8,
    #[error("invalid char code point 0x{0:x}")]
    InvalidChar(u32),
    #[error("values nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("element count {count} does not fit in {size} bytes")]
    CountExceedsSize { count: usize, size: usize },
    #[error("map with odd element count {0}")]
    OddMapCount(usize),
    #[error("frame size {0} is smaller than the frame header")]
    FrameTooSmall(u32),
    #[error("frame size {size} exceeds limit {limit}")]
    FrameTooLarge { size: u32, limit: u32 },
    #[error("invalid data offset {0}")]
    InvalidDataOffset(u8),
    #[error("unknown frame type {0}")]
    UnknownFrameType(u8),
    #[error("unknown descriptor {0}")]
    UnknownDescriptor(String),
    #[error("expected {expected}, got {got}")]
    Unexpected {
        expected: &'static str,
        got: String,
    },
    #[error("{performative}: mandatory field {field} missing or mistyped")]
    MissingField {
        performative: &'static str,
        field: &'static str,
    },
    #[error("invalid protocol header {0:02x?}")]
    InvalidProtocolHeader([u8; 8]),
}
