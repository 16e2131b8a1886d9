//! Protocol headers and frame framing.

use super::sasl::SaslFrame;
use super::{CodecError, Decoder, Performative};

pub const FRAME_HEADER_SIZE: usize = 8;

/// Smallest max-frame-size a peer may advertise.
pub const MIN_MAX_FRAME_SIZE: u32 = 512;

const TYPE_AMQP: u8 = 0;
const TYPE_SASL: u8 = 1;
const DOFF: u8 = 2;

/// The eight-byte header exchanged before each protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolHeader {
    Amqp,
    Tls,
    Sasl,
}

impl ProtocolHeader {
    pub fn to_bytes(self) -> [u8; 8] {
        let id = match self {
            ProtocolHeader::Amqp => 0,
            ProtocolHeader::Tls => 2,
            ProtocolHeader::Sasl => 3,
        };
        [b'A', b'M', b'Q', b'P', id, 1, 0, 0]
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Result<Self, CodecError> {
        match bytes {
            [b'A', b'M', b'Q', b'P', 0, 1, 0, 0] => Ok(ProtocolHeader::Amqp),
            [b'A', b'M', b'Q', b'P', 2, 1, 0, 0] => Ok(ProtocolHeader::Tls),
            [b'A', b'M', b'Q', b'P', 3, 1, 0, 0] => Ok(ProtocolHeader::Sasl),
            other => Err(CodecError::InvalidProtocolHeader(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Amqp {
        channel: u16,
        performative: Performative,
        /// Bytes after the performative; only transfers carry any.
        payload: Vec<u8>,
    },
    Sasl(SaslFrame),
    /// Empty AMQP frame used to keep an idle connection alive.
    Heartbeat,
}

impl Frame {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0, DOFF]);
        match self {
            Frame::Amqp {
                channel,
                performative,
                payload,
            } => {
                buf.push(TYPE_AMQP);
                buf.extend_from_slice(&channel.to_be_bytes());
                performative.to_value().encode(buf);
                buf.extend_from_slice(payload);
            }
            Frame::Sasl(frame) => {
                buf.push(TYPE_SASL);
                buf.extend_from_slice(&[0, 0]);
                frame.to_value().encode(buf);
            }
            Frame::Heartbeat => {
                buf.push(TYPE_AMQP);
                buf.extend_from_slice(&[0, 0]);
            }
        }
        let size = (buf.len() - start) as u32;
        buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Decodes one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` while the buffer holds less than a whole frame,
    /// otherwise the frame and the number of bytes it occupied.
    pub fn decode(buf: &[u8], max_frame_size: u32) -> Result<Option<(Frame, usize)>, CodecError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let size = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if (size as usize) < FRAME_HEADER_SIZE {
            return Err(CodecError::FrameTooSmall(size));
        }
        if size > max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size,
                limit: max_frame_size,
            });
        }
        let doff = buf[4];
        if doff < DOFF || (doff as usize) * 4 > size as usize {
            return Err(CodecError::InvalidDataOffset(doff));
        }
        if buf.len() < size as usize {
            return Ok(None);
        }
        let frame_type = buf[5];
        let channel = u16::from_be_bytes([buf[6], buf[7]]);
        let body = &buf[(doff as usize) * 4..size as usize];

        let frame = match frame_type {
            TYPE_AMQP if body.is_empty() => Frame::Heartbeat,
            TYPE_AMQP => {
                let mut decoder = Decoder::new(body);
                let performative = Performative::from_value(decoder.decode_value()?)?;
                Frame::Amqp {
                    channel,
                    performative,
                    payload: decoder.remaining().to_vec(),
                }
            }
            TYPE_SASL => {
                let mut decoder = Decoder::new(body);
                Frame::Sasl(SaslFrame::from_value(decoder.decode_value()?)?)
            }
            other => return Err(CodecError::UnknownFrameType(other)),
        };
        Ok(Some((frame, size as usize)))
    }
}
