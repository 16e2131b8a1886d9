//! AMQP 1.0 type system.
//!
//! Encoding always picks the most compact constructor. Decoding accepts every
//! fixed and variable width form. Decimal types are surfaced as raw bytes.

use super::CodecError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Ubyte(u8),
    Ushort(u16),
    Uint(u32),
    Ulong(u64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Uuid([u8; 16]),
    Binary(Vec<u8>),
    String(String),
    Symbol(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Homogeneous sequence, encoded with a single element constructor.
    Array(Vec<Value>),
    Described(Box<Value>, Box<Value>),
}

impl Value {
    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn described(descriptor: u64, value: Value) -> Self {
        Value::Described(Box::new(Value::Ulong(descriptor)), Box::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::Ubyte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::Ubyte(v) => Some(u16::from(*v)),
            Value::Ushort(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Ubyte(v) => Some(u32::from(*v)),
            Value::Ushort(v) => Some(u32::from(*v)),
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Ulong(v) => Some(*v),
            other => other.as_u32().map(u64::from),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// A `multiple="true"` field: either a single value or an array of them.
    pub fn as_multiple(&self) -> Vec<&Value> {
        match self {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => buf.push(0x40),
            Value::Bool(true) => buf.push(0x41),
            Value::Bool(false) => buf.push(0x42),
            Value::Ubyte(v) => {
                buf.push(0x50);
                buf.push(*v);
            }
            Value::Ushort(v) => {
                buf.push(0x60);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Uint(0) => buf.push(0x43),
            Value::Uint(v) if *v < 256 => {
                buf.push(0x52);
                buf.push(*v as u8);
            }
            Value::Uint(v) => {
                buf.push(0x70);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Ulong(0) => buf.push(0x44),
            Value::Ulong(v) if *v < 256 => {
                buf.push(0x53);
                buf.push(*v as u8);
            }
            Value::Ulong(v) => {
                buf.push(0x80);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Byte(v) => {
                buf.push(0x51);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Short(v) => {
                buf.push(0x61);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Int(v) => match i8::try_from(*v) {
                Ok(small) => {
                    buf.push(0x54);
                    buf.extend_from_slice(&small.to_be_bytes());
                }
                Err(_) => {
                    buf.push(0x71);
                    buf.extend_from_slice(&v.to_be_bytes());
                }
            },
            Value::Long(v) => match i8::try_from(*v) {
                Ok(small) => {
                    buf.push(0x55);
                    buf.extend_from_slice(&small.to_be_bytes());
                }
                Err(_) => {
                    buf.push(0x81);
                    buf.extend_from_slice(&v.to_be_bytes());
                }
            },
            Value::Float(v) => {
                buf.push(0x72);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Double(v) => {
                buf.push(0x82);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Char(c) => {
                buf.push(0x73);
                buf.extend_from_slice(&u32::from(*c).to_be_bytes());
            }
            Value::Timestamp(ms) => {
                buf.push(0x83);
                buf.extend_from_slice(&ms.to_be_bytes());
            }
            Value::Uuid(bytes) => {
                buf.push(0x98);
                buf.extend_from_slice(bytes);
            }
            Value::Binary(bytes) => encode_variable(buf, 0xa0, 0xb0, bytes),
            Value::String(s) => encode_variable(buf, 0xa1, 0xb1, s.as_bytes()),
            Value::Symbol(s) => encode_variable(buf, 0xa3, 0xb3, s.as_bytes()),
            Value::List(items) if items.is_empty() => buf.push(0x45),
            Value::List(items) => {
                let mut body = Vec::new();
                for item in items {
                    item.encode(&mut body);
                }
                encode_compound(buf, 0xc0, 0xd0, items.len(), &body);
            }
            Value::Map(pairs) => {
                let mut body = Vec::new();
                for (k, v) in pairs {
                    k.encode(&mut body);
                    v.encode(&mut body);
                }
                encode_compound(buf, 0xc1, 0xd1, pairs.len() * 2, &body);
            }
            Value::Array(items) => encode_array(buf, items),
            Value::Described(descriptor, value) => {
                buf.push(0x00);
                descriptor.encode(buf);
                value.encode(buf);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

fn encode_variable(buf: &mut Vec<u8>, short: u8, long: u8, bytes: &[u8]) {
    match u8::try_from(bytes.len()) {
        Ok(len) => {
            buf.push(short);
            buf.push(len);
        }
        Err(_) => {
            buf.push(long);
            buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        }
    }
    buf.extend_from_slice(bytes);
}

/// Lists and maps: size covers the count field plus the body.
fn encode_compound(buf: &mut Vec<u8>, short: u8, long: u8, count: usize, body: &[u8]) {
    if count < 256 && body.len() + 1 < 256 {
        buf.push(short);
        buf.push((body.len() + 1) as u8);
        buf.push(count as u8);
    } else {
        buf.push(long);
        buf.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
        buf.extend_from_slice(&(count as u32).to_be_bytes());
    }
    buf.extend_from_slice(body);
}

/// Wide-form constructor shared by every element of an array.
fn array_constructor(value: &Value) -> Option<u8> {
    Some(match value {
        Value::Bool(_) => 0x56,
        Value::Ubyte(_) => 0x50,
        Value::Ushort(_) => 0x60,
        Value::Uint(_) => 0x70,
        Value::Ulong(_) => 0x80,
        Value::Byte(_) => 0x51,
        Value::Short(_) => 0x61,
        Value::Int(_) => 0x71,
        Value::Long(_) => 0x81,
        Value::Float(_) => 0x72,
        Value::Double(_) => 0x82,
        Value::Char(_) => 0x73,
        Value::Timestamp(_) => 0x83,
        Value::Uuid(_) => 0x98,
        Value::Binary(_) => 0xb0,
        Value::String(_) => 0xb1,
        Value::Symbol(_) => 0xb3,
        _ => return None,
    })
}

fn encode_array_element(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Ubyte(v) => buf.push(*v),
        Value::Ushort(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Uint(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Ulong(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Byte(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Short(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Long(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Double(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Char(c) => buf.extend_from_slice(&u32::from(*c).to_be_bytes()),
        Value::Timestamp(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Uuid(bytes) => buf.extend_from_slice(bytes),
        Value::Binary(bytes) => {
            buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            buf.extend_from_slice(bytes);
        }
        Value::String(s) | Value::Symbol(s) => {
            buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        other => other.encode(buf),
    }
}

fn encode_array(buf: &mut Vec<u8>, items: &[Value]) {
    let Some(constructor) = items.first().map_or(Some(0x40), array_constructor) else {
        // No shared primitive constructor; fall back to a list.
        Value::List(items.to_vec()).encode(buf);
        return;
    };
    let mut body = vec![constructor];
    for item in items {
        encode_array_element(&mut body, item);
    }
    // Size covers count, constructor and elements; body already holds the
    // constructor.
    if items.len() < 256 && body.len() + 1 < 256 {
        buf.push(0xe0);
        buf.push((body.len() + 1) as u8);
        buf.push(items.len() as u8);
    } else {
        buf.push(0xf0);
        buf.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
        buf.extend_from_slice(&(items.len() as u32).to_be_bytes());
    }
    buf.extend_from_slice(&body);
}

/// Deepest nesting of described, list, map and array values accepted.
pub const MAX_NESTING: usize = 64;

/// Cursor over an encoded buffer.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(CodecError::Truncated)?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn decode_value(&mut self) -> Result<Value, CodecError> {
        let code = self.u8()?;
        self.decode_with(code)
    }

    fn decode_with(&mut self, code: u8) -> Result<Value, CodecError> {
        if !matches!(code, 0x00 | 0xc0 | 0xd0 | 0xc1 | 0xd1 | 0xe0 | 0xf0) {
            return self.decode_constructor(code);
        }
        if self.depth == MAX_NESTING {
            return Err(CodecError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let value = self.decode_constructor(code);
        self.depth -= 1;
        value
    }

    fn decode_constructor(&mut self, code: u8) -> Result<Value, CodecError> {
        Ok(match code {
            0x00 => {
                let descriptor = self.decode_value()?;
                let value = self.decode_value()?;
                Value::Described(Box::new(descriptor), Box::new(value))
            }
            0x40 => Value::Null,
            0x41 => Value::Bool(true),
            0x42 => Value::Bool(false),
            0x56 => Value::Bool(self.u8()? != 0),
            0x50 => Value::Ubyte(self.u8()?),
            0x60 => Value::Ushort(u16::from_be_bytes(self.array()?)),
            0x43 => Value::Uint(0),
            0x52 => Value::Uint(u32::from(self.u8()?)),
            0x70 => Value::Uint(self.u32()?),
            0x44 => Value::Ulong(0),
            0x53 => Value::Ulong(u64::from(self.u8()?)),
            0x80 => Value::Ulong(u64::from_be_bytes(self.array()?)),
            0x51 => Value::Byte(i8::from_be_bytes(self.array()?)),
            0x61 => Value::Short(i16::from_be_bytes(self.array()?)),
            0x54 => Value::Int(i32::from(i8::from_be_bytes(self.array()?))),
            0x71 => Value::Int(i32::from_be_bytes(self.array()?)),
            0x55 => Value::Long(i64::from(i8::from_be_bytes(self.array()?))),
            0x81 => Value::Long(i64::from_be_bytes(self.array()?)),
            0x72 => Value::Float(f32::from_be_bytes(self.array()?)),
            0x82 => Value::Double(f64::from_be_bytes(self.array()?)),
            0x74 => Value::Binary(self.take(4)?.to_vec()),
            0x84 => Value::Binary(self.take(8)?.to_vec()),
            0x94 => Value::Binary(self.take(16)?.to_vec()),
            0x73 => {
                let raw = self.u32()?;
                Value::Char(char::from_u32(raw).ok_or(CodecError::InvalidChar(raw))?)
            }
            0x83 => Value::Timestamp(i64::from_be_bytes(self.array()?)),
            0x98 => Value::Uuid(self.array()?),
            0xa0 => {
                let len = usize::from(self.u8()?);
                Value::Binary(self.take(len)?.to_vec())
            }
            0xb0 => {
                let len = self.u32()? as usize;
                Value::Binary(self.take(len)?.to_vec())
            }
            0xa1 | 0xa3 => {
                let len = usize::from(self.u8()?);
                self.text(code, len)?
            }
            0xb1 | 0xb3 => {
                let len = self.u32()? as usize;
                self.text(code, len)?
            }
            0x45 => Value::List(Vec::new()),
            0xc0 | 0xd0 => {
                let count = self.compound_header(code == 0xc0)?;
                let mut items = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    items.push(self.decode_value()?);
                }
                Value::List(items)
            }
            0xc1 | 0xd1 => {
                let count = self.compound_header(code == 0xc1)?;
                if count % 2 != 0 {
                    return Err(CodecError::OddMapCount(count));
                }
                let mut pairs = Vec::with_capacity((count / 2).min(64));
                for _ in 0..count / 2 {
                    let k = self.decode_value()?;
                    let v = self.decode_value()?;
                    pairs.push((k, v));
                }
                Value::Map(pairs)
            }
            0xe0 | 0xf0 => {
                let count = self.compound_header(code == 0xe0)?;
                let mut element = self.u8()?;
                let descriptor = if element == 0x00 {
                    let d = self.decode_value()?;
                    element = self.u8()?;
                    Some(d)
                } else {
                    None
                };
                let mut items = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    let v = self.decode_with(element)?;
                    items.push(match &descriptor {
                        Some(d) => Value::Described(Box::new(d.clone()), Box::new(v)),
                        None => v,
                    });
                }
                Value::Array(items)
            }
            other => return Err(CodecError::UnknownConstructor(other)),
        })
    }

    fn text(&mut self, code: u8, len: usize) -> Result<Value, CodecError> {
        let s = std::str::from_utf8(self.take(len)?)
            .map_err(|_| CodecError::InvalidUtf8)?
            .to_string();
        Ok(if code & 0x0f == 0x03 {
            Value::Symbol(s)
        } else {
            Value::String(s)
        })
    }

    /// Reads size and count, checking the size against the buffer. Returns
    /// the element count, which may not exceed the bytes the size declares
    /// after the count field, zero-width array elements included.
    fn compound_header(&mut self, short: bool) -> Result<usize, CodecError> {
        let (size, count) = if short {
            (usize::from(self.u8()?), usize::from(self.u8()?))
        } else {
            (self.u32()? as usize, self.u32()? as usize)
        };
        let count_width = if short { 1 } else { 4 };
        if size < count_width || size - count_width > self.buf.len() - self.pos {
            return Err(CodecError::Truncated);
        }
        if count > size - count_width {
            return Err(CodecError::CountExceedsSize { count, size });
        }
        Ok(count)
    }
}
