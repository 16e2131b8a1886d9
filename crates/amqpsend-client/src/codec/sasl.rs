//! SASL frame bodies.

use super::performative::{Fields, described_list, list};
use super::{CodecError, Value};

const MECHANISMS: u64 = 0x40;
const INIT: u64 = 0x41;
const CHALLENGE: u64 = 0x42;
const RESPONSE: u64 = 0x43;
const OUTCOME: u64 = 0x44;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslMechanisms {
    pub mechanisms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslInit {
    pub mechanism: String,
    pub initial_response: Option<Vec<u8>>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslCode {
    Ok,
    Auth,
    Sys,
    SysPerm,
    SysTemp,
}

impl SaslCode {
    fn to_u8(self) -> u8 {
        match self {
            SaslCode::Ok => 0,
            SaslCode::Auth => 1,
            SaslCode::Sys => 2,
            SaslCode::SysPerm => 3,
            SaslCode::SysTemp => 4,
        }
    }

    fn from_u8(code: u8) -> Self {
        match code {
            0 => SaslCode::Ok,
            1 => SaslCode::Auth,
            3 => SaslCode::SysPerm,
            4 => SaslCode::SysTemp,
            _ => SaslCode::Sys,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SaslCode::Ok => "authentication succeeded",
            SaslCode::Auth => "authentication failed",
            SaslCode::Sys => "system error",
            SaslCode::SysPerm => "permanent system error",
            SaslCode::SysTemp => "transient system error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslOutcome {
    pub code: SaslCode,
    pub additional_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaslFrame {
    Mechanisms(SaslMechanisms),
    Init(SaslInit),
    Challenge(Vec<u8>),
    Response(Vec<u8>),
    Outcome(SaslOutcome),
}

impl SaslFrame {
    pub fn name(&self) -> &'static str {
        match self {
            SaslFrame::Mechanisms(_) => "sasl-mechanisms",
            SaslFrame::Init(_) => "sasl-init",
            SaslFrame::Challenge(_) => "sasl-challenge",
            SaslFrame::Response(_) => "sasl-response",
            SaslFrame::Outcome(_) => "sasl-outcome",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SaslFrame::Mechanisms(m) => list(
                MECHANISMS,
                vec![Value::Array(
                    m.mechanisms.iter().map(|s| Value::symbol(s.clone())).collect(),
                )],
            ),
            SaslFrame::Init(init) => list(
                INIT,
                vec![
                    Value::symbol(init.mechanism.clone()),
                    init.initial_response
                        .clone()
                        .map_or(Value::Null, Value::Binary),
                    init.hostname.clone().map_or(Value::Null, Value::String),
                ],
            ),
            SaslFrame::Challenge(data) => list(CHALLENGE, vec![Value::Binary(data.clone())]),
            SaslFrame::Response(data) => list(RESPONSE, vec![Value::Binary(data.clone())]),
            SaslFrame::Outcome(outcome) => list(
                OUTCOME,
                vec![
                    Value::Ubyte(outcome.code.to_u8()),
                    outcome
                        .additional_data
                        .clone()
                        .map_or(Value::Null, Value::Binary),
                ],
            ),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        let (code, items) = described_list(value)?;
        Ok(match code {
            MECHANISMS => {
                let f = Fields::new("sasl-mechanisms", items);
                SaslFrame::Mechanisms(SaslMechanisms {
                    mechanisms: f.symbols(0),
                })
            }
            INIT => {
                let f = Fields::new("sasl-init", items);
                SaslFrame::Init(SaslInit {
                    mechanism: f.req_string(0, "mechanism")?,
                    initial_response: f.opt_binary(1, "initial-response")?,
                    hostname: f.opt_string(2, "hostname")?,
                })
            }
            CHALLENGE => {
                let f = Fields::new("sasl-challenge", items);
                SaslFrame::Challenge(f.opt_binary(0, "challenge")?.unwrap_or_default())
            }
            RESPONSE => {
                let f = Fields::new("sasl-response", items);
                SaslFrame::Response(f.opt_binary(0, "response")?.unwrap_or_default())
            }
            OUTCOME => {
                let f = Fields::new("sasl-outcome", items);
                let code = f.opt_u8(0, "code")?.ok_or(CodecError::MissingField {
                    performative: "sasl-outcome",
                    field: "code",
                })?;
                SaslFrame::Outcome(SaslOutcome {
                    code: SaslCode::from_u8(code),
                    additional_data: f.opt_binary(1, "additional-data")?,
                })
            }
            other => return Err(CodecError::UnknownDescriptor(format!("0x{other:x}"))),
        })
    }
}
