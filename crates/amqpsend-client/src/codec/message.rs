//! Bare message encoding: application-properties followed by an amqp-value
//! string body.

use super::Value;
use amqpsend_core::OutboundMessage;

const APPLICATION_PROPERTIES: u64 = 0x74;
const AMQP_VALUE: u64 = 0x77;

pub fn encode_message(message: &OutboundMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    if !message.properties().is_empty() {
        let map = message
            .properties()
            .iter()
            .map(|(k, v)| (Value::string(k.clone()), Value::string(v.clone())))
            .collect();
        Value::described(APPLICATION_PROPERTIES, Value::Map(map)).encode(&mut buf);
    }
    Value::described(AMQP_VALUE, Value::string(message.body())).encode(&mut buf);
    buf
}
