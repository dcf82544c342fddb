//! Response body decoding

use crate::common::{Error, Result};
use crate::value::{Mapping, Value};

/// Turns a raw response body into a structured [`Value`]
pub trait ResponseDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Value>;
}

/// Decodes JSON object bodies.
///
/// Integers survive exactly: `Value`'s deserializer keeps whole numbers as
/// `Int`/`UInt` rather than routing them through `f64`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl ResponseDecoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Map(Mapping::new()));
        }

        let value: Value =
            serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;

        match value {
            Value::Map(_) => Ok(value),
            other => Err(Error::Decode(format!(
                "expected a JSON object, got {}",
                other.kind()
            ))),
        }
    }
}
