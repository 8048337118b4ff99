//! Collaborator interfaces for the wire: transport and serializer.

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::Result;
use crate::queue::RestRequest;

/// Executes requests against the remote service.
///
/// Calling `execute` is the dispatch point: implementations must capture the
/// request synchronously and do the I/O inside the returned future, so that
/// the order of `execute` calls is the order requests reach the wire.
pub trait Transport: Send + Sync {
  fn execute(&self, request: &RestRequest) -> BoxFuture<'static, Result<Value>>;
}

/// Wire format for request and response bodies.
pub trait Serializer: Send + Sync {
  fn content_type(&self) -> &'static str;

  fn serialize(&self, value: &Value) -> Result<Vec<u8>>;

  /// Decode a response body. An empty body decodes to `null`.
  fn deserialize(&self, bytes: &[u8]) -> Result<Value>;
}

/// The default JSON wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
  fn content_type(&self) -> &'static str {
    "application/json"
  }

  fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
  }

  fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_json_serializer_round_trip() {
    let serializer = JsonSerializer;
    let bytes = serializer.serialize(&json!({"name": "Inbox"})).unwrap();
    assert_eq!(serializer.deserialize(&bytes).unwrap(), json!({"name": "Inbox"}));
  }

  #[test]
  fn test_empty_body_is_null() {
    assert_eq!(JsonSerializer.deserialize(b"").unwrap(), Value::Null);
    assert_eq!(JsonSerializer.deserialize(b"  \n").unwrap(), Value::Null);
  }

  #[test]
  fn test_malformed_body_is_json_error() {
    let err = JsonSerializer.deserialize(b"{oops").unwrap_err();
    assert!(matches!(err, crate::Error::Json(_)));
  }
}
