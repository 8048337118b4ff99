//! Outbound request descriptors.
//!
//! A [`RestRequest`] is everything the transport needs to perform one call,
//! plus the shape of the result so a payload can be routed back into the
//! entity cache without a waiting caller. It is serde-serializable, which is
//! the persisted form used to save and restore pending work.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::trello::EntityKind;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  /// Whether the method mutates remote state.
  pub fn is_write(self) -> bool {
    !matches!(self, Method::Get)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Declared shape of a request's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "kind", rename_all = "lowercase")]
pub enum ResultKind {
  /// Nothing to route (deletes).
  None,
  /// A single entity payload.
  Entity(EntityKind),
  /// An array of entity payloads.
  List(EntityKind),
}

/// Path below the API root, as a list of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Endpoint {
  segments: Vec<String>,
}

impl Endpoint {
  pub fn new<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      segments: segments.into_iter().map(Into::into).collect(),
    }
  }

  pub fn segments(&self) -> &[String] {
    &self.segments
  }

  /// Relative path, e.g. `cards/5abc/checklists`.
  pub fn path(&self) -> String {
    self.segments.join("/")
  }
}

impl From<&str> for Endpoint {
  fn from(path: &str) -> Self {
    Endpoint::new(path.split('/').filter(|s| !s.is_empty()))
  }
}

impl From<String> for Endpoint {
  fn from(path: String) -> Self {
    Endpoint::from(path.as_str())
  }
}

impl From<Endpoint> for String {
  fn from(endpoint: Endpoint) -> Self {
    endpoint.path()
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}", self.path())
  }
}

/// One unit of outbound work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestRequest {
  pub endpoint: Endpoint,
  pub method: Method,
  #[serde(default)]
  pub parameters: BTreeMap<String, String>,
  #[serde(default)]
  pub body: Option<Value>,
  pub result: ResultKind,
}

impl RestRequest {
  pub fn new(method: Method, endpoint: Endpoint, result: ResultKind) -> Self {
    Self {
      endpoint,
      method,
      parameters: BTreeMap::new(),
      body: None,
      result,
    }
  }

  pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.parameters.insert(key.into(), value.into());
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  /// The entity addressed by the endpoint, if it names one (`cards/{id}/...`).
  pub fn target(&self) -> Option<(EntityKind, &str)> {
    match self.endpoint.segments() {
      [resource, id, ..] => EntityKind::from_resource(resource).map(|kind| (kind, id.as_str())),
      _ => None,
    }
  }
}

impl fmt::Display for RestRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.method, self.endpoint)
  }
}
