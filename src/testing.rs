//! Test doubles shared by the unit tests.

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::queue::{Method, RestRequest};
use crate::sync::SyncSettings;
use crate::transport::Transport;
use crate::trello::TrelloService;

#[derive(Clone)]
enum Reply {
  Json(Value),
  Status(u16),
  NotFound,
}

#[derive(Default)]
struct MockState {
  replies: HashMap<(Method, String), Reply>,
  calls: Vec<RestRequest>,
  delay: Duration,
}

/// Recording transport with canned replies.
///
/// Unmocked routes answer like a permissive server: GET of an entity is not
/// found, PUT echoes the body back with the id, DELETE succeeds with no body
/// and POST fails.
#[derive(Clone, Default)]
pub struct MockTransport {
  state: Arc<Mutex<MockState>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> MutexGuard<'_, MockState> {
    self.state.lock().unwrap()
  }

  /// Reply to `method path` with this payload. Replaces earlier replies.
  pub fn on(&self, method: Method, path: &str, payload: Value) {
    self
      .state()
      .replies
      .insert((method, path.to_string()), Reply::Json(payload));
  }

  /// Fail `method path` with an HTTP status.
  pub fn fail(&self, method: Method, path: &str, status: u16) {
    self
      .state()
      .replies
      .insert((method, path.to_string()), Reply::Status(status));
  }

  pub fn not_found(&self, method: Method, path: &str) {
    self
      .state()
      .replies
      .insert((method, path.to_string()), Reply::NotFound);
  }

  /// Delay every reply, measured from dispatch.
  pub fn set_delay(&self, delay: Duration) {
    self.state().delay = delay;
  }

  pub fn calls(&self) -> Vec<RestRequest> {
    self.state().calls.clone()
  }

  /// Dispatched requests as `METHOD path`.
  pub fn paths(&self) -> Vec<String> {
    self
      .state()
      .calls
      .iter()
      .map(|call| format!("{} {}", call.method, call.endpoint.path()))
      .collect()
  }

  pub fn count(&self, method: Method, path: &str) -> usize {
    self
      .state()
      .calls
      .iter()
      .filter(|call| call.method == method && call.endpoint.path() == path)
      .count()
  }

  fn reply(&self, request: &RestRequest) -> Result<Value> {
    let key = (request.method, request.endpoint.path());
    let reply = self.state().replies.get(&key).cloned();

    match reply {
      Some(Reply::Json(payload)) => Ok(payload),
      Some(Reply::Status(status)) => Err(Error::Transport {
        status,
        message: format!("mocked failure for {}", request),
      }),
      Some(Reply::NotFound) => Err(not_found(request)),
      None => match request.method {
        Method::Get => Err(not_found(request)),
        Method::Put => {
          let mut echo = match &request.body {
            Some(Value::Object(body)) => body.clone(),
            _ => Map::new(),
          };
          if let Some((_, id)) = request.target() {
            echo.insert("id".to_string(), Value::String(id.to_string()));
          }
          Ok(Value::Object(echo))
        }
        Method::Delete => Ok(Value::Null),
        Method::Post => Err(Error::Transport {
          status: 500,
          message: format!("no reply mocked for {}", request),
        }),
      },
    }
  }
}

fn not_found(request: &RestRequest) -> Error {
  match request.target() {
    Some((kind, id)) => Error::NotFound {
      kind,
      id: id.to_string(),
    },
    None => Error::Transport {
      status: 404,
      message: format!("{} not found", request),
    },
  }
}

impl Transport for MockTransport {
  fn execute(&self, request: &RestRequest) -> BoxFuture<'static, Result<Value>> {
    let reply = self.reply(request);
    let delay = {
      let mut state = self.state();
      state.calls.push(request.clone());
      state.delay
    };

    Box::pin(async move {
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      reply
    })
  }
}

pub fn settings() -> SyncSettings {
  SyncSettings {
    ttl: chrono::Duration::seconds(60),
    request_interval: Duration::ZERO,
    read_only: false,
  }
}

pub fn service(mock: &MockTransport) -> TrelloService {
  TrelloService::new(Arc::new(mock.clone()), settings())
}

pub fn service_with_ttl(mock: &MockTransport, ttl: chrono::Duration) -> TrelloService {
  TrelloService::new(Arc::new(mock.clone()), SyncSettings { ttl, ..settings() })
}

pub fn read_only_service(mock: &MockTransport) -> TrelloService {
  TrelloService::new(
    Arc::new(mock.clone()),
    SyncSettings {
      read_only: true,
      ..settings()
    },
  )
}
