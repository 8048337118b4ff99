//! Glue between contexts, the entity cache and the request queue.

use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;

use super::context::SyncContext;
use super::registry::EntityCache;
use crate::error::{Error, Result};
use crate::queue::{RequestQueue, ResponseRouter, RestRequest, ResultKind};
use crate::trello::EntityKind;

/// Tunables shared by every context of a session.
#[derive(Debug, Clone)]
pub struct SyncSettings {
  /// How long a snapshot stays fresh.
  pub ttl: chrono::Duration,
  /// Minimum spacing between two dispatched requests.
  pub request_interval: std::time::Duration,
  /// Reject writes locally (no token).
  pub read_only: bool,
}

impl Default for SyncSettings {
  fn default() -> Self {
    Self {
      ttl: chrono::Duration::seconds(30),
      request_interval: std::time::Duration::from_millis(100),
      read_only: false,
    }
  }
}

/// What every context needs to reach the server and the registry.
pub(crate) struct Pipeline {
  queue: Arc<RequestQueue>,
  cache: EntityCache,
  settings: SyncSettings,
}

impl Pipeline {
  pub(crate) fn new(queue: Arc<RequestQueue>, settings: SyncSettings) -> Arc<Self> {
    Arc::new(Self {
      queue,
      cache: EntityCache::new(),
      settings,
    })
  }

  pub(crate) fn queue(&self) -> &Arc<RequestQueue> {
    &self.queue
  }

  pub(crate) fn cache(&self) -> &EntityCache {
    &self.cache
  }

  pub(crate) fn settings(&self) -> &SyncSettings {
    &self.settings
  }

  /// Queue a request and wait for its outcome.
  pub(crate) async fn execute(&self, request: RestRequest) -> Result<Value> {
    if request.method.is_write() && self.settings.read_only {
      return Err(Error::ReadOnly);
    }

    let pending = self.queue.reserve(request);
    let (tx, rx) = oneshot::channel();
    pending.arm(Some(tx));

    rx.await.map_err(|_| Error::Cancelled)?
  }

  /// The single context for this remote object, created lazily.
  pub(crate) fn context(self: &Arc<Self>, kind: EntityKind, id: &str) -> Arc<SyncContext> {
    self
      .cache
      .find_or_add_by_id(kind, id, || SyncContext::new(kind, id, Arc::clone(self)))
  }

  /// Build (or update) a context from a prefetched snapshot.
  pub(crate) fn adopt(self: &Arc<Self>, kind: EntityKind, payload: Value) -> Result<Arc<SyncContext>> {
    let snapshot = into_object(payload)?;
    let id = snapshot
      .get("id")
      .and_then(Value::as_str)
      .ok_or_else(|| Error::UnexpectedPayload(format!("{} payload without an id", kind)))?
      .to_string();

    let context = self.context(kind, &id);
    context.merge(snapshot);
    Ok(context)
  }

  /// Route a payload into the cache by its declared shape. Lists fan out
  /// into one merge per element.
  pub(crate) fn apply_payload(
    self: &Arc<Self>,
    result: ResultKind,
    payload: &Value,
  ) -> Result<Vec<Arc<SyncContext>>> {
    match result {
      ResultKind::None => Ok(Vec::new()),
      ResultKind::Entity(kind) => Ok(vec![self.adopt(kind, payload.clone())?]),
      ResultKind::List(kind) => payload
        .as_array()
        .ok_or_else(|| Error::UnexpectedPayload(format!("expected a list of {}", kind)))?
        .iter()
        .map(|item| self.adopt(kind, item.clone()))
        .collect(),
    }
  }
}

/// [`ResponseRouter`] feeding caller-less responses into the cache.
pub(crate) struct CacheRouter(Weak<Pipeline>);

impl CacheRouter {
  pub(crate) fn new(pipeline: &Arc<Pipeline>) -> Self {
    Self(Arc::downgrade(pipeline))
  }
}

impl ResponseRouter for CacheRouter {
  fn apply_json(&self, result: ResultKind, payload: &Value) -> Result<()> {
    if let Some(pipeline) = self.0.upgrade() {
      pipeline.apply_payload(result, payload)?;
    }
    Ok(())
  }
}

pub(crate) fn into_object(payload: Value) -> Result<Map<String, Value>> {
  match payload {
    Value::Object(map) => Ok(map),
    other => Err(Error::UnexpectedPayload(format!(
      "expected an object, got {}",
      other
    ))),
  }
}
