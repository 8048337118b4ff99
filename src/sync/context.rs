//! Per-entity synchronization context.
//!
//! A context owns the snapshot of one remote object and runs its
//! refresh/merge/submit protocol:
//!
//! - `synchronize` fetches the full object when the snapshot is missing or
//!   older than the TTL, replacing everything except dirty properties
//! - `merge` overlays a (possibly partial) snapshot obtained elsewhere
//! - `stage` writes a local value and marks the property dirty
//! - `submit_data` sends dirty properties and clears them on success
//! - `delete` removes the remote object and retires the context
//!
//! Refreshes and submits hold the in-flight guard, so at most one request per
//! context is outstanding.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::pipeline::Pipeline;
use super::property::{PropertyDef, PropertyTable};
use crate::error::{Error, Result};
use crate::trello::endpoint;
use crate::trello::EntityKind;

#[derive(Debug, Default)]
struct ContextState {
  snapshot: Option<Map<String, Value>>,
  last_synchronized: Option<DateTime<Utc>>,
  /// Dirty property name -> generation of its latest local write.
  dirty: BTreeMap<&'static str, u64>,
  generation: u64,
  synchronized_once: bool,
  deleted: bool,
}

pub struct SyncContext {
  kind: EntityKind,
  id: String,
  pipeline: Arc<Pipeline>,
  state: Mutex<ContextState>,
  in_flight: tokio::sync::Mutex<()>,
  changes: broadcast::Sender<Vec<&'static str>>,
}

impl SyncContext {
  pub(crate) fn new(kind: EntityKind, id: impl Into<String>, pipeline: Arc<Pipeline>) -> Arc<Self> {
    let (changes, _) = broadcast::channel(32);
    Arc::new(Self {
      kind,
      id: id.into(),
      pipeline,
      state: Mutex::new(ContextState::default()),
      in_flight: tokio::sync::Mutex::new(()),
      changes,
    })
  }

  pub fn kind(&self) -> EntityKind {
    self.kind
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn properties(&self) -> &'static PropertyTable {
    self.kind.properties()
  }

  pub(crate) fn pipeline(&self) -> &Arc<Pipeline> {
    &self.pipeline
  }

  fn state(&self) -> MutexGuard<'_, ContextState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn is_deleted(&self) -> bool {
    self.state().deleted
  }

  pub fn is_dirty(&self, property: &str) -> bool {
    self.state().dirty.contains_key(property)
  }

  pub fn dirty_properties(&self) -> Vec<&'static str> {
    self.state().dirty.keys().copied().collect()
  }

  pub fn last_synchronized(&self) -> Option<DateTime<Utc>> {
    self.state().last_synchronized
  }

  /// Copy of the current snapshot.
  pub fn snapshot(&self) -> Option<Map<String, Value>> {
    self.state().snapshot.clone()
  }

  /// Whether a refresh or submit is outstanding.
  pub fn is_in_flight(&self) -> bool {
    self.in_flight.try_lock().is_err()
  }

  /// Whether the next `synchronize` would fetch.
  pub fn is_expired(&self) -> bool {
    let ttl = self.pipeline.settings().ttl;
    let state = self.state();
    match (&state.snapshot, state.last_synchronized) {
      (Some(_), Some(last)) => Utc::now() - last > ttl,
      _ => true,
    }
  }

  fn needs_refresh(&self) -> bool {
    !self.is_deleted() && self.is_expired()
  }

  /// Receive the names of properties whose values changed.
  pub fn subscribe(&self) -> broadcast::Receiver<Vec<&'static str>> {
    self.changes.subscribe()
  }

  /// Make the next `synchronize` fetch regardless of the TTL.
  pub fn expire(&self) {
    self.state().last_synchronized = None;
  }

  /// Refresh the snapshot if it is missing or stale.
  pub async fn synchronize(&self) -> Result<()> {
    if !self.needs_refresh() {
      return Ok(());
    }

    let _guard = self.in_flight.lock().await;
    if !self.needs_refresh() {
      return Ok(());
    }

    debug!(kind = %self.kind, id = %self.id, "refreshing");
    let result = self
      .pipeline
      .execute(endpoint::read(self.kind, &self.id))
      .await
      .and_then(|payload| match payload {
        Value::Object(map) => Ok(map),
        Value::Null => Err(Error::NotFound {
          kind: self.kind,
          id: self.id.clone(),
        }),
        other => Err(Error::UnexpectedPayload(format!(
          "expected an object for {} {}, got {}",
          self.kind, self.id, other
        ))),
      });

    match result {
      Ok(snapshot) => {
        self.apply(snapshot, false);
        Ok(())
      }
      Err(err) => {
        if err.is_not_found() {
          warn!(kind = %self.kind, id = %self.id, "remote object not found");
        } else if !self.state().synchronized_once {
          warn!(kind = %self.kind, id = %self.id, error = %err, "evicting entity after failed first refresh");
          self.pipeline.cache().remove(self);
        }
        Err(err)
      }
    }
  }

  /// Overlay an externally obtained snapshot.
  ///
  /// Applies regardless of the TTL and leaves dirty properties and the dirty
  /// set untouched.
  pub fn merge(&self, snapshot: Map<String, Value>) {
    if self.is_deleted() {
      return;
    }
    self.apply(snapshot, true);
  }

  /// Send dirty properties to the server.
  ///
  /// Properties written again while the request was in flight stay dirty.
  pub async fn submit_data(&self) -> Result<()> {
    let _guard = self.in_flight.lock().await;

    let (body, submitted) = {
      let state = self.state();
      if state.deleted {
        return Err(self.not_found());
      }
      if state.dirty.is_empty() {
        return Ok(());
      }

      let table = self.properties();
      let empty = Map::new();
      let snapshot = state.snapshot.as_ref().unwrap_or(&empty);
      let mut body = Map::new();
      for name in state.dirty.keys() {
        if let Some(property) = table.get(name) {
          let value = property.get(snapshot).cloned().unwrap_or(Value::Null);
          body.insert(property.submit_key(), value);
        }
      }
      (body, state.dirty.clone())
    };

    debug!(kind = %self.kind, id = %self.id, properties = ?submitted.keys().collect::<Vec<_>>(), "submitting");
    let payload = self
      .pipeline
      .execute(endpoint::update(self.kind, &self.id, Value::Object(body)))
      .await?;

    {
      let mut state = self.state();
      for (name, generation) in submitted {
        if state.dirty.get(name) == Some(&generation) {
          state.dirty.remove(name);
        }
      }
    }

    if let Value::Object(snapshot) = payload {
      self.apply(snapshot, true);
    }
    Ok(())
  }

  /// Delete the remote object.
  ///
  /// Afterwards `synchronize` is a no-op, live-only properties read as
  /// `None`, and the context leaves the entity cache.
  pub async fn delete(&self) -> Result<()> {
    if !self.kind.supports_delete() {
      return Err(Error::Unsupported {
        kind: self.kind,
        operation: "delete",
      });
    }

    let _guard = self.in_flight.lock().await;
    if self.is_deleted() {
      return Ok(());
    }

    self
      .pipeline
      .execute(endpoint::delete(self.kind, &self.id))
      .await?;

    {
      let mut state = self.state();
      state.deleted = true;
      state.dirty.clear();
    }
    self.pipeline.cache().remove(self);
    debug!(kind = %self.kind, id = %self.id, "deleted");
    Ok(())
  }

  /// Current value of a property, without synchronizing.
  pub fn value(&self, property: &PropertyDef) -> Option<Value> {
    let state = self.state();
    if state.deleted && property.is_live_only() {
      return None;
    }
    state
      .snapshot
      .as_ref()
      .and_then(|snapshot| property.get(snapshot))
      .filter(|value| !value.is_null())
      .cloned()
  }

  /// Write a local value and mark the property dirty. Validation is the
  /// caller's job.
  pub(crate) fn stage(&self, property: &'static PropertyDef, value: Value) -> Result<()> {
    if property.is_read_only() {
      return Err(Error::ReadOnlyProperty(property.name().to_string()));
    }
    if self.pipeline.settings().read_only {
      return Err(Error::ReadOnly);
    }

    {
      let mut state = self.state();
      if state.deleted {
        return Err(self.not_found());
      }
      state.generation += 1;
      let generation = state.generation;
      property.set(state.snapshot.get_or_insert_with(Map::new), value);
      state.dirty.insert(property.name(), generation);
    }

    let _ = self.changes.send(vec![property.name()]);
    Ok(())
  }

  fn apply(&self, incoming: Map<String, Value>, overlay: bool) {
    let table = self.properties();

    let changed = {
      let mut state = self.state();
      let previous = state.snapshot.take();

      let mut next = match (&previous, overlay) {
        (Some(previous), true) => {
          let mut merged = previous.clone();
          merged.extend(incoming);
          merged
        }
        _ => incoming,
      };

      if let Some(previous) = &previous {
        for name in state.dirty.keys() {
          if let Some(property) = table.get(name) {
            if let Some(value) = property.get(previous) {
              property.set(&mut next, value.clone());
            }
          }
        }
      }

      let changed: Vec<&'static str> = table
        .iter()
        .filter(|p| previous.as_ref().and_then(|s| p.get(s)) != p.get(&next))
        .map(PropertyDef::name)
        .collect();

      state.snapshot = Some(next);
      state.last_synchronized = Some(Utc::now());
      state.synchronized_once = true;
      changed
    };

    if !changed.is_empty() {
      let _ = self.changes.send(changed);
    }
  }

  fn not_found(&self) -> Error {
    Error::NotFound {
      kind: self.kind,
      id: self.id.clone(),
    }
  }
}

impl std::fmt::Debug for SyncContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SyncContext")
      .field("kind", &self.kind)
      .field("id", &self.id)
      .field("state", &*self.state())
      .finish_non_exhaustive()
  }
}
