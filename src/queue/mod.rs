//! Ordered queue of outbound requests.
//!
//! The queue is decoupled from the transport: requests can sit here while
//! dispatch is paused, be inspected or persisted without being removed, and
//! be bulk-restored later. Each entry carries a readiness gate. A slot is
//! reserved first (fixing its position in the FIFO) and armed afterwards,
//! once a responder is attached; the handler never dispatches an entry whose
//! gate is still closed.

mod handler;
mod request;
mod store;

pub use handler::{HandlerStats, QueueControl, RequestQueueHandler, ResponseRouter};
pub use request::{Endpoint, Method, RestRequest, ResultKind};
pub use store::{RequestStore, SqliteRequestStore};

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, watch, Notify};

use crate::error::Result;

/// Channel half that receives the outcome of a dispatched request.
pub type Responder = oneshot::Sender<Result<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
  Pending,
  Ready,
  Abandoned,
}

/// A request sitting in the queue.
pub(crate) struct QueuedRequest {
  pub(crate) id: u64,
  pub(crate) request: RestRequest,
  gate: watch::Receiver<Gate>,
  responder: Mutex<Option<Responder>>,
}

impl QueuedRequest {
  /// Wait until the owner armed or abandoned this entry.
  pub(crate) async fn wait_ready(&self) -> Gate {
    let mut gate = self.gate.clone();
    let state = match gate.wait_for(|g| *g != Gate::Pending).await {
      Ok(g) => *g,
      Err(_) => Gate::Abandoned,
    };
    state
  }

  pub(crate) fn take_responder(&self) -> Option<Responder> {
    self
      .responder
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take()
  }
}

/// A reserved queue slot whose gate is still closed.
///
/// Dropping it without calling [`PendingRequest::arm`] abandons the slot.
pub struct PendingRequest {
  entry: Arc<QueuedRequest>,
  gate: Option<watch::Sender<Gate>>,
}

impl PendingRequest {
  pub fn id(&self) -> u64 {
    self.entry.id
  }

  /// Attach the responder (if any) and open the gate.
  pub fn arm(mut self, responder: Option<Responder>) {
    *self
      .entry
      .responder
      .lock()
      .unwrap_or_else(PoisonError::into_inner) = responder;
    if let Some(gate) = self.gate.take() {
      let _ = gate.send(Gate::Ready);
    }
  }
}

impl Drop for PendingRequest {
  fn drop(&mut self) {
    if let Some(gate) = self.gate.take() {
      let _ = gate.send(Gate::Abandoned);
    }
  }
}

/// Thread-safe FIFO of pending requests.
pub struct RequestQueue {
  entries: Mutex<VecDeque<Arc<QueuedRequest>>>,
  available: Notify,
  next_id: AtomicU64,
}

impl RequestQueue {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(VecDeque::new()),
      available: Notify::new(),
      next_id: AtomicU64::new(1),
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Arc<QueuedRequest>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Append a request with a closed gate.
  pub fn reserve(&self, request: RestRequest) -> PendingRequest {
    let (tx, rx) = watch::channel(Gate::Pending);
    let entry = Arc::new(QueuedRequest {
      id: self.next_id.fetch_add(1, Ordering::Relaxed),
      request,
      gate: rx,
      responder: Mutex::new(None),
    });

    self.lock().push_back(Arc::clone(&entry));
    self.available.notify_one();

    PendingRequest {
      entry,
      gate: Some(tx),
    }
  }

  /// Append a ready request that has no waiting caller.
  ///
  /// Its result is routed through the handler's [`ResponseRouter`].
  pub fn enqueue(&self, request: RestRequest) -> u64 {
    let pending = self.reserve(request);
    let id = pending.id();
    pending.arm(None);
    id
  }

  /// Append many ready requests in order, e.g. when restoring persisted work.
  pub fn enqueue_all(&self, requests: impl IntoIterator<Item = RestRequest>) -> usize {
    requests
      .into_iter()
      .map(|request| self.enqueue(request))
      .count()
  }

  /// Copy of the pending requests in dispatch order. Nothing is removed.
  pub fn snapshot(&self) -> Vec<RestRequest> {
    self.lock().iter().map(|e| e.request.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Head of the queue without removing it, waiting while the queue is empty.
  pub(crate) async fn front(&self) -> Arc<QueuedRequest> {
    loop {
      let notified = self.available.notified();
      let head = self.lock().front().cloned();
      if let Some(entry) = head {
        return entry;
      }
      notified.await;
    }
  }

  /// Remove the entry with this id, wherever it sits.
  pub(crate) fn remove(&self, id: u64) -> Option<Arc<QueuedRequest>> {
    let mut entries = self.lock();
    let index = entries.iter().position(|e| e.id == id)?;
    entries.remove(index)
  }
}

impl Default for RequestQueue {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trello::EntityKind;

  fn get(path: &str) -> RestRequest {
    RestRequest::new(Method::Get, Endpoint::from(path), ResultKind::Entity(EntityKind::Card))
  }

  #[test]
  fn test_snapshot_preserves_order_without_removing() {
    let queue = RequestQueue::new();
    queue.enqueue(get("cards/a"));
    queue.enqueue(get("cards/b"));
    queue.enqueue(get("cards/c"));

    let paths: Vec<String> = queue.snapshot().iter().map(|r| r.endpoint.path()).collect();
    assert_eq!(paths, ["cards/a", "cards/b", "cards/c"]);
    assert_eq!(queue.len(), 3);
  }

  #[test]
  fn test_enqueue_all_counts() {
    let queue = RequestQueue::new();
    assert_eq!(queue.enqueue_all(vec![get("cards/a"), get("cards/b")]), 2);
    assert_eq!(queue.len(), 2);
  }

  #[test]
  fn test_remove_by_id() {
    let queue = RequestQueue::new();
    let first = queue.enqueue(get("cards/a"));
    queue.enqueue(get("cards/b"));

    assert!(queue.remove(first).is_some());
    assert!(queue.remove(first).is_none());
    assert_eq!(queue.snapshot()[0].endpoint.path(), "cards/b");
  }

  #[tokio::test]
  async fn test_gate_opens_when_armed() {
    let queue = RequestQueue::new();
    let pending = queue.reserve(get("cards/a"));
    let entry = queue.front().await;

    let waiter = tokio::spawn(async move { entry.wait_ready().await });
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    pending.arm(None);
    assert_eq!(waiter.await.unwrap(), Gate::Ready);
  }

  #[tokio::test]
  async fn test_dropped_slot_is_abandoned() {
    let queue = RequestQueue::new();
    let pending = queue.reserve(get("cards/a"));
    let entry = queue.front().await;

    drop(pending);
    assert_eq!(entry.wait_ready().await, Gate::Abandoned);
  }

  #[tokio::test]
  async fn test_front_waits_for_enqueue() {
    let queue = Arc::new(RequestQueue::new());
    let waiter = {
      let queue = Arc::clone(&queue);
      tokio::spawn(async move { queue.front().await.request.endpoint.path() })
    };
    tokio::task::yield_now().await;

    queue.enqueue(get("cards/late"));
    assert_eq!(waiter.await.unwrap(), "cards/late");
  }
}
