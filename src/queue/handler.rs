//! Background worker that drains the request queue.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::{Gate, QueuedRequest, RequestQueue, ResultKind};
use crate::error::Result;
use crate::transport::Transport;

/// Receives payloads of requests that have no waiting caller.
///
/// Restored requests are the typical case: their results still need to land
/// in the entity cache.
pub trait ResponseRouter: Send + Sync {
  fn apply_json(&self, result: ResultKind, payload: &Value) -> Result<()>;
}

/// Whether the handler may dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueControl {
  /// Cleared by `hold_requests`, set by `resume`.
  pub active: bool,
  /// Connectivity as reported by the embedding application.
  pub connected: bool,
}

impl QueueControl {
  fn dispatchable(&self) -> bool {
    self.active && self.connected
  }
}

/// Counters for requests that went through the handler.
#[derive(Debug, Default)]
pub struct HandlerStats {
  dispatched: AtomicU64,
  completed: AtomicU64,
  failed: AtomicU64,
  abandoned: AtomicU64,
}

impl HandlerStats {
  pub fn dispatched(&self) -> u64 {
    self.dispatched.load(Ordering::SeqCst)
  }

  pub fn completed(&self) -> u64 {
    self.completed.load(Ordering::SeqCst)
  }

  pub fn failed(&self) -> u64 {
    self.failed.load(Ordering::SeqCst)
  }

  pub fn abandoned(&self) -> u64 {
    self.abandoned.load(Ordering::SeqCst)
  }
}

#[derive(Default)]
struct Shared {
  stats: HandlerStats,
  in_flight: AtomicUsize,
  idle: Notify,
}

/// Handle to the dispatch task. Dropping it stops dispatch; queued requests
/// stay in the queue.
pub struct RequestQueueHandler {
  queue: Arc<RequestQueue>,
  control: watch::Sender<QueueControl>,
  shared: Arc<Shared>,
  task: JoinHandle<()>,
}

impl RequestQueueHandler {
  /// Spawn the dispatch loop on the current tokio runtime.
  ///
  /// `interval` is the minimum spacing between two dispatches.
  pub fn spawn(
    queue: Arc<RequestQueue>,
    transport: Arc<dyn Transport>,
    router: Arc<dyn ResponseRouter>,
    interval: Duration,
  ) -> Self {
    let (control, control_rx) = watch::channel(QueueControl {
      active: true,
      connected: true,
    });
    let shared = Arc::new(Shared::default());

    let worker = Worker {
      queue: Arc::clone(&queue),
      transport,
      router,
      control: control_rx,
      interval,
      last_dispatch: None,
      shared: Arc::clone(&shared),
    };
    let task = tokio::spawn(worker.run());

    Self {
      queue,
      control,
      shared,
      task,
    }
  }

  /// Stop dispatching new requests. In-flight requests are not cancelled.
  pub fn hold_requests(&self) {
    self.control.send_modify(|c| c.active = false);
  }

  /// Resume dispatch of everything still queued.
  pub fn resume(&self) {
    self.control.send_modify(|c| c.active = true);
  }

  pub fn set_connected(&self, connected: bool) {
    self.control.send_modify(|c| c.connected = connected);
  }

  pub fn is_active(&self) -> bool {
    self.control.borrow().active
  }

  pub fn is_connected(&self) -> bool {
    self.control.borrow().connected
  }

  pub fn stats(&self) -> &HandlerStats {
    &self.shared.stats
  }

  pub fn in_flight(&self) -> usize {
    self.shared.in_flight.load(Ordering::SeqCst)
  }

  /// Wait until the queue is empty and nothing is in flight.
  ///
  /// Never returns while dispatch is held and requests are queued.
  pub async fn wait_idle(&self) {
    loop {
      let notified = self.shared.idle.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      if self.queue.is_empty() && self.in_flight() == 0 {
        return;
      }
      notified.await;
    }
  }

  /// Wait until no dispatched request is still running. Queued requests are
  /// not waited for, so this returns while dispatch is held.
  pub async fn wait_in_flight(&self) {
    loop {
      let notified = self.shared.idle.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      if self.in_flight() == 0 {
        return;
      }
      notified.await;
    }
  }
}

impl Drop for RequestQueueHandler {
  fn drop(&mut self) {
    self.task.abort();
  }
}

struct Worker {
  queue: Arc<RequestQueue>,
  transport: Arc<dyn Transport>,
  router: Arc<dyn ResponseRouter>,
  control: watch::Receiver<QueueControl>,
  interval: Duration,
  last_dispatch: Option<Instant>,
  shared: Arc<Shared>,
}

impl Worker {
  async fn run(mut self) {
    loop {
      if self
        .control
        .wait_for(QueueControl::dispatchable)
        .await
        .is_err()
      {
        break;
      }

      let entry = self.queue.front().await;
      if entry.wait_ready().await != Gate::Ready {
        self.queue.remove(entry.id);
        self.shared.stats.abandoned.fetch_add(1, Ordering::SeqCst);
        debug!(id = entry.id, request = %entry.request, "skipping abandoned request");
        self.shared.idle.notify_waiters();
        continue;
      }

      if let Some(last) = self.last_dispatch {
        tokio::time::sleep_until(last + self.interval).await;
      }

      // Paused while we were waiting on the gate or the pacing interval.
      if !self.control.borrow().dispatchable() {
        continue;
      }

      self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
      match self.queue.remove(entry.id) {
        Some(entry) => self.dispatch(entry),
        None => {
          self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
      }
    }
  }

  fn dispatch(&mut self, entry: Arc<QueuedRequest>) {
    self.last_dispatch = Some(Instant::now());
    self.shared.stats.dispatched.fetch_add(1, Ordering::SeqCst);
    debug!(id = entry.id, request = %entry.request, "dispatching");

    let call = self.transport.execute(&entry.request);
    let router = Arc::clone(&self.router);
    let shared = Arc::clone(&self.shared);

    tokio::spawn(async move {
      let result = call.await;
      complete(&entry, result, router.as_ref(), &shared.stats);
      shared.in_flight.fetch_sub(1, Ordering::SeqCst);
      shared.idle.notify_waiters();
    });
  }
}

fn complete(
  entry: &QueuedRequest,
  result: Result<Value>,
  router: &dyn ResponseRouter,
  stats: &HandlerStats,
) {
  match &result {
    Ok(_) => stats.completed.fetch_add(1, Ordering::SeqCst),
    Err(e) => {
      debug!(id = entry.id, request = %entry.request, error = %e, "request failed");
      stats.failed.fetch_add(1, Ordering::SeqCst)
    }
  };

  if let Some(responder) = entry.take_responder() {
    if responder.send(result).is_err() {
      warn!(id = entry.id, request = %entry.request, "caller dropped before the response arrived");
    }
    return;
  }

  match result {
    Ok(payload) => {
      if let Err(e) = router.apply_json(entry.request.result, &payload) {
        error!(request = %entry.request, error = %e, "failed to apply response");
      }
    }
    Err(e) => {
      error!(request = %entry.request, error = %e, "request without a caller failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::queue::{Endpoint, Method, RestRequest};
  use crate::testing::MockTransport;
  use crate::trello::EntityKind;
  use serde_json::json;
  use std::sync::Mutex;
  use tokio::sync::oneshot;

  #[derive(Default)]
  struct RecordingRouter {
    applied: Mutex<Vec<(ResultKind, Value)>>,
  }

  impl ResponseRouter for RecordingRouter {
    fn apply_json(&self, result: ResultKind, payload: &Value) -> Result<()> {
      self.applied.lock().unwrap().push((result, payload.clone()));
      Ok(())
    }
  }

  fn get(path: &str) -> RestRequest {
    RestRequest::new(Method::Get, Endpoint::from(path), ResultKind::Entity(EntityKind::Card))
  }

  fn setup(mock: &MockTransport) -> (Arc<RequestQueue>, Arc<RecordingRouter>, RequestQueueHandler) {
    let queue = Arc::new(RequestQueue::new());
    let router = Arc::new(RecordingRouter::default());
    let handler = RequestQueueHandler::spawn(
      Arc::clone(&queue),
      Arc::new(mock.clone()),
      router.clone(),
      Duration::ZERO,
    );
    (queue, router, handler)
  }

  #[tokio::test]
  async fn test_dispatches_in_enqueue_order() {
    let mock = MockTransport::new();
    for id in ["a", "b", "c"] {
      mock.on(Method::Get, &format!("cards/{}", id), json!({"id": id}));
    }
    let (queue, _router, handler) = setup(&mock);

    queue.enqueue(get("cards/a"));
    queue.enqueue(get("cards/b"));
    queue.enqueue(get("cards/c"));
    handler.wait_idle().await;

    assert_eq!(mock.paths(), ["GET cards/a", "GET cards/b", "GET cards/c"]);
  }

  #[tokio::test]
  async fn test_hold_and_resume_loses_nothing() {
    let mock = MockTransport::new();
    let (queue, router, handler) = setup(&mock);

    handler.hold_requests();
    tokio::task::yield_now().await;
    for id in ["a", "b", "c"] {
      mock.on(Method::Get, &format!("cards/{}", id), json!({"id": id}));
      queue.enqueue(get(&format!("cards/{}", id)));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(mock.calls().is_empty());
    assert_eq!(queue.len(), 3);

    handler.resume();
    handler.wait_idle().await;

    assert_eq!(mock.paths(), ["GET cards/a", "GET cards/b", "GET cards/c"]);
    assert_eq!(router.applied.lock().unwrap().len(), 3);
    assert_eq!(handler.stats().dispatched(), 3);
  }

  #[tokio::test]
  async fn test_disconnected_holds_dispatch() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "cards/a", json!({"id": "a"}));
    let (queue, _router, handler) = setup(&mock);

    handler.set_connected(false);
    tokio::task::yield_now().await;
    queue.enqueue(get("cards/a"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(mock.calls().is_empty());

    handler.set_connected(true);
    handler.wait_idle().await;
    assert_eq!(mock.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_responder_receives_result_instead_of_router() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "cards/a", json!({"id": "a", "name": "Card"}));
    let (queue, router, _handler) = setup(&mock);

    let (tx, rx) = oneshot::channel();
    queue.reserve(get("cards/a")).arm(Some(tx));

    let payload = rx.await.unwrap().unwrap();
    assert_eq!(payload["name"], json!("Card"));
    assert!(router.applied.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_failure_reaches_caller() {
    let mock = MockTransport::new();
    mock.fail(Method::Get, "cards/a", 500);
    let (queue, _router, handler) = setup(&mock);

    let (tx, rx) = oneshot::channel();
    queue.reserve(get("cards/a")).arm(Some(tx));

    let err = rx.await.unwrap().unwrap_err();
    assert!(matches!(err, crate::Error::Transport { status: 500, .. }));
    handler.wait_idle().await;
    assert_eq!(handler.stats().failed(), 1);
  }

  #[tokio::test]
  async fn test_unarmed_head_blocks_until_armed() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "cards/a", json!({"id": "a"}));
    mock.on(Method::Get, "cards/b", json!({"id": "b"}));
    let (queue, _router, handler) = setup(&mock);

    let first = queue.reserve(get("cards/a"));
    queue.enqueue(get("cards/b"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(mock.calls().is_empty());

    first.arm(None);
    handler.wait_idle().await;
    assert_eq!(mock.paths(), ["GET cards/a", "GET cards/b"]);
  }

  #[tokio::test]
  async fn test_abandoned_slot_is_skipped() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "cards/b", json!({"id": "b"}));
    let (queue, _router, handler) = setup(&mock);

    drop(queue.reserve(get("cards/a")));
    queue.enqueue(get("cards/b"));
    handler.wait_idle().await;

    assert_eq!(mock.paths(), ["GET cards/b"]);
    assert_eq!(handler.stats().abandoned(), 1);
  }

  #[tokio::test]
  async fn test_pacing_spaces_dispatches() {
    let mock = MockTransport::new();
    let queue = Arc::new(RequestQueue::new());
    let handler = RequestQueueHandler::spawn(
      Arc::clone(&queue),
      Arc::new(mock.clone()),
      Arc::new(RecordingRouter::default()),
      Duration::from_millis(25),
    );

    let started = std::time::Instant::now();
    for id in ["a", "b", "c"] {
      mock.on(Method::Get, &format!("cards/{}", id), json!({"id": id}));
      queue.enqueue(get(&format!("cards/{}", id)));
    }
    handler.wait_idle().await;

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(mock.calls().len(), 3);
  }

  #[tokio::test]
  async fn test_wait_in_flight_ignores_held_queue() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "cards/a", json!({"id": "a"}));
    mock.on(Method::Get, "cards/b", json!({"id": "b"}));
    mock.set_delay(Duration::from_millis(40));
    let (queue, router, handler) = setup(&mock);

    queue.enqueue(get("cards/a"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handler.in_flight(), 1);

    handler.hold_requests();
    queue.enqueue(get("cards/b"));
    handler.wait_in_flight().await;

    assert_eq!(handler.in_flight(), 0);
    assert_eq!(router.applied.lock().unwrap().len(), 1);
    assert_eq!(queue.len(), 1);
    assert_eq!(mock.paths(), ["GET cards/a"]);
  }
}
