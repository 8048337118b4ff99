//! Session object tying the synchronization core to a transport.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::entities::{Action, Board, Card, Checklist, Entity, List, Member, Organization};
use super::endpoint;
use crate::error::Result;
use crate::queue::{RequestQueue, RequestQueueHandler, RequestStore};
use crate::sync::{CacheRouter, EntityCache, Pipeline, SyncSettings};
use crate::transport::Transport;

/// A Trello session.
///
/// Owns the entity cache, the request queue and the handler draining it.
/// Cloning is cheap and shares everything; the handler stops once the last
/// clone is dropped.
#[derive(Clone)]
pub struct TrelloService {
  pipeline: Arc<Pipeline>,
  handler: Arc<RequestQueueHandler>,
}

impl TrelloService {
  /// Start a session. Must be called from within a tokio runtime.
  pub fn new(transport: Arc<dyn Transport>, settings: SyncSettings) -> Self {
    let interval = settings.request_interval;
    let queue = Arc::new(RequestQueue::new());
    let pipeline = Pipeline::new(Arc::clone(&queue), settings);
    let router = Arc::new(CacheRouter::new(&pipeline));
    let handler = RequestQueueHandler::spawn(queue, transport, router, interval);

    Self {
      pipeline,
      handler: Arc::new(handler),
    }
  }

  /// Handle for the entity with this id. Nothing is fetched until a property
  /// is read.
  pub fn get<E: Entity>(&self, id: &str) -> E {
    E::from_context(self.pipeline.context(E::KIND, id))
  }

  /// Handle built from a payload obtained elsewhere (a webhook, a nested
  /// response). The payload is merged into the cached context.
  pub fn adopt<E: Entity>(&self, payload: Value) -> Result<E> {
    Ok(E::from_context(self.pipeline.adopt(E::KIND, payload)?))
  }

  pub fn action(&self, id: &str) -> Action {
    self.get(id)
  }

  pub fn board(&self, id: &str) -> Board {
    self.get(id)
  }

  pub fn card(&self, id: &str) -> Card {
    self.get(id)
  }

  pub fn checklist(&self, id: &str) -> Checklist {
    self.get(id)
  }

  pub fn list(&self, id: &str) -> List {
    self.get(id)
  }

  pub fn member(&self, id: &str) -> Member {
    self.get(id)
  }

  pub fn organization(&self, id: &str) -> Organization {
    self.get(id)
  }

  /// The member owning the token.
  pub async fn me(&self) -> Result<Member> {
    let payload = self.pipeline.execute(endpoint::me()).await?;
    self.adopt(payload)
  }

  pub async fn create_board(&self, name: &str) -> Result<Board> {
    super::entities::create(&self.pipeline, json!({ "name": name })).await
  }

  pub fn is_read_only(&self) -> bool {
    self.pipeline.settings().read_only
  }

  pub fn settings(&self) -> &SyncSettings {
    self.pipeline.settings()
  }

  pub fn cache(&self) -> &EntityCache {
    self.pipeline.cache()
  }

  pub fn queue(&self) -> &Arc<RequestQueue> {
    self.pipeline.queue()
  }

  pub fn handler(&self) -> &RequestQueueHandler {
    &self.handler
  }

  #[cfg(test)]
  pub(crate) fn pipeline(&self) -> &Arc<Pipeline> {
    &self.pipeline
  }

  /// Stop dispatching. Requests keep queuing up.
  pub fn hold_requests(&self) {
    self.handler.hold_requests();
  }

  pub fn resume(&self) {
    self.handler.resume();
  }

  pub fn set_connected(&self, connected: bool) {
    self.handler.set_connected(connected);
  }

  /// Wait until the queue is drained and nothing is in flight.
  pub async fn wait_idle(&self) {
    self.handler.wait_idle().await;
  }

  /// Wait for dispatched requests to finish, leaving queued ones alone.
  pub async fn wait_in_flight(&self) {
    self.handler.wait_in_flight().await;
  }

  /// Save queued requests so another process can replay them.
  pub fn persist_pending(&self, store: &dyn RequestStore) -> Result<usize> {
    let pending = self.queue().snapshot();
    store.save(&pending)?;
    if !pending.is_empty() {
      info!(count = pending.len(), "persisted pending requests");
    }
    Ok(pending.len())
  }

  /// Queue previously persisted requests and empty the store. Their results
  /// are merged into the cache as they complete.
  pub fn restore_pending(&self, store: &dyn RequestStore) -> Result<usize> {
    let requests = store.load()?;
    let count = self.queue().enqueue_all(requests);
    store.clear()?;
    if count > 0 {
      info!(count, "restored pending requests");
    }
    Ok(count)
  }
}
