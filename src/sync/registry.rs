//! Registry of live entity contexts.
//!
//! Maps (kind, remote id) to the one context representing that remote
//! object. Entries are weak: the registry never keeps an entity alive, and
//! entries whose context was dropped are pruned as they are encountered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use super::context::SyncContext;
use crate::trello::EntityKind;

type Key = (EntityKind, String);

/// Map size below which dead entries are never pruned.
const PRUNE_FLOOR: usize = 64;

/// Process-local, explicitly owned entity registry.
pub struct EntityCache {
  entries: RwLock<HashMap<Key, Weak<SyncContext>>>,
  prune_at: AtomicUsize,
}

impl Default for EntityCache {
  fn default() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
      prune_at: AtomicUsize::new(PRUNE_FLOOR),
    }
  }
}

impl EntityCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> RwLockReadGuard<'_, HashMap<Key, Weak<SyncContext>>> {
    self.entries.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, HashMap<Key, Weak<SyncContext>>> {
    self.entries.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// The live context for this remote object, if any.
  pub fn get(&self, kind: EntityKind, id: &str) -> Option<Arc<SyncContext>> {
    self.read().get(&(kind, id.to_string()))?.upgrade()
  }

  /// First live context of `kind` matching the predicate.
  pub fn find<P>(&self, kind: EntityKind, predicate: P) -> Option<Arc<SyncContext>>
  where
    P: Fn(&SyncContext) -> bool,
  {
    scan(&self.read(), kind, &predicate)
  }

  /// Return the context matching `predicate`, constructing and registering
  /// one with `factory` if none exists.
  ///
  /// Construction happens outside the lock, so racing callers may each run
  /// the factory, but registration is re-checked under the write lock and all
  /// callers get the same instance back.
  pub fn find_or_add<P, F>(&self, kind: EntityKind, predicate: P, factory: F) -> Arc<SyncContext>
  where
    P: Fn(&SyncContext) -> bool,
    F: FnOnce() -> Arc<SyncContext>,
  {
    if let Some(found) = self.find(kind, &predicate) {
      return found;
    }

    let created = factory();
    let key = (created.kind(), created.id().to_string());

    let mut entries = self.write();
    if let Some(existing) = entries.get(&key).and_then(Weak::upgrade) {
      return existing;
    }
    if let Some(existing) = scan(&entries, kind, &predicate) {
      return existing;
    }
    self.register(&mut entries, key, &created);
    created
  }

  /// Find by remote id, constructing on a miss. Lookups go through the key
  /// and never scan.
  pub fn find_or_add_by_id<F>(&self, kind: EntityKind, id: &str, factory: F) -> Arc<SyncContext>
  where
    F: FnOnce() -> Arc<SyncContext>,
  {
    let key = (kind, id.to_string());
    if let Some(found) = self.read().get(&key).and_then(Weak::upgrade) {
      return found;
    }

    let created = factory();

    let mut entries = self.write();
    if let Some(existing) = entries.get(&key).and_then(Weak::upgrade) {
      return existing;
    }
    self.register(&mut entries, key, &created);
    created
  }

  /// Insert under the write lock. Dead entries are pruned only once the map
  /// has doubled since the last prune, so inserts stay amortized O(1).
  fn register(
    &self,
    entries: &mut HashMap<Key, Weak<SyncContext>>,
    key: Key,
    context: &Arc<SyncContext>,
  ) {
    if entries.len() >= self.prune_at.load(Ordering::Relaxed) {
      entries.retain(|_, weak| weak.strong_count() > 0);
      self
        .prune_at
        .store((entries.len() * 2).max(PRUNE_FLOOR), Ordering::Relaxed);
    }
    entries.insert(key, Arc::downgrade(context));
  }

  /// Register a context, replacing any entry for the same remote object.
  pub fn add(&self, context: &Arc<SyncContext>) {
    self.write().insert(
      (context.kind(), context.id().to_string()),
      Arc::downgrade(context),
    );
  }

  /// Unregister a context. Returns false if a different (or no) context is
  /// registered under its key.
  pub fn remove(&self, context: &SyncContext) -> bool {
    let key = (context.kind(), context.id().to_string());
    let mut entries = self.write();
    match entries.get(&key) {
      Some(weak) if std::ptr::eq(weak.as_ptr(), context) => {
        entries.remove(&key);
        true
      }
      _ => false,
    }
  }

  /// Number of live entries.
  pub fn len(&self) -> usize {
    self
      .read()
      .values()
      .filter(|weak| weak.strong_count() > 0)
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self.write().clear();
  }
}

fn scan<P>(
  entries: &HashMap<Key, Weak<SyncContext>>,
  kind: EntityKind,
  predicate: &P,
) -> Option<Arc<SyncContext>>
where
  P: Fn(&SyncContext) -> bool,
{
  entries
    .iter()
    .filter(|((k, _), _)| *k == kind)
    .filter_map(|(_, weak)| weak.upgrade())
    .find(|ctx| predicate(ctx))
}
