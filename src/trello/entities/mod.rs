//! Typed façades over synchronization contexts.
//!
//! An entity is a cheap handle: an `Arc` of its context. Two handles for the
//! same remote object share one context, so a write through one is visible
//! through the other.

pub mod action;
pub mod board;
pub mod card;
pub mod checklist;
pub mod list;
pub mod member;
pub mod organization;

pub use action::Action;
pub use board::Board;
pub use card::Card;
pub use checklist::{CheckItem, Checklist};
pub use list::List;
pub use member::Member;
pub use organization::Organization;

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{endpoint, EntityKind};
use crate::error::{Error, Result};
use crate::queue::ResultKind;
use crate::sync::{Field, Pipeline, PropertyDef, SyncContext};

pub trait Entity: Sized {
  const KIND: EntityKind;

  fn from_context(context: Arc<SyncContext>) -> Self;

  fn context(&self) -> &Arc<SyncContext>;

  fn id(&self) -> &str {
    self.context().id()
  }

  /// Whether both handles share one context.
  fn same_as(&self, other: &Self) -> bool {
    Arc::ptr_eq(self.context(), other.context())
  }

  /// Refresh from the server if the snapshot is stale.
  fn refresh(&self) -> BoxFuture<'_, Result<()>> {
    Box::pin(self.context().synchronize())
  }

  fn expire(&self) {
    self.context().expire();
  }

  fn is_deleted(&self) -> bool {
    self.context().is_deleted()
  }

  fn subscribe(&self) -> broadcast::Receiver<Vec<&'static str>> {
    self.context().subscribe()
  }

  /// Dynamic access to a property by name.
  fn field<T>(&self, name: &str) -> Result<Field<T>> {
    let property = Self::KIND
      .properties()
      .get(name)
      .ok_or_else(|| Error::UnknownProperty {
        kind: Self::KIND,
        property: name.to_string(),
      })?;
    Ok(Field::new(Arc::clone(self.context()), property))
  }
}

pub(crate) fn field<E: Entity, T>(entity: &E, property: &'static PropertyDef) -> Field<T> {
  Field::new(Arc::clone(entity.context()), property)
}

/// Resolve an id-valued property into the entity it points at.
pub(crate) async fn related<E: Entity, R: Entity>(
  entity: &E,
  property: &'static PropertyDef,
) -> Result<Option<R>> {
  let id: Option<String> = field(entity, property).get().await?;
  let pipeline = entity.context().pipeline();
  Ok(id.map(|id| R::from_context(pipeline.context(R::KIND, &id))))
}

/// Fetch a child collection, merging every element into the cache.
pub(crate) async fn children<E: Entity, C: Entity>(entity: &E) -> Result<Vec<C>> {
  let pipeline = entity.context().pipeline();
  let request = endpoint::children(E::KIND, entity.id(), C::KIND);
  let payload = pipeline.execute(request).await?;
  Ok(
    pipeline
      .apply_payload(ResultKind::List(C::KIND), &payload)?
      .into_iter()
      .map(C::from_context)
      .collect(),
  )
}

/// POST a new entity and adopt the server's answer.
pub(crate) async fn create<C: Entity>(pipeline: &Arc<Pipeline>, body: Value) -> Result<C> {
  let payload = pipeline.execute(endpoint::create(C::KIND, body)).await?;
  Ok(C::from_context(pipeline.adopt(C::KIND, payload)?))
}

pub(crate) async fn delete<E: Entity>(entity: &E) -> Result<()> {
  entity.context().delete().await
}
