//! Endpoint construction for the Trello REST API.
//!
//! Everything here is pure: operations map to endpoints and requests without
//! touching the network or any session state.

use serde_json::Value;

use super::EntityKind;
use crate::queue::{Endpoint, Method, RestRequest, ResultKind};

/// What a request does to (or around) an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
  Read { id: &'a str },
  Update { id: &'a str },
  Delete { id: &'a str },
  Create,
  /// Collection of `child` entities hanging off `id` (`boards/{id}/lists`).
  Children { id: &'a str, child: EntityKind },
  /// Comment actions on a card.
  Comments { id: &'a str },
  /// Items of a checklist. They are not entities of their own.
  CheckItems { id: &'a str },
  /// The member owning the token.
  Me,
}

pub struct EndpointFactory;

impl EndpointFactory {
  pub fn build(kind: EntityKind, operation: Operation<'_>) -> Endpoint {
    let resource = kind.resource();
    match operation {
      Operation::Read { id } | Operation::Update { id } | Operation::Delete { id } => {
        Endpoint::new([resource, id])
      }
      Operation::Create => Endpoint::new([resource]),
      Operation::Children { id, child } => Endpoint::new([resource, id, child.resource()]),
      Operation::Comments { id } => Endpoint::new([resource, id, "actions", "comments"]),
      Operation::CheckItems { id } => Endpoint::new([resource, id, "checkItems"]),
      Operation::Me => Endpoint::new([EntityKind::Member.resource(), "me"]),
    }
  }
}

/// Fetch the full entity.
pub fn read(kind: EntityKind, id: &str) -> RestRequest {
  RestRequest::new(
    Method::Get,
    EndpointFactory::build(kind, Operation::Read { id }),
    ResultKind::Entity(kind),
  )
  .with_param("fields", "all")
}

/// Write properties; `body` is keyed by submit keys.
pub fn update(kind: EntityKind, id: &str, body: Value) -> RestRequest {
  RestRequest::new(
    Method::Put,
    EndpointFactory::build(kind, Operation::Update { id }),
    ResultKind::Entity(kind),
  )
  .with_body(body)
}

pub fn delete(kind: EntityKind, id: &str) -> RestRequest {
  RestRequest::new(
    Method::Delete,
    EndpointFactory::build(kind, Operation::Delete { id }),
    ResultKind::None,
  )
}

pub fn create(kind: EntityKind, body: Value) -> RestRequest {
  RestRequest::new(
    Method::Post,
    EndpointFactory::build(kind, Operation::Create),
    ResultKind::Entity(kind),
  )
  .with_body(body)
}

pub fn children(kind: EntityKind, id: &str, child: EntityKind) -> RestRequest {
  RestRequest::new(
    Method::Get,
    EndpointFactory::build(kind, Operation::Children { id, child }),
    ResultKind::List(child),
  )
}

pub fn comment(card_id: &str, text: &str) -> RestRequest {
  RestRequest::new(
    Method::Post,
    EndpointFactory::build(EntityKind::Card, Operation::Comments { id: card_id }),
    ResultKind::Entity(EntityKind::Action),
  )
  .with_body(serde_json::json!({ "text": text }))
}

/// Add an item to a checklist. The answer is the bare item, which has no
/// context of its own to land in.
pub fn check_item(checklist_id: &str, name: &str) -> RestRequest {
  RestRequest::new(
    Method::Post,
    EndpointFactory::build(EntityKind::Checklist, Operation::CheckItems { id: checklist_id }),
    ResultKind::None,
  )
  .with_body(serde_json::json!({ "name": name }))
}

pub fn me() -> RestRequest {
  RestRequest::new(
    Method::Get,
    EndpointFactory::build(EntityKind::Member, Operation::Me),
    ResultKind::Entity(EntityKind::Member),
  )
}
