//! Trello-specific layer: entity kinds, endpoints, the HTTP transport, the
//! session object and the typed entities.

pub mod client;
pub mod endpoint;
pub mod entities;
pub mod service;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sync::PropertyTable;

pub use client::TrelloClient;
pub use endpoint::{EndpointFactory, Operation};
pub use entities::{Action, Board, Card, Checklist, Entity, List, Member, Organization};
pub use service::TrelloService;

/// The kinds of remote objects this crate mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Action,
  Board,
  Card,
  Checklist,
  List,
  Member,
  Organization,
}

impl EntityKind {
  pub const ALL: [EntityKind; 7] = [
    EntityKind::Action,
    EntityKind::Board,
    EntityKind::Card,
    EntityKind::Checklist,
    EntityKind::List,
    EntityKind::Member,
    EntityKind::Organization,
  ];

  /// REST collection name (`cards`, `boards`, ...).
  pub fn resource(self) -> &'static str {
    match self {
      EntityKind::Action => "actions",
      EntityKind::Board => "boards",
      EntityKind::Card => "cards",
      EntityKind::Checklist => "checklists",
      EntityKind::List => "lists",
      EntityKind::Member => "members",
      EntityKind::Organization => "organizations",
    }
  }

  pub fn from_resource(resource: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.resource() == resource)
  }

  pub fn properties(self) -> &'static PropertyTable {
    match self {
      EntityKind::Action => &entities::action::PROPERTIES,
      EntityKind::Board => &entities::board::PROPERTIES,
      EntityKind::Card => &entities::card::PROPERTIES,
      EntityKind::Checklist => &entities::checklist::PROPERTIES,
      EntityKind::List => &entities::list::PROPERTIES,
      EntityKind::Member => &entities::member::PROPERTIES,
      EntityKind::Organization => &entities::organization::PROPERTIES,
    }
  }

  /// Members are accounts and lists can only be archived; the API offers
  /// no way to delete either.
  pub fn supports_delete(self) -> bool {
    !matches!(self, EntityKind::Member | EntityKind::List)
  }

  fn as_str(self) -> &'static str {
    match self {
      EntityKind::Action => "action",
      EntityKind::Board => "board",
      EntityKind::Card => "card",
      EntityKind::Checklist => "checklist",
      EntityKind::List => "list",
      EntityKind::Member => "member",
      EntityKind::Organization => "organization",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resource_round_trip() {
    for kind in EntityKind::ALL {
      assert_eq!(EntityKind::from_resource(kind.resource()), Some(kind));
      assert_eq!(kind.properties().kind(), kind);
    }
    assert_eq!(EntityKind::from_resource("tokens"), None);
  }

  #[test]
  fn test_display_is_lowercase() {
    assert_eq!(EntityKind::Organization.to_string(), "organization");
    assert_eq!(
      serde_json::to_string(&EntityKind::Checklist).unwrap(),
      "\"checklist\""
    );
  }
}
