use serde_json::json;
use std::sync::Arc;

use super::{Board, Card, Entity};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::EntityKind;

pub static NAME: PropertyDef =
  PropertyDef::new("name", &["name"]).rules(&[Rule::NotNull, Rule::MaxLength(16384)]);
pub static CLOSED: PropertyDef = PropertyDef::new("closed", &["closed"]).rules(&[Rule::NotNull]);
pub static BOARD_ID: PropertyDef = PropertyDef::new("idBoard", &["idBoard"]).rules(&[Rule::NotNull]);
pub static POSITION: PropertyDef = PropertyDef::new("pos", &["pos"]);
pub static SUBSCRIBED: PropertyDef = PropertyDef::new("subscribed", &["subscribed"]);

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::List,
  &[&NAME, &CLOSED, &BOARD_ID, &POSITION, &SUBSCRIBED],
);

/// A column of cards on a board. Lists are archived, never deleted.
#[derive(Debug, Clone)]
pub struct List {
  context: Arc<SyncContext>,
}

impl Entity for List {
  const KIND: EntityKind = EntityKind::List;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl List {
  pub async fn name(&self) -> Result<Option<String>> {
    super::field(self, &NAME).get().await
  }

  pub async fn set_name(&self, name: &str) -> Result<()> {
    super::field::<_, String>(self, &NAME).set(name.to_string()).await
  }

  pub async fn is_closed(&self) -> Result<Option<bool>> {
    super::field(self, &CLOSED).get().await
  }

  pub async fn set_closed(&self, closed: bool) -> Result<()> {
    super::field::<_, bool>(self, &CLOSED).set(closed).await
  }

  pub async fn position(&self) -> Result<Option<f64>> {
    super::field(self, &POSITION).get().await
  }

  pub async fn set_position(&self, position: f64) -> Result<()> {
    super::field::<_, f64>(self, &POSITION).set(position).await
  }

  pub async fn is_subscribed(&self) -> Result<Option<bool>> {
    super::field(self, &SUBSCRIBED).get().await
  }

  pub async fn set_subscribed(&self, subscribed: bool) -> Result<()> {
    super::field::<_, bool>(self, &SUBSCRIBED).set(subscribed).await
  }

  pub async fn board(&self) -> Result<Option<Board>> {
    super::related(self, &BOARD_ID).await
  }

  /// Move the list to another board.
  pub async fn move_to(&self, board: &Board) -> Result<()> {
    super::field::<_, String>(self, &BOARD_ID)
      .set(board.id().to_string())
      .await
  }

  pub async fn cards(&self) -> Result<Vec<Card>> {
    super::children(self).await
  }

  pub async fn add_card(&self, name: &str) -> Result<Card> {
    super::create(
      self.context.pipeline(),
      json!({ "idList": self.id(), "name": name }),
    )
    .await
  }
}
