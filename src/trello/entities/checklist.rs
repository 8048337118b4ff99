use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{Board, Card, Entity};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::{endpoint, EntityKind};

pub static NAME: PropertyDef =
  PropertyDef::new("name", &["name"]).rules(&[Rule::NotNull, Rule::MaxLength(16384)]);
pub static CARD_ID: PropertyDef = PropertyDef::new("idCard", &["idCard"]).rules(&[Rule::NotNull]);
pub static BOARD_ID: PropertyDef = PropertyDef::new("idBoard", &["idBoard"]).read_only();
pub static POSITION: PropertyDef = PropertyDef::new("pos", &["pos"]);
pub static CHECK_ITEMS: PropertyDef = PropertyDef::new("checkItems", &["checkItems"]).read_only();

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::Checklist,
  &[&NAME, &CARD_ID, &BOARD_ID, &POSITION, &CHECK_ITEMS],
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
  Complete,
  Incomplete,
}

/// One line of a checklist, embedded in the checklist's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckItem {
  pub id: String,
  pub name: String,
  pub state: CheckState,
  #[serde(default)]
  pub pos: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Checklist {
  context: Arc<SyncContext>,
}

impl Entity for Checklist {
  const KIND: EntityKind = EntityKind::Checklist;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl Checklist {
  pub async fn name(&self) -> Result<Option<String>> {
    super::field(self, &NAME).get().await
  }

  pub async fn set_name(&self, name: &str) -> Result<()> {
    super::field::<_, String>(self, &NAME).set(name.to_string()).await
  }

  pub async fn position(&self) -> Result<Option<f64>> {
    super::field(self, &POSITION).get().await
  }

  pub async fn set_position(&self, position: f64) -> Result<()> {
    super::field::<_, f64>(self, &POSITION).set(position).await
  }

  pub async fn items(&self) -> Result<Vec<CheckItem>> {
    let items: Option<Vec<CheckItem>> = super::field(self, &CHECK_ITEMS).get().await?;
    Ok(items.unwrap_or_default())
  }

  /// Add an item. The checklist is expired so the next read picks it up.
  pub async fn add_item(&self, name: &str) -> Result<()> {
    self
      .context
      .pipeline()
      .execute(endpoint::check_item(self.id(), name))
      .await?;
    self.context.expire();
    Ok(())
  }

  pub async fn card(&self) -> Result<Option<Card>> {
    super::related(self, &CARD_ID).await
  }

  pub async fn board(&self) -> Result<Option<Board>> {
    super::related(self, &BOARD_ID).await
  }

  pub async fn delete(&self) -> Result<()> {
    super::delete(self).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::queue::Method;
  use crate::testing::{self, MockTransport};
  use serde_json::json;

  #[tokio::test]
  async fn test_items_parse_embedded_array() {
    let mock = MockTransport::new();
    mock.on(
      Method::Get,
      "checklists/k1",
      json!({
        "id": "k1",
        "name": "Release",
        "checkItems": [
          {"id": "i1", "name": "Tag", "state": "complete", "pos": 1.0},
          {"id": "i2", "name": "Publish", "state": "incomplete"},
        ],
      }),
    );
    let service = testing::service(&mock);

    let items = service.checklist("k1").items().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].state, CheckState::Complete);
    assert_eq!(items[1].pos, None);
  }

  #[tokio::test]
  async fn test_add_item_expires_checklist() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "checklists/k1", json!({"id": "k1", "checkItems": []}));
    mock.on(
      Method::Post,
      "checklists/k1/checkItems",
      json!({"id": "i1", "name": "Tag", "state": "incomplete"}),
    );
    let service = testing::service(&mock);
    let checklist = service.checklist("k1");

    assert!(checklist.items().await.unwrap().is_empty());
    checklist.add_item("Tag").await.unwrap();

    mock.on(
      Method::Get,
      "checklists/k1",
      json!({"id": "k1", "checkItems": [{"id": "i1", "name": "Tag", "state": "incomplete"}]}),
    );
    assert_eq!(checklist.items().await.unwrap().len(), 1);
    assert_eq!(mock.count(Method::Get, "checklists/k1"), 2);
  }

  #[tokio::test]
  async fn test_deleted_checklist_leaves_cache() {
    let mock = MockTransport::new();
    let service = testing::service(&mock);
    let checklist = service.checklist("k1");

    checklist.delete().await.unwrap();
    assert!(checklist.is_deleted());
    assert!(service.cache().get(EntityKind::Checklist, "k1").is_none());
    assert_eq!(mock.paths(), ["DELETE checklists/k1"]);
  }
}
