use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{Board, Card, Entity, Member};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::EntityKind;

/// `commentCard`, `updateCard`, `createList`...
pub static TYPE: PropertyDef = PropertyDef::new("type", &["type"]).read_only().live_only();
pub static MEMBER_CREATOR_ID: PropertyDef = PropertyDef::new("idMemberCreator", &["idMemberCreator"])
  .read_only()
  .live_only();
pub static DATE: PropertyDef = PropertyDef::new("date", &["date"]).read_only();
/// Comment text; the API takes it as a top-level `text` parameter.
pub static TEXT: PropertyDef = PropertyDef::new("text", &["data", "text"])
  .submit_as("text")
  .rules(&[Rule::NotNull, Rule::MaxLength(16384)]);
pub static CARD_ID: PropertyDef = PropertyDef::new("idCard", &["data", "card", "id"]).read_only();
pub static BOARD_ID: PropertyDef = PropertyDef::new("idBoard", &["data", "board", "id"]).read_only();

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::Action,
  &[&TYPE, &MEMBER_CREATOR_ID, &DATE, &TEXT, &CARD_ID, &BOARD_ID],
);

/// Something that happened on a board. Actions usually arrive embedded in
/// other responses and are adopted from those payloads.
#[derive(Debug, Clone)]
pub struct Action {
  context: Arc<SyncContext>,
}

impl Entity for Action {
  const KIND: EntityKind = EntityKind::Action;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl Action {
  /// `None` once the action has been deleted.
  pub async fn action_type(&self) -> Result<Option<String>> {
    super::field(self, &TYPE).get().await
  }

  /// `None` once the action has been deleted.
  pub async fn member_creator(&self) -> Result<Option<Member>> {
    super::related(self, &MEMBER_CREATOR_ID).await
  }

  pub async fn date(&self) -> Result<Option<DateTime<Utc>>> {
    super::field(self, &DATE).get().await
  }

  pub async fn text(&self) -> Result<Option<String>> {
    super::field(self, &TEXT).get().await
  }

  /// Edit a comment.
  pub async fn set_text(&self, text: &str) -> Result<()> {
    super::field::<_, String>(self, &TEXT).set(text.to_string()).await
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
  use crate::testing::{self, MockTransport};
  use serde_json::json;

  fn comment() -> serde_json::Value {
    json!({
      "id": "a1",
      "type": "commentCard",
      "idMemberCreator": "m1",
      "date": "2026-02-10T08:30:00.000Z",
      "data": {
        "text": "First!",
        "card": {"id": "c1", "name": "Card"},
        "board": {"id": "b1", "name": "Board"},
      },
    })
  }

  #[tokio::test]
  async fn test_adopted_action_reads_without_fetch() {
    let mock = MockTransport::new();
    let service = testing::service(&mock);
    let action: Action = service.adopt(comment()).unwrap();

    assert_eq!(action.action_type().await.unwrap().as_deref(), Some("commentCard"));
    assert_eq!(action.text().await.unwrap().as_deref(), Some("First!"));
    assert_eq!(action.card().await.unwrap().unwrap().id(), "c1");
    assert_eq!(
      action.member_creator().await.unwrap().map(|m| m.id().to_string()),
      Some("m1".to_string())
    );
    assert!(mock.calls().is_empty());
  }

  #[tokio::test]
  async fn test_edit_comment_submits_text_parameter() {
    let mock = MockTransport::new();
    let service = testing::service(&mock);
    let action: Action = service.adopt(comment()).unwrap();

    action.set_text("Edited").await.unwrap();
    assert_eq!(mock.calls()[0].body, Some(json!({"text": "Edited"})));
    assert_eq!(action.text().await.unwrap().as_deref(), Some("Edited"));
  }

  #[tokio::test]
  async fn test_deleted_action_short_circuits_live_properties() {
    let mock = MockTransport::new();
    let service = testing::service(&mock);
    let action: Action = service.adopt(comment()).unwrap();

    action.delete().await.unwrap();

    assert_eq!(action.action_type().await.unwrap(), None);
    assert!(action.member_creator().await.unwrap().is_none());
    // Historical data stays readable
    assert_eq!(action.text().await.unwrap().as_deref(), Some("First!"));
    assert_eq!(mock.paths(), ["DELETE actions/a1"]);
  }
}
