use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;

use super::{Action, Board, Checklist, Entity, List, Member};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::{endpoint, EntityKind};

pub static NAME: PropertyDef =
  PropertyDef::new("name", &["name"]).rules(&[Rule::NotNull, Rule::MaxLength(16384)]);
pub static DESCRIPTION: PropertyDef =
  PropertyDef::new("description", &["desc"]).rules(&[Rule::MaxLength(16384)]);
pub static CLOSED: PropertyDef = PropertyDef::new("closed", &["closed"]).rules(&[Rule::NotNull]);
pub static LIST_ID: PropertyDef = PropertyDef::new("idList", &["idList"]).rules(&[Rule::NotNull]);
pub static BOARD_ID: PropertyDef = PropertyDef::new("idBoard", &["idBoard"]).rules(&[Rule::NotNull]);
pub static POSITION: PropertyDef = PropertyDef::new("pos", &["pos"]);
pub static VOTES: PropertyDef = PropertyDef::new("votes", &["badges", "votes"]).read_only();
pub static COMMENTS: PropertyDef = PropertyDef::new("comments", &["badges", "comments"]).read_only();
pub static URL: PropertyDef = PropertyDef::new("url", &["url"]).read_only();
pub static SHORT_URL: PropertyDef = PropertyDef::new("shortUrl", &["shortUrl"]).read_only();
pub static DUE: PropertyDef = PropertyDef::new("due", &["due"]);
pub static LAST_ACTIVITY: PropertyDef =
  PropertyDef::new("dateLastActivity", &["dateLastActivity"]).read_only();

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::Card,
  &[
    &NAME,
    &DESCRIPTION,
    &CLOSED,
    &LIST_ID,
    &BOARD_ID,
    &POSITION,
    &VOTES,
    &COMMENTS,
    &URL,
    &SHORT_URL,
    &DUE,
    &LAST_ACTIVITY,
  ],
);

/// A card on a list.
#[derive(Debug, Clone)]
pub struct Card {
  context: Arc<SyncContext>,
}

impl Entity for Card {
  const KIND: EntityKind = EntityKind::Card;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl Card {
  pub async fn name(&self) -> Result<Option<String>> {
    super::field(self, &NAME).get().await
  }

  pub async fn set_name(&self, name: &str) -> Result<()> {
    super::field::<_, String>(self, &NAME).set(name.to_string()).await
  }

  pub async fn description(&self) -> Result<Option<String>> {
    super::field(self, &DESCRIPTION).get().await
  }

  pub async fn set_description(&self, description: Option<String>) -> Result<()> {
    super::field::<_, String>(self, &DESCRIPTION).set(description).await
  }

  /// Archived cards are closed.
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

  pub async fn due(&self) -> Result<Option<DateTime<Utc>>> {
    super::field(self, &DUE).get().await
  }

  pub async fn set_due(&self, due: Option<DateTime<Utc>>) -> Result<()> {
    super::field::<_, DateTime<Utc>>(self, &DUE).set(due).await
  }

  pub async fn votes(&self) -> Result<Option<u32>> {
    super::field(self, &VOTES).get().await
  }

  pub async fn comment_count(&self) -> Result<Option<u32>> {
    super::field(self, &COMMENTS).get().await
  }

  pub async fn url(&self) -> Result<Option<String>> {
    super::field(self, &URL).get().await
  }

  pub async fn short_url(&self) -> Result<Option<String>> {
    super::field(self, &SHORT_URL).get().await
  }

  pub async fn last_activity(&self) -> Result<Option<DateTime<Utc>>> {
    super::field(self, &LAST_ACTIVITY).get().await
  }

  pub async fn list(&self) -> Result<Option<List>> {
    super::related(self, &LIST_ID).await
  }

  pub async fn board(&self) -> Result<Option<Board>> {
    super::related(self, &BOARD_ID).await
  }

  /// Move the card to another list.
  pub async fn move_to(&self, list: &List) -> Result<()> {
    super::field::<_, String>(self, &LIST_ID).set(list.id().to_string()).await
  }

  pub async fn checklists(&self) -> Result<Vec<Checklist>> {
    super::children(self).await
  }

  pub async fn members(&self) -> Result<Vec<Member>> {
    super::children(self).await
  }

  pub async fn actions(&self) -> Result<Vec<Action>> {
    super::children(self).await
  }

  pub async fn add_checklist(&self, name: &str) -> Result<Checklist> {
    super::create(
      self.context.pipeline(),
      json!({ "idCard": self.id(), "name": name }),
    )
    .await
  }

  /// Post a comment; the server answers with the comment action.
  pub async fn add_comment(&self, text: &str) -> Result<Action> {
    let pipeline = self.context.pipeline();
    let payload = pipeline.execute(endpoint::comment(self.id(), text)).await?;
    Ok(Action::from_context(pipeline.adopt(EntityKind::Action, payload)?))
  }

  pub async fn delete(&self) -> Result<()> {
    super::delete(self).await
  }
}
