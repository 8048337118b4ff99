use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{Action, Card, Entity, List, Member, Organization};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::EntityKind;

pub static NAME: PropertyDef =
  PropertyDef::new("name", &["name"]).rules(&[Rule::NotNull, Rule::MaxLength(16384)]);
pub static DESCRIPTION: PropertyDef =
  PropertyDef::new("description", &["desc"]).rules(&[Rule::MaxLength(16384)]);
pub static CLOSED: PropertyDef = PropertyDef::new("closed", &["closed"]).rules(&[Rule::NotNull]);
pub static ORGANIZATION_ID: PropertyDef = PropertyDef::new("idOrganization", &["idOrganization"]);
pub static PERMISSION_LEVEL: PropertyDef =
  PropertyDef::new("permissionLevel", &["prefs", "permissionLevel"])
    .rules(&[Rule::NotNull, Rule::OneOf(&["private", "org", "public"])]);
pub static BACKGROUND: PropertyDef = PropertyDef::new("background", &["prefs", "background"]);
pub static URL: PropertyDef = PropertyDef::new("url", &["url"]).read_only();
pub static SHORT_URL: PropertyDef = PropertyDef::new("shortUrl", &["shortUrl"]).read_only();
pub static LAST_ACTIVITY: PropertyDef =
  PropertyDef::new("dateLastActivity", &["dateLastActivity"]).read_only();

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::Board,
  &[
    &NAME,
    &DESCRIPTION,
    &CLOSED,
    &ORGANIZATION_ID,
    &PERMISSION_LEVEL,
    &BACKGROUND,
    &URL,
    &SHORT_URL,
    &LAST_ACTIVITY,
  ],
);

/// Who can see a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
  Private,
  Org,
  Public,
}

#[derive(Debug, Clone)]
pub struct Board {
  context: Arc<SyncContext>,
}

impl Entity for Board {
  const KIND: EntityKind = EntityKind::Board;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl Board {
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

  pub async fn is_closed(&self) -> Result<Option<bool>> {
    super::field(self, &CLOSED).get().await
  }

  pub async fn set_closed(&self, closed: bool) -> Result<()> {
    super::field::<_, bool>(self, &CLOSED).set(closed).await
  }

  pub async fn permission_level(&self) -> Result<Option<PermissionLevel>> {
    super::field(self, &PERMISSION_LEVEL).get().await
  }

  pub async fn set_permission_level(&self, level: PermissionLevel) -> Result<()> {
    super::field::<_, PermissionLevel>(self, &PERMISSION_LEVEL)
      .set(level)
      .await
  }

  /// Background color name or image id.
  pub async fn background(&self) -> Result<Option<String>> {
    super::field(self, &BACKGROUND).get().await
  }

  pub async fn set_background(&self, background: &str) -> Result<()> {
    super::field::<_, String>(self, &BACKGROUND)
      .set(background.to_string())
      .await
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

  pub async fn organization(&self) -> Result<Option<Organization>> {
    super::related(self, &ORGANIZATION_ID).await
  }

  pub async fn lists(&self) -> Result<Vec<List>> {
    super::children(self).await
  }

  pub async fn cards(&self) -> Result<Vec<Card>> {
    super::children(self).await
  }

  pub async fn members(&self) -> Result<Vec<Member>> {
    super::children(self).await
  }

  pub async fn actions(&self) -> Result<Vec<Action>> {
    super::children(self).await
  }

  pub async fn add_list(&self, name: &str) -> Result<List> {
    super::create(
      self.context.pipeline(),
      json!({ "idBoard": self.id(), "name": name }),
    )
    .await
  }

  pub async fn delete(&self) -> Result<()> {
    super::delete(self).await
  }
}
