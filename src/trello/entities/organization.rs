use std::sync::Arc;

use super::{Board, Entity, Member};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::EntityKind;

/// Short name, unique across Trello.
pub static NAME: PropertyDef = PropertyDef::new("name", &["name"]).rules(&[Rule::NotNull]);
pub static DISPLAY_NAME: PropertyDef =
  PropertyDef::new("displayName", &["displayName"]).rules(&[Rule::NotNull]);
pub static DESCRIPTION: PropertyDef =
  PropertyDef::new("description", &["desc"]).rules(&[Rule::MaxLength(16384)]);
pub static WEBSITE: PropertyDef = PropertyDef::new("website", &["website"]).rules(&[Rule::Uri]);
pub static URL: PropertyDef = PropertyDef::new("url", &["url"]).read_only();

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::Organization,
  &[&NAME, &DISPLAY_NAME, &DESCRIPTION, &WEBSITE, &URL],
);

/// A workspace grouping boards and members.
#[derive(Debug, Clone)]
pub struct Organization {
  context: Arc<SyncContext>,
}

impl Entity for Organization {
  const KIND: EntityKind = EntityKind::Organization;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl Organization {
  pub async fn name(&self) -> Result<Option<String>> {
    super::field(self, &NAME).get().await
  }

  pub async fn display_name(&self) -> Result<Option<String>> {
    super::field(self, &DISPLAY_NAME).get().await
  }

  pub async fn set_display_name(&self, name: &str) -> Result<()> {
    super::field::<_, String>(self, &DISPLAY_NAME)
      .set(name.to_string())
      .await
  }

  pub async fn description(&self) -> Result<Option<String>> {
    super::field(self, &DESCRIPTION).get().await
  }

  pub async fn set_description(&self, description: Option<String>) -> Result<()> {
    super::field::<_, String>(self, &DESCRIPTION)
      .set(description)
      .await
  }

  pub async fn website(&self) -> Result<Option<String>> {
    super::field(self, &WEBSITE).get().await
  }

  pub async fn set_website(&self, website: Option<String>) -> Result<()> {
    super::field::<_, String>(self, &WEBSITE).set(website).await
  }

  pub async fn url(&self) -> Result<Option<String>> {
    super::field(self, &URL).get().await
  }

  pub async fn boards(&self) -> Result<Vec<Board>> {
    super::children(self).await
  }

  pub async fn members(&self) -> Result<Vec<Member>> {
    super::children(self).await
  }

  pub async fn delete(&self) -> Result<()> {
    super::delete(self).await
  }
}
