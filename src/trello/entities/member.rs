use std::sync::Arc;

use super::{Board, Entity, Organization};
use crate::error::Result;
use crate::sync::{PropertyDef, PropertyTable, Rule, SyncContext};
use crate::trello::EntityKind;

pub static FULL_NAME: PropertyDef =
  PropertyDef::new("fullName", &["fullName"]).rules(&[Rule::NotNull, Rule::MaxLength(512)]);
pub static USERNAME: PropertyDef = PropertyDef::new("username", &["username"]).rules(&[Rule::NotNull]);
pub static INITIALS: PropertyDef =
  PropertyDef::new("initials", &["initials"]).rules(&[Rule::MaxLength(4)]);
pub static BIO: PropertyDef = PropertyDef::new("bio", &["bio"]).rules(&[Rule::MaxLength(16384)]);
pub static AVATAR_URL: PropertyDef = PropertyDef::new("avatarUrl", &["avatarUrl"])
  .read_only()
  .rules(&[Rule::Uri]);
pub static URL: PropertyDef = PropertyDef::new("url", &["url"]).read_only();
pub static MEMBER_TYPE: PropertyDef = PropertyDef::new("memberType", &["memberType"]).read_only();

pub static PROPERTIES: PropertyTable = PropertyTable::new(
  EntityKind::Member,
  &[
    &FULL_NAME,
    &USERNAME,
    &INITIALS,
    &BIO,
    &AVATAR_URL,
    &URL,
    &MEMBER_TYPE,
  ],
);

/// A Trello account.
#[derive(Debug, Clone)]
pub struct Member {
  context: Arc<SyncContext>,
}

impl Entity for Member {
  const KIND: EntityKind = EntityKind::Member;

  fn from_context(context: Arc<SyncContext>) -> Self {
    Self { context }
  }

  fn context(&self) -> &Arc<SyncContext> {
    &self.context
  }
}

impl Member {
  pub async fn full_name(&self) -> Result<Option<String>> {
    super::field(self, &FULL_NAME).get().await
  }

  pub async fn set_full_name(&self, name: &str) -> Result<()> {
    super::field::<_, String>(self, &FULL_NAME)
      .set(name.to_string())
      .await
  }

  pub async fn username(&self) -> Result<Option<String>> {
    super::field(self, &USERNAME).get().await
  }

  pub async fn initials(&self) -> Result<Option<String>> {
    super::field(self, &INITIALS).get().await
  }

  pub async fn set_initials(&self, initials: &str) -> Result<()> {
    super::field::<_, String>(self, &INITIALS)
      .set(initials.to_string())
      .await
  }

  pub async fn bio(&self) -> Result<Option<String>> {
    super::field(self, &BIO).get().await
  }

  pub async fn set_bio(&self, bio: Option<String>) -> Result<()> {
    super::field::<_, String>(self, &BIO).set(bio).await
  }

  pub async fn avatar_url(&self) -> Result<Option<String>> {
    super::field(self, &AVATAR_URL).get().await
  }

  pub async fn url(&self) -> Result<Option<String>> {
    super::field(self, &URL).get().await
  }

  /// `normal`, `admin`, `ghost`...
  pub async fn member_type(&self) -> Result<Option<String>> {
    super::field(self, &MEMBER_TYPE).get().await
  }

  pub async fn boards(&self) -> Result<Vec<Board>> {
    super::children(self).await
  }

  pub async fn organizations(&self) -> Result<Vec<Organization>> {
    super::children(self).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::queue::Method;
  use crate::testing::{self, MockTransport};
  use crate::Error;
  use serde_json::json;

  #[tokio::test]
  async fn test_initials_length_rule() {
    let mock = MockTransport::new();
    let service = testing::service(&mock);
    let member = service.member("m1");

    assert!(matches!(
      member.set_initials("ABCDE").await,
      Err(Error::Validation { .. })
    ));
    member.set_initials("AB").await.unwrap();
    assert_eq!(mock.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_boards_of_member() {
    let mock = MockTransport::new();
    mock.on(
      Method::Get,
      "members/m1/boards",
      json!([{"id": "b1", "name": "Roadmap"}, {"id": "b2", "name": "Ops"}]),
    );
    let service = testing::service(&mock);

    let boards = service.member("m1").boards().await.unwrap();
    let ids: Vec<&str> = boards.iter().map(|b| b.id()).collect();
    assert_eq!(ids, ["b1", "b2"]);
  }
}
