//! Static per-kind property tables.
//!
//! Every entity kind declares one [`PropertyTable`] listing its properties in
//! order. A [`PropertyDef`] names a property, locates it inside the snapshot by
//! a JSON path, and carries its validation rules. The getter/setter pair is
//! derived from the path, so the tables are plain `static` data shared by all
//! instances of a kind.

use serde_json::{Map, Value};

use super::rules::Rule;
use crate::trello::EntityKind;

/// Descriptor for one synchronized property.
#[derive(Debug)]
pub struct PropertyDef {
  name: &'static str,
  path: &'static [&'static str],
  submit_key: Option<&'static str>,
  rules: &'static [Rule],
  read_only: bool,
  live_only: bool,
}

impl PropertyDef {
  pub const fn new(name: &'static str, path: &'static [&'static str]) -> Self {
    Self {
      name,
      path,
      submit_key: None,
      rules: &[],
      read_only: false,
      live_only: false,
    }
  }

  /// Server-managed: reads work, writes are rejected.
  pub const fn read_only(mut self) -> Self {
    self.read_only = true;
    self
  }

  /// Reads as `None` once the entity has been deleted.
  pub const fn live_only(mut self) -> Self {
    self.live_only = true;
    self
  }

  pub const fn rules(mut self, rules: &'static [Rule]) -> Self {
    self.rules = rules;
    self
  }

  /// Parameter name used when submitting, if it differs from the path.
  pub const fn submit_as(mut self, key: &'static str) -> Self {
    self.submit_key = Some(key);
    self
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn path(&self) -> &'static [&'static str] {
    self.path
  }

  pub fn validation_rules(&self) -> &'static [Rule] {
    self.rules
  }

  pub fn is_read_only(&self) -> bool {
    self.read_only
  }

  pub fn is_live_only(&self) -> bool {
    self.live_only
  }

  /// Key under which the property is written back to the API.
  ///
  /// Nested paths are joined with `/`, matching Trello's `prefs/background`
  /// parameter convention.
  pub fn submit_key(&self) -> String {
    match self.submit_key {
      Some(key) => key.to_string(),
      None => self.path.join("/"),
    }
  }

  /// Project the property out of a snapshot.
  pub fn get<'a>(&self, snapshot: &'a Map<String, Value>) -> Option<&'a Value> {
    let (first, rest) = self.path.split_first()?;
    let mut current = snapshot.get(*first)?;
    for segment in rest {
      current = current.as_object()?.get(*segment)?;
    }
    Some(current)
  }

  /// Write the property into a snapshot, creating intermediate objects.
  pub fn set(&self, snapshot: &mut Map<String, Value>, value: Value) {
    let Some((last, parents)) = self.path.split_last() else {
      return;
    };

    let mut current = snapshot;
    for segment in parents {
      let entry = current
        .entry(segment.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
      if !entry.is_object() {
        *entry = Value::Object(Map::new());
      }
      current = match entry {
        Value::Object(map) => map,
        _ => return,
      };
    }
    current.insert(last.to_string(), value);
  }
}

/// Ordered list of the properties of one entity kind.
#[derive(Debug)]
pub struct PropertyTable {
  kind: EntityKind,
  properties: &'static [&'static PropertyDef],
}

impl PropertyTable {
  pub const fn new(kind: EntityKind, properties: &'static [&'static PropertyDef]) -> Self {
    Self { kind, properties }
  }

  pub fn kind(&self) -> EntityKind {
    self.kind
  }

  /// Look up a property by name.
  pub fn get(&self, name: &str) -> Option<&'static PropertyDef> {
    self.properties.iter().copied().find(|p| p.name == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &'static PropertyDef> + '_ {
    self.properties.iter().copied()
  }

  pub fn contains(&self, property: &PropertyDef) -> bool {
    self.properties.iter().any(|p| std::ptr::eq(*p, property))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  static NAME: PropertyDef = PropertyDef::new("name", &["name"]).rules(&[Rule::NotNull]);
  static BACKGROUND: PropertyDef = PropertyDef::new("background", &["prefs", "background"]);
  static URL: PropertyDef = PropertyDef::new("url", &["url"]).read_only();
  static TABLE: PropertyTable = PropertyTable::new(EntityKind::Board, &[&NAME, &BACKGROUND, &URL]);

  fn snapshot(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => Map::new(),
    }
  }

  #[test]
  fn test_get_nested_path() {
    let snap = snapshot(json!({"name": "Roadmap", "prefs": {"background": "blue"}}));
    assert_eq!(NAME.get(&snap), Some(&json!("Roadmap")));
    assert_eq!(BACKGROUND.get(&snap), Some(&json!("blue")));
    assert_eq!(URL.get(&snap), None);
  }

  #[test]
  fn test_set_creates_intermediate_objects() {
    let mut snap = Map::new();
    BACKGROUND.set(&mut snap, json!("green"));
    assert_eq!(Value::Object(snap), json!({"prefs": {"background": "green"}}));
  }

  #[test]
  fn test_set_keeps_sibling_keys() {
    let mut snap = snapshot(json!({"prefs": {"background": "blue", "cardAging": "regular"}}));
    BACKGROUND.set(&mut snap, json!("red"));
    assert_eq!(
      Value::Object(snap),
      json!({"prefs": {"background": "red", "cardAging": "regular"}})
    );
  }

  #[test]
  fn test_submit_key() {
    assert_eq!(NAME.submit_key(), "name");
    assert_eq!(BACKGROUND.submit_key(), "prefs/background");
    let text = PropertyDef::new("text", &["data", "text"]).submit_as("text");
    assert_eq!(text.submit_key(), "text");
  }

  #[test]
  fn test_table_lookup() {
    assert_eq!(TABLE.kind(), EntityKind::Board);
    assert!(TABLE.get("url").is_some_and(|p| p.is_read_only()));
    assert!(TABLE.get("missing").is_none());
    assert!(TABLE.contains(&NAME));
    assert_eq!(TABLE.iter().count(), 3);
  }
}
