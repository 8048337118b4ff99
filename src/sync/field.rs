//! Typed, lazily synchronized property slot.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use super::context::SyncContext;
use super::property::PropertyDef;
use super::rules::{self, Rule};
use crate::error::Result;

/// A typed view over one property of a context's snapshot.
///
/// Reads always go through the context's current snapshot; nothing is cached
/// in the field itself.
pub struct Field<T> {
  context: Arc<SyncContext>,
  property: &'static PropertyDef,
  rules: Vec<Rule>,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
  pub(crate) fn new(context: Arc<SyncContext>, property: &'static PropertyDef) -> Self {
    debug_assert!(context.properties().contains(property));
    Self {
      context,
      property,
      rules: Vec::new(),
      _marker: PhantomData,
    }
  }

  /// Attach an extra rule to this field instance, on top of the table's.
  pub fn with_rule(mut self, rule: Rule) -> Self {
    self.rules.push(rule);
    self
  }

  pub fn name(&self) -> &'static str {
    self.property.name()
  }

  pub fn is_dirty(&self) -> bool {
    self.context.is_dirty(self.property.name())
  }
}

impl<T> Field<T>
where
  T: Serialize + DeserializeOwned,
{
  /// Refresh the owning context if stale, then read the value.
  ///
  /// A remote object that does not exist reads as `None`.
  pub async fn get(&self) -> Result<Option<T>> {
    match self.context.synchronize().await {
      Ok(()) => {}
      Err(err) if err.is_not_found() => return Ok(None),
      Err(err) => return Err(err),
    }
    self.peek()
  }

  /// Read the value from the current snapshot without synchronizing.
  pub fn peek(&self) -> Result<Option<T>> {
    let value = self.context.value(self.property);
    Ok(value.map(serde_json::from_value).transpose()?)
  }

  /// Validate and write the value locally, marking the property dirty.
  ///
  /// A rejected value leaves the snapshot and the dirty set untouched.
  pub fn stage(&self, value: impl Into<Option<T>>) -> Result<()> {
    let json = match value.into() {
      Some(v) => serde_json::to_value(v)?,
      None => Value::Null,
    };

    rules::validate(
      self.property.name(),
      self.property.validation_rules().iter().chain(&self.rules),
      &json,
    )?;
    debug!(property = self.property.name(), "staging value");
    self.context.stage(self.property, json)
  }

  /// Stage the value and submit the context's dirty properties.
  pub async fn set(&self, value: impl Into<Option<T>>) -> Result<()> {
    self.stage(value)?;
    self.context.submit_data().await
  }
}
