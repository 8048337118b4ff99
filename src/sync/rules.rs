//! Validation rules attached to writable properties.
//!
//! Rules are plain predicates over the JSON value about to be staged. They
//! compose by listing: a write is accepted only if every rule accepts it.
//! Apart from [`Rule::NotNull`], rules accept `null` so that optional
//! properties can still be cleared.

use serde_json::Value;

use crate::error::{Error, Result};

/// A single validation predicate.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
  /// Value must not be null.
  NotNull,
  /// Value must be a well-formed absolute URI.
  Uri,
  /// Value must be one of the listed strings.
  OneOf(&'static [&'static str]),
  /// String value must not exceed this many characters.
  MaxLength(usize),
  /// Numeric value must fall within `min..=max`.
  Range { min: f64, max: f64 },
  /// Arbitrary check returning a reason on rejection.
  Custom(fn(&Value) -> std::result::Result<(), String>),
}

impl Rule {
  /// Check a value, returning the rejection reason if it fails.
  pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
    if value.is_null() {
      return match self {
        Rule::NotNull => Err("must not be null".to_string()),
        Rule::Custom(check) => check(value),
        _ => Ok(()),
      };
    }

    match self {
      Rule::NotNull => Ok(()),
      Rule::Uri => {
        let s = value.as_str().ok_or("must be a string")?;
        url::Url::parse(s)
          .map(|_| ())
          .map_err(|e| format!("'{}' is not a valid URI: {}", s, e))
      }
      Rule::OneOf(allowed) => {
        let s = value.as_str().ok_or("must be a string")?;
        if allowed.contains(&s) {
          Ok(())
        } else {
          Err(format!("'{}' is not one of: {}", s, allowed.join(", ")))
        }
      }
      Rule::MaxLength(max) => {
        let s = value.as_str().ok_or("must be a string")?;
        let len = s.chars().count();
        if len <= *max {
          Ok(())
        } else {
          Err(format!("length {} exceeds {}", len, max))
        }
      }
      Rule::Range { min, max } => {
        let n = value.as_f64().ok_or("must be a number")?;
        if (*min..=*max).contains(&n) {
          Ok(())
        } else {
          Err(format!("{} is outside {}..={}", n, min, max))
        }
      }
      Rule::Custom(check) => check(value),
    }
  }
}

/// Run every rule against `value`, failing on the first rejection.
pub fn validate<'a>(
  property: &str,
  rules: impl IntoIterator<Item = &'a Rule>,
  value: &Value,
) -> Result<()> {
  for rule in rules {
    rule
      .check(value)
      .map_err(|reason| Error::validation(property, reason))?;
  }
  Ok(())
}
