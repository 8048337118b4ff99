//! Generic synchronization core.
//!
//! This module is Trello-agnostic apart from the entity kind used as a cache
//! key. It provides:
//! - [`SyncContext`]: snapshot ownership, TTL, dirty tracking and the
//!   refresh/merge/submit protocol
//! - [`Field`]: typed property access bound to a context
//! - [`PropertyTable`]: static per-kind property metadata
//! - [`EntityCache`]: one live representative per remote object

mod context;
mod field;
mod pipeline;
mod property;
mod registry;
mod rules;

pub use context::SyncContext;
pub use field::Field;
pub use pipeline::SyncSettings;
pub use property::{PropertyDef, PropertyTable};
pub use registry::EntityCache;
pub use rules::{validate, Rule};

pub(crate) use pipeline::{CacheRouter, Pipeline};
