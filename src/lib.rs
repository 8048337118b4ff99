//! Trello client library with lazily synchronized, cached entities.
//!
//! Entities are handles onto shared synchronization contexts. Reading a
//! property refreshes the context when its snapshot is stale; writing stages
//! the value locally and submits it through a paced request queue.
//!
//! ```no_run
//! # async fn demo() -> trello_sync::Result<()> {
//! use std::sync::Arc;
//! use trello_sync::{SyncSettings, TrelloClient, TrelloService};
//!
//! let client = TrelloClient::new("app-key", Some("user-token".to_string()))?;
//! let service = TrelloService::new(Arc::new(client), SyncSettings::default());
//!
//! let card = service.card("5f1a2b3c4d5e6f7a8b9c0d1e");
//! if let Some(name) = card.name().await? {
//!   card.set_name(&name.to_uppercase()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod queue;
pub mod sync;
pub mod transport;
pub mod trello;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use sync::{Field, SyncContext, SyncSettings};
pub use transport::{JsonSerializer, Serializer, Transport};
pub use trello::{
  Action, Board, Card, Checklist, Entity, EntityKind, List, Member, Organization, TrelloClient,
  TrelloService,
};
