//! Persistence for pending requests.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::request::{Endpoint, Method, RestRequest, ResultKind};
use crate::error::Result;

/// Trait for pending-request storage backends.
pub trait RequestStore: Send + Sync {
  /// Replace the stored requests with these, in order.
  fn save(&self, requests: &[RestRequest]) -> Result<()>;

  /// Stored requests in their original order.
  fn load(&self) -> Result<Vec<RestRequest>>;

  fn clear(&self) -> Result<()>;
}

/// SQLite-based request storage.
pub struct SqliteRequestStore {
  conn: Mutex<Connection>,
}

impl SqliteRequestStore {
  /// Open (or create) the store at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    Self::from_connection(Connection::open(path)?)
  }

  /// Open a store that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  /// Default location under the user's data directory.
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("trello-sync").join("queue.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn.execute_batch(QUEUE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Schema for the pending request table.
const QUEUE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_requests (
    position INTEGER PRIMARY KEY,
    method TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    parameters TEXT NOT NULL,
    body TEXT,
    result TEXT NOT NULL,
    queued_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl RequestStore for SqliteRequestStore {
  fn save(&self, requests: &[RestRequest]) -> Result<()> {
    let mut conn = self.lock();
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM pending_requests", [])?;
    for (position, request) in requests.iter().enumerate() {
      let parameters = serde_json::to_string(&request.parameters)?;
      let body = request
        .body
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
      let result = serde_json::to_string(&request.result)?;

      tx.execute(
        "INSERT INTO pending_requests (position, method, endpoint, parameters, body, result)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
          position as i64,
          request.method.as_str(),
          request.endpoint.path(),
          parameters,
          body,
          result
        ],
      )?;
    }

    tx.commit()?;
    Ok(())
  }

  fn load(&self) -> Result<Vec<RestRequest>> {
    let conn = self.lock();
    let mut stmt = conn.prepare(
      "SELECT method, endpoint, parameters, body, result FROM pending_requests
       ORDER BY position",
    )?;

    let rows: Vec<(String, String, String, Option<String>, String)> = stmt
      .query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
      })?
      .collect::<rusqlite::Result<_>>()?;

    rows
      .into_iter()
      .map(|(method, endpoint, parameters, body, result)| -> Result<RestRequest> {
        let method: Method = serde_json::from_value(serde_json::Value::String(method))?;
        let result: ResultKind = serde_json::from_str(&result)?;
        Ok(RestRequest {
          endpoint: Endpoint::from(endpoint),
          method,
          parameters: serde_json::from_str(&parameters)?,
          body: body
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?,
          result,
        })
      })
      .collect()
  }

  fn clear(&self) -> Result<()> {
    self.lock().execute("DELETE FROM pending_requests", [])?;
    Ok(())
  }
}
