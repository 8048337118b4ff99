use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::queue::SqliteRequestStore;
use crate::sync::SyncSettings;
use crate::trello::TrelloClient;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub trello: TrelloConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloConfig {
  /// Application key from https://trello.com/app-key
  pub key: String,
  /// API root (defaults to https://api.trello.com/1/)
  pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Seconds before a fetched entity is considered stale
  #[serde(default = "default_ttl_seconds")]
  pub ttl_seconds: i64,
  /// Minimum spacing between two requests, in milliseconds
  #[serde(default = "default_request_interval_ms")]
  pub request_interval_ms: u64,
  /// Where pending requests are persisted between runs
  pub queue_path: Option<PathBuf>,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      ttl_seconds: default_ttl_seconds(),
      request_interval_ms: default_request_interval_ms(),
      queue_path: None,
    }
  }
}

fn default_ttl_seconds() -> i64 {
  30
}

fn default_request_interval_ms() -> u64 {
  100
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./trello-sync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/trello-sync/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/trello-sync/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("trello-sync.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("trello-sync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.sync.ttl_seconds < 0 {
      return Err(eyre!("sync.ttl_seconds must not be negative"));
    }
    Ok(config)
  }

  /// Get the Trello user token from environment variables.
  ///
  /// Checks TRELLO_SYNC_TOKEN first, then TRELLO_TOKEN as fallback. Without
  /// a token the session is read-only.
  pub fn get_api_token() -> Option<String> {
    std::env::var("TRELLO_SYNC_TOKEN")
      .or_else(|_| std::env::var("TRELLO_TOKEN"))
      .ok()
      .filter(|token| !token.trim().is_empty())
  }

  pub fn client(&self, token: Option<String>) -> Result<TrelloClient> {
    let client = TrelloClient::new(&self.trello.key, token)
      .map_err(|e| eyre!("Failed to create Trello client: {}", e))?;

    match &self.trello.base_url {
      Some(url) => client
        .with_base_url(url)
        .map_err(|e| eyre!("Invalid trello.base_url '{}': {}", url, e)),
      None => Ok(client),
    }
  }

  pub fn sync_settings(&self, read_only: bool) -> SyncSettings {
    SyncSettings {
      ttl: chrono::Duration::seconds(self.sync.ttl_seconds),
      request_interval: std::time::Duration::from_millis(self.sync.request_interval_ms),
      read_only,
    }
  }

  /// Configured queue database, or the default under the data directory.
  pub fn queue_path(&self) -> Option<PathBuf> {
    self
      .sync
      .queue_path
      .clone()
      .or_else(SqliteRequestStore::default_path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("trello:\n  key: abc123\n").unwrap();
    assert_eq!(config.trello.key, "abc123");
    assert!(config.trello.base_url.is_none());

    let settings = config.sync_settings(false);
    assert_eq!(settings.ttl, chrono::Duration::seconds(30));
    assert_eq!(settings.request_interval, std::time::Duration::from_millis(100));
    assert!(!settings.read_only);
  }

  #[test]
  fn test_sync_overrides() {
    let yaml = r#"
trello:
  key: abc123
  base_url: http://localhost:9000/1
sync:
  ttl_seconds: 5
  request_interval_ms: 0
  queue_path: /tmp/queue.db
"#;
    let config = Config::parse(yaml).unwrap();
    let settings = config.sync_settings(true);

    assert_eq!(settings.ttl, chrono::Duration::seconds(5));
    assert!(settings.request_interval.is_zero());
    assert!(settings.read_only);
    assert_eq!(config.queue_path(), Some(PathBuf::from("/tmp/queue.db")));

    let client = config.client(None).unwrap();
    assert_eq!(client.base_url().as_str(), "http://localhost:9000/1/");
    assert!(client.is_read_only());
  }

  #[test]
  fn test_negative_ttl_rejected() {
    let yaml = "trello:\n  key: k\nsync:\n  ttl_seconds: -1\n";
    assert!(Config::parse(yaml).is_err());
  }

  #[test]
  fn test_missing_key_rejected() {
    assert!(Config::parse("trello: {}\n").is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "trello:\n  key: from-file").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.trello.key, "from-file");

    let missing = file.path().with_extension("missing");
    assert!(Config::load(Some(&missing)).is_err());
  }
}
