//! HTTP transport for the Trello REST API.

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::queue::{Method, RestRequest};
use crate::transport::{JsonSerializer, Serializer, Transport};

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1/";

/// Trello API client authenticating with an application key and an optional
/// user token.
#[derive(Clone)]
pub struct TrelloClient {
  http: reqwest::Client,
  base_url: Url,
  key: String,
  token: Option<String>,
  serializer: Arc<dyn Serializer>,
}

impl TrelloClient {
  pub fn new(key: impl Into<String>, token: Option<String>) -> Result<Self> {
    Ok(Self {
      http: reqwest::Client::new(),
      base_url: Url::parse(DEFAULT_BASE_URL)?,
      key: key.into(),
      token,
      serializer: Arc::new(JsonSerializer),
    })
  }

  /// Point the client at another API root.
  pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
    // Url::join drops the last segment unless the base ends with a slash
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    self.base_url = Url::parse(&normalized)?;
    Ok(self)
  }

  pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
    self.serializer = serializer;
    self
  }

  /// Without a token only reads are possible.
  pub fn is_read_only(&self) -> bool {
    self.token.is_none()
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Absolute URL for a request, credentials and parameters included.
  pub fn url_for(&self, request: &RestRequest) -> Result<Url> {
    let mut url = self.base_url.join(&request.endpoint.path())?;
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("key", &self.key);
      if let Some(token) = &self.token {
        query.append_pair("token", token);
      }
      for (name, value) in &request.parameters {
        query.append_pair(name, value);
      }
    }
    Ok(url)
  }

  fn prepare(&self, request: &RestRequest) -> Result<reqwest::RequestBuilder> {
    let url = self.url_for(request)?;
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    };

    let mut builder = self.http.request(method, url);
    if let Some(body) = &request.body {
      builder = builder
        .header(CONTENT_TYPE, self.serializer.content_type())
        .body(self.serializer.serialize(body)?);
    }
    Ok(builder)
  }
}

impl Transport for TrelloClient {
  fn execute(&self, request: &RestRequest) -> BoxFuture<'static, Result<Value>> {
    debug!(request = %request, "sending");
    let prepared = self.prepare(request);
    let serializer = Arc::clone(&self.serializer);
    let target = request
      .target()
      .map(|(kind, id)| (kind, id.to_string()));

    Box::pin(async move {
      let response = prepared?.send().await?;
      let status = response.status();
      let bytes = response.bytes().await?;

      if status == StatusCode::NOT_FOUND {
        if let Some((kind, id)) = target {
          return Err(Error::NotFound { kind, id });
        }
      }

      if !status.is_success() {
        let message = String::from_utf8_lossy(&bytes).trim().to_string();
        return Err(Error::Transport {
          status: status.as_u16(),
          message,
        });
      }

      serializer.deserialize(&bytes)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trello::endpoint;
  use crate::trello::EntityKind;
  use serde_json::json;

  #[test]
  fn test_url_carries_credentials_and_parameters() {
    let client = TrelloClient::new("app-key", Some("user-token".to_string())).unwrap();
    let url = client.url_for(&endpoint::read(EntityKind::Card, "c1")).unwrap();

    assert_eq!(url.path(), "/1/cards/c1");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("key".to_string(), "app-key".to_string())));
    assert!(pairs.contains(&("token".to_string(), "user-token".to_string())));
    assert!(pairs.contains(&("fields".to_string(), "all".to_string())));
  }

  #[test]
  fn test_base_url_without_trailing_slash() {
    let client = TrelloClient::new("k", None)
      .unwrap()
      .with_base_url("http://localhost:8080/api")
      .unwrap();
    let url = client.url_for(&endpoint::me()).unwrap();
    assert_eq!(url.path(), "/api/members/me");
  }

  #[test]
  fn test_missing_token_is_read_only() {
    let client = TrelloClient::new("k", None).unwrap();
    assert!(client.is_read_only());

    let url = client
      .url_for(&endpoint::update(EntityKind::Card, "c1", json!({})))
      .unwrap();
    assert!(url.query_pairs().all(|(name, _)| name != "token"));
  }

  #[test]
  fn test_invalid_base_url() {
    let result = TrelloClient::new("k", None).unwrap().with_base_url("not a url");
    assert!(matches!(result, Err(Error::Url(_))));
  }
}
