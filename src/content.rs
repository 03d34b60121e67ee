use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{CACHE_CONTROL, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::model::{Category, LoreSection, NewPost, Post};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const MAX_DETAIL_CHARS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

/// Failure of a single content service round-trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The request never completed.
    #[error("Could not connect to content service at {base_url} ({reason})")]
    Unreachable { base_url: String, reason: String },
    /// A response arrived with a non-success status, or a body that did not decode.
    #[error("Content service returned {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

impl StoreError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, StoreError::Unreachable { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Rejected { status, .. } => Some(*status),
            StoreError::Unreachable { .. } => None,
        }
    }
}

/// Blocking client for the content service. Every call is one round-trip with
/// no retry and no response caching.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("content client user agent required");
        }
        let base = config
            .base_url
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(base.trim())
            .with_context(|| format!("content: invalid base url {base}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!("content: base url must be http or https, got {}", base_url);
        }
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .build()
                .context("content: build http client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn list_directory(&self) -> Result<Vec<Category>, StoreError> {
        self.get_json(&["sections"])
    }

    pub fn list_lore_sections(&self) -> Result<Vec<LoreSection>, StoreError> {
        self.get_json(&["lore", "sections"])
    }

    /// Posts of one channel in store order (oldest first).
    pub fn list_posts(&self, channel_id: &str) -> Result<Vec<Post>, StoreError> {
        self.get_json(&["sections", channel_id, "posts"])
    }

    pub fn create_post(&self, channel_id: &str, post: &NewPost) -> Result<Post, StoreError> {
        let body = NewPost::normalized(&post.author, &post.content, &post.tags);
        let url = self.endpoint(&["sections", channel_id, "posts"]);
        let req = self.http.request(Method::POST, url.clone()).json(&body);
        let resp = self.execute(req, Method::POST, &url)?;
        decode(resp)
    }

    pub fn health(&self) -> Result<Value, StoreError> {
        self.get_json(&["health"])
    }

    fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, StoreError> {
        let url = self.endpoint(segments);
        let req = self
            .http
            .request(Method::GET, url.clone())
            .header(CACHE_CONTROL, "no-store");
        let resp = self.execute(req, Method::GET, &url)?;
        decode(resp)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn execute(&self, req: RequestBuilder, method: Method, url: &Url) -> Result<Response, StoreError> {
        let resp = req
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .map_err(|err| {
                warn!(%method, path = url.path(), error = %err, "content service unreachable");
                StoreError::Unreachable {
                    base_url: self.base_url.as_str().trim_end_matches('/').to_string(),
                    reason: transport_reason(&err),
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!(%method, path = url.path(), status = status.as_u16(), "content request ok");
            return Ok(resp);
        }

        let body = resp.text().unwrap_or_default();
        let detail = error_detail(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string());
        warn!(%method, path = url.path(), status = status.as_u16(), %detail, "content service rejected request");
        Err(StoreError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
    let status = resp.status().as_u16();
    resp.json::<T>().map_err(|err| {
        warn!(status, error = %err, "content service returned a malformed body");
        StoreError::Rejected {
            status,
            detail: format!("malformed response: {err}"),
        }
    })
}

fn transport_reason(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        "request failed".to_string()
    }
}

/// Pulls a readable message out of an error body. Understands `{"detail": "..."}`
/// and the validation list form `{"detail": [{"msg": "..."}]}`.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        match value.get("detail") {
            Some(Value::String(detail)) => return Some(detail.clone()),
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            _ => {}
        }
    }
    Some(truncate(trimmed, MAX_DETAIL_CHARS))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(ClientConfig {
            base_url: Some(base.to_string()),
            user_agent: "liber-console-test".into(),
            http_client: None,
        })
        .unwrap()
    }

    #[test]
    fn defaults_to_local_service() {
        let client = Client::new(ClientConfig {
            user_agent: "agent".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn rejects_missing_user_agent_and_bad_scheme() {
        assert!(Client::new(ClientConfig::default()).is_err());
        assert!(Client::new(ClientConfig {
            base_url: Some("ftp://example.com".into()),
            user_agent: "agent".into(),
            http_client: None,
        })
        .is_err());
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = client("http://example.com/api/");
        let url = client.endpoint(&["sections", "npcs", "posts"]);
        assert_eq!(url.as_str(), "http://example.com/api/sections/npcs/posts");
    }

    #[test]
    fn endpoint_escapes_channel_ids() {
        let client = client("http://example.com");
        let url = client.endpoint(&["sections", "a b/c", "posts"]);
        assert_eq!(url.path(), "/sections/a%20b%2Fc/posts");
    }

    #[test]
    fn error_detail_reads_service_shapes() {
        assert_eq!(
            error_detail(r#"{"detail":"Section not found"}"#).as_deref(),
            Some("Section not found")
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"msg":"too short"},{"msg":"missing"}]}"#).as_deref(),
            Some("too short; missing")
        );
        assert_eq!(error_detail("upstream down").as_deref(), Some("upstream down"));
        assert_eq!(error_detail("  "), None);
    }

    #[test]
    fn failure_kinds_read_differently() {
        let unreachable = StoreError::Unreachable {
            base_url: "http://localhost:8000".into(),
            reason: "connection failed".into(),
        };
        let rejected = StoreError::Rejected {
            status: 503,
            detail: "Service Unavailable".into(),
        };
        assert_ne!(unreachable.to_string(), rejected.to_string());
        assert!(rejected.to_string().contains("503"));
        assert!(unreachable.to_string().contains("http://localhost:8000"));
        assert_eq!(unreachable.status(), None);
        assert_eq!(rejected.status(), Some(503));
    }
}
