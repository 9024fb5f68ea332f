//! HTTP transport for the panel backend.
//!
//! Wraps a `reqwest::Client`: every request gets a unique cache-busting
//! `_ts` query parameter and carries the session cookie. Non-2xx and
//! connection failures never surface as `Err` from the text/JSON helpers;
//! they come back as inert replies (`ok == false`) so callers can render
//! them as status messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderValue, CACHE_CONTROL, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response};

use crate::error::PanelError;

/// Reply of a text request. `ok` mirrors HTTP success; connection-level
/// failures use `status == 0` with the error text as body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub ok: bool,
    pub status: u16,
    pub text: String,
}

/// Reply of a JSON request; `json` is `None` for malformed bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub ok: bool,
    pub status: u16,
    pub text: String,
    pub json: Option<serde_json::Value>,
}

/// Parses JSON leniently: malformed payloads degrade to `None`.
pub fn try_json(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str(text).ok()
}

/// Joins the base URL and a request path.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Transport bound to one backend with one session credential.
#[derive(Debug)]
pub struct Transport {
    client: Client,
    base_url: String,
    session_cookie: Option<String>,
    cache_buster: AtomicU64,
}

impl Transport {
    pub fn new(
        base_url: &str,
        session_cookie: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PanelError::Transport(err.to_string()))?;
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_cookie,
            cache_buster: AtomicU64::new(seed),
        })
    }

    /// Unique per-request cache-busting token.
    fn next_ts(&self) -> u64 {
        self.cache_buster.fetch_add(1, Ordering::Relaxed)
    }

    fn builder(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        let mut builder = self
            .client
            .request(method, url)
            .query(query)
            .query(&[("_ts", self.next_ts().to_string())])
            .header(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if let Some(cookie) = self.session_cookie.as_deref() {
            builder = builder.header(COOKIE, cookie.to_string());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    /// Sends a request and returns the raw response. Only the streaming
    /// path needs this; everything else goes through the reply helpers.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, PanelError> {
        self.builder(method, path, query, body)
            .send()
            .await
            .map_err(|err| PanelError::Transport(err.to_string()))
    }

    pub async fn fetch_text(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> TextReply {
        match self.send_raw(method, path, query, body).await {
            Ok(response) => {
                let status = response.status().as_u16();
                let ok = response.status().is_success();
                let text = response.text().await.unwrap_or_default();
                TextReply { ok, status, text }
            }
            Err(err) => TextReply {
                ok: false,
                status: 0,
                text: err.to_string(),
            },
        }
    }

    pub async fn fetch_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> JsonReply {
        let reply = self.fetch_text(method, path, query, body).await;
        let json = try_json(&reply.text);
        JsonReply {
            ok: reply.ok,
            status: reply.status,
            text: reply.text,
            json,
        }
    }
}
