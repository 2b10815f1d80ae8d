// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::errors::RequestError;

/// Header carrying the operator identity on every request.
pub const USER_HEADER: &str = "Comfy-User";

/// Method and optional JSON body of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
        }
    }

    pub fn post_empty() -> Self {
        Self {
            method: Method::POST,
            body: None,
        }
    }
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self::get()
    }
}

/// Builds URLs relative to the API root and sends requests with the fixed
/// no-cache policy and operator identity header.
///
/// Responses come back raw; interpreting the status code is up to the caller.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dagwood_client::client::RequestClient;
///
/// let client = RequestClient::new("https://engine.local:8188/base", "ops", Duration::from_secs(5)).unwrap();
///
/// assert_eq!(client.api_url("/prompt").unwrap().as_str(), "https://engine.local:8188/base/api/prompt");
/// assert_eq!(
///     client.live_url(Some("abc")).unwrap().as_str(),
///     "wss://engine.local:8188/base/ws?clientId=abc"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    root: Url,
    user: String,
}

impl RequestClient {
    pub fn new(api_root: &str, user: impl Into<String>, timeout: Duration) -> Result<Self, RequestError> {
        let root = Url::parse(api_root).map_err(|e| RequestError::InvalidUrl {
            url: api_root.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(root.scheme(), "http" | "https") {
            return Err(RequestError::InvalidUrl {
                url: api_root.to_string(),
                reason: format!("unsupported scheme '{}'", root.scheme()),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            root,
            user: user.into(),
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.root
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// `<root>/api<route>`
    pub fn api_url(&self, route: &str) -> Result<Url, RequestError> {
        self.join("/api", route)
    }

    /// `<root>/internal<route>`
    pub fn internal_url(&self, route: &str) -> Result<Url, RequestError> {
        self.join("/internal", route)
    }

    /// `<root><route>`, for static files served next to the API.
    pub fn file_url(&self, route: &str) -> Result<Url, RequestError> {
        self.join("", route)
    }

    /// Live channel endpoint `ws(s)://<host><base>/ws`, resuming `client_id` when given.
    pub fn live_url(&self, client_id: Option<&str>) -> Result<Url, RequestError> {
        let mut url = self.join("", "/ws")?;
        let scheme = if self.root.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| RequestError::InvalidUrl {
            url: url.to_string(),
            reason: format!("cannot switch scheme to '{}'", scheme),
        })?;
        if let Some(id) = client_id {
            url.query_pairs_mut().append_pair("clientId", id);
        }
        Ok(url)
    }

    /// Send `request` to the API route and return the raw response.
    pub async fn fetch(&self, route: &str, request: ApiRequest) -> Result<reqwest::Response, RequestError> {
        let url = self.api_url(route)?;
        tracing::debug!(method = %request.method, url = %url, "Sending engine request");

        let mut builder = self
            .http
            .request(request.method, url)
            .header(USER_HEADER, self.user.as_str());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    fn join(&self, prefix: &str, route: &str) -> Result<Url, RequestError> {
        let (path, query) = match route.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (route, None),
        };
        let base = self.root.path().trim_end_matches('/');

        let mut url = self.root.clone();
        url.set_path(&format!("{}{}{}", base, prefix, path));
        url.set_query(query);
        url.set_fragment(None);
        Ok(url)
    }
}
