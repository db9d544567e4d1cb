//! Shared HTTP plumbing for provider clients.
//!
//! [`ApiClient`] wraps a `reqwest::Client` with the provider's base URL,
//! credential scheme and set of accepted status codes. Adapters describe each
//! call as an [`ApiRequest`] and get back parsed JSON or a classified
//! [`ProviderError`].

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Default timeout applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause between consecutive per-record detail fetches.
pub const DEFAULT_DETAIL_DELAY: Duration = Duration::from_millis(100);

/// Client-wide HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause between per-record detail fetches.
    pub detail_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            detail_delay: DEFAULT_DETAIL_DELAY,
            user_agent: format!("eventbridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpSettings {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }
}

/// The HTTP statuses a provider treats as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessCodes(&'static [u16]);

impl SuccessCodes {
    pub const fn new(codes: &'static [u16]) -> Self {
        Self(codes)
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

/// How a client authenticates.
#[derive(Clone)]
pub enum Credential {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Token sent in a custom header.
    Header { name: &'static str, token: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Header { name, .. } => write!(f, "Header({}: <redacted>)", name),
        }
    }
}

/// Fills `{name}` placeholders in an endpoint template, URL-encoding values.
pub fn fill_template(template: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), &urlencoding::encode(value))
    })
}

/// One outbound call.
#[derive(Debug)]
pub struct ApiRequest<'a> {
    method: Method,
    path: String,
    query: Vec<(&'a str, String)>,
    body: Option<&'a Value>,
    headers: Vec<(&'static str, &'a str)>,
}

impl<'a> ApiRequest<'a> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: &'a Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: &'a Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: &'a Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: &'a str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn with_body(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header, replacing a client default of the same name.
    pub fn with_header(mut self, name: &'static str, value: &'a str) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// Authenticated JSON client for one provider.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    provider: &'static str,
    base_url: String,
    credential: Credential,
    success: SuccessCodes,
    default_headers: Vec<(&'static str, String)>,
}

impl ApiClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is not absolute or the
    /// underlying HTTP client cannot be built.
    pub fn new(
        provider: &'static str,
        base_url: &str,
        credential: Credential,
        success: SuccessCodes,
        settings: &HttpSettings,
    ) -> ProviderResult<Self> {
        url::Url::parse(base_url).map_err(|e| {
            ProviderError::configuration(format!("invalid base URL `{}`", base_url))
                .with_provider(provider)
                .with_source(e)
        })?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| {
                ProviderError::configuration("failed to create HTTP client")
                    .with_provider(provider)
                    .with_source(e)
            })?;

        Ok(Self {
            http,
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            success,
            default_headers: Vec::new(),
        })
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.default_headers.push((name, value.into()));
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Resolves a path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Sends a request and parses the JSON answer. Empty bodies become `Null`.
    pub async fn send(&self, request: ApiRequest<'_>) -> ProviderResult<Value> {
        let url = self.url(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        builder = match &self.credential {
            Credential::Bearer(token) => builder.bearer_auth(token),
            Credential::Header { name, token } => builder.header(*name, token.as_str()),
        };

        for (name, value) in &self.default_headers {
            let overridden = request
                .headers
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case(name));
            if !overridden {
                builder = builder.header(*name, value.as_str());
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(*name, *value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        debug!(provider = self.provider, method = %request.method, %url, "sending request");

        let response = builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            ProviderError::network(message)
                .with_provider(self.provider)
                .with_source(e)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            ProviderError::network("failed to read response")
                .with_provider(self.provider)
                .with_source(e)
        })?;

        debug!(provider = self.provider, %url, status, "received response");

        if !self.success.contains(status) {
            return Err(ProviderError::from_status(status, text).with_provider(self.provider));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response from {}", url))
                .with_provider(self.provider)
                .with_source(e)
        })
    }

    /// Like [`send`](Self::send), but a 404 yields `None`.
    pub async fn send_optional(&self, request: ApiRequest<'_>) -> ProviderResult<Option<Value>> {
        match self.send(request).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Deserializes a JSON answer into a typed response.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    value: Value,
) -> ProviderResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ProviderError::invalid_response(format!("unexpected response shape: {}", e))
            .with_provider(provider)
    })
}

/// Reads a string or numeric id at `path` in a JSON answer.
pub(crate) fn id_at(value: &Value, path: &str) -> Option<String> {
    crate::mapping::lookup_path(value, path).and_then(crate::mapping::value_to_text)
}
