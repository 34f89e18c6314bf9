use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// HTTP verb for an outbound call
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Request options that take part in the cache key.
///
/// Headers are kept in a `BTreeMap` so the serialized form does not depend
/// on insertion order.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    #[serde(default)]
    pub method: Method,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// Authentication injected by a provider adapter - never part of the cache key
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Bearer(String),
    QueryParam { name: String, value: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Auth::QueryParam { name, .. } => write!(f, "QueryParam({}=<redacted>)", name),
        }
    }
}

/// A fully resolved outbound request: provider URL, options and the auth to
/// inject at send time.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// Absolute URL including query string, without credentials.
    pub url: String,
    pub options: RequestOptions,
    pub auth: Option<Auth>,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            url: url.into(),
            options,
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// URL actually sent upstream, with a query-parameter credential appended.
    pub fn resolved_url(&self) -> String {
        match &self.auth {
            Some(Auth::QueryParam { name, value }) => append_query(&self.url, name, value),
            _ => self.url.clone(),
        }
    }
}

/// Join `key=value` pairs with `&`. Values are not percent-encoded.
pub fn to_query_string<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), value.as_ref()))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append one parameter, picking `?` or `&` depending on whether `url`
/// already carries a query string.
pub fn append_query(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, key, value)
}
