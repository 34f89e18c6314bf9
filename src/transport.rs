use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

use crate::errors::FetchError;
use crate::metrics::UPSTREAM_LATENCY;
use crate::models::{ApiRequest, Auth, Method};

/// The network call behind a cache miss.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the JSON body of a 2xx response.
    async fn execute(&self, request: &ApiRequest) -> Result<Value, FetchError>;
}

/// `Transport` over HTTP using reqwest.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let mut builder = match request.options.method {
            Method::Get => self.client.get(request.resolved_url()),
            Method::Post => self.client.post(request.resolved_url()),
        };

        for (name, value) in &request.options.headers {
            builder = builder.header(name, value);
        }
        if let Some(Auth::Bearer(token)) = &request.auth {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.options.body {
            builder = builder.json(body);
        }

        // log the url without credentials
        debug!("Upstream {:?} {}", request.options.method, request.url);

        let start_time = Instant::now();
        let response = builder.send().await?;
        UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
