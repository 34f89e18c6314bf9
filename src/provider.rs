//! Provider adapters: base-URL prefixing and credential injection for the
//! market data APIs, plus typed calls built on top of them.
//!
//! Every call goes through the shared [`Dispatcher`], so the scheduler quota
//! spans all providers together.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::errors::FetchError;
use crate::models::{ApiRequest, Auth, RequestOptions, to_query_string};

pub const POLYGON_BASE_URL: &str = "https://api.polygon.io/v3/";
pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com/";

/// Where a provider API key comes from.
#[derive(Clone)]
pub enum Credential {
    /// Read from this environment variable on every call.
    Env(String),
    Static(String),
}

impl Credential {
    fn resolve(&self) -> Result<String, FetchError> {
        match self {
            Credential::Env(var) => {
                std::env::var(var).map_err(|_| FetchError::MissingCredential(var.clone()))
            }
            Credential::Static(key) => Ok(key.clone()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Env(var) => write!(f, "Env({})", var),
            Credential::Static(_) => f.write_str("Static(<redacted>)"),
        }
    }
}

/// How the credential is attached to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `<param>=<key>` appended to the query string.
    QueryParam(String),
}

/// Base URL and auth settings for one provider.
#[derive(Clone, Debug)]
pub struct ProviderEndpoint {
    pub name: String,
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    pub credential: Credential,
}

impl ProviderEndpoint {
    /// Polygon.io, bearer token from `POLY_API_KEY`.
    pub fn polygon() -> Self {
        Self {
            name: "POLYGON".to_string(),
            base_url: POLYGON_BASE_URL.to_string(),
            auth_scheme: AuthScheme::Bearer,
            credential: Credential::Env("POLY_API_KEY".to_string()),
        }
    }

    /// Financial Modeling Prep, `apikey` query parameter from `FMP_API_KEY`.
    pub fn fmp() -> Self {
        Self {
            name: "FMP".to_string(),
            base_url: FMP_BASE_URL.to_string(),
            auth_scheme: AuthScheme::QueryParam("apikey".to_string()),
            credential: Credential::Env("FMP_API_KEY".to_string()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Resolve `path` against the base URL and attach the credential.
    pub fn request(&self, path: &str, options: RequestOptions) -> Result<ApiRequest, FetchError> {
        let key = self.credential.resolve()?;
        let auth = match &self.auth_scheme {
            AuthScheme::Bearer => Auth::Bearer(key),
            AuthScheme::QueryParam(name) => Auth::QueryParam {
                name: name.clone(),
                value: key,
            },
        };

        Ok(ApiRequest::new(format!("{}{}", self.base_url, path), options).with_auth(auth))
    }
}

/// Filters for the FMP company screener.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenerParams {
    pub market_cap_more_than: u64,
    pub is_actively_trading: bool,
    pub volume_more_than: u64,
    pub is_etf: bool,
    pub is_fund: bool,
    pub country: String,
    pub limit: u32,
}

impl Default for ScreenerParams {
    fn default() -> Self {
        Self {
            market_cap_more_than: 10_000_000_000,
            is_actively_trading: true,
            volume_more_than: crate::screening::MIN_VOLUME,
            is_etf: false,
            is_fund: false,
            country: "US".to_string(),
            limit: 10_000,
        }
    }
}

impl ScreenerParams {
    // order is part of the cache key
    pub fn to_query_string(&self) -> String {
        to_query_string(&[
            ("marketCapMoreThan", self.market_cap_more_than.to_string()),
            ("isActivelyTrading", self.is_actively_trading.to_string()),
            ("volumeMoreThan", self.volume_more_than.to_string()),
            ("isEtf", self.is_etf.to_string()),
            ("isFund", self.is_fund.to_string()),
            ("country", self.country.clone()),
            ("limit", self.limit.to_string()),
        ])
    }
}

/// Market data client sharing one dispatcher across providers.
#[derive(Clone)]
pub struct MarketClient {
    dispatcher: Arc<Dispatcher>,
    polygon: ProviderEndpoint,
    fmp: ProviderEndpoint,
}

impl MarketClient {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            polygon: ProviderEndpoint::polygon(),
            fmp: ProviderEndpoint::fmp(),
        }
    }

    pub fn with_polygon(mut self, endpoint: ProviderEndpoint) -> Self {
        self.polygon = endpoint;
        self
    }

    pub fn with_fmp(mut self, endpoint: ProviderEndpoint) -> Self {
        self.fmp = endpoint;
        self
    }

    pub async fn polygon_fetch<T>(&self, path: &str, options: RequestOptions) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let request = self.polygon.request(path, options)?;
        self.dispatcher.fetch_cached(request).await
    }

    pub async fn fmp_fetch<T>(&self, path: &str, options: RequestOptions) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let request = self.fmp.request(path, options)?;
        self.dispatcher.fetch_cached(request).await
    }

    /// Symbol lookup by ticker or company name.
    pub async fn search_symbol(&self, query: &str) -> Result<Value, FetchError> {
        let path = format!("stable/search-symbol?{}", to_query_string(&[("query", query)]));
        self.fmp_fetch(&path, RequestOptions::get()).await
    }

    /// Companies matching `params`.
    pub async fn company_screener(&self, params: &ScreenerParams) -> Result<Vec<Value>, FetchError> {
        let path = format!("stable/company-screener?{}", params.to_query_string());
        self.fmp_fetch(&path, RequestOptions::get()).await
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
