//! Rate limited, caching client for market data REST APIs.
//!
//! Every upstream call goes through one [`Dispatcher`]: fresh responses are
//! served from its cache, everything else is queued on a [`Scheduler`] that
//! runs one call at a time and at most `quota` calls per rolling window.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod rate_limit;
pub mod screening;
pub mod transport;
pub mod worker;

pub use dispatcher::{DEFAULT_CACHE_TTL, Dispatcher};
pub use errors::FetchError;
pub use models::{ApiRequest, Auth, Method, RequestOptions, append_query, to_query_string};
pub use provider::{AuthScheme, Credential, MarketClient, ProviderEndpoint, ScreenerParams};
pub use transport::{HttpTransport, Transport};
pub use worker::{Scheduler, SchedulerConfig};
