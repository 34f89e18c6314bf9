use thiserror::Error;

/// Errors surfaced to the caller of a fetch.
///
/// None of these are ever written to the cache and none are retried.
#[derive(Error, Debug)]
pub enum FetchError {
    /// DNS failure, connection reset, timeout enforced by the client.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("Failed to fetch data: {status_text}")]
    Http { status: u16, status_text: String },

    /// Body was not valid JSON or did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Environment variable holding a provider API key is not set.
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    /// The scheduler worker is no longer receiving work.
    #[error("Scheduler is closed")]
    SchedulerClosed,

    /// The work item was dropped before producing a result (it panicked).
    #[error("Worker failed to respond")]
    WorkerGone,
}
