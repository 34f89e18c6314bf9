use clap::Parser;
use std::time::Duration;

use crate::provider::{FMP_BASE_URL, POLYGON_BASE_URL, ScreenerParams};
use crate::worker::SchedulerConfig;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "market-fetch")]
#[command(about = "Rate limited, caching market data client")]
pub struct Args {
    // Max upstream calls per window (shared by all providers)
    #[arg(long, default_value_t = 60)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 3600)]
    pub cache_ttl: u64,

    #[arg(long, default_value = POLYGON_BASE_URL)]
    pub polygon_url: String,

    #[arg(long, default_value = FMP_BASE_URL)]
    pub fmp_url: String,

    // Symbol search query
    #[arg(short, long, default_value = "AAPL")]
    pub query: String,

    // Screener country filter
    #[arg(long, default_value = "US")]
    pub country: String,

    // Screener result limit
    #[arg(long, default_value_t = 10_000)]
    pub limit: u32,

    // Print prometheus metrics before exiting
    #[arg(long, default_value_t = false)]
    pub print_metrics: bool,
}

impl Args {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            quota: self.rate_limit,
            window: Duration::from_secs(self.rate_window),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn screener_params(&self) -> ScreenerParams {
        ScreenerParams {
            country: self.country.clone(),
            limit: self.limit,
            ..ScreenerParams::default()
        }
    }
}
