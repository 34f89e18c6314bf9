use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use market_fetch::config::Args;
use market_fetch::screening::OFFICIAL_WALLSTREET_SECTORS;
use market_fetch::{Dispatcher, HttpTransport, MarketClient, ProviderEndpoint, Scheduler, metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    info!(
        "Rate limit: {} requests per {} seconds, cache TTL {} seconds",
        args.rate_limit, args.rate_window, args.cache_ttl
    );

    let scheduler = Scheduler::new(args.scheduler_config());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(HttpTransport::new()),
        scheduler,
        args.cache_ttl(),
    ));

    let client = MarketClient::new(Arc::clone(&dispatcher))
        .with_polygon(ProviderEndpoint::polygon().with_base_url(args.polygon_url.clone()))
        .with_fmp(ProviderEndpoint::fmp().with_base_url(args.fmp_url.clone()));

    info!("Sectors: {:?}", OFFICIAL_WALLSTREET_SECTORS);

    let search = client.search_symbol(&args.query).await?;
    println!("{} Search: {}", args.query, serde_json::to_string_pretty(&search)?);

    let screener = client.company_screener(&args.screener_params()).await?;
    println!(
        "Stock Screener: {} {}",
        serde_json::to_string_pretty(&screener)?,
        screener.len()
    );

    if args.print_metrics {
        println!("{}", metrics::render()?);
    }

    Ok(())
}
