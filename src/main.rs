use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use log::{info, warn};

mod cli;

use cli::Cli;
use ytcaps::cache::TranscriptCache;
use ytcaps::config::Config;
use ytcaps::extract::AppState;
use ytcaps::server::create_router;
use ytcaps::youtube::RetryPolicy;

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "ytcaps=debug" } else { "ytcaps=info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config: {e}, using defaults");
        Config::default()
    });

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());

    // One client for the whole process; the per-call timeout bounds both
    // upstream requests, and dropping a request future cancels its call.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.timeout_secs))
        .build()?;

    let state = Arc::new(AppState {
        client,
        cache: TranscriptCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.capacity,
        ),
        preferred_langs: config.extract.preferred_langs.clone(),
        retry: RetryPolicy {
            max_attempts: config.upstream.retry_attempts,
            base_delay: Duration::from_millis(config.upstream.retry_base_delay_ms),
        },
    });

    let app = create_router(state);

    info!("ytcaps v{} listening on {bind}", env!("CARGO_PKG_VERSION"));
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
