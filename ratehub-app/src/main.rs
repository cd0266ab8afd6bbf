//! # RateHub Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter and the rate cache
//! - Create the rates, integration and usage services
//! - Start the polling scheduler and the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratehub_hex::{
    IntegrationService, PollingScheduler, RatesService, UsageService, inbound::HttpServer,
};
use ratehub_repo::cache::{MemoryCache, RedisCache};
use ratehub_repo::{CredentialCipher, build_repo};
use ratehub_types::RateCache;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("ratehub-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // OTLP export is opt-in: only wired when an endpoint is configured
    let otel = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        Some(init_tracer()?)
    } else {
        None
    };
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ratehub_app=debug,ratehub_hex=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting ratehub server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // The credential cipher rejects an unusable key before anything connects
    let cipher = CredentialCipher::new(&config.app_data_key)?;

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url, cipher).await?);

    // Redis when configured and reachable, otherwise the in-process cache
    let (cache, cache_status): (Arc<dyn RateCache>, &str) = match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(redis) => (Arc::new(redis), "connected"),
            Err(e) => {
                tracing::warn!("Redis unavailable, falling back to in-process cache: {e}");
                (Arc::new(MemoryCache::default()), "fallback")
            }
        },
        None => (Arc::new(MemoryCache::default()), "fallback"),
    };
    tracing::info!("Rate cache: {}", cache_status);

    // Create the services
    let rates = RatesService::new(repo.clone(), cache.clone());
    let integrations = IntegrationService::new(repo.clone());
    let usage = UsageService::new(repo.clone());

    // Start polling the configured integrations
    let scheduler = Arc::new(PollingScheduler::new(
        repo,
        cache,
        config.base_currencies.clone(),
    ));
    scheduler.clone().start().await;

    // Create and run the HTTP server
    let server = HttpServer::new(
        rates,
        integrations,
        usage,
        scheduler,
        cache_status.to_string(),
    );
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    Ok(())
}
