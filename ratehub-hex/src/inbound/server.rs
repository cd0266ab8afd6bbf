//! HTTP Server configuration and startup.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ratehub_types::RateRepository;

use super::handlers::{self, AppState};
use crate::openapi::ApiDoc;
use crate::{IntegrationService, PollingScheduler, RatesService, UsageService};

/// HTTP Server for the rate hub API.
pub struct HttpServer<R: RateRepository> {
    state: Arc<AppState<R>>,
}

impl<R: RateRepository> HttpServer<R> {
    /// Creates a new HTTP server over the given services.
    pub fn new(
        rates: RatesService<R>,
        integrations: IntegrationService<R>,
        usage: UsageService<R>,
        scheduler: Arc<PollingScheduler<R>>,
        cache_status: String,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                rates,
                integrations,
                usage,
                scheduler,
                cache_status,
                started_at: Instant::now(),
            }),
        }
    }

    /// Builds the Axum router with all routes.
    ///
    /// CORS is permissive: the dashboard is served from a different origin.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health::<R>))
            .route(
                "/api/integrations/providers",
                get(handlers::list_providers),
            )
            .route("/api/integrations", post(handlers::create_integration::<R>))
            .route("/api/integrations", get(handlers::list_integrations::<R>))
            .route(
                "/api/integrations/{id}",
                get(handlers::get_integration::<R>),
            )
            .route(
                "/api/integrations/{id}",
                put(handlers::update_integration::<R>),
            )
            .route(
                "/api/integrations/{id}",
                delete(handlers::deactivate_integration::<R>),
            )
            .route(
                "/api/integrations/{id}/permanent",
                delete(handlers::delete_integration::<R>),
            )
            .route(
                "/api/integrations/{id}/usage",
                get(handlers::integration_usage::<R>),
            )
            .route(
                "/api/integrations/{id}/trigger",
                post(handlers::trigger_integration::<R>),
            )
            .route("/api/rates/currencies", get(handlers::list_currencies::<R>))
            .route("/api/rates/latest", get(handlers::list_latest_rates::<R>))
            .route("/api/rates/history", get(handlers::rate_history::<R>))
            .route("/api/convert", get(handlers::convert::<R>))
            .route("/api/monitoring/usage", get(handlers::monitoring_usage::<R>))
            .route(
                "/api/monitoring/scheduler",
                get(handlers::scheduler_status::<R>),
            )
            .route(
                "/api/monitoring/requests",
                get(handlers::recent_requests::<R>),
            )
            .route(
                "/api/monitoring/requests/stats/{id}",
                get(handlers::request_stats::<R>),
            )
            .route(
                "/api/monitoring/conversions",
                get(handlers::recent_conversions::<R>),
            )
            .route(
                "/api/monitoring/conversions/popular",
                get(handlers::popular_pairs::<R>),
            )
            .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    ///
    /// The polling scheduler is stopped as soon as the shutdown signal
    /// arrives, before in-flight connections drain.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let scheduler = self.state.scheduler.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                scheduler.stop().await;
            })
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
