//! Router configuration module

use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::app_state::AppState;
use crate::handlers::{health, invoices, metrics, openapi_json, webhook};
use crate::middleware::request_logger_middleware;

/// Headroom on top of the webhook dispatch bound before the router gives up on a request
const REQUEST_TIMEOUT_HEADROOM_SECS: u64 = 15;

/// Build the application router.
pub fn build_router(app_state: AppState) -> Router {
    let request_timeout = Duration::from_secs(
        app_state.config.webhook_dispatch_timeout_secs + REQUEST_TIMEOUT_HEADROOM_SECS,
    );

    let api = Router::new()
        .route("/create-invoice", post(invoices::create_invoice))
        .route("/invoices/{invoiceId}", get(invoices::get_invoice_status))
        .route("/webhook", post(webhook::btcpay_webhook))
        .route("/docs/openapi.json", get(openapi_json));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::get_prometheus_metrics))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                ))
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_logger_middleware)),
        )
        .with_state(app_state)
}
