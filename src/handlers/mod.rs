pub mod health;
pub mod invoices;
pub mod metrics;
pub mod webhook;

use axum::response::Json;
use utoipa::OpenApi;

use crate::error::{ErrorCode, ErrorDetail, ErrorResponse};
use crate::models::invoice::{CreateInvoiceRequest, CreateInvoiceResponse, InvoiceStatusResponse};

#[derive(OpenApi)]
#[openapi(
    info(title = "BTCPay Relay", description = "Storefront invoice and webhook relay for BTCPay Server"),
    paths(
        health::health_check,
        invoices::create_invoice,
        invoices::get_invoice_status,
        webhook::btcpay_webhook,
        metrics::get_prometheus_metrics,
    ),
    components(schemas(
        health::HealthResponse,
        CreateInvoiceRequest,
        CreateInvoiceResponse,
        InvoiceStatusResponse,
        ErrorResponse,
        ErrorDetail,
        ErrorCode,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "invoices", description = "Invoice creation and status"),
        (name = "webhooks", description = "BTCPay webhook receiver"),
        (name = "metrics", description = "Prometheus metrics"),
    )
)]
pub struct ApiDoc;

/// Generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
