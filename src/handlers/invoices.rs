use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use tracing::{error, info, warn};
use validator::Validate;

use crate::error::{handle_rejection, ApiError, ErrorResponse, Result};
use crate::models::invoice::{
    is_valid_invoice_id, CreateInvoiceRequest, CreateInvoiceResponse, InvoiceStatusResponse,
};
use crate::services::ProcessorError;
use crate::AppState;

/// Create a payment invoice for a storefront purchase
#[utoipa::path(
    post,
    path = "/api/create-invoice",
    tag = "invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice created", body = CreateInvoiceResponse),
        (status = 400, description = "Invalid amount, email or body", body = ErrorResponse),
        (status = 500, description = "Payment processor failure", body = ErrorResponse)
    )
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<Json<CreateInvoiceResponse>> {
    let Json(request) = payload.map_err(handle_rejection)?;

    let amount = request.positive_amount().ok_or_else(ApiError::invalid_amount)?;
    request.validate()?;

    let order_stamp = chrono::Utc::now().timestamp_millis();
    let body = request.to_payload(amount, &state.config.client_url, order_stamp);

    let invoice = state.invoices.create_invoice(&body).await.map_err(|e| {
        error!(order_id = %body.metadata.order_id, "Invoice creation failed: {}", e);
        ApiError::from(e)
    })?;

    info!(
        invoice_id = %invoice.id,
        order_id = %body.metadata.order_id,
        amount = %body.amount,
        currency = %body.currency,
        "Invoice created for storefront"
    );

    Ok(Json(invoice.into()))
}

/// Current status of an invoice
#[utoipa::path(
    get,
    path = "/api/invoices/{invoiceId}",
    tag = "invoices",
    params(("invoiceId" = String, Path, description = "BTCPay invoice id")),
    responses(
        (status = 200, description = "Invoice status", body = InvoiceStatusResponse),
        (status = 400, description = "Malformed invoice id", body = ErrorResponse),
        (status = 500, description = "Payment processor failure", body = ErrorResponse)
    )
)]
pub async fn get_invoice_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceStatusResponse>> {
    if !is_valid_invoice_id(&invoice_id) {
        warn!(invoice_id = ?invoice_id, "Rejected malformed invoice id");
        return Err(ProcessorError::InvalidInvoiceId(invoice_id).into());
    }

    let invoice = state.invoices.fetch_invoice(&invoice_id).await.map_err(|e| {
        error!(invoice_id = %invoice_id, "Invoice status lookup failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(invoice.into()))
}
