use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::error::{ApiError, ErrorCode, ErrorResponse, Result};
use crate::services::WebhookOutcome;
use crate::utils::signature::{SignatureError, SIGNATURE_HEADER};
use crate::AppState;

/// BTCPay webhook receiver
///
/// Answers 200 for every accepted delivery, including ones that could not be
/// processed; only a failed signature check is surfaced.
#[utoipa::path(
    post,
    path = "/api/webhook",
    tag = "webhooks",
    request_body(content = String, description = "Raw BTCPay webhook JSON", content_type = "application/json"),
    params(("btcpay-sig" = Option<String>, Header, description = "sha256=<hex HMAC of body>")),
    responses(
        (status = 200, description = "Delivery accepted"),
        (status = 401, description = "Signature rejected", body = ErrorResponse)
    )
)]
pub async fn btcpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.webhooks.handle(&body, signature).await {
        WebhookOutcome::Rejected(SignatureError::Missing) => Err(ApiError::with_code(
            ErrorCode::SignatureMissing,
            "Missing webhook signature",
        )),
        WebhookOutcome::Rejected(e) => Err(ApiError::with_code(
            ErrorCode::InvalidSignature,
            format!("Invalid webhook signature: {}", e),
        )),
        _ => Ok(StatusCode::OK),
    }
}
