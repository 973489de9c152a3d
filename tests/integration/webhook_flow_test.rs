mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use btcpay_relay::utils::sign_payload;
use common::*;

const SECRET: &str = "whsec-test";

fn event(event_type: &str, invoice_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "deliveryId": "delivery-1",
        "webhookId": "webhook-1",
        "isRedelivery": false,
        "type": event_type,
        "timestamp": 1700000100,
        "storeId": STORE_ID,
        "invoiceId": invoice_id
    }))
    .unwrap()
}

fn webhook_request(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("btcpay-sig", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

fn signed(body: &[u8]) -> Option<String> {
    Some(format!("sha256={}", sign_payload(SECRET, body).unwrap()))
}

#[tokio::test]
async fn test_signed_settlement_notifies_admin_then_buyer() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV1", "Settled", Some(BUYER)), 1).await;
    mount_payment_methods(
        &server,
        "INV1",
        json!([{ "paymentMethodId": "BTC-CHAIN", "currency": "BTC", "amount": "0.0005", "payments": [] }]),
    )
    .await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = event("InvoiceSettled", "INV1");
    let signature = signed(&body);
    let response = app.oneshot(webhook_request(body, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, ADMIN);
    assert_eq!(sent[0].subject, "Payment Settled: Invoice INV1");
    assert!(sent[0].html_body.contains("BTC-CHAIN"));
    assert!(sent[0].text_body.contains(&format!("{}/invoices/INV1", server.uri())));
    assert_eq!(sent[1].to, BUYER);
}

#[tokio::test]
async fn test_forged_signature_is_rejected_without_side_effects() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV1", "Settled", Some(BUYER)), 0).await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = event("InvoiceSettled", "INV1");
    let forged = Some(format!("sha256={}", sign_payload("wrong-secret", &body).unwrap()));
    let response = app.oneshot(webhook_request(body, forged)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV1", "Settled", None), 0).await;
    let (app, mailer) = app(&server, Some(SECRET));

    let response = app
        .oneshot(webhook_request(event("InvoiceSettled", "INV1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "AUTH_1002");
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_signature_over_reformatted_body_is_rejected() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV1", "Settled", None), 0).await;
    let (app, _mailer) = app(&server, Some(SECRET));

    let original = event("InvoiceSettled", "INV1");
    let signature = signed(&original);
    let value: serde_json::Value = serde_json::from_slice(&original).unwrap();
    let pretty = serde_json::to_vec_pretty(&value).unwrap();

    let response = app.oneshot(webhook_request(pretty, signature)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsigned_delivery_accepted_when_no_secret() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV2", "Processing", Some(BUYER)), 1).await;
    mount_payment_methods(&server, "INV2", json!([])).await;
    let (app, mailer) = app(&server, None);

    let response = app
        .oneshot(webhook_request(event("InvoiceProcessing", "INV2"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "Payment Processing: Invoice INV2");
}

#[tokio::test]
async fn test_received_payment_subject() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV3", "Processing", None), 1).await;
    mount_payment_methods(&server, "INV3", json!([])).await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = event("InvoiceReceivedPayment", "INV3");
    let signature = signed(&body);
    let response = app.oneshot(webhook_request(body, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Payment Received: Invoice INV3");
}

#[tokio::test]
async fn test_expired_invoice_notifies_admin_only() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV4", "Expired", Some(BUYER)), 1).await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = event("InvoiceExpired", "INV4");
    let signature = signed(&body);
    let response = app.oneshot(webhook_request(body, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ADMIN);
    assert!(sent[0].html_body.contains("Failed/Expired"));
}

#[tokio::test]
async fn test_invalid_invoice_notifies_admin_only() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV5", "Invalid", Some(BUYER)), 1).await;
    let (app, mailer) = app(&server, None);

    let response = app
        .oneshot(webhook_request(event("InvoiceInvalid", "INV5"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("Invalid"));
}

#[tokio::test]
async fn test_unknown_event_type_is_ignored() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV6", "New", Some(BUYER)), 0).await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = event("InvoiceCreated", "INV6");
    let signature = signed(&body);
    let response = app.oneshot(webhook_request(body, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_body_answers_ok() {
    let server = MockServer::start().await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = b"{not json".to_vec();
    let signature = signed(&body);
    let response = app.oneshot(webhook_request(body, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_missing_invoice_id_answers_ok() {
    let server = MockServer::start().await;
    let (app, mailer) = app(&server, None);

    let body = serde_json::to_vec(&json!({ "type": "InvoiceSettled" })).unwrap();
    let response = app.oneshot(webhook_request(body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_invoice_fetch_failure_answers_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(invoice_path("INV7")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    let (app, mailer) = app(&server, None);

    let response = app
        .oneshot(webhook_request(event("InvoiceSettled", "INV7"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_payment_methods_failure_still_notifies() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV8", "Settled", None), 1).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/payment-methods", invoice_path("INV8"))))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (app, mailer) = app(&server, None);

    let response = app
        .oneshot(webhook_request(event("InvoicePaymentSettled", "INV8"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html_body.contains("No payment method details available"));
}

#[tokio::test]
async fn test_mail_failure_answers_ok() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV9", "Settled", Some(BUYER)), 1).await;
    mount_payment_methods(&server, "INV9", json!([])).await;
    let mailer = Arc::new(RecordingMailer::failing_for(ADMIN));
    let app = app_with(&server, None, true, mailer.clone());

    let response = app
        .oneshot(webhook_request(event("InvoiceSettled", "INV9"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, BUYER);
}

#[tokio::test]
async fn test_buyer_receipts_can_be_disabled() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV10", "Settled", Some(BUYER)), 1).await;
    mount_payment_methods(&server, "INV10", json!([])).await;
    let mailer = Arc::new(RecordingMailer::default());
    let app = app_with(&server, None, false, mailer.clone());

    let response = app
        .oneshot(webhook_request(event("InvoiceSettled", "INV10"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ADMIN);
}

#[tokio::test]
async fn test_path_like_invoice_id_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (app, mailer) = app(&server, None);

    let response = app
        .oneshot(webhook_request(event("InvoiceSettled", "../../api-keys/current"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_loosely_typed_optional_fields_still_notify() {
    let server = MockServer::start().await;
    mount_invoice(&server, invoice_json("INV9", "Settled", None), 1).await;
    mount_payment_methods(&server, "INV9", json!([])).await;
    let (app, mailer) = app(&server, Some(SECRET));

    let body = serde_json::to_vec(&json!({
        "type": "InvoiceSettled",
        "invoiceId": "INV9",
        "isRedelivery": null,
        "deliveryId": 17,
        "overPaid": "weird",
        "timestamp": "x"
    }))
    .unwrap();
    let signature = signed(&body);
    let response = app.oneshot(webhook_request(body, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Payment Settled: Invoice INV9");
}
