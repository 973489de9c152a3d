mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn invoices_path() -> String {
    format!("/api/v1/stores/{}/invoices", STORE_ID)
}

async fn mount_create_never_called(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(invoices_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_or_non_positive_amount_rejected_before_upstream() {
    let server = MockServer::start().await;
    mount_create_never_called(&server).await;
    let (app, _) = app(&server, None);

    for body in [
        json!({ "productId": "sku-1" }),
        json!({ "amount": 0 }),
        json!({ "amount": "-5.00" }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/create-invoice", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);

        let json = body_json(response).await;
        assert_eq!(json["error"]["field"], "amount");
    }
}

#[tokio::test]
async fn test_invalid_email_rejected_before_upstream() {
    let server = MockServer::start().await;
    mount_create_never_called(&server).await;
    let (app, _) = app(&server, None);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/create-invoice",
            json!({ "amount": "10.00", "customerEmail": "not-an-email" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["field"], "customerEmail");
}

#[tokio::test]
async fn test_malformed_json_rejected_before_upstream() {
    let server = MockServer::start().await;
    mount_create_never_called(&server).await;
    let (app, _) = app(&server, None);

    let request = Request::builder()
        .method("POST")
        .uri("/api/create-invoice")
        .header("content-type", "application/json")
        .body(Body::from("{\"amount\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_invoice_builds_processor_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(invoices_path()))
        .and(header("authorization", "token api-key"))
        .and(body_partial_json(json!({
            "amount": "19.99",
            "currency": "EUR",
            "metadata": {
                "orderId": "order-sku-1",
                "buyerEmail": BUYER,
                "itemCode": "sku-1",
                "itemDesc": "Blue T-Shirt",
                "description": "Payment for product: sku-1",
                "posData": { "Gameid": "Blue T-Shirt" }
            },
            "checkout": {
                "redirectURL": "https://shop.example.com",
                "defaultPaymentMethod": "BTC",
                "expirationMinutes": 15
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json("NEW1", "New", Some(BUYER))))
        .expect(1)
        .mount(&server)
        .await;
    let (app, _) = app(&server, None);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/create-invoice",
            json!({
                "amount": "19.99",
                "currency": "EUR",
                "productId": "sku-1",
                "title": "Blue T-Shirt",
                "customerEmail": BUYER
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["invoiceId"], "NEW1");
    assert_eq!(json["paymentUrl"], "https://pay.example.com/i/NEW1");
    assert_eq!(json["status"], "New");
    assert_eq!(json["expirationTime"], 1700000900);
}

#[tokio::test]
async fn test_numeric_amount_and_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(invoices_path()))
        .and(body_partial_json(json!({
            "amount": "20",
            "currency": "USD",
            "metadata": { "itemCode": "product", "itemDesc": "Product Purchase" },
            "checkout": { "redirectURL": "https://shop.example.com/thanks" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json("NEW2", "New", None)))
        .expect(1)
        .mount(&server)
        .await;
    let (app, _) = app(&server, None);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/create-invoice",
            json!({ "amount": 20, "redirectUrl": "https://shop.example.com/thanks" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_processor_failure_returns_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(invoices_path()))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;
    let (app, _) = app(&server, None);

    let response = app
        .oneshot(json_request("POST", "/api/create-invoice", json!({ "amount": "5" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "EXT_8003");
}

#[tokio::test]
async fn test_status_flags_follow_invoice_status() {
    let server = MockServer::start().await;
    for (id, status) in [("S1", "Settled"), ("S2", "Processing"), ("S3", "New"), ("S4", "Expired")] {
        mount_invoice(&server, invoice_json(id, status, None), 1).await;
    }
    let (app, _) = app(&server, None);

    for (id, status, received, completed) in [
        ("S1", "Settled", true, true),
        ("S2", "Processing", true, false),
        ("S3", "New", false, false),
        ("S4", "Expired", false, false),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/invoices/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["invoiceId"], id);
        assert_eq!(json["status"], status);
        assert_eq!(json["paymentReceived"], received);
        assert_eq!(json["paymentCompleted"], completed);
    }
}

#[tokio::test]
async fn test_unknown_invoice_returns_500() {
    let server = MockServer::start().await;
    let (app, _) = app(&server, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/invoices/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_encoded_traversal_in_invoice_id_never_leaves_invoice_path() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "leaked" })))
        .expect(0)
        .mount(&server)
        .await;
    let (app, _) = app(&server, None);

    for id in [
        "..%2F..%2F..%2Fapi-keys%2Fcurrent",
        "INV1%3FstoreId%3Dother",
        "INV1%23frag",
        "..",
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/invoices/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "id {}", id);

        let json = body_json(response).await;
        assert_eq!(json["error"]["field"], "invoiceId");
        assert_eq!(json["error"]["code"], "VAL_3003");
    }
}
