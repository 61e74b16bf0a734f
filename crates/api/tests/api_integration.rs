//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::{InMemoryAuditLog, InMemoryNotifier, ReconcilePolicy};
use common::ProductId;
use domain::{Money, Product};
use gateway::{InMemoryPaymentGateway, ProviderState};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, Store};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    gateway: InMemoryPaymentGateway,
    notifier: InMemoryNotifier,
}

fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let gateway = InMemoryPaymentGateway::new();
    let notifier = InMemoryNotifier::new();

    let state = api::create_state(
        store.clone(),
        Arc::new(gateway.clone()),
        Arc::new(notifier.clone()),
        Arc::new(InMemoryAuditLog::new()),
        ReconcilePolicy {
            interval: Duration::from_millis(1),
            max_attempts: 12,
        },
    );
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        store,
        gateway,
        notifier,
    }
}

async fn seed_product(store: &InMemoryStore, price_cents: i64, stock: u32) -> ProductId {
    let product = Product {
        id: ProductId::new(),
        name: "Solar lantern".to_string(),
        image: String::new(),
        price: Money::from_cents(price_cents),
        count_in_stock: stock,
        seller_name: "Rift Valley Traders".to_string(),
    };
    let id = product.id;
    store.insert_product(product).await.unwrap();
    id
}

fn order_body(lines: &[(ProductId, u32)], items_price: f64) -> serde_json::Value {
    serde_json::json!({
        "orderItems": lines
            .iter()
            .map(|(id, quantity)| serde_json::json!({"product": id.to_string(), "quantity": quantity}))
            .collect::<Vec<_>>(),
        "shippingAddress": {
            "fullName": "Njeri Mwangi",
            "phone": "0712345678",
            "address": "Kimathi St 22",
            "city": "Nyeri"
        },
        "paymentMethod": "cash_on_delivery",
        "itemsPrice": items_price,
        "taxPrice": 0.0,
        "shippingPrice": 0.0,
        "totalPrice": items_price,
        "guestEmail": "guest@example.com"
    })
}

async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();
    let (status, json) = request_json(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_guest_order() {
    let t = setup();
    let lantern = seed_product(&t.store, 10_000, 4).await;
    let mug = seed_product(&t.store, 5_000, 10).await;

    let (status, json) = request_json(
        &t.app,
        "POST",
        "/orders",
        Some(order_body(&[(lantern, 1), (mug, 2)], 200.0)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["isPaid"], false);
    assert_eq!(json["isGuest"], true);
    assert_eq!(json["itemsPrice"], 200.0);
    assert_eq!(json["orderItems"].as_array().unwrap().len(), 2);

    // Commission figures are derived per line at the 10% rate.
    let first = &json["orderItems"][0];
    assert_eq!(first["grossAmount"], 100.0);
    assert_eq!(first["platformCommission"], 10.0);
    assert_eq!(first["sellerEarning"], 90.0);

    let remaining = t.store.get_product(lantern).await.unwrap().unwrap();
    assert_eq!(remaining.count_in_stock, 3);
}

#[tokio::test]
async fn test_guest_order_requires_email() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 4).await;

    let mut body = order_body(&[(p, 1)], 100.0);
    body.as_object_mut().unwrap().remove("guestEmail");

    let (status, json) = request_json(&t.app, "POST", "/orders", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn test_oversell_returns_conflict() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 1).await;

    let (status, json) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 2)], 200.0))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Out of stock"));
}

#[tokio::test]
async fn test_declared_total_mismatch_rejected() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 4).await;

    let (status, _) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 1.0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_order() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 4).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 100.0))).await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = request_json(&t.app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], created["id"]);

    let (status, _) = request_json(
        &t.app,
        "GET",
        "/orders/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request_json(&t.app, "GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pay_endpoint_is_idempotent() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 4).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 100.0))).await;
    let id = created["id"].as_str().unwrap();

    let payment = serde_json::json!({"provider": "manual", "reference": "RCPT-1"});
    let (status, first) = request_json(
        &t.app,
        "PUT",
        &format!("/orders/{id}/pay"),
        Some(payment.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["isPaid"], true);
    assert_eq!(first["status"], "paid");

    let (status, second) =
        request_json(&t.app, "PUT", &format!("/orders/{id}/pay"), Some(payment)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["paidAt"], first["paidAt"]);

    let confirmations = t
        .notifier
        .sent()
        .iter()
        .filter(|m| m.subject.starts_with("Payment confirmed"))
        .count();
    assert_eq!(confirmations, 1);
}

#[tokio::test]
async fn test_deliver_requires_paid() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 4).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 100.0))).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = request_json(&t.app, "PUT", &format!("/orders/{id}/deliver"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    request_json(
        &t.app,
        "PUT",
        &format!("/orders/{id}/pay"),
        Some(serde_json::json!({})),
    )
    .await;

    let (status, json) =
        request_json(&t.app, "PUT", &format!("/orders/{id}/deliver"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "delivered");
    assert_eq!(json["isDelivered"], true);
}

#[tokio::test]
async fn test_mobile_push_unconfigured_gateway() {
    let t = setup();
    t.gateway.set_configured(false);
    let p = seed_product(&t.store, 50_000, 2).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 500.0))).await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = request_json(
        &t.app,
        "POST",
        "/payments/mobile-push",
        Some(serde_json::json!({
            "amount": 500.0,
            "phone": "0712345678",
            "orderId": id,
        })),
    )
    .await;

    // Missing credentials are "payment unavailable", not an error.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], false);
    assert!(json.get("invoiceId").is_none());
}

#[tokio::test]
async fn test_mobile_push_invalid_phone() {
    let t = setup();
    let p = seed_product(&t.store, 50_000, 2).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 500.0))).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = request_json(
        &t.app,
        "POST",
        "/payments/mobile-push",
        Some(serde_json::json!({
            "amount": 500.0,
            "phone": "12345",
            "orderId": id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mobile_push_flow_confirms_in_background() {
    let t = setup();
    let p = seed_product(&t.store, 50_000, 2).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 500.0))).await;
    let id = created["id"].as_str().unwrap().to_string();

    t.gateway.script_states([
        ProviderState::Pending,
        ProviderState::Pending,
        ProviderState::Pending,
        ProviderState::Paid,
    ]);

    let (status, json) = request_json(
        &t.app,
        "POST",
        "/payments/mobile-push",
        Some(serde_json::json!({
            "amount": 500.0,
            "phone": "254712345678",
            "email": "guest@example.com",
            "fullName": "Njeri Mwangi",
            "orderId": id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], true);
    let invoice_id = json["invoiceId"].as_str().unwrap().to_string();

    // Reconciliation runs in the background; poll the cheap status endpoint
    // until the attempt settles.
    let mut settled = serde_json::Value::Null;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (status, json) = request_json(
            &t.app,
            "GET",
            &format!("/payments/mobile-status/{invoice_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if json["isPaid"] == true {
            settled = json;
            break;
        }
    }
    assert_eq!(settled["isPaid"], true, "attempt never settled");
    assert_eq!(settled["isFailed"], false);

    let (_, order) = request_json(&t.app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(order["isPaid"], true);
    assert_eq!(order["status"], "paid");
}

#[tokio::test]
async fn test_mobile_status_unknown_invoice() {
    let t = setup();
    let (status, _) =
        request_json(&t.app, "GET", "/payments/mobile-status/MM-9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_marks_order_paid_and_is_idempotent() {
    let t = setup();
    let p = seed_product(&t.store, 50_000, 2).await;

    let (_, created) =
        request_json(&t.app, "POST", "/orders", Some(order_body(&[(p, 1)], 500.0))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let payload = serde_json::json!({
        "orderId": id,
        "status": "COMPLETE",
        "paymentId": "MM-0007",
    });

    let (status, json) =
        request_json(&t.app, "POST", "/payments/webhook", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let (_, order) = request_json(&t.app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(order["isPaid"], true);

    // Redelivery acknowledges without a second transition.
    let (status, json) = request_json(&t.app, "POST", "/payments/webhook", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let confirmations = t
        .notifier
        .sent()
        .iter()
        .filter(|m| m.subject.starts_with("Payment confirmed"))
        .count();
    assert_eq!(confirmations, 1);
}

#[tokio::test]
async fn test_webhook_requires_order_id() {
    let t = setup();
    let (status, _) = request_json(
        &t.app,
        "POST",
        "/payments/webhook",
        Some(serde_json::json!({"status": "COMPLETE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_unknown_order_acknowledged() {
    let t = setup();
    let (status, json) = request_json(
        &t.app,
        "POST",
        "/payments/webhook",
        Some(serde_json::json!({
            "orderId": "00000000-0000-0000-0000-000000000000",
            "status": "COMPLETE",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
}

#[tokio::test]
async fn test_orders_mine_requires_buyer_context() {
    let t = setup();
    let (status, _) = request_json(&t.app, "GET", "/orders/mine", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_orders_mine_with_buyer_headers() {
    let t = setup();
    let p = seed_product(&t.store, 10_000, 4).await;
    let buyer_id = uuid::Uuid::new_v4();

    let mut body = order_body(&[(p, 1)], 100.0);
    body.as_object_mut().unwrap().remove("guestEmail");

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("x-buyer-id", buyer_id.to_string())
                .header("x-buyer-email", "member@example.com")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/orders/mine")
                .header("x-buyer-id", buyer_id.to_string())
                .header("x-buyer-email", "member@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["isGuest"], false);
    assert_eq!(json[0]["guestEmail"], "member@example.com");
}
