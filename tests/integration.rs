use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_settlement::api::rest::router;
use delivery_settlement::config::Config;
use delivery_settlement::pix::verify_checksum;
use delivery_settlement::state::AppState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    let mut config = Config::default();
    config.pix.key = Some("pix@restaurante.com.br".to_string());
    config.pix.merchant_name = "Restaurante Sabor".to_string();
    config.pix.merchant_city = "Sao Paulo".to_string();
    router(Arc::new(AppState::new(&config)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn create_courier(app: &axum::Router, body: Value) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/couriers", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_order(app: &axum::Router, value: &str, payment_method: &str) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "customer_name": "Marina",
                "address": "Rua Augusta, 500",
                "items": [{ "name": "Combo", "quantity": 1, "unit_price": value }],
                "payment_method": payment_method,
                "service_type": "delivery"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn send_event(app: &axum::Router, order_id: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/events"),
            body,
        ))
        .await
        .unwrap()
}

/// Drives an order from intake to `delivering` with the given courier.
async fn to_delivering(app: &axum::Router, order_id: &str, courier_id: &str) -> Value {
    let res = send_event(app, order_id, json!({ "event": "start_preparation" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = send_event(app, order_id, json!({ "event": "mark_ready" })).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send_event(
        app,
        order_id,
        json!({ "event": "assign", "driver_id": courier_id, "expected_status": "ready" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let assigned = body_json(res).await;

    let res = send_event(
        app,
        order_id,
        json!({ "event": "confirm_pickup", "input_code": assigned["restaurant_code"] }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send_event(app, order_id, json!({ "event": "start_delivery" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["orders"], 0);
    assert_eq!(body["settlements"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_created_total"));
    assert!(body.contains("settlements_closed_total"));
}

#[tokio::test]
async fn create_order_returns_pending_without_codes() {
    let app = setup();
    let order = create_order(&app, "42.90", "cartao").await;

    assert_eq!(order["status"], "pending");
    assert_eq!(money(&order["value"]), dec!(42.90));
    assert!(order["driver_id"].is_null());
    assert!(order["restaurant_code"].is_null());
    assert!(order["delivery_confirmation_code"].is_null());
}

#[tokio::test]
async fn negative_order_value_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "customer_name": "Marina",
                "value": "-3.00",
                "payment_method": "pix"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_amount");
}

#[tokio::test]
async fn overflowing_item_total_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "customer_name": "Marina",
                "items": [
                    {"name": "Banquete", "quantity": 2, "unit_price": "79228162514264337593543950335"}
                ],
                "payment_method": "pix"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_amount");
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_preparation_mints_codes_once() {
    let app = setup();
    let order = create_order(&app, "20.00", "dinheiro").await;
    let id = order["id"].as_str().unwrap();

    let res = send_event(&app, id, json!({ "event": "start_preparation" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let preparing = body_json(res).await;
    assert_eq!(preparing["status"], "preparing");
    assert_eq!(preparing["restaurant_code"].as_str().unwrap().len(), 4);

    let res = send_event(&app, id, json!({ "event": "mark_ready" })).await;
    let ready = body_json(res).await;
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["restaurant_code"], preparing["restaurant_code"]);
    assert_eq!(
        ready["delivery_confirmation_code"],
        preparing["delivery_confirmation_code"]
    );
}

#[tokio::test]
async fn stale_expected_status_returns_409() {
    let app = setup();
    let order = create_order(&app, "20.00", "dinheiro").await;
    let id = order["id"].as_str().unwrap();

    send_event(&app, id, json!({ "event": "start_preparation" })).await;
    let res = send_event(
        &app,
        id,
        json!({ "event": "start_preparation", "expected_status": "pending" }),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["code"], "concurrent_modification");
}

#[tokio::test]
async fn wrong_delivery_code_keeps_order_delivering() {
    let app = setup();
    let courier_id = create_courier(
        &app,
        json!({ "name": "Paulo", "payment_model": "fixed_per_delivery", "payment_rate": "6.00" }),
    )
    .await;
    let order = create_order(&app, "35.00", "cartao").await;
    let id = order["id"].as_str().unwrap();

    let delivering = to_delivering(&app, id, &courier_id).await;
    assert_eq!(delivering["status"], "delivering");
    let code = delivering["delivery_confirmation_code"].as_str().unwrap();
    let wrong = if code == "1234" { "4321" } else { "1234" };

    let res = send_event(
        &app,
        id,
        json!({ "event": "confirm_delivery", "input_code": wrong }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["code"], "code_mismatch");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();
    let stored = body_json(res).await;
    assert_eq!(stored["status"], "delivering");
    assert!(stored["completed_at"].is_null());
}

#[tokio::test]
async fn cancelled_order_rejects_further_events() {
    let app = setup();
    let order = create_order(&app, "12.00", "dinheiro").await;
    let id = order["id"].as_str().unwrap();

    let res = send_event(&app, id, json!({ "event": "cancel" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");

    for event in ["start_preparation", "complete_manually", "cancel"] {
        let res = send_event(&app, id, json!({ "event": event })).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["code"], "invalid_transition");
    }
}

#[tokio::test]
async fn pix_payload_is_served_for_pix_orders() {
    let app = setup();
    let order = create_order(&app, "25.50", "PIX").await;
    let id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}/pix")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    let payload = body["payload"].as_str().unwrap();
    assert!(payload.starts_with("00020101021226"));
    assert!(payload.contains("pix@restaurante.com.br"));
    assert!(payload.contains("540525.50"));
    assert!(payload.contains("RESTAURANTE SABOR"));
    assert!(verify_checksum(payload));
}

#[tokio::test]
async fn pix_payload_for_card_order_returns_400() {
    let app = setup();
    let order = create_order(&app, "25.50", "cartao").await;
    let id = order["id"].as_str().unwrap();

    let res = app
        .oneshot(get_request(&format!("/orders/{id}/pix")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auto_assign_without_couriers_returns_503() {
    let app = setup();
    let order = create_order(&app, "25.50", "cartao").await;
    let id = order["id"].as_str().unwrap();

    send_event(&app, id, json!({ "event": "start_preparation" })).await;
    send_event(&app, id, json!({ "event": "mark_ready" })).await;
    let res = send_event(&app, id, json!({ "event": "auto_assign" })).await;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn invalid_percentage_rate_returns_400() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "Rita", "payment_model": "percentage", "payment_rate": "120" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_settlement_flow() {
    let app = setup();
    let courier_id = create_courier(
        &app,
        json!({ "name": "Dispatch Dan", "payment_model": "percentage", "payment_rate": "10" }),
    )
    .await;

    for value in ["50.00", "30.00"] {
        let order = create_order(&app, value, "dinheiro").await;
        let id = order["id"].as_str().unwrap();
        let delivering = to_delivering(&app, id, &courier_id).await;

        let res = send_event(
            &app,
            id,
            json!({
                "event": "confirm_delivery",
                "input_code": delivering["delivery_confirmation_code"],
                "expected_status": "delivering"
            }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let completed = body_json(res).await;
        assert_eq!(completed["status"], "completed");
        assert!(!completed["completed_at"].is_null());
    }

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/couriers/{courier_id}/advances"),
            json!({ "amount": "5.00", "note": "combustivel" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/couriers/{courier_id}/settlement")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let preview = body_json(res).await;
    assert_eq!(preview["deliveries_count"], 2);
    assert_eq!(money(&preview["earnings"]), dec!(8.00));
    assert_eq!(money(&preview["payable"]), dec!(3.00));

    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

    let res = app
        .clone()
        .oneshot(empty_post(&format!("/couriers/{courier_id}/settlement")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let settlement = body_json(res).await;
    assert_eq!(settlement["deliveries_count"], 2);
    assert_eq!(money(&settlement["deliveries_total"]), dec!(8.00));
    assert_eq!(money(&settlement["vales_total"]), dec!(5.00));
    assert_eq!(money(&settlement["final_amount"]), dec!(3.00));

    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/couriers/{courier_id}/settlement")))
        .await
        .unwrap();
    let next = body_json(res).await;
    assert_eq!(next["deliveries_count"], 0);
    assert_eq!(money(&next["payable"]), Decimal::ZERO);

    let res = app
        .oneshot(get_request(&format!("/couriers/{courier_id}/settlements")))
        .await
        .unwrap();
    let history = body_json(res).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}
