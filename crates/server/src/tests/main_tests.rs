use super::*;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{Client, Contact, Deal, DealStatus, Invoice, InvoiceStatus, Stage},
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tower::ServiceExt;

async fn test_app() -> Router {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    build_router(Arc::new(AppState::new(Arc::new(storage), 32)))
}

async fn send(app: &Router, method: &str, uri: &str, payload: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match payload {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    app.clone().oneshot(request).await.expect("response")
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn seed_contact(app: &Router) -> Contact {
    let response = send(
        app,
        "POST",
        "/contacts",
        Some(json!({
            "first_name": "Dana",
            "last_name": "Reyes",
            "email": "dana.reyes@northwind.test",
            "company": "Northwind",
            "relationship_level": "Decision Maker"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

async fn seed_deal(app: &Router, contact: &Contact) -> Deal {
    let response = send(
        app,
        "POST",
        "/deals",
        Some(json!({
            "title": "Northwind renewal",
            "contact_id": contact.id,
            "value": "12000",
            "probability": 60,
            "stage": "Negotiation",
            "expected_close_date": "2024-11-15",
            "products": ["Analytics", "Support"]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let app = test_app().await;
    let response = send(&app, "GET", "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn winning_a_deal_converts_contact_and_reopening_clears_close_date() {
    let app = test_app().await;
    let contact = seed_contact(&app).await;
    let deal = seed_deal(&app, &contact).await;
    assert_eq!(deal.account_id, "Northwind");
    assert_eq!(deal.status, DealStatus::Open);

    let response = send(
        &app,
        "POST",
        &format!("/deals/{}/stage", deal.id),
        Some(json!({ "stage": "Closed Won" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let won: Deal = read_json(response).await;
    assert_eq!(won.stage, Stage::ClosedWon);
    assert_eq!(won.status, DealStatus::Won);
    assert!(won.actual_close_date.is_some());

    let clients: Vec<Client> = read_json(send(&app, "GET", "/clients", None).await).await;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].email, contact.email);

    let response = send(
        &app,
        "POST",
        &format!("/deals/{}/stage", deal.id),
        Some(json!({ "stage": "Qualified" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reopened: Deal = read_json(response).await;
    assert_eq!(reopened.status, DealStatus::Open);
    assert_eq!(reopened.actual_close_date, None);

    let fetched: Deal =
        read_json(send(&app, "GET", &format!("/deals/{}", deal.id), None).await).await;
    assert_eq!(fetched.actual_close_date, None);
    assert_eq!(fetched.stage, Stage::Qualified);
}

#[tokio::test]
async fn unknown_stage_is_rejected_without_touching_the_deal() {
    let app = test_app().await;
    let contact = seed_contact(&app).await;
    let deal = seed_deal(&app, &contact).await;

    let response = send(
        &app,
        "POST",
        &format!("/deals/{}/stage", deal.id),
        Some(json!({ "stage": "Archived" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, ErrorCode::InvalidStage);

    let fetched: Deal =
        read_json(send(&app, "GET", &format!("/deals/{}", deal.id), None).await).await;
    assert_eq!(fetched.stage, Stage::Negotiation);
}

#[tokio::test]
async fn missing_records_and_bad_bodies_map_to_client_errors() {
    let app = test_app().await;

    let response = send(&app, "GET", "/deals/41", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, ErrorCode::NotFound);

    let response = send(&app, "DELETE", "/leads/3", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::post("/contacts")
        .header("content-type", "application/json")
        .body(Body::from("{\"first_name\": "))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, ErrorCode::Validation);

    let response = send(
        &app,
        "POST",
        "/deals",
        Some(json!({ "title": "No contact", "value": "10" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deal_list_filters_by_stage_and_search() {
    let app = test_app().await;
    let contact = seed_contact(&app).await;
    seed_deal(&app, &contact).await;

    let matching: Vec<Deal> =
        read_json(send(&app, "GET", "/deals?stage=Negotiation&search=northwind", None).await)
            .await;
    assert_eq!(matching.len(), 1);

    let none: Vec<Deal> =
        read_json(send(&app, "GET", "/deals?stage=Closed%20Won", None).await).await;
    assert!(none.is_empty());

    let metrics: Value = read_json(send(&app, "GET", "/pipeline/metrics", None).await).await;
    assert_eq!(metrics["total_deals"], json!(1));
    assert_eq!(metrics["count_by_stage"]["Negotiation"], json!(1));
    assert_eq!(metrics["count_by_stage"]["Closed Won"], json!(0));
}

#[tokio::test]
async fn invoice_totals_are_recomputed_and_paid_stamps_payment_date() {
    let app = test_app().await;
    let contact = seed_contact(&app).await;

    let response = send(
        &app,
        "POST",
        "/invoices",
        Some(json!({
            "contact_id": contact.id,
            "due_date": "2024-12-01",
            "line_items": [
                { "description": "Licenses", "quantity": "10", "unit_price": "100", "total": "1" },
                { "description": "Onboarding", "quantity": "1", "unit_price": "500" }
            ]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice: Invoice = read_json(response).await;
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.line_items[0].total.to_string(), "1000");
    assert_eq!(invoice.subtotal.to_string(), "1500");
    assert_eq!(invoice.tax_amount.normalize().to_string(), "120");
    assert_eq!(invoice.total_amount.normalize().to_string(), "1620");
    assert!(invoice.invoice_number.starts_with("INV-"));
    assert!(invoice.invoice_number.ends_with("-001"));

    let response = send(
        &app,
        "POST",
        &format!("/invoices/{}/status", invoice.id),
        Some(json!({ "status": "Paid" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let paid: Invoice = read_json(response).await;
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(paid.payment_date.is_some());

    let dashboard: Value = read_json(send(&app, "GET", "/dashboard", None).await).await;
    assert_eq!(dashboard["pending_invoices"], json!(0));
}
