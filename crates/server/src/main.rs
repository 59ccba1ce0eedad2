use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::sync::broadcast::error::RecvError;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::{activities::*, deals::*, invoices::*, people::*};
use app_state::{open_backend, AppState};
use config::load_settings;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let backend = open_backend(&settings).await?;
    let state = AppState::new(backend, settings.event_buffer);
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, backend = ?settings.backend, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/dashboard", get(api::http_dashboard))
        .route("/pipeline/metrics", get(api::http_pipeline_metrics))
        .route("/deals", get(http_list_deals).post(http_create_deal))
        .route(
            "/deals/:deal_id",
            get(http_get_deal)
                .patch(http_update_deal)
                .put(http_update_deal)
                .delete(http_delete_deal),
        )
        .route("/deals/:deal_id/stage", post(http_change_deal_stage))
        .route("/contacts", get(http_list_contacts).post(http_create_contact))
        .route(
            "/contacts/:contact_id",
            get(http_get_contact)
                .patch(http_update_contact)
                .put(http_update_contact)
                .delete(http_delete_contact),
        )
        .route("/clients", get(http_list_clients).post(http_create_client))
        .route(
            "/clients/:client_id",
            get(http_get_client)
                .patch(http_update_client)
                .put(http_update_client)
                .delete(http_delete_client),
        )
        .route("/leads", get(http_list_leads).post(http_create_lead))
        .route(
            "/leads/:lead_id",
            get(http_get_lead)
                .patch(http_update_lead)
                .put(http_update_lead)
                .delete(http_delete_lead),
        )
        .route(
            "/activities",
            get(http_list_activities).post(http_create_activity),
        )
        .route(
            "/activities/:activity_id",
            get(http_get_activity)
                .patch(http_update_activity)
                .put(http_update_activity)
                .delete(http_delete_activity),
        )
        .route("/invoices", get(http_list_invoices).post(http_create_invoice))
        .route(
            "/invoices/:invoice_id",
            get(http_get_invoice)
                .patch(http_update_invoice)
                .put(http_update_invoice)
                .delete(http_delete_invoice),
        )
        .route("/invoices/:invoice_id/status", post(http_set_invoice_status))
        .route(
            "/sales_teams",
            get(api::http_list_sales_teams).post(api::http_create_sales_team),
        )
        .route("/sales_teams/:team_id", get(api::http_get_sales_team))
        .route("/events", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

/// Streams every `CrmEvent` to the socket as JSON text until either side
/// goes away. Incoming frames are ignored.
async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.crm.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagging; dropped events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
