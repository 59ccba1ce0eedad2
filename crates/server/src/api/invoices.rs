use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use crm_api::{invoices, search::InvoiceFilter};
use shared::{
    domain::{Invoice, InvoiceId},
    protocol::{InvoiceDraft, InvoicePatch, InvoiceStatusRequest},
};

use super::{body, failure, ApiFailure, ApiResult, Created};
use crate::app_state::AppState;

pub(crate) async fn http_list_invoices(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<InvoiceFilter>,
) -> ApiResult<Vec<Invoice>> {
    let invoices = invoices::list_invoices(&state.crm, &filter)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(invoices))
}

pub(crate) async fn http_get_invoice(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<i64>,
) -> ApiResult<Invoice> {
    let invoice = invoices::get_invoice(&state.crm, InvoiceId(invoice_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(invoice))
}

/// Totals in the body are ignored; they are always recomputed from the lines.
pub(crate) async fn http_create_invoice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InvoiceDraft>, JsonRejection>,
) -> Created<Invoice> {
    let draft = body(&state.crm, payload)?;
    let invoice = invoices::create_invoice(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub(crate) async fn http_update_invoice(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<i64>,
    payload: Result<Json<InvoicePatch>, JsonRejection>,
) -> ApiResult<Invoice> {
    let patch = body(&state.crm, payload)?;
    let invoice = invoices::update_invoice(&state.crm, InvoiceId(invoice_id), patch)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(invoice))
}

pub(crate) async fn http_set_invoice_status(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<i64>,
    payload: Result<Json<InvoiceStatusRequest>, JsonRejection>,
) -> ApiResult<Invoice> {
    let req = body(&state.crm, payload)?;
    let invoice = invoices::set_invoice_status(&state.crm, InvoiceId(invoice_id), req.status)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(invoice))
}

pub(crate) async fn http_delete_invoice(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    invoices::delete_invoice(&state.crm, InvoiceId(invoice_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(StatusCode::NO_CONTENT)
}
