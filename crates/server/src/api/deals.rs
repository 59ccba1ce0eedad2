use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use crm_api::{deals, search::DealFilter};
use shared::{
    domain::{Deal, DealId},
    protocol::{DealDraft, DealPatch, StageChangeRequest},
};

use super::{body, failure, ApiFailure, ApiResult, Created};
use crate::app_state::AppState;

pub(crate) async fn http_list_deals(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DealFilter>,
) -> ApiResult<Vec<Deal>> {
    let deals = deals::list_deals(&state.crm, &filter)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(deals))
}

pub(crate) async fn http_get_deal(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<i64>,
) -> ApiResult<Deal> {
    let deal = deals::get_deal(&state.crm, DealId(deal_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(deal))
}

pub(crate) async fn http_create_deal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DealDraft>, JsonRejection>,
) -> Created<Deal> {
    let draft = body(&state.crm, payload)?;
    let deal = deals::create_deal(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(deal)))
}

pub(crate) async fn http_update_deal(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<i64>,
    payload: Result<Json<DealPatch>, JsonRejection>,
) -> ApiResult<Deal> {
    let patch = body(&state.crm, payload)?;
    let deal = deals::update_deal(&state.crm, DealId(deal_id), patch)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(deal))
}

/// Drag-and-drop on the pipeline board: `{"stage": "Closed Won"}`.
pub(crate) async fn http_change_deal_stage(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<i64>,
    payload: Result<Json<StageChangeRequest>, JsonRejection>,
) -> ApiResult<Deal> {
    let req = body(&state.crm, payload)?;
    let deal = deals::change_stage(&state.crm, DealId(deal_id), &req.stage)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(deal))
}

pub(crate) async fn http_delete_deal(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    deals::delete_deal(&state.crm, DealId(deal_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(StatusCode::NO_CONTENT)
}
