//! HTTP handlers. Each one unwraps the request, calls the matching
//! `crm_api` operation and maps `CrmError` onto a status code.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use crm_api::{dashboard::dashboard, deals::pipeline_metrics, sales_teams, CrmContext};
use pipeline::{DashboardSummary, PipelineMetrics};
use shared::{
    domain::{SalesTeam, SalesTeamId},
    error::{ApiError, CrmError, ErrorCode},
    protocol::{Notice, SalesTeamDraft},
};
use tracing::{error, warn};

use crate::app_state::AppState;

pub(crate) mod activities;
pub(crate) mod deals;
pub(crate) mod invoices;
pub(crate) mod people;

pub(crate) type ApiFailure = (StatusCode, Json<ApiError>);
pub(crate) type ApiResult<T> = Result<Json<T>, ApiFailure>;
pub(crate) type Created<T> = Result<(StatusCode, Json<T>), ApiFailure>;

pub(crate) fn status_for(err: &CrmError) -> StatusCode {
    match err {
        CrmError::Validation(_) | CrmError::InvalidStage(_) => StatusCode::BAD_REQUEST,
        CrmError::NotFound { .. } => StatusCode::NOT_FOUND,
        CrmError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Logs the failure, tells live subscribers about it and builds the error
/// response.
pub(crate) fn failure(crm: &CrmContext, err: CrmError) -> ApiFailure {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }
    crm.notify(Notice::error(err.to_string()));
    (status, Json(ApiError::from(err)))
}

/// Unwraps a JSON body, turning axum's rejection into a validation error.
pub(crate) fn body<T>(
    crm: &CrmContext,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiFailure> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            let message = rejection.body_text();
            warn!(error = %message, "malformed request body");
            crm.notify(Notice::error("Request body could not be read"));
            Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(ErrorCode::Validation, message)),
            ))
        }
    }
}

pub(crate) async fn http_dashboard(
    State(state): State<Arc<AppState>>,
) -> ApiResult<DashboardSummary> {
    let summary = dashboard(&state.crm)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(summary))
}

pub(crate) async fn http_pipeline_metrics(
    State(state): State<Arc<AppState>>,
) -> ApiResult<PipelineMetrics> {
    let metrics = pipeline_metrics(&state.crm)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(metrics))
}

pub(crate) async fn http_list_sales_teams(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<SalesTeam>> {
    let teams = sales_teams::list_sales_teams(&state.crm)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(teams))
}

pub(crate) async fn http_get_sales_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<i64>,
) -> ApiResult<SalesTeam> {
    let team = sales_teams::get_sales_team(&state.crm, SalesTeamId(team_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(team))
}

pub(crate) async fn http_create_sales_team(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SalesTeamDraft>, JsonRejection>,
) -> Created<SalesTeam> {
    let draft = body(&state.crm, payload)?;
    let team = sales_teams::create_sales_team(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
