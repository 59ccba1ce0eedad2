use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use crm_api::{activities, search::ActivityFilter};
use shared::{
    domain::{Activity, ActivityId},
    protocol::{ActivityDraft, ActivityPatch},
};

use super::{body, failure, ApiFailure, ApiResult, Created};
use crate::app_state::AppState;

/// Newest first.
pub(crate) async fn http_list_activities(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ActivityFilter>,
) -> ApiResult<Vec<Activity>> {
    let activities = activities::list_activities(&state.crm, &filter)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(activities))
}

pub(crate) async fn http_get_activity(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> ApiResult<Activity> {
    let activity = activities::get_activity(&state.crm, ActivityId(activity_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(activity))
}

pub(crate) async fn http_create_activity(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActivityDraft>, JsonRejection>,
) -> Created<Activity> {
    let draft = body(&state.crm, payload)?;
    let activity = activities::create_activity(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub(crate) async fn http_update_activity(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    payload: Result<Json<ActivityPatch>, JsonRejection>,
) -> ApiResult<Activity> {
    let patch = body(&state.crm, payload)?;
    let activity = activities::update_activity(&state.crm, ActivityId(activity_id), patch)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(activity))
}

pub(crate) async fn http_delete_activity(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    activities::delete_activity(&state.crm, ActivityId(activity_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(StatusCode::NO_CONTENT)
}
