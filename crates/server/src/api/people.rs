//! Contacts, clients and leads share one form shape and one handler shape.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use crm_api::{
    clients, contacts, leads,
    search::{ClientFilter, ContactFilter, LeadFilter},
};
use shared::{
    domain::{Client, ClientId, Contact, ContactId, Lead, LeadId},
    protocol::{ClientDraft, ClientPatch, ContactDraft, ContactPatch, LeadDraft, LeadPatch},
};

use super::{body, failure, ApiFailure, ApiResult, Created};
use crate::app_state::AppState;

pub(crate) async fn http_list_contacts(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ContactFilter>,
) -> ApiResult<Vec<Contact>> {
    let contacts = contacts::list_contacts(&state.crm, &filter)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(contacts))
}

pub(crate) async fn http_get_contact(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
) -> ApiResult<Contact> {
    let contact = contacts::get_contact(&state.crm, ContactId(contact_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(contact))
}

pub(crate) async fn http_create_contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactDraft>, JsonRejection>,
) -> Created<Contact> {
    let draft = body(&state.crm, payload)?;
    let contact = contacts::create_contact(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub(crate) async fn http_update_contact(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
    payload: Result<Json<ContactPatch>, JsonRejection>,
) -> ApiResult<Contact> {
    let patch = body(&state.crm, payload)?;
    let contact = contacts::update_contact(&state.crm, ContactId(contact_id), patch)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(contact))
}

pub(crate) async fn http_delete_contact(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    contacts::delete_contact(&state.crm, ContactId(contact_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn http_list_clients(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ClientFilter>,
) -> ApiResult<Vec<Client>> {
    let clients = clients::list_clients(&state.crm, &filter)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(clients))
}

pub(crate) async fn http_get_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> ApiResult<Client> {
    let client = clients::get_client(&state.crm, ClientId(client_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(client))
}

pub(crate) async fn http_create_client(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClientDraft>, JsonRejection>,
) -> Created<Client> {
    let draft = body(&state.crm, payload)?;
    let client = clients::create_client(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub(crate) async fn http_update_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
    payload: Result<Json<ClientPatch>, JsonRejection>,
) -> ApiResult<Client> {
    let patch = body(&state.crm, payload)?;
    let client = clients::update_client(&state.crm, ClientId(client_id), patch)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(client))
}

pub(crate) async fn http_delete_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    clients::delete_client(&state.crm, ClientId(client_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn http_list_leads(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LeadFilter>,
) -> ApiResult<Vec<Lead>> {
    let leads = leads::list_leads(&state.crm, &filter)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(leads))
}

pub(crate) async fn http_get_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<i64>,
) -> ApiResult<Lead> {
    let lead = leads::get_lead(&state.crm, LeadId(lead_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(lead))
}

pub(crate) async fn http_create_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LeadDraft>, JsonRejection>,
) -> Created<Lead> {
    let draft = body(&state.crm, payload)?;
    let lead = leads::create_lead(&state.crm, draft)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok((StatusCode::CREATED, Json(lead)))
}

pub(crate) async fn http_update_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<i64>,
    payload: Result<Json<LeadPatch>, JsonRejection>,
) -> ApiResult<Lead> {
    let patch = body(&state.crm, payload)?;
    let lead = leads::update_lead(&state.crm, LeadId(lead_id), patch)
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(Json(lead))
}

pub(crate) async fn http_delete_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    leads::delete_lead(&state.crm, LeadId(lead_id))
        .await
        .map_err(|err| failure(&state.crm, err))?;
    Ok(StatusCode::NO_CONTENT)
}
