use chrono::Utc;
use shared::{
    domain::{Client, ClientId},
    error::CrmError,
    protocol::{ChangeKind, ClientDraft, ClientPatch, Notice},
};

use crate::{
    contacts::{validate_person, validate_person_patch},
    search::{matches_search, search_term, ClientFilter},
    CrmContext, Stamped, Stamps,
};

pub async fn list_clients(ctx: &CrmContext, filter: &ClientFilter) -> Result<Vec<Client>, CrmError> {
    let term = search_term(&filter.search);
    Ok(ctx
        .clients
        .get_all()
        .await?
        .into_iter()
        .filter(|client| {
            filter
                .relationship_level
                .map_or(true, |level| client.relationship_level == level)
        })
        .filter(|client| {
            filter
                .company
                .as_deref()
                .map_or(true, |company| client.company.eq_ignore_ascii_case(company))
        })
        .filter(|client| {
            matches_search(
                term,
                [
                    client.first_name.as_str(),
                    client.last_name.as_str(),
                    client.email.as_str(),
                    client.company.as_str(),
                ],
            )
        })
        .collect())
}

pub async fn get_client(ctx: &CrmContext, id: ClientId) -> Result<Client, CrmError> {
    ctx.clients
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("client", id))
}

pub async fn create_client(ctx: &CrmContext, draft: ClientDraft) -> Result<Client, CrmError> {
    validate_person(&draft.first_name, &draft.last_name, &draft.email)?;
    let client = ctx
        .clients
        .create(&Stamped {
            fields: &draft,
            stamps: Stamps {
                last_interaction: Some(Utc::now()),
                ..Stamps::default()
            },
        })
        .await?;
    ctx.record_changed::<Client>(client.id, ChangeKind::Created);
    ctx.notify(Notice::success("Client created successfully!"));
    Ok(client)
}

pub async fn update_client(
    ctx: &CrmContext,
    id: ClientId,
    patch: ClientPatch,
) -> Result<Client, CrmError> {
    validate_person_patch(
        patch.first_name.as_ref(),
        patch.last_name.as_ref(),
        patch.email.as_ref(),
    )?;
    let client = ctx
        .clients
        .update(id, &patch)
        .await?
        .ok_or_else(|| CrmError::not_found("client", id))?;
    ctx.record_changed::<Client>(id, ChangeKind::Updated);
    ctx.notify(Notice::success("Client updated successfully!"));
    Ok(client)
}

pub async fn delete_client(ctx: &CrmContext, id: ClientId) -> Result<(), CrmError> {
    if !ctx.clients.delete(id).await? {
        return Err(CrmError::not_found("client", id));
    }
    ctx.record_changed::<Client>(id, ChangeKind::Deleted);
    ctx.notify(Notice::success("Client deleted successfully!"));
    Ok(())
}
