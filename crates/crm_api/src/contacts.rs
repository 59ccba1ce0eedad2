use chrono::Utc;
use shared::{
    domain::{Contact, ContactId},
    error::CrmError,
    protocol::{ChangeKind, ContactDraft, ContactPatch, Notice},
};

use crate::{
    search::{matches_search, search_term, ContactFilter},
    CrmContext, Stamped, Stamps,
};

/// Required fields shared by the contact, client and lead forms.
pub(crate) fn validate_person(
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<(), CrmError> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(CrmError::validation("first and last name are required"));
    }
    validate_email(email)
}

pub(crate) fn validate_email(email: &str) -> Result<(), CrmError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(CrmError::validation(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}

pub(crate) fn validate_person_patch(
    first_name: Option<&String>,
    last_name: Option<&String>,
    email: Option<&String>,
) -> Result<(), CrmError> {
    if [first_name, last_name]
        .into_iter()
        .flatten()
        .any(|name| name.trim().is_empty())
    {
        return Err(CrmError::validation("first and last name are required"));
    }
    match email {
        Some(email) => validate_email(email),
        None => Ok(()),
    }
}

pub async fn list_contacts(
    ctx: &CrmContext,
    filter: &ContactFilter,
) -> Result<Vec<Contact>, CrmError> {
    let term = search_term(&filter.search);
    Ok(ctx
        .contacts
        .get_all()
        .await?
        .into_iter()
        .filter(|contact| {
            filter
                .account_id
                .as_deref()
                .map_or(true, |account| contact.account_id == account)
        })
        .filter(|contact| {
            matches_search(
                term,
                [
                    contact.first_name.as_str(),
                    contact.last_name.as_str(),
                    contact.email.as_str(),
                    contact.company.as_str(),
                ],
            )
        })
        .collect())
}

pub async fn get_contact(ctx: &CrmContext, id: ContactId) -> Result<Contact, CrmError> {
    ctx.contacts
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("contact", id))
}

pub async fn create_contact(ctx: &CrmContext, draft: ContactDraft) -> Result<Contact, CrmError> {
    validate_person(&draft.first_name, &draft.last_name, &draft.email)?;
    let contact = ctx
        .contacts
        .create(&Stamped {
            fields: &draft,
            stamps: Stamps {
                last_interaction: Some(Utc::now()),
                ..Stamps::default()
            },
        })
        .await?;
    ctx.record_changed::<Contact>(contact.id, ChangeKind::Created);
    ctx.notify(Notice::success("Contact created successfully!"));
    Ok(contact)
}

pub async fn update_contact(
    ctx: &CrmContext,
    id: ContactId,
    patch: ContactPatch,
) -> Result<Contact, CrmError> {
    validate_person_patch(
        patch.first_name.as_ref(),
        patch.last_name.as_ref(),
        patch.email.as_ref(),
    )?;
    let contact = ctx
        .contacts
        .update(id, &patch)
        .await?
        .ok_or_else(|| CrmError::not_found("contact", id))?;
    ctx.record_changed::<Contact>(id, ChangeKind::Updated);
    ctx.notify(Notice::success("Contact updated successfully!"));
    Ok(contact)
}

pub async fn delete_contact(ctx: &CrmContext, id: ContactId) -> Result<(), CrmError> {
    if !ctx.contacts.delete(id).await? {
        return Err(CrmError::not_found("contact", id));
    }
    ctx.record_changed::<Contact>(id, ChangeKind::Deleted);
    ctx.notify(Notice::success("Contact deleted successfully!"));
    Ok(())
}
