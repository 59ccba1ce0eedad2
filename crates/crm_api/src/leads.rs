use chrono::Utc;
use shared::{
    domain::{Lead, LeadId},
    error::CrmError,
    protocol::{ChangeKind, LeadDraft, LeadPatch, Notice},
};

use crate::{
    contacts::{validate_person, validate_person_patch},
    search::{matches_search, search_term, LeadFilter},
    CrmContext, Stamped, Stamps,
};

pub async fn list_leads(ctx: &CrmContext, filter: &LeadFilter) -> Result<Vec<Lead>, CrmError> {
    let term = search_term(&filter.search);
    Ok(ctx
        .leads
        .get_all()
        .await?
        .into_iter()
        .filter(|lead| filter.status.map_or(true, |status| lead.status == status))
        .filter(|lead| {
            matches_search(
                term,
                [
                    lead.first_name.as_str(),
                    lead.last_name.as_str(),
                    lead.email.as_str(),
                    lead.company.as_str(),
                ],
            )
        })
        .collect())
}

pub async fn get_lead(ctx: &CrmContext, id: LeadId) -> Result<Lead, CrmError> {
    ctx.leads
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("lead", id))
}

pub async fn create_lead(ctx: &CrmContext, draft: LeadDraft) -> Result<Lead, CrmError> {
    validate_person(&draft.first_name, &draft.last_name, &draft.email)?;
    let now = Utc::now();
    let lead = ctx
        .leads
        .create(&Stamped {
            fields: &draft,
            stamps: Stamps {
                created_date: Some(now),
                last_contact: Some(now),
                ..Stamps::default()
            },
        })
        .await?;
    ctx.record_changed::<Lead>(lead.id, ChangeKind::Created);
    ctx.notify(Notice::success("Lead created successfully!"));
    Ok(lead)
}

pub async fn update_lead(ctx: &CrmContext, id: LeadId, patch: LeadPatch) -> Result<Lead, CrmError> {
    validate_person_patch(
        patch.first_name.as_ref(),
        patch.last_name.as_ref(),
        patch.email.as_ref(),
    )?;
    let lead = ctx
        .leads
        .update(id, &patch)
        .await?
        .ok_or_else(|| CrmError::not_found("lead", id))?;
    ctx.record_changed::<Lead>(id, ChangeKind::Updated);
    ctx.notify(Notice::success("Lead updated successfully!"));
    Ok(lead)
}

pub async fn delete_lead(ctx: &CrmContext, id: LeadId) -> Result<(), CrmError> {
    if !ctx.leads.delete(id).await? {
        return Err(CrmError::not_found("lead", id));
    }
    ctx.record_changed::<Lead>(id, ChangeKind::Deleted);
    ctx.notify(Notice::success("Lead deleted successfully!"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use shared::domain::LeadStatus;

    fn draft(first: &str, status: LeadStatus) -> LeadDraft {
        LeadDraft {
            first_name: first.into(),
            last_name: "Lead".into(),
            email: format!("{}@initech.test", first.to_lowercase()),
            company: "Initech".into(),
            industry: "Software".into(),
            lead_source: "Website".into(),
            status,
            ..LeadDraft::default()
        }
    }

    #[tokio::test]
    async fn create_stamps_dates_and_status_filter_applies() {
        let ctx = context().await;
        let lead = create_lead(&ctx, draft("Lee", LeadStatus::New))
            .await
            .expect("lead");
        assert_eq!(lead.created_date, lead.last_contact);
        create_lead(&ctx, draft("Kim", LeadStatus::Qualified))
            .await
            .expect("lead");

        let qualified = list_leads(
            &ctx,
            &LeadFilter {
                status: Some(LeadStatus::Qualified),
                ..LeadFilter::default()
            },
        )
        .await
        .expect("list");
        assert_eq!(qualified.len(), 1);
        assert_eq!(qualified[0].first_name, "Kim");
    }

    #[tokio::test]
    async fn status_update_keeps_other_fields() {
        let ctx = context().await;
        let lead = create_lead(&ctx, draft("Lee", LeadStatus::New))
            .await
            .expect("lead");
        let updated = update_lead(
            &ctx,
            lead.id,
            LeadPatch {
                status: Some(LeadStatus::Contacted),
                ..LeadPatch::default()
            },
        )
        .await
        .expect("update");
        assert_eq!(updated.status, LeadStatus::Contacted);
        assert_eq!(updated.company, "Initech");
        delete_lead(&ctx, lead.id).await.expect("delete");
        assert!(matches!(
            get_lead(&ctx, lead.id).await,
            Err(CrmError::NotFound { .. })
        ));
    }
}
