use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{Activity, ActivityId, ActivityOutcome, ActivityType, ContactId, DealId},
    error::CrmError,
    protocol::{ActivityDraft, ActivityPatch, ChangeKind, Notice},
};

use crate::{
    search::{contact_labels, matches_search, search_term, ActivityFilter},
    CrmContext,
};

#[derive(Serialize)]
struct NewActivity<'a> {
    activity_type: ActivityType,
    contact_id: ContactId,
    deal_id: Option<DealId>,
    subject: &'a str,
    description: &'a str,
    date: DateTime<Utc>,
    duration_minutes: Option<u32>,
    outcome: ActivityOutcome,
}

/// Newest first, like the activity timeline.
pub async fn list_activities(
    ctx: &CrmContext,
    filter: &ActivityFilter,
) -> Result<Vec<Activity>, CrmError> {
    let term = search_term(&filter.search);
    let contacts = if term.trim().is_empty() {
        Vec::new()
    } else {
        ctx.contacts.get_all().await?
    };

    let mut activities: Vec<Activity> = ctx
        .activities
        .get_all()
        .await?
        .into_iter()
        .filter(|activity| {
            filter
                .activity_type
                .map_or(true, |kind| activity.activity_type == kind)
        })
        .filter(|activity| {
            filter
                .contact_id
                .map_or(true, |id| activity.contact_id.0 == id)
        })
        .filter(|activity| {
            filter
                .deal_id
                .map_or(true, |id| activity.deal_id.map(|deal| deal.0) == Some(id))
        })
        .filter(|activity| {
            let (name, _) = contact_labels(&contacts, activity.contact_id.0);
            matches_search(
                term,
                [
                    activity.subject.as_str(),
                    activity.description.as_str(),
                    name.as_str(),
                ],
            )
        })
        .collect();
    activities.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(activities)
}

pub async fn get_activity(ctx: &CrmContext, id: ActivityId) -> Result<Activity, CrmError> {
    ctx.activities
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("activity", id))
}

pub async fn create_activity(
    ctx: &CrmContext,
    draft: ActivityDraft,
) -> Result<Activity, CrmError> {
    if draft.subject.trim().is_empty() {
        return Err(CrmError::validation("activity subject is required"));
    }
    let activity = ctx
        .activities
        .create(&NewActivity {
            activity_type: draft.activity_type,
            contact_id: draft.contact_id,
            deal_id: draft.deal_id,
            subject: draft.subject.trim(),
            description: &draft.description,
            date: draft.date.unwrap_or_else(Utc::now),
            duration_minutes: draft.duration_minutes,
            outcome: draft.outcome,
        })
        .await?;
    ctx.record_changed::<Activity>(activity.id, ChangeKind::Created);
    ctx.notify(Notice::success("Activity created successfully!"));
    Ok(activity)
}

pub async fn update_activity(
    ctx: &CrmContext,
    id: ActivityId,
    patch: ActivityPatch,
) -> Result<Activity, CrmError> {
    if patch
        .subject
        .as_deref()
        .is_some_and(|subject| subject.trim().is_empty())
    {
        return Err(CrmError::validation("activity subject is required"));
    }
    let activity = ctx
        .activities
        .update(id, &patch)
        .await?
        .ok_or_else(|| CrmError::not_found("activity", id))?;
    ctx.record_changed::<Activity>(id, ChangeKind::Updated);
    ctx.notify(Notice::success("Activity updated successfully!"));
    Ok(activity)
}

pub async fn delete_activity(ctx: &CrmContext, id: ActivityId) -> Result<(), CrmError> {
    if !ctx.activities.delete(id).await? {
        return Err(CrmError::not_found("activity", id));
    }
    ctx.record_changed::<Activity>(id, ChangeKind::Deleted);
    ctx.notify(Notice::success("Activity deleted successfully!"));
    Ok(())
}

#[cfg(test)]
#[path = "tests/activities_tests.rs"]
mod tests;
