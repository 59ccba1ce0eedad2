use chrono::Utc;
use pipeline::{
    apply_stage_change, compute_metrics, transition, validate_deal_draft,
    validation::{validate_probability, validate_value},
    PipelineMetrics, StageChange,
};
use serde::Serialize;
use shared::{
    domain::{Deal, DealId},
    error::CrmError,
    protocol::{ChangeKind, DealDraft, DealPatch, Notice},
};
use tracing::info;

use crate::{
    hooks::run_deal_hooks,
    search::{contact_labels, matches_search, search_term, DealFilter},
    CrmContext,
};

/// Store write for a full-form edit: the plain field changes plus, when the
/// stage moved, the fields the transition rule derived.
#[derive(Serialize)]
struct DealUpdate<'a> {
    #[serde(flatten)]
    fields: &'a DealPatch,
    #[serde(flatten)]
    stage_change: Option<&'a StageChange>,
}

pub async fn list_deals(ctx: &CrmContext, filter: &DealFilter) -> Result<Vec<Deal>, CrmError> {
    let deals = ctx.deals.get_all().await?;
    let term = search_term(&filter.search);
    let contacts = if term.trim().is_empty() {
        Vec::new()
    } else {
        ctx.contacts.get_all().await?
    };

    Ok(deals
        .into_iter()
        .filter(|deal| filter.stage.map_or(true, |stage| deal.stage == stage))
        .filter(|deal| filter.contact_id.map_or(true, |id| deal.contact_id.0 == id))
        .filter(|deal| {
            let (name, company) = contact_labels(&contacts, deal.contact_id.0);
            matches_search(term, [deal.title.as_str(), name.as_str(), company.as_str()])
        })
        .collect())
}

pub async fn get_deal(ctx: &CrmContext, id: DealId) -> Result<Deal, CrmError> {
    ctx.deals
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("deal", id))
}

/// Validates the form, derives status from the starting stage and fills the
/// account from the contact's company when the form left it blank.
pub async fn create_deal(ctx: &CrmContext, draft: DealDraft) -> Result<Deal, CrmError> {
    let mut new_deal = validate_deal_draft(&draft, Utc::now())?;
    let contact = ctx
        .contacts
        .get_by_id(new_deal.contact_id)
        .await?
        .ok_or_else(|| CrmError::not_found("contact", new_deal.contact_id))?;
    if new_deal.account_id.is_empty() {
        new_deal.account_id = contact.company.clone();
    }

    let deal = ctx.deals.create(&new_deal).await?;
    info!(deal_id = %deal.id, stage = %deal.stage, "deal created");
    ctx.record_changed::<Deal>(deal.id, ChangeKind::Created);
    ctx.notify(Notice::success("Deal created successfully!"));
    Ok(deal)
}

/// Full-form edit. A stage in the patch goes through the transition rule;
/// an unchanged stage leaves `stage_updated_at` alone.
pub async fn update_deal(ctx: &CrmContext, id: DealId, patch: DealPatch) -> Result<Deal, CrmError> {
    let current = get_deal(ctx, id).await?;
    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(CrmError::validation("deal title is required"));
        }
    }
    if let Some(probability) = patch.probability {
        validate_probability(probability)?;
    }
    if let Some(value) = patch.value {
        validate_value(value)?;
    }

    let change = patch
        .stage
        .filter(|stage| *stage != current.stage)
        .map(|stage| transition(&current, stage, Utc::now()));
    let fields = DealPatch {
        stage: None,
        ..patch
    };

    let deal = ctx
        .deals
        .update(
            id,
            &DealUpdate {
                fields: &fields,
                stage_change: change.as_ref(),
            },
        )
        .await?
        .ok_or_else(|| CrmError::not_found("deal", id))?;
    ctx.record_changed::<Deal>(deal.id, ChangeKind::Updated);
    ctx.notify(Notice::success("Deal updated successfully!"));

    if let Some(change) = change {
        info!(
            deal_id = %deal.id,
            from = %change.previous_stage,
            to = %change.stage,
            "deal stage changed by edit"
        );
        run_deal_hooks(ctx, &deal, &change).await;
    }
    Ok(deal)
}

/// Moves a deal to `stage` (a stage name such as `"Closed Won"`), persists
/// the derived fields and then runs the post-transition hooks.
pub async fn change_stage(ctx: &CrmContext, id: DealId, stage: &str) -> Result<Deal, CrmError> {
    let current = get_deal(ctx, id).await?;
    let change = apply_stage_change(&current, stage, Utc::now())?;

    let deal = ctx
        .deals
        .update(id, &change)
        .await?
        .ok_or_else(|| CrmError::not_found("deal", id))?;
    info!(
        deal_id = %deal.id,
        from = %change.previous_stage,
        to = %change.stage,
        reopened = change.reopens(),
        "deal stage changed"
    );
    ctx.record_changed::<Deal>(deal.id, ChangeKind::Updated);
    ctx.notify(Notice::success(format!(
        "Deal moved to {} successfully!",
        change.stage
    )));

    run_deal_hooks(ctx, &deal, &change).await;
    Ok(deal)
}

pub async fn delete_deal(ctx: &CrmContext, id: DealId) -> Result<(), CrmError> {
    if !ctx.deals.delete(id).await? {
        return Err(CrmError::not_found("deal", id));
    }
    ctx.record_changed::<Deal>(id, ChangeKind::Deleted);
    ctx.notify(Notice::success("Deal deleted successfully!"));
    Ok(())
}

pub async fn pipeline_metrics(ctx: &CrmContext) -> Result<PipelineMetrics, CrmError> {
    let deals = ctx.deals.get_all().await?;
    compute_metrics(&deals)
}

#[cfg(test)]
#[path = "tests/deals_tests.rs"]
mod tests;
