//! Side effects that follow a persisted deal stage change.
//!
//! Hooks run in order after the store write succeeds. A failing hook is
//! logged and skipped; it never undoes or fails the stage change.

use async_trait::async_trait;
use chrono::Utc;
use pipeline::{on_deal_won, StageChange};
use shared::{
    domain::{Client, Deal, Stage},
    error::CrmError,
    protocol::{ChangeKind, CrmEvent, Notice},
};
use tracing::{info, warn};

use crate::{CrmContext, Stamped, Stamps};

#[async_trait]
pub trait DealHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn after_stage_change(
        &self,
        ctx: &CrmContext,
        deal: &Deal,
        change: &StageChange,
    ) -> Result<(), CrmError>;
}

/// Broadcasts every stage change to event subscribers.
pub struct StageEventHook;

#[async_trait]
impl DealHook for StageEventHook {
    fn name(&self) -> &'static str {
        "stage-event"
    }

    async fn after_stage_change(
        &self,
        ctx: &CrmContext,
        deal: &Deal,
        change: &StageChange,
    ) -> Result<(), CrmError> {
        ctx.publish(CrmEvent::DealStageChanged {
            deal_id: deal.id,
            from: change.previous_stage,
            to: change.stage,
            status: change.status,
        });
        Ok(())
    }
}

/// Creates a client from the deal's contact when a deal is won, unless that
/// contact was already converted.
pub struct ClientConversionHook;

#[async_trait]
impl DealHook for ClientConversionHook {
    fn name(&self) -> &'static str {
        "client-conversion"
    }

    async fn after_stage_change(
        &self,
        ctx: &CrmContext,
        deal: &Deal,
        change: &StageChange,
    ) -> Result<(), CrmError> {
        if !change.enters(Stage::ClosedWon) {
            return Ok(());
        }

        let contact = ctx
            .contacts
            .get_by_id(deal.contact_id)
            .await?
            .ok_or_else(|| CrmError::not_found("contact", deal.contact_id))?;
        let existing = ctx.clients.get_all().await?;
        let Some(draft) = on_deal_won(deal, &contact, &existing) else {
            info!(deal_id = %deal.id, contact_id = %contact.id, "contact already a client");
            return Ok(());
        };

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
        info!(deal_id = %deal.id, client_id = %client.id, "client created from won deal");
        ctx.record_changed::<Client>(client.id, ChangeKind::Created);
        ctx.publish(CrmEvent::ClientConverted {
            deal_id: deal.id,
            client_id: client.id,
        });
        ctx.notify(Notice::success(format!(
            "{} {} added as a client",
            client.first_name, client.last_name
        )));
        Ok(())
    }
}

/// Runs every installed hook, logging and suppressing failures.
pub(crate) async fn run_deal_hooks(ctx: &CrmContext, deal: &Deal, change: &StageChange) {
    for hook in ctx.hooks() {
        if let Err(err) = hook.after_stage_change(ctx, deal, change).await {
            warn!(
                hook = hook.name(),
                deal_id = %deal.id,
                error = %err,
                "deal hook failed; stage change kept"
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
