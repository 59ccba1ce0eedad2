use pipeline::{summarize, DashboardSummary};
use shared::error::CrmError;

use crate::CrmContext;

pub async fn dashboard(ctx: &CrmContext) -> Result<DashboardSummary, CrmError> {
    let leads = ctx.leads.get_all().await?;
    let deals = ctx.deals.get_all().await?;
    let invoices = ctx.invoices.get_all().await?;
    let activities = ctx.activities.get_all().await?;
    summarize(&leads, &deals, &invoices, &activities)
}
