use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    domain::{Activity, Deal, DealStatus, Invoice, InvoiceStatus, Lead, LeadStatus, Stage},
    error::CrmError,
};

use crate::validation::sum_amounts;

pub const RECENT_ACTIVITY_LIMIT: usize = 5;
pub const UPCOMING_DEAL_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_leads: usize,
    pub qualified_leads: usize,
    pub total_deals: usize,
    pub open_deals: usize,
    /// Sum of won deal values.
    pub total_revenue: Decimal,
    pub pending_invoices: usize,
    pub recent_activities: Vec<Activity>,
    pub upcoming_deals: Vec<Deal>,
    pub pipeline: BTreeMap<Stage, usize>,
}

pub fn summarize(
    leads: &[Lead],
    deals: &[Deal],
    invoices: &[Invoice],
    activities: &[Activity],
) -> Result<DashboardSummary, CrmError> {
    let mut pipeline: BTreeMap<Stage, usize> = Stage::ALL.into_iter().map(|s| (s, 0)).collect();
    for deal in deals {
        *pipeline.entry(deal.stage).or_default() += 1;
    }

    let total_revenue = sum_amounts(
        deals
            .iter()
            .filter(|deal| deal.status == DealStatus::Won)
            .map(|deal| deal.value),
    )?;

    let mut recent_activities = activities.to_vec();
    recent_activities.sort_by(|a, b| b.date.cmp(&a.date));
    recent_activities.truncate(RECENT_ACTIVITY_LIMIT);

    let mut upcoming_deals: Vec<Deal> = deals
        .iter()
        .filter(|deal| deal.status == DealStatus::Open)
        .cloned()
        .collect();
    upcoming_deals.sort_by_key(|deal| deal.expected_close_date);
    upcoming_deals.truncate(UPCOMING_DEAL_LIMIT);

    Ok(DashboardSummary {
        total_leads: leads.len(),
        qualified_leads: leads
            .iter()
            .filter(|lead| lead.status == LeadStatus::Qualified)
            .count(),
        total_deals: deals.len(),
        open_deals: deals
            .iter()
            .filter(|deal| deal.status == DealStatus::Open)
            .count(),
        total_revenue,
        pending_invoices: invoices
            .iter()
            .filter(|invoice| invoice.status == InvoiceStatus::Pending)
            .count(),
        recent_activities,
        upcoming_deals,
        pipeline,
    })
}
