use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Deal, DealStatus, Stage},
    error::CrmError,
};

use crate::validation::amount_overflow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// Every stage is present, zero-filled.
    pub count_by_stage: BTreeMap<Stage, usize>,
    pub value_by_stage: BTreeMap<Stage, Decimal>,
    /// Σ value × probability / 100 over open deals.
    pub open_weighted_value: Decimal,
    pub avg_deal_size: Decimal,
    /// Won / (won + lost); zero while nothing has closed.
    pub win_rate: Decimal,
    pub total_deals: usize,
    pub open_deals: usize,
    pub won_value: Decimal,
}

/// Fails with a validation error when stored values are too large to add up.
pub fn compute_metrics(deals: &[Deal]) -> Result<PipelineMetrics, CrmError> {
    let mut count_by_stage: BTreeMap<Stage, usize> =
        Stage::ALL.into_iter().map(|stage| (stage, 0)).collect();
    let mut value_by_stage: BTreeMap<Stage, Decimal> = Stage::ALL
        .into_iter()
        .map(|stage| (stage, Decimal::ZERO))
        .collect();

    let mut total_value = Decimal::ZERO;
    let mut open_weighted_value = Decimal::ZERO;
    let mut won_value = Decimal::ZERO;
    let (mut open, mut won, mut lost) = (0usize, 0usize, 0usize);

    for deal in deals {
        *count_by_stage.entry(deal.stage).or_default() += 1;
        let stage_value = value_by_stage.entry(deal.stage).or_default();
        *stage_value = add(*stage_value, deal.value)?;
        total_value = add(total_value, deal.value)?;

        match deal.status {
            DealStatus::Open => {
                open += 1;
                open_weighted_value = add(open_weighted_value, weighted_value(deal)?)?;
            }
            DealStatus::Won => {
                won += 1;
                won_value = add(won_value, deal.value)?;
            }
            DealStatus::Lost => lost += 1,
        }
    }

    Ok(PipelineMetrics {
        count_by_stage,
        value_by_stage,
        open_weighted_value,
        avg_deal_size: ratio(total_value, deals.len()),
        win_rate: ratio(Decimal::from(won), won + lost),
        total_deals: deals.len(),
        open_deals: open,
        won_value,
    })
}

pub fn weighted_value(deal: &Deal) -> Result<Decimal, CrmError> {
    deal.value
        .checked_mul(Decimal::from(deal.probability))
        .map(|weighted| weighted / Decimal::ONE_HUNDRED)
        .ok_or_else(amount_overflow)
}

fn add(total: Decimal, value: Decimal) -> Result<Decimal, CrmError> {
    total.checked_add(value).ok_or_else(amount_overflow)
}

fn ratio(numerator: Decimal, denominator: usize) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    numerator / Decimal::from(denominator)
}

#[cfg(test)]
#[path = "tests/metrics_tests.rs"]
mod tests;
