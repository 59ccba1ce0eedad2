use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{Deal, DealStatus, Stage},
    error::CrmError,
};

/// Field set produced by moving a deal to a new stage.
///
/// Serializes to exactly the fields a store update must write, including an
/// explicit `null` close date when a deal is reopened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageChange {
    #[serde(skip)]
    pub previous_stage: Stage,
    pub stage: Stage,
    pub status: DealStatus,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub stage_updated_at: DateTime<Utc>,
}

impl StageChange {
    pub fn apply_to(&self, deal: &mut Deal) {
        deal.stage = self.stage;
        deal.status = self.status;
        deal.actual_close_date = self.actual_close_date;
        deal.stage_updated_at = self.stage_updated_at;
    }

    /// True when the deal was not in `stage` before and is now.
    pub fn enters(&self, stage: Stage) -> bool {
        self.previous_stage != stage && self.stage == stage
    }

    pub fn reopens(&self) -> bool {
        self.previous_stage.is_closed() && !self.stage.is_closed()
    }
}

/// Status and close date implied by sitting in `stage` as of `now`.
pub fn derived_status(stage: Stage, now: DateTime<Utc>) -> (DealStatus, Option<DateTime<Utc>>) {
    let status = stage.implied_status();
    let closed_at = match status {
        DealStatus::Won | DealStatus::Lost => Some(now),
        DealStatus::Open => None,
    };
    (status, closed_at)
}

pub fn transition(deal: &Deal, new_stage: Stage, now: DateTime<Utc>) -> StageChange {
    let (status, actual_close_date) = derived_status(new_stage, now);
    StageChange {
        previous_stage: deal.stage,
        stage: new_stage,
        status,
        actual_close_date,
        stage_updated_at: now,
    }
}

/// Parses `new_stage` and computes the resulting fields. Unknown stage names
/// fail with [`CrmError::InvalidStage`].
pub fn apply_stage_change(
    deal: &Deal,
    new_stage: &str,
    now: DateTime<Utc>,
) -> Result<StageChange, CrmError> {
    let stage = new_stage.parse::<Stage>()?;
    Ok(transition(deal, stage, now))
}

#[cfg(test)]
#[path = "tests/stage_tests.rs"]
mod tests;
