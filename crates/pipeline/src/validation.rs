use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    domain::{Deal, DealStatus, LineItem, Stage},
    error::CrmError,
    protocol::{DealDraft, NewDeal},
};

use crate::stage::derived_status;

pub const MAX_PROBABILITY: u8 = 100;
pub const DEFAULT_PROBABILITY: u8 = 50;
/// Largest accepted deal value, line quantity or unit price (10^15).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Checks the stored-deal invariants: status follows stage, a close date
/// exists exactly for closed deals, probability and value are in range.
pub fn validate_deal(deal: &Deal) -> Result<(), CrmError> {
    let expected = deal.stage.implied_status();
    if deal.status != expected {
        return Err(CrmError::validation(format!(
            "deal {} is in stage '{}' but has status {:?} (expected {:?})",
            deal.id, deal.stage, deal.status, expected
        )));
    }

    let closed = matches!(deal.status, DealStatus::Won | DealStatus::Lost);
    if closed != deal.actual_close_date.is_some() {
        return Err(CrmError::validation(format!(
            "deal {} close date must be set only for closed deals",
            deal.id
        )));
    }

    validate_probability(deal.probability)?;
    validate_value(deal.value)
}

/// Turns a submitted form into the field set of a new deal. The stage
/// defaults to `New`; status and close date are derived from it.
pub fn validate_deal_draft(draft: &DealDraft, now: DateTime<Utc>) -> Result<NewDeal, CrmError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(CrmError::validation("deal title is required"));
    }
    let contact_id = draft
        .contact_id
        .ok_or_else(|| CrmError::validation("a contact must be selected"))?;
    let value = draft
        .value
        .filter(|value| *value > Decimal::ZERO)
        .ok_or_else(|| CrmError::validation("deal value must be greater than zero"))?;
    validate_value(value)?;
    let expected_close_date = draft
        .expected_close_date
        .ok_or_else(|| CrmError::validation("expected close date is required"))?;
    let probability = draft.probability.unwrap_or(DEFAULT_PROBABILITY);
    validate_probability(probability)?;

    let stage = draft.stage.unwrap_or(Stage::New);
    let (status, actual_close_date) = derived_status(stage, now);

    Ok(NewDeal {
        title: title.to_string(),
        contact_id,
        account_id: draft.account_id.trim().to_string(),
        value,
        probability,
        stage,
        status,
        expected_close_date,
        actual_close_date,
        stage_updated_at: now,
        products: draft.products.clone(),
        notes: draft.notes.clone(),
        sales_team_id: draft.sales_team_id,
    })
}

pub fn validate_probability(probability: u8) -> Result<(), CrmError> {
    if probability > MAX_PROBABILITY {
        return Err(CrmError::validation(format!(
            "probability must be between 0 and {MAX_PROBABILITY}, got {probability}"
        )));
    }
    Ok(())
}

pub fn validate_value(value: Decimal) -> Result<(), CrmError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CrmError::validation(format!(
            "deal value must not be negative, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(CrmError::validation(format!(
            "deal value must not exceed {MAX_AMOUNT}, got {value}"
        )));
    }
    Ok(())
}

pub fn validate_line_items(line_items: &[LineItem]) -> Result<(), CrmError> {
    if line_items.is_empty() {
        return Err(CrmError::validation("an invoice needs at least one line item"));
    }
    for (index, item) in line_items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(CrmError::validation(format!(
                "line item {} needs a description",
                index + 1
            )));
        }
        if item.quantity < Decimal::ZERO || item.unit_price < Decimal::ZERO {
            return Err(CrmError::validation(format!(
                "line item {} has a negative quantity or price",
                index + 1
            )));
        }
        if item.quantity > MAX_AMOUNT || item.unit_price > MAX_AMOUNT {
            return Err(CrmError::validation(format!(
                "line item {} quantity and price must not exceed {MAX_AMOUNT}",
                index + 1
            )));
        }
    }
    Ok(())
}

/// Adds up amounts, failing instead of overflowing on out-of-range data.
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, CrmError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(amount_overflow)
}

pub(crate) fn amount_overflow() -> CrmError {
    CrmError::validation("amounts exceed the supported range")
}

/// Parses a user-entered money amount such as `"1200.50"`.
pub fn parse_amount(raw: &str) -> Result<Decimal, CrmError> {
    let trimmed = raw.trim();
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| CrmError::validation(format!("'{trimmed}' is not a valid amount")))?;
    validate_value(amount)?;
    Ok(amount)
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
