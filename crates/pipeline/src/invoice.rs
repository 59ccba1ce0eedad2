use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{InvoiceId, LineItem},
    error::CrmError,
};

use crate::validation::{amount_overflow, sum_amounts};

/// Flat sales tax applied to every invoice (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Totals derived from `quantity * unit_price` of each line; stored line
/// totals are not trusted. Amounts too large to represent are an error.
pub fn recompute_totals(line_items: &[LineItem]) -> Result<InvoiceTotals, CrmError> {
    let line_totals = line_items
        .iter()
        .map(line_total)
        .collect::<Result<Vec<_>, _>>()?;
    let subtotal = sum_amounts(line_totals)?;
    let tax_amount = subtotal.checked_mul(TAX_RATE).ok_or_else(amount_overflow)?;
    Ok(InvoiceTotals {
        subtotal,
        tax_amount,
        total_amount: subtotal.checked_add(tax_amount).ok_or_else(amount_overflow)?,
    })
}

/// Rewrites every line total and returns the invoice totals.
pub fn normalize_line_items(line_items: &mut [LineItem]) -> Result<InvoiceTotals, CrmError> {
    for item in line_items.iter_mut() {
        item.total = line_total(item)?;
    }
    recompute_totals(line_items)
}

fn line_total(item: &LineItem) -> Result<Decimal, CrmError> {
    item.quantity
        .checked_mul(item.unit_price)
        .ok_or_else(amount_overflow)
}

pub fn invoice_number(issued_at: DateTime<Utc>, id: InvoiceId) -> String {
    format!("INV-{}-{:03}", issued_at.year(), id.0)
}
