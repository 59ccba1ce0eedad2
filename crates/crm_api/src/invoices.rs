use chrono::{DateTime, NaiveDate, Utc};
use pipeline::{invoice::invoice_number, normalize_line_items, validate_line_items, InvoiceTotals};
use serde::Serialize;
use shared::{
    domain::{ContactId, DealId, Invoice, InvoiceId, InvoiceStatus, LineItem},
    error::CrmError,
    protocol::{ChangeKind, InvoiceDraft, InvoicePatch, Notice},
};
use tracing::{info, warn};

use crate::{
    search::{contact_labels, matches_search, search_term, InvoiceFilter},
    CrmContext,
};

#[derive(Serialize)]
struct NewInvoice<'a> {
    invoice_number: &'a str,
    contact_id: ContactId,
    deal_id: Option<DealId>,
    issue_date: DateTime<Utc>,
    due_date: NaiveDate,
    line_items: &'a [LineItem],
    #[serde(flatten)]
    totals: InvoiceTotals,
    status: InvoiceStatus,
    payment_date: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct InvoiceNumberPatch {
    invoice_number: String,
}

/// Store write for an invoice edit. Totals travel with the line items so the
/// stored amounts never drift from them.
#[derive(Default, Serialize)]
struct InvoiceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_id: Option<ContactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deal_id: Option<DealId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_items: Option<Vec<LineItem>>,
    #[serde(flatten)]
    totals: Option<InvoiceTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_date: Option<Option<DateTime<Utc>>>,
}

pub async fn list_invoices(
    ctx: &CrmContext,
    filter: &InvoiceFilter,
) -> Result<Vec<Invoice>, CrmError> {
    let term = search_term(&filter.search);
    let contacts = if term.trim().is_empty() {
        Vec::new()
    } else {
        ctx.contacts.get_all().await?
    };

    Ok(ctx
        .invoices
        .get_all()
        .await?
        .into_iter()
        .filter(|invoice| filter.status.map_or(true, |status| invoice.status == status))
        .filter(|invoice| {
            filter
                .contact_id
                .map_or(true, |id| invoice.contact_id.0 == id)
        })
        .filter(|invoice| {
            let (name, company) = contact_labels(&contacts, invoice.contact_id.0);
            matches_search(
                term,
                [
                    invoice.invoice_number.as_str(),
                    name.as_str(),
                    company.as_str(),
                ],
            )
        })
        .collect())
}

pub async fn get_invoice(ctx: &CrmContext, id: InvoiceId) -> Result<Invoice, CrmError> {
    ctx.invoices
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("invoice", id))
}

/// Creates a draft invoice. Totals come from the line items; the number is
/// derived from the issue year and the assigned id. If the number cannot be
/// written the unnumbered record is removed again.
pub async fn create_invoice(ctx: &CrmContext, draft: InvoiceDraft) -> Result<Invoice, CrmError> {
    validate_line_items(&draft.line_items)?;
    let mut line_items = draft.line_items;
    let totals = normalize_line_items(&mut line_items)?;
    let issued_at = Utc::now();

    let created = ctx
        .invoices
        .create(&NewInvoice {
            invoice_number: "",
            contact_id: draft.contact_id,
            deal_id: draft.deal_id,
            issue_date: issued_at,
            due_date: draft.due_date,
            line_items: &line_items,
            totals,
            status: InvoiceStatus::Draft,
            payment_date: None,
        })
        .await?;

    let number = invoice_number(issued_at, created.id);
    let numbered = ctx
        .invoices
        .update(
            created.id,
            &InvoiceNumberPatch {
                invoice_number: number,
            },
        )
        .await
        .and_then(|invoice| invoice.ok_or_else(|| CrmError::not_found("invoice", created.id)));
    let invoice = match numbered {
        Ok(invoice) => invoice,
        Err(err) => {
            warn!(invoice_id = %created.id, error = %err, "numbering failed; removing unnumbered invoice");
            if let Err(cleanup) = ctx.invoices.delete(created.id).await {
                warn!(invoice_id = %created.id, error = %cleanup, "unnumbered invoice left in store");
            }
            return Err(err);
        }
    };
    info!(
        invoice_id = %invoice.id,
        number = %invoice.invoice_number,
        total = %invoice.total_amount,
        "invoice created"
    );
    ctx.record_changed::<Invoice>(invoice.id, ChangeKind::Created);
    ctx.notify(Notice::success("Invoice created successfully!"));
    Ok(invoice)
}

pub async fn update_invoice(
    ctx: &CrmContext,
    id: InvoiceId,
    patch: InvoicePatch,
) -> Result<Invoice, CrmError> {
    let current = get_invoice(ctx, id).await?;
    let mut update = InvoiceUpdate {
        contact_id: patch.contact_id,
        deal_id: patch.deal_id,
        due_date: patch.due_date,
        ..InvoiceUpdate::default()
    };
    if let Some(mut line_items) = patch.line_items {
        validate_line_items(&line_items)?;
        update.totals = Some(normalize_line_items(&mut line_items)?);
        update.line_items = Some(line_items);
    }
    if let Some(status) = patch.status {
        update.payment_date = payment_date_for(current.status, status);
        update.status = Some(status);
    }

    let invoice = ctx
        .invoices
        .update(id, &update)
        .await?
        .ok_or_else(|| CrmError::not_found("invoice", id))?;
    ctx.record_changed::<Invoice>(id, ChangeKind::Updated);
    ctx.notify(Notice::success("Invoice updated successfully!"));
    Ok(invoice)
}

/// Moves an invoice to `status`; marking it paid stamps the payment date.
pub async fn set_invoice_status(
    ctx: &CrmContext,
    id: InvoiceId,
    status: InvoiceStatus,
) -> Result<Invoice, CrmError> {
    let current = get_invoice(ctx, id).await?;
    let update = InvoiceUpdate {
        status: Some(status),
        payment_date: payment_date_for(current.status, status),
        ..InvoiceUpdate::default()
    };
    let invoice = ctx
        .invoices
        .update(id, &update)
        .await?
        .ok_or_else(|| CrmError::not_found("invoice", id))?;
    ctx.record_changed::<Invoice>(id, ChangeKind::Updated);
    let label = format!("{status:?}").to_lowercase();
    ctx.notify(Notice::success(format!("Invoice marked as {label}!")));
    Ok(invoice)
}

/// `Some(Some(now))` when the invoice becomes paid, `Some(None)` when it
/// stops being paid, `None` when the payment date is unaffected.
fn payment_date_for(
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> Option<Option<DateTime<Utc>>> {
    match (from == InvoiceStatus::Paid, to == InvoiceStatus::Paid) {
        (false, true) => Some(Some(Utc::now())),
        (true, false) => Some(None),
        _ => None,
    }
}

pub async fn delete_invoice(ctx: &CrmContext, id: InvoiceId) -> Result<(), CrmError> {
    if !ctx.invoices.delete(id).await? {
        return Err(CrmError::not_found("invoice", id));
    }
    ctx.record_changed::<Invoice>(id, ChangeKind::Deleted);
    ctx.notify(Notice::success("Invoice deleted successfully!"));
    Ok(())
}

#[cfg(test)]
#[path = "tests/invoices_tests.rs"]
mod tests;
