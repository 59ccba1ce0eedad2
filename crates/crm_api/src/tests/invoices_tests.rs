use super::*;
use crate::{
    test_support::{context, seed_contact},
    DEFAULT_EVENT_BUFFER,
};
use async_trait::async_trait;
use chrono::Datelike;
use rust_decimal_macros::dec;
use std::sync::Arc;
use storage::{Fields, RecordBackend, Storage};
use tokio::sync::broadcast;

/// Local store whose invoice updates always fail.
struct RejectInvoiceUpdates(Storage);

#[async_trait]
impl RecordBackend for RejectInvoiceUpdates {
    async fn fetch_all(&self, collection: &str) -> anyhow::Result<Vec<Fields>> {
        self.0.fetch_all(collection).await
    }

    async fn fetch_one(&self, collection: &str, id: i64) -> anyhow::Result<Option<Fields>> {
        self.0.fetch_one(collection, id).await
    }

    async fn create(&self, collection: &str, fields: Fields) -> anyhow::Result<Option<Fields>> {
        self.0.create(collection, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: i64,
        fields: Fields,
    ) -> anyhow::Result<Option<Fields>> {
        if collection == "invoice_c" {
            anyhow::bail!("invoice_c is read-only");
        }
        self.0.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: i64) -> anyhow::Result<bool> {
        self.0.delete(collection, id).await
    }
}

fn draft(contact_id: ContactId) -> InvoiceDraft {
    InvoiceDraft {
        contact_id,
        deal_id: None,
        due_date: NaiveDate::from_ymd_opt(2024, 4, 30).expect("date"),
        line_items: vec![
            LineItem {
                description: "Seats".into(),
                quantity: dec!(2),
                unit_price: dec!(50),
                total: dec!(999),
            },
            LineItem::new("Onboarding", dec!(1), dec!(100)),
        ],
    }
}

#[tokio::test]
async fn create_recomputes_totals_and_numbers_the_invoice() {
    let ctx = context().await;
    let contact = seed_contact(&ctx, "Dana", "Reyes", "Acme Corp").await;

    let invoice = create_invoice(&ctx, draft(contact.id)).await.expect("invoice");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.line_items[0].total, dec!(100));
    assert_eq!(invoice.subtotal, dec!(200));
    assert_eq!(invoice.tax_amount, dec!(16));
    assert_eq!(invoice.total_amount, dec!(216));
    assert_eq!(
        invoice.invoice_number,
        format!("INV-{}-001", invoice.issue_date.year())
    );
}

#[tokio::test]
async fn create_requires_line_items() {
    let ctx = context().await;
    let contact = seed_contact(&ctx, "Dana", "Reyes", "Acme Corp").await;
    let mut empty = draft(contact.id);
    empty.line_items.clear();
    let err = create_invoice(&ctx, empty).await.expect_err("no lines");
    assert!(matches!(err, CrmError::Validation(_)));
}

#[tokio::test]
async fn replacing_line_items_updates_totals() {
    let ctx = context().await;
    let contact = seed_contact(&ctx, "Dana", "Reyes", "Acme Corp").await;
    let invoice = create_invoice(&ctx, draft(contact.id)).await.expect("invoice");

    let updated = update_invoice(
        &ctx,
        invoice.id,
        InvoicePatch {
            line_items: Some(vec![LineItem::new("Seats", dec!(10), dec!(50))]),
            ..InvoicePatch::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.subtotal, dec!(500));
    assert_eq!(updated.tax_amount, dec!(40));
    assert_eq!(updated.total_amount, dec!(540));
    assert_eq!(updated.invoice_number, invoice.invoice_number);
}

#[tokio::test]
async fn paying_stamps_and_unpaying_clears_the_payment_date() {
    let ctx = context().await;
    let contact = seed_contact(&ctx, "Dana", "Reyes", "Acme Corp").await;
    let invoice = create_invoice(&ctx, draft(contact.id)).await.expect("invoice");
    assert_eq!(invoice.payment_date, None);

    let pending = set_invoice_status(&ctx, invoice.id, InvoiceStatus::Pending)
        .await
        .expect("pending");
    assert_eq!(pending.payment_date, None);

    let paid = set_invoice_status(&ctx, invoice.id, InvoiceStatus::Paid)
        .await
        .expect("paid");
    assert!(paid.payment_date.is_some());

    let overdue = set_invoice_status(&ctx, invoice.id, InvoiceStatus::Overdue)
        .await
        .expect("overdue");
    assert_eq!(overdue.payment_date, None);
}

#[tokio::test]
async fn search_matches_number_and_contact_company() {
    let ctx = context().await;
    let dana = seed_contact(&ctx, "Dana", "Reyes", "Acme Corp").await;
    let sam = seed_contact(&ctx, "Sam", "Ortiz", "Globex").await;
    create_invoice(&ctx, draft(dana.id)).await.expect("invoice");
    let second = create_invoice(&ctx, draft(sam.id)).await.expect("invoice");

    let by_company = list_invoices(
        &ctx,
        &InvoiceFilter {
            search: Some("GLOBEX".into()),
            ..InvoiceFilter::default()
        },
    )
    .await
    .expect("list");
    assert_eq!(by_company.len(), 1);
    assert_eq!(by_company[0].id, second.id);

    let by_number = list_invoices(
        &ctx,
        &InvoiceFilter {
            search: Some("-002".into()),
            ..InvoiceFilter::default()
        },
    )
    .await
    .expect("list");
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].id, second.id);
}

#[tokio::test]
async fn failed_numbering_leaves_no_unnumbered_invoice_behind() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (events, _) = broadcast::channel(DEFAULT_EVENT_BUFFER);
    let ctx = CrmContext::new(Arc::new(RejectInvoiceUpdates(storage.clone())), events);
    let contact = seed_contact(&ctx, "Dana", "Reyes", "Acme Corp").await;

    let err = create_invoice(&ctx, draft(contact.id))
        .await
        .expect_err("numbering fails");
    assert!(matches!(err, CrmError::Store(_)));
    assert!(ctx.invoices.get_all().await.expect("list").is_empty());
    assert_eq!(storage.count("invoice_c").await.expect("count"), 0);
}
