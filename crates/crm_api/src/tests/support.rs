use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use shared::{
    domain::{Contact, ContactId, RelationshipLevel},
    protocol::{ContactDraft, CrmEvent, DealDraft},
};
use storage::Storage;
use tokio::sync::broadcast;

use crate::{contacts::create_contact, CrmContext, DealHook, DEFAULT_EVENT_BUFFER};

pub(crate) async fn context() -> CrmContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (events, _) = broadcast::channel(DEFAULT_EVENT_BUFFER);
    CrmContext::new(Arc::new(storage), events)
}

pub(crate) async fn context_with_hooks(hooks: Vec<Arc<dyn DealHook>>) -> CrmContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (events, _) = broadcast::channel(DEFAULT_EVENT_BUFFER);
    CrmContext::with_hooks(Arc::new(storage), events, hooks)
}

pub(crate) fn contact_draft(first: &str, last: &str, company: &str) -> ContactDraft {
    ContactDraft {
        first_name: first.into(),
        last_name: last.into(),
        email: format!(
            "{}.{}@{}.test",
            first.to_lowercase(),
            last.to_lowercase(),
            company.to_lowercase().replace(' ', "")
        ),
        phone: "555-0100".into(),
        company: company.into(),
        job_title: "Buyer".into(),
        account_id: company.into(),
        relationship_level: RelationshipLevel::DecisionMaker,
        notes: String::new(),
    }
}

pub(crate) async fn seed_contact(ctx: &CrmContext, first: &str, last: &str, company: &str) -> Contact {
    create_contact(ctx, contact_draft(first, last, company))
        .await
        .expect("contact")
}

pub(crate) fn deal_draft(title: &str, contact_id: ContactId) -> DealDraft {
    DealDraft {
        title: title.into(),
        contact_id: Some(contact_id),
        value: Some(dec!(5000)),
        probability: Some(40),
        expected_close_date: NaiveDate::from_ymd_opt(2024, 9, 30),
        ..DealDraft::default()
    }
}

/// Every event published since the receiver subscribed.
pub(crate) fn drain(rx: &mut broadcast::Receiver<CrmEvent>) -> Vec<CrmEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
