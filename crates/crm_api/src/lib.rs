//! CRM operations over the record stores: the request-level behavior behind
//! each page of the application (listing with search, form submits, stage
//! changes) plus the hooks that run after a deal changes stage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{Activity, Client, Contact, Deal, Invoice, Lead, SalesTeam},
    protocol::{ChangeKind, CrmEvent, Notice},
};
use storage::{Entity, EntityStore, RecordBackend};
use tokio::sync::broadcast;
use tracing::debug;

pub mod activities;
pub mod clients;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod hooks;
pub mod invoices;
pub mod leads;
pub mod sales_teams;
pub mod search;

pub use hooks::{ClientConversionHook, DealHook, StageEventHook};

pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct CrmContext {
    pub deals: EntityStore<Deal>,
    pub contacts: EntityStore<Contact>,
    pub clients: EntityStore<Client>,
    pub leads: EntityStore<Lead>,
    pub activities: EntityStore<Activity>,
    pub invoices: EntityStore<Invoice>,
    pub sales_teams: EntityStore<SalesTeam>,
    hooks: Arc<Vec<Arc<dyn DealHook>>>,
    events: broadcast::Sender<CrmEvent>,
}

impl CrmContext {
    /// Context with the standard post-transition hooks installed.
    pub fn new(backend: Arc<dyn RecordBackend>, events: broadcast::Sender<CrmEvent>) -> Self {
        Self::with_hooks(
            backend,
            events,
            vec![Arc::new(StageEventHook), Arc::new(ClientConversionHook)],
        )
    }

    pub fn with_hooks(
        backend: Arc<dyn RecordBackend>,
        events: broadcast::Sender<CrmEvent>,
        hooks: Vec<Arc<dyn DealHook>>,
    ) -> Self {
        Self {
            deals: EntityStore::new(backend.clone()),
            contacts: EntityStore::new(backend.clone()),
            clients: EntityStore::new(backend.clone()),
            leads: EntityStore::new(backend.clone()),
            activities: EntityStore::new(backend.clone()),
            invoices: EntityStore::new(backend.clone()),
            sales_teams: EntityStore::new(backend),
            hooks: Arc::new(hooks),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrmEvent> {
        self.events.subscribe()
    }

    pub fn hooks(&self) -> &[Arc<dyn DealHook>] {
        &self.hooks
    }

    pub fn publish(&self, event: CrmEvent) {
        // No subscribers is the normal case outside a live session.
        if self.events.send(event).is_err() {
            debug!("event dropped: no subscribers");
        }
    }

    pub fn notify(&self, notice: Notice) {
        self.publish(CrmEvent::Notification(notice));
    }

    pub(crate) fn record_changed<E: Entity>(&self, id: E::Id, change: ChangeKind) {
        self.publish(CrmEvent::RecordChanged {
            collection: E::COLLECTION.to_string(),
            id: id.into(),
            change,
        });
    }
}

/// A draft plus the timestamps the server stamps on create.
#[derive(Serialize)]
pub(crate) struct Stamped<'a, T> {
    #[serde(flatten)]
    pub fields: &'a T,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Default, Serialize)]
pub(crate) struct Stamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
