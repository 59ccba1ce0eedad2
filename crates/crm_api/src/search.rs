//! List filters for each page. Search terms match case-insensitively as a
//! substring of any of the record's searchable fields; an empty term matches
//! everything.

use serde::Deserialize;
use shared::domain::{
    ActivityType, Contact, InvoiceStatus, LeadStatus, RelationshipLevel, Stage,
};

pub fn matches_search<'a>(term: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(&term))
}

pub(crate) fn search_term(search: &Option<String>) -> &str {
    search.as_deref().unwrap_or_default()
}

/// Name and company of the contact with `id`, blank when it is unknown.
pub(crate) fn contact_labels(contacts: &[Contact], id: i64) -> (String, String) {
    contacts
        .iter()
        .find(|contact| contact.id.0 == id)
        .map(|contact| (contact.full_name(), contact.company.clone()))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub contact_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub relationship_level: Option<RelationshipLevel>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub contact_id: Option<i64>,
    #[serde(default)]
    pub deal_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub contact_id: Option<i64>,
}
