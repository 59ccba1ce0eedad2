//! Typed access to record collections.
//!
//! Domain types serialize with plain snake_case names. On the way to a
//! backend every field except the id gains a `_c` suffix, and list fields
//! (such as deal products) collapse to one comma-joined string, with commas
//! and backslashes inside an item escaped by a backslash. Nothing outside
//! this module sees the storage spelling.

use std::{marker::PhantomData, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{
        Activity, ActivityId, Client, ClientId, Contact, ContactId, Deal, DealId, Invoice,
        InvoiceId, Lead, LeadId, SalesTeam, SalesTeamId,
    },
    error::CrmError,
};

use crate::{Fields, RecordBackend, ID_FIELD};

const FIELD_SUFFIX: &str = "_c";
const LIST_SEPARATOR: char = ',';
const LIST_ESCAPE: char = '\\';

pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Copy + Into<i64> + Send + Sync;

    /// Backend collection (table) name.
    const COLLECTION: &'static str;

    /// Fields stored as a comma-joined string rather than a list.
    const LIST_FIELDS: &'static [&'static str] = &[];
}

impl Entity for Deal {
    type Id = DealId;
    const COLLECTION: &'static str = "deal_c";
    const LIST_FIELDS: &'static [&'static str] = &["products"];
}

impl Entity for Contact {
    type Id = ContactId;
    const COLLECTION: &'static str = "contact_c";
}

impl Entity for Client {
    type Id = ClientId;
    const COLLECTION: &'static str = "client_c";
}

impl Entity for Lead {
    type Id = LeadId;
    const COLLECTION: &'static str = "lead_c";
}

impl Entity for Activity {
    type Id = ActivityId;
    const COLLECTION: &'static str = "activity_c";
}

impl Entity for Invoice {
    type Id = InvoiceId;
    const COLLECTION: &'static str = "invoice_c";
}

impl Entity for SalesTeam {
    type Id = SalesTeamId;
    const COLLECTION: &'static str = "sales_team_c";
}

/// Converts a domain value or patch into storage-format fields.
pub fn encode_fields<T: Serialize>(value: &T, list_fields: &[&str]) -> Result<Fields> {
    let Value::Object(map) = serde_json::to_value(value)? else {
        bail!("record fields must serialize to an object");
    };

    let mut fields = Fields::new();
    for (name, value) in map {
        if name == "id" {
            continue;
        }
        let value = if list_fields.contains(&name.as_str()) {
            join_list(value)
        } else {
            value
        };
        fields.insert(format!("{name}{FIELD_SUFFIX}"), value);
    }
    Ok(fields)
}

/// Converts a backend record back into a domain value. Unknown system
/// fields are ignored; nulls fall back to the field's default.
pub fn decode_record<E: Entity>(record: Fields) -> Result<E> {
    let mut map = Fields::new();
    for (name, value) in record {
        if value.is_null() {
            continue;
        }
        if name == ID_FIELD {
            map.insert("id".to_string(), value);
            continue;
        }
        let Some(field) = name.strip_suffix(FIELD_SUFFIX) else {
            continue;
        };
        let value = if E::LIST_FIELDS.contains(&field) {
            split_list(value)
        } else {
            value
        };
        map.insert(field.to_string(), value);
    }
    serde_json::from_value(Value::Object(map))
        .with_context(|| format!("malformed '{}' record", E::COLLECTION))
}

fn join_list(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::String(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(escape_item)
                .collect::<Vec<_>>()
                .join(&LIST_SEPARATOR.to_string()),
        ),
        other => other,
    }
}

fn escape_item(item: &str) -> String {
    let mut escaped = String::with_capacity(item.len());
    for ch in item.chars() {
        if ch == LIST_SEPARATOR || ch == LIST_ESCAPE {
            escaped.push(LIST_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

fn split_list(value: Value) -> Value {
    match value {
        Value::String(joined) => Value::Array(
            split_escaped(&joined)
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        other => other,
    }
}

/// Splits on unescaped separators. A trailing lone escape is kept as is.
fn split_escaped(joined: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = joined.chars();
    while let Some(ch) = chars.next() {
        match ch {
            LIST_ESCAPE => current.push(chars.next().unwrap_or(LIST_ESCAPE)),
            LIST_SEPARATOR => items.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    items.push(current);
    items
}

/// Per-entity store over an injected backend.
pub struct EntityStore<E> {
    backend: Arc<dyn RecordBackend>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            _entity: PhantomData,
        }
    }

    pub async fn get_all(&self) -> Result<Vec<E>, CrmError> {
        let records = self.backend.fetch_all(E::COLLECTION).await?;
        let entities = records
            .into_iter()
            .map(decode_record::<E>)
            .collect::<Result<Vec<_>>>()?;
        Ok(entities)
    }

    pub async fn get_by_id(&self, id: E::Id) -> Result<Option<E>, CrmError> {
        let record = self.backend.fetch_one(E::COLLECTION, id.into()).await?;
        Ok(record.map(decode_record::<E>).transpose()?)
    }

    /// Creates a record from any serializable field set (a `New*` struct or
    /// a draft) and returns it as stored.
    pub async fn create<T: Serialize + Sync>(&self, fields: &T) -> Result<E, CrmError> {
        let fields = encode_fields(fields, E::LIST_FIELDS)?;
        let record = self
            .backend
            .create(E::COLLECTION, fields)
            .await?
            .ok_or_else(|| anyhow!("backend returned no '{}' record", E::COLLECTION))?;
        Ok(decode_record(record)?)
    }

    /// Merges `patch` into the stored record. Fields the patch omits are
    /// left untouched; explicit nulls clear the stored value.
    pub async fn update<T: Serialize + Sync>(
        &self,
        id: E::Id,
        patch: &T,
    ) -> Result<Option<E>, CrmError> {
        let fields = encode_fields(patch, E::LIST_FIELDS)?;
        let record = self.backend.update(E::COLLECTION, id.into(), fields).await?;
        Ok(record.map(decode_record::<E>).transpose()?)
    }

    pub async fn delete(&self, id: E::Id) -> Result<bool, CrmError> {
        Ok(self.backend.delete(E::COLLECTION, id.into()).await?)
    }
}

#[cfg(test)]
#[path = "tests/entity_tests.rs"]
mod tests;
