use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ActivityOutcome, ActivityType, ClientId, ContactId, DealId, DealStatus, InvoiceStatus,
    LeadStatus, LineItem, ProductSet, RelationshipLevel, SalesTeamId, Stage,
};

/// Deal form as submitted by a user; checked before it becomes a [`NewDeal`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub probability: Option<u8>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub products: ProductSet,
    #[serde(default)]
    pub sales_team_id: Option<SalesTeamId>,
}

/// Field set of a deal about to be created, with derived fields filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeal {
    pub title: String,
    pub contact_id: ContactId,
    pub account_id: String,
    pub value: Decimal,
    pub probability: u8,
    pub stage: Stage,
    pub status: DealStatus,
    pub expected_close_date: NaiveDate,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub stage_updated_at: DateTime<Utc>,
    pub products: ProductSet,
    pub notes: String,
    pub sales_team_id: Option<SalesTeamId>,
}

/// Full-form deal edit. `stage` is routed through the stage-transition rule;
/// status and close date are never accepted from the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<ProductSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_team_id: Option<SalesTeamId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageChangeRequest {
    pub stage: String,
}

/// Contact form; clients share the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactDraft {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub relationship_level: RelationshipLevel,
    #[serde(default)]
    pub notes: String,
}

pub type ClientDraft = ContactDraft;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_level: Option<RelationshipLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub type ClientPatch = ContactPatch;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadDraft {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub lead_source: String,
    #[serde(default)]
    pub status: LeadStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDraft {
    #[serde(default)]
    pub activity_type: ActivityType,
    pub contact_id: ContactId,
    #[serde(default)]
    pub deal_id: Option<DealId>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to the creation time when omitted.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub outcome: ActivityOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActivityOutcome>,
}

/// Invoice form. Totals are not part of the input; they are recomputed from
/// the line items on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub contact_id: ContactId,
    #[serde(default)]
    pub deal_id: Option<DealId>,
    pub due_date: NaiveDate,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTeamDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub team_lead: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub member_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-facing message, the server-side counterpart of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CrmEvent {
    RecordChanged {
        collection: String,
        id: i64,
        change: ChangeKind,
    },
    DealStageChanged {
        deal_id: DealId,
        from: Stage,
        to: Stage,
        status: DealStatus,
    },
    ClientConverted {
        deal_id: DealId,
        client_id: ClientId,
    },
    Notification(Notice),
}
