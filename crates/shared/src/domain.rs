use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CrmError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(DealId);
id_newtype!(ContactId);
id_newtype!(ClientId);
id_newtype!(LeadId);
id_newtype!(InvoiceId);
id_newtype!(ActivityId);
id_newtype!(SalesTeamId);

/// Pipeline phase of a deal. Declaration order is board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    New,
    Qualified,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::New,
        Stage::Qualified,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::ClosedWon,
        Stage::ClosedLost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::New => "New",
            Stage::Qualified => "Qualified",
            Stage::Proposal => "Proposal",
            Stage::Negotiation => "Negotiation",
            Stage::ClosedWon => "Closed Won",
            Stage::ClosedLost => "Closed Lost",
        }
    }

    /// Status a deal must carry while sitting in this stage.
    pub fn implied_status(self) -> DealStatus {
        match self {
            Stage::ClosedWon => DealStatus::Won,
            Stage::ClosedLost => DealStatus::Lost,
            _ => DealStatus::Open,
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Stage::ClosedWon | Stage::ClosedLost)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CrmError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == trimmed)
            .ok_or_else(|| CrmError::InvalidStage(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DealStatus {
    #[default]
    Open,
    Won,
    Lost,
}

/// Insertion-ordered product names without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ProductSet(Vec<String>);

impl ProductSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product, ignoring blanks and names already present.
    pub fn insert(&mut self, product: impl Into<String>) -> bool {
        let product = product.into();
        let product = product.trim();
        if product.is_empty() || self.contains(product) {
            return false;
        }
        self.0.push(product.to_string());
        true
    }

    pub fn remove(&mut self, product: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != product);
        self.0.len() != before
    }

    pub fn contains(&self, product: &str) -> bool {
        self.0.iter().any(|existing| existing == product)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProductSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ProductSet::new();
        for product in iter {
            set.insert(product);
        }
        set
    }
}

impl From<Vec<String>> for ProductSet {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<ProductSet> for Vec<String> {
    fn from(value: ProductSet) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub title: String,
    pub contact_id: ContactId,
    #[serde(default)]
    pub account_id: String,
    pub value: Decimal,
    pub probability: u8,
    pub stage: Stage,
    #[serde(default)]
    pub status: DealStatus,
    pub expected_close_date: NaiveDate,
    #[serde(default)]
    pub actual_close_date: Option<DateTime<Utc>>,
    pub stage_updated_at: DateTime<Utc>,
    #[serde(default)]
    pub products: ProductSet,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub sales_team_id: Option<SalesTeamId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RelationshipLevel {
    #[serde(rename = "Decision Maker")]
    DecisionMaker,
    Influencer,
    Champion,
    #[serde(rename = "Technical Evaluator")]
    TechnicalEvaluator,
    #[default]
    Contact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
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
    pub last_interaction: DateTime<Utc>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A contact that has become a paying customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
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
    pub last_interaction: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Unqualified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub first_name: String,
    pub last_name: String,
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
    pub created_date: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityType {
    #[default]
    Call,
    Meeting,
    Email,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityOutcome {
    #[default]
    Pending,
    Positive,
    Neutral,
    Negative,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub activity_type: ActivityType,
    pub contact_id: ContactId,
    #[serde(default)]
    pub deal_id: Option<DealId>,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub outcome: ActivityOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Always `quantity * unit_price` once normalized; client input is ignored.
    #[serde(default)]
    pub total: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total: quantity * unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(default)]
    pub invoice_number: String,
    pub contact_id: ContactId,
    #[serde(default)]
    pub deal_id: Option<DealId>,
    pub issue_date: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTeam {
    pub id: SalesTeamId,
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
