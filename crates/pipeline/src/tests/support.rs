use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::domain::{
    Client, ClientId, Contact, ContactId, Deal, DealId, DealStatus, ProductSet,
    RelationshipLevel, Stage,
};

pub(crate) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub(crate) fn deal(id: i64, value: Decimal, probability: u8, stage: Stage) -> Deal {
    let status = stage.implied_status();
    Deal {
        id: DealId(id),
        title: format!("deal-{id}"),
        contact_id: ContactId(1),
        account_id: "Acme Corp".into(),
        value,
        probability,
        stage,
        status,
        expected_close_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        actual_close_date: (status != DealStatus::Open).then(|| at(1, 9)),
        stage_updated_at: at(1, 9),
        products: ProductSet::from_iter(["Basic CRM"]),
        notes: String::new(),
        sales_team_id: None,
    }
}

pub(crate) fn contact() -> Contact {
    Contact {
        id: ContactId(1),
        first_name: "Dana".into(),
        last_name: "Reyes".into(),
        email: "dana.reyes@acme.test".into(),
        phone: "555-0100".into(),
        company: "Acme Corp".into(),
        job_title: "VP Operations".into(),
        account_id: "Acme Corp".into(),
        relationship_level: RelationshipLevel::DecisionMaker,
        notes: String::new(),
        last_interaction: at(1, 8),
    }
}

pub(crate) fn client_from(contact: &Contact, id: i64) -> Client {
    Client {
        id: ClientId(id),
        first_name: contact.first_name.clone(),
        last_name: contact.last_name.clone(),
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        company: contact.company.clone(),
        job_title: contact.job_title.clone(),
        account_id: contact.account_id.clone(),
        relationship_level: contact.relationship_level,
        notes: String::new(),
        last_interaction: at(2, 8),
    }
}
