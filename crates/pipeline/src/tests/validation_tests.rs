use super::*;
use crate::test_support::{at, deal};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use shared::domain::{ContactId, ProductSet};

fn draft() -> DealDraft {
    DealDraft {
        title: "  Annual renewal ".into(),
        contact_id: Some(ContactId(3)),
        account_id: "Acme Corp".into(),
        value: Some(dec!(4800)),
        probability: None,
        stage: None,
        expected_close_date: NaiveDate::from_ymd_opt(2024, 9, 1),
        notes: String::new(),
        products: ProductSet::from_iter(["Enterprise CRM", "Training Package"]),
        sales_team_id: None,
    }
}

#[test]
fn well_formed_deals_pass() {
    for stage in Stage::ALL {
        validate_deal(&deal(1, dec!(10), 40, stage)).expect("valid");
    }
}

#[test]
fn status_out_of_step_with_stage_is_reported() {
    let mut d = deal(1, dec!(10), 40, Stage::Negotiation);
    d.status = DealStatus::Won;
    assert!(matches!(validate_deal(&d), Err(CrmError::Validation(_))));
}

#[test]
fn close_date_on_open_deal_is_reported() {
    let mut d = deal(1, dec!(10), 40, Stage::Proposal);
    d.actual_close_date = Some(at(2, 2));
    assert!(validate_deal(&d).is_err());

    let mut won = deal(2, dec!(10), 100, Stage::ClosedWon);
    won.actual_close_date = None;
    assert!(validate_deal(&won).is_err());
}

#[test]
fn probability_above_hundred_is_rejected() {
    let d = deal(1, dec!(10), 101, Stage::New);
    assert!(validate_deal(&d).is_err());
}

#[test]
fn negative_value_is_rejected() {
    let d = deal(1, dec!(-1), 10, Stage::New);
    assert!(validate_deal(&d).is_err());
}

#[test]
fn draft_defaults_to_new_open_deal() {
    let new_deal = validate_deal_draft(&draft(), at(4, 9)).expect("valid");
    assert_eq!(new_deal.title, "Annual renewal");
    assert_eq!(new_deal.stage, Stage::New);
    assert_eq!(new_deal.status, DealStatus::Open);
    assert_eq!(new_deal.actual_close_date, None);
    assert_eq!(new_deal.probability, DEFAULT_PROBABILITY);
    assert_eq!(new_deal.stage_updated_at, at(4, 9));
    assert_eq!(new_deal.products.len(), 2);
}

#[test]
fn draft_created_as_won_gets_derived_fields() {
    let mut won = draft();
    won.stage = Some(Stage::ClosedWon);
    let new_deal = validate_deal_draft(&won, at(4, 9)).expect("valid");
    assert_eq!(new_deal.status, DealStatus::Won);
    assert_eq!(new_deal.actual_close_date, Some(at(4, 9)));
}

#[test]
fn draft_requires_title_contact_value_and_close_date() {
    let mut blank_title = draft();
    blank_title.title = "   ".into();
    assert!(validate_deal_draft(&blank_title, at(1, 1)).is_err());

    let mut no_contact = draft();
    no_contact.contact_id = None;
    assert!(validate_deal_draft(&no_contact, at(1, 1)).is_err());

    let mut zero_value = draft();
    zero_value.value = Some(Decimal::ZERO);
    assert!(validate_deal_draft(&zero_value, at(1, 1)).is_err());

    let mut no_date = draft();
    no_date.expected_close_date = None;
    assert!(validate_deal_draft(&no_date, at(1, 1)).is_err());
}

#[test]
fn line_items_need_description_and_non_negative_numbers() {
    assert!(validate_line_items(&[]).is_err());
    assert!(validate_line_items(&[LineItem::new(" ", dec!(1), dec!(1))]).is_err());
    assert!(validate_line_items(&[LineItem::new("Seats", dec!(-1), dec!(1))]).is_err());
    validate_line_items(&[LineItem::new("Seats", dec!(2), dec!(9.5))]).expect("valid");
}

#[test]
fn amounts_must_be_numeric() {
    assert_eq!(parse_amount(" 1200.50 ").expect("amount"), dec!(1200.50));
    assert!(matches!(parse_amount("12k"), Err(CrmError::Validation(_))));
    assert!(parse_amount("-5").is_err());
}

#[test]
fn amounts_above_the_supported_maximum_are_rejected() {
    validate_value(MAX_AMOUNT).expect("at the limit");
    assert!(matches!(
        validate_value(MAX_AMOUNT + Decimal::ONE),
        Err(CrmError::Validation(_))
    ));

    let mut oversized = draft();
    oversized.value = Some(Decimal::MAX);
    assert!(validate_deal_draft(&oversized, at(1, 9)).is_err());

    let line = LineItem::new("Fleet", MAX_AMOUNT + Decimal::ONE, dec!(1));
    assert!(validate_line_items(&[line]).is_err());
    let line = LineItem::new("Fleet", dec!(1), MAX_AMOUNT + Decimal::ONE);
    assert!(validate_line_items(&[line]).is_err());
}
