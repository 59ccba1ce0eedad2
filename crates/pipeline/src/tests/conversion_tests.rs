use super::*;
use crate::test_support::{client_from, contact, deal};
use rust_decimal_macros::dec;
use shared::domain::ClientId;

#[test]
fn won_deal_without_client_produces_client_from_contact() {
    let won = deal(4, dec!(12000), 100, Stage::ClosedWon);
    let contact = contact();

    let draft = on_deal_won(&won, &contact, &[]).expect("client draft");
    assert_eq!(draft.first_name, "Dana");
    assert_eq!(draft.last_name, "Reyes");
    assert_eq!(draft.email, contact.email);
    assert_eq!(draft.phone, contact.phone);
    assert_eq!(draft.company, contact.company);
    assert_eq!(draft.job_title, contact.job_title);
    assert_eq!(draft.relationship_level, contact.relationship_level);
    assert!(draft.notes.contains("deal-4"));
}

#[test]
fn conversion_is_idempotent_once_client_exists() {
    let won = deal(4, dec!(12000), 100, Stage::ClosedWon);
    let contact = contact();
    let mut clients = Vec::new();

    assert!(on_deal_won(&won, &contact, &clients).is_some());
    clients.push(client_from(&contact, 1));
    assert!(on_deal_won(&won, &contact, &clients).is_none());
}

#[test]
fn email_match_ignores_case_and_padding() {
    let won = deal(4, dec!(1), 100, Stage::ClosedWon);
    let contact = contact();
    let mut existing = client_from(&contact, 9);
    existing.email = "  DANA.REYES@acme.test ".into();
    assert!(on_deal_won(&won, &contact, &[existing]).is_none());
}

#[test]
fn same_email_under_another_account_still_converts() {
    let won = deal(4, dec!(1), 100, Stage::ClosedWon);
    let contact = contact();
    let mut other_account = client_from(&contact, 2);
    other_account.id = ClientId(2);
    other_account.account_id = "Globex".into();
    assert!(on_deal_won(&won, &contact, &[other_account]).is_some());
}

#[test]
fn deals_that_are_not_won_never_convert() {
    let contact = contact();
    for stage in [Stage::Negotiation, Stage::ClosedLost] {
        let d = deal(5, dec!(1), 50, stage);
        assert!(on_deal_won(&d, &contact, &[]).is_none());
    }
}
