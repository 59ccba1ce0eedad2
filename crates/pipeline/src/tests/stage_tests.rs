use super::*;
use crate::test_support::{at, deal};
use rust_decimal_macros::dec;

#[test]
fn open_stages_clear_status_and_close_date() {
    let won = deal(1, dec!(1000), 100, Stage::ClosedWon);
    for stage in [
        Stage::New,
        Stage::Qualified,
        Stage::Proposal,
        Stage::Negotiation,
    ] {
        let change = transition(&won, stage, at(5, 10));
        assert_eq!(change.stage, stage);
        assert_eq!(change.status, DealStatus::Open);
        assert_eq!(change.actual_close_date, None);
        assert_eq!(change.stage_updated_at, at(5, 10));
    }
}

#[test]
fn closed_won_sets_won_and_close_date() {
    let open = deal(1, dec!(1000), 60, Stage::Negotiation);
    let change = apply_stage_change(&open, "Closed Won", at(5, 10)).expect("stage");
    assert_eq!(change.status, DealStatus::Won);
    assert_eq!(change.actual_close_date, Some(at(5, 10)));
    assert!(change.enters(Stage::ClosedWon));
}

#[test]
fn closed_lost_sets_lost_and_close_date() {
    let open = deal(1, dec!(1000), 60, Stage::Proposal);
    let change = apply_stage_change(&open, "Closed Lost", at(6, 11)).expect("stage");
    assert_eq!(change.status, DealStatus::Lost);
    assert_eq!(change.actual_close_date, Some(at(6, 11)));
    assert!(!change.enters(Stage::ClosedWon));
}

#[test]
fn moving_won_deal_back_to_proposal_reopens_it() {
    let mut won = deal(7, dec!(2500), 100, Stage::ClosedWon);
    let change = apply_stage_change(&won, "Proposal", at(9, 12)).expect("stage");
    assert!(change.reopens());

    change.apply_to(&mut won);
    assert_eq!(won.stage, Stage::Proposal);
    assert_eq!(won.status, DealStatus::Open);
    assert_eq!(won.actual_close_date, None);
    assert_eq!(won.stage_updated_at, at(9, 12));
    // other fields are untouched
    assert_eq!(won.probability, 100);
    assert_eq!(won.value, dec!(2500));
}

#[test]
fn unknown_stage_is_rejected() {
    let open = deal(1, dec!(10), 10, Stage::New);
    let err = apply_stage_change(&open, "Won Maybe", at(1, 1)).expect_err("invalid");
    assert_eq!(err, CrmError::InvalidStage("Won Maybe".into()));

    let err = apply_stage_change(&open, "closed won", at(1, 1)).expect_err("case matters");
    assert!(matches!(err, CrmError::InvalidStage(_)));
}

#[test]
fn stage_change_serializes_null_close_date_for_reopen() {
    let won = deal(2, dec!(10), 100, Stage::ClosedWon);
    let change = transition(&won, Stage::New, at(3, 3));
    let fields = serde_json::to_value(&change).expect("json");
    assert_eq!(fields["stage"], "New");
    assert_eq!(fields["status"], "Open");
    assert!(fields["actual_close_date"].is_null());
    assert!(fields.get("previous_stage").is_none());
}

#[test]
fn same_stage_still_refreshes_timestamp() {
    let open = deal(3, dec!(10), 10, Stage::Qualified);
    let change = transition(&open, Stage::Qualified, at(4, 4));
    assert_eq!(change.stage_updated_at, at(4, 4));
    assert!(!change.enters(Stage::Qualified));
}
