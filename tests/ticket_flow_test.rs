//! Ticket issuance, submission, payment and cancellation end to end.

mod common;

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use common::{bet, harness, harness_with, TENANT};
use fairdraw::common::{DebitRequest, Ledger};
use fairdraw::config::{GameEntitlementConfig, TenantEntitlementConfig};
use fairdraw::storage::StoreTransaction;
use fairdraw::ticket::{ParticipationStatus, SubmissionStatus};
use fairdraw::{ErrorKind, IssueTicketRequest, LotteryError, LotteryResult, SubmitNumbersRequest};

fn issue(draw_ids: Vec<Uuid>, member_id: u64, cost: i64) -> IssueTicketRequest {
    IssueTicketRequest {
        tenant_id: TENANT,
        member_id,
        game_code: "lotto".to_string(),
        draw_ids,
        campaign_id: None,
        template_id: None,
        cost,
    }
}

fn submit(ticket_id: Uuid, play_type: &str, lines: Vec<Vec<u8>>) -> SubmitNumbersRequest {
    SubmitNumbersRequest {
        ticket_id,
        play_type: play_type.to_string(),
        lines,
        submitted_by: Some("member".to_string()),
        client_reference: None,
        note: None,
    }
}

#[tokio::test]
async fn test_place_bet_debits_member_and_activates_participation() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    h.fund(5, 1_000).await;

    let ticket = h
        .engine
        .place_bet(bet(&draw, 5, "straight", vec![vec![49, 3, 17, 8, 22, 1]], 200))
        .await
        .unwrap();
    assert_eq!(ticket.status, SubmissionStatus::Submitted);
    assert_eq!(ticket.total_cost, 200);
    assert_eq!(ticket.lines.len(), 1);
    assert_eq!(ticket.lines[0].numbers, vec![1, 3, 8, 17, 22, 49]);

    assert_eq!(h.balance(5), 800);
    let journal = h.engine.store_ledger().unwrap().journal(TENANT, 5).unwrap();
    let debit = journal.iter().find(|e| e.amount == -200).unwrap();
    assert_eq!(debit.reference_type, "lottery_ticket");
    assert_eq!(debit.reference_id, ticket.id.to_string());

    let participations = h.engine.participations(ticket.id).unwrap();
    assert_eq!(participations.len(), 1);
    assert_eq!(participations[0].status, ParticipationStatus::Active);
    assert_eq!(h.engine.tickets_for_draw(draw.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_place_bet_on_current_draw() {
    let h = harness();
    let mut request = bet(&h.open_draw("daily5").await, 2, "straight", vec![vec![1, 2, 3, 4, 5]], 0);
    request.draw_id = None;

    let ticket = h.engine.place_bet(request).await.unwrap();
    let current = h.engine.current_draw(TENANT, "daily5").await.unwrap();
    assert_eq!(ticket.draw_id, Some(current.id));
}

#[tokio::test]
async fn test_insufficient_balance_leaves_nothing_behind() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    h.fund(9, 100).await;

    let err = h
        .engine
        .place_bet(bet(&draw, 9, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 200))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::InsufficientBalance { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(h.balance(9), 100);
    assert!(h.engine.tickets_for_draw(draw.id).unwrap().is_empty());

    let err = h
        .engine
        .place_bet(bet(&draw, 404, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 200))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::AccountNotFound { .. }));
}

#[tokio::test]
async fn test_suspended_member_cannot_pay() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    h.fund(4, 1_000).await;
    h.engine.store_ledger().unwrap().set_suspended(TENANT, 4, true).await.unwrap();

    let err = h
        .engine
        .place_bet(bet(&draw, 4, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 200))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::MemberSuspended(4)));
    assert_eq!(h.balance(4), 1_000);
}

#[tokio::test]
async fn test_second_submission_conflicts_and_keeps_first_lines() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    let ticket = h.engine.issue_ticket(issue(vec![draw.id], 1, 0)).await.unwrap();
    assert_eq!(ticket.status, SubmissionStatus::Unsubmitted);
    assert_eq!(
        h.engine.participations(ticket.id).unwrap()[0].status,
        ParticipationStatus::Pending
    );

    h.engine
        .submit_numbers(submit(ticket.id, "straight", vec![vec![1, 2, 3, 4, 5, 6]]))
        .await
        .unwrap();

    let err = h
        .engine
        .submit_numbers(submit(
            ticket.id,
            "straight",
            vec![vec![7, 8, 9, 10, 11, 12], vec![13, 14, 15, 16, 17, 18]],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::TicketAlreadySubmittedConflict(_)));

    let stored = h.engine.get_ticket(ticket.id).unwrap();
    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines[0].numbers, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(h.engine.metrics().snapshot().submission_conflicts, 1);
}

#[tokio::test]
async fn test_concurrent_submissions_have_one_winner() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    let ticket = h.engine.issue_ticket(issue(vec![draw.id], 1, 0)).await.unwrap();

    let (first, second) = futures::join!(
        h.engine
            .submit_numbers(submit(ticket.id, "straight", vec![vec![1, 2, 3, 4, 5, 6]])),
        h.engine.submit_numbers(submit(
            ticket.id,
            "system",
            vec![vec![10, 11, 12, 13, 14, 15, 16]]
        )),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(LotteryError::TicketAlreadySubmittedConflict(_)))));

    let winner = outcomes.iter().find_map(|r| r.as_ref().ok()).unwrap();
    let stored = h.engine.get_ticket(ticket.id).unwrap();
    assert_eq!(stored.play_type, winner.play_type);
    assert_eq!(stored.lines, winner.lines);
}

#[tokio::test]
async fn test_bet_shape_validation() {
    let h = harness();
    let draw = h.open_draw("lotto").await;

    let cases: Vec<(&str, Vec<Vec<u8>>, &str)> = vec![
        ("straight", vec![], "EmptyBet"),
        ("straight", vec![vec![1, 2, 3, 4, 5]], "InvalidNumberCount"),
        ("straight", vec![vec![1, 2, 3, 4, 5, 50]], "NumberOutOfRange"),
        ("straight", vec![vec![1, 2, 3, 4, 5, 5]], "DuplicateNumber"),
        ("system", vec![vec![1, 2, 3, 4, 5, 6]], "InvalidNumberCount"),
        ("system", vec![(1..=11).collect()], "InvalidNumberCount"),
        ("pick3", vec![vec![1, 2, 3, 4]], "InvalidNumberCount"),
        ("quick", vec![vec![1, 2, 3, 4, 5, 6]], "InvalidPlayType"),
    ];
    for (play_type, lines, code) in cases {
        let err = h
            .engine
            .place_bet(bet(&draw, 1, play_type, lines, 0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code, "{} bet", play_type);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(h.engine.tickets_for_draw(draw.id).unwrap().is_empty());

    let system = h
        .engine
        .place_bet(bet(&draw, 1, "system", vec![(20..28).collect()], 0))
        .await
        .unwrap();
    assert_eq!(system.lines[0].numbers.len(), 8);
    h.engine
        .place_bet(bet(&draw, 1, "pick3", vec![vec![40, 2, 33]], 0))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_draw_restricts_play_types() {
    let h = harness();
    let draw = h.draw_with("lotto", Duration::zero(), vec!["straight"]).await;

    let err = h
        .engine
        .place_bet(bet(&draw, 1, "system", vec![(1..=7).collect()], 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::PlayTypeNotEnabledForDraw { .. }));
}

#[tokio::test]
async fn test_tenant_entitlements() {
    let h = harness_with(
        |config| {
            config.entitlements = vec![TenantEntitlementConfig {
                tenant_id: TENANT,
                games: vec![GameEntitlementConfig {
                    game_code: "lotto".to_string(),
                    play_types: vec!["straight".to_string()],
                }],
            }];
        },
        |builder| builder,
    );
    let lotto = h.open_draw("lotto").await;
    let daily = h.open_draw("daily5").await;

    h.engine
        .place_bet(bet(&lotto, 1, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 0))
        .await
        .unwrap();
    let err = h
        .engine
        .place_bet(bet(&lotto, 1, "system", vec![(1..=7).collect()], 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::PlayTypeNotEnabled { .. }));
    let err = h
        .engine
        .place_bet(bet(&daily, 1, "straight", vec![vec![1, 2, 3, 4, 5]], 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::GameNotEnabled { .. }));
}

#[tokio::test]
async fn test_template_allow_list() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    let template_id = Uuid::new_v4();

    let mut request = issue(vec![draw.id], 1, 0);
    request.template_id = Some(template_id);
    let ticket = h.engine.issue_ticket(request.clone()).await.unwrap();
    let err = h
        .engine
        .submit_numbers(submit(ticket.id, "straight", vec![vec![1, 2, 3, 4, 5, 6]]))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::TemplateNotAllowed { .. }));

    h.engine.allow_ticket_template(draw.id, template_id).await.unwrap();
    h.engine
        .submit_numbers(submit(ticket.id, "straight", vec![vec![1, 2, 3, 4, 5, 6]]))
        .await
        .unwrap();

    h.engine.revoke_ticket_template(draw.id, template_id).await.unwrap();
    let revoked = h.engine.issue_ticket(request).await.unwrap();
    let err = h
        .engine
        .submit_numbers(submit(revoked.id, "straight", vec![vec![1, 2, 3, 4, 5, 6]]))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::TemplateNotAllowed { .. }));
}

#[tokio::test]
async fn test_campaign_ticket_marks_unopened_draw_invalid() {
    let h = harness();
    let current = h.open_draw("lotto").await;
    let later = h.draw_with("lotto", Duration::hours(2), vec![]).await;

    let ticket = h
        .engine
        .issue_ticket(issue(vec![current.id, later.id], 1, 0))
        .await
        .unwrap();
    assert_eq!(ticket.draw_id, Some(current.id));
    h.engine
        .submit_numbers(submit(ticket.id, "straight", vec![vec![1, 2, 3, 4, 5, 6]]))
        .await
        .unwrap();

    let participations = h.engine.participations(ticket.id).unwrap();
    let status_for = |draw_id: Uuid| {
        participations
            .iter()
            .find(|p| p.draw_id == draw_id)
            .map(|p| p.status)
            .unwrap()
    };
    assert_eq!(status_for(current.id), ParticipationStatus::Active);
    assert_eq!(status_for(later.id), ParticipationStatus::Invalid);
}

#[tokio::test]
async fn test_issue_on_closed_draw_charges_nothing() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    let other = h.open_draw("lotto").await;
    h.fund(9, 100).await;

    // Manual close inside the window
    h.clock.advance(Duration::minutes(5));
    h.engine.manual_close(other.id, "audit").await.unwrap();
    let err = h.engine.issue_ticket(issue(vec![other.id], 9, 40)).await.unwrap_err();
    assert!(matches!(err, LotteryError::DrawNotOpen { .. }));
    assert_eq!(h.balance(9), 100);

    h.clock.set(draw.sales_close_at + Duration::minutes(1));
    let err = h.engine.issue_ticket(issue(vec![draw.id], 9, 40)).await.unwrap_err();
    assert!(matches!(err, LotteryError::DrawNotOpen { .. }));
    assert_eq!(h.balance(9), 100);
    assert!(h.engine.tickets_for_draw(draw.id).unwrap().is_empty());
    assert!(h.engine.tickets_for_draw(other.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_before_draw_time_without_refund() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    h.fund(6, 500).await;
    let ticket = h
        .engine
        .place_bet(bet(&draw, 6, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 200))
        .await
        .unwrap();

    // Sales are closed but the draw has not happened yet
    h.clock.set(draw.sales_close_at + Duration::minutes(1));
    let cancelled = h.engine.cancel_ticket(ticket.id, "member request").await.unwrap();
    assert_eq!(cancelled.status, SubmissionStatus::Cancelled);
    assert_eq!(h.balance(6), 300);
    assert_eq!(
        h.engine.participations(ticket.id).unwrap()[0].status,
        ParticipationStatus::Cancelled
    );

    let err = h.engine.cancel_ticket(ticket.id, "again").await.unwrap_err();
    assert!(matches!(err, LotteryError::TicketCancelled(_)));
}

#[tokio::test]
async fn test_cancel_rejected_from_draw_time_on() {
    let h = harness();
    let draw = h.open_draw("lotto").await;
    let ticket = h
        .engine
        .place_bet(bet(&draw, 6, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 0))
        .await
        .unwrap();

    h.clock.set(draw.draw_at);
    let err = h.engine.cancel_ticket(ticket.id, "too late").await.unwrap_err();
    assert!(matches!(err, LotteryError::TicketCancelAfterDrawTime { .. }));

    h.engine.execute_draw(draw.id).await.unwrap();
    h.engine.settle_draw(draw.id).await.unwrap();
    let err = h.engine.cancel_ticket(ticket.id, "too late").await.unwrap_err();
    assert!(matches!(err, LotteryError::TicketParticipationSettled { .. }));
    assert_eq!(
        h.engine.get_ticket(ticket.id).unwrap().status,
        SubmissionStatus::Submitted
    );
}

/// Ledger that outlives any reasonable deadline
struct SlowLedger;

#[async_trait]
impl Ledger for SlowLedger {
    async fn debit(&self, _tx: &mut StoreTransaction<'_>, _request: DebitRequest) -> LotteryResult<i64> {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        Ok(0)
    }
}

#[tokio::test]
async fn test_timeout_rolls_back_and_releases_writer() {
    let h = harness_with(
        |config| config.operations.timeout_ms = 100,
        |builder| builder.ledger(Arc::new(SlowLedger)),
    );
    let draw = h.open_draw("lotto").await;

    let err = h
        .engine
        .place_bet(bet(&draw, 1, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 200))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::Timeout { .. }));
    assert!(err.is_retryable());
    assert!(h.engine.tickets_for_draw(draw.id).unwrap().is_empty());

    // Free tickets skip the ledger and go straight through
    h.engine
        .place_bet(bet(&draw, 1, "straight", vec![vec![1, 2, 3, 4, 5, 6]], 0))
        .await
        .unwrap();
    assert_eq!(h.engine.tickets_for_draw(draw.id).unwrap().len(), 1);
    assert!(h.engine.metrics().render().unwrap().contains("code=\"Timeout\""));
}
