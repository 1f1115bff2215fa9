//! Ledger behavior against a real database: settlement, consumption,
//! refunds, and the audit-trail invariants.

use entity::sea_orm_active_enums::TransactionKind;
use fluenta::services::LedgerService;
use fluenta::ApiError;
use uuid::Uuid;

use crate::{create_test_account, settlement, setup_test_db};

/// Walk the ledger in order and check every entry's snapshot chains from
/// the previous one, ending at the cached balance.
async fn assert_audit_chain(service: &LedgerService, user_id: Uuid) {
    let entries = service.transactions(user_id).await.unwrap();

    let mut running = 0;
    for entry in &entries {
        running += entry.amount;
        assert_eq!(
            entry.credits_after, running,
            "credits_after snapshot broke the chain at entry {}",
            entry.id
        );
    }

    let balance = service.get_balance(user_id).await.unwrap();
    assert_eq!(running, balance, "folded ledger disagrees with balance");
    assert_eq!(
        service.reconstructed_balance(user_id).await.unwrap(),
        balance
    );
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn settlement_credits_balance_once() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;
    let reference = format!("cs_{}", Uuid::new_v4());

    let outcome = service
        .append_settlement(&settlement(user_id, &reference, 10))
        .await
        .unwrap();

    assert!(outcome.applied);
    assert_eq!(outcome.credits_after, 10);
    assert_eq!(service.get_balance(user_id).await.unwrap(), 10);

    let entries = service.transactions(user_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, TransactionKind::Purchase);
    assert_eq!(entries[0].amount, 10);
    assert_eq!(entries[0].credits_after, 10);
    assert_eq!(entries[0].external_reference.as_deref(), Some(reference.as_str()));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn redelivered_settlement_is_a_noop() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;
    let reference = format!("cs_{}", Uuid::new_v4());
    let event = settlement(user_id, &reference, 10);

    let first = service.append_settlement(&event).await.unwrap();
    assert!(first.applied);

    // Same event again, as Stripe will do on any flaky acknowledgement
    let second = service.append_settlement(&event).await.unwrap();
    assert!(!second.applied);
    assert_eq!(second.credits_after, 10);
    assert_eq!(second.transaction_id, first.transaction_id);

    assert_eq!(service.get_balance(user_id).await.unwrap(), 10);
    assert_eq!(service.transactions(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn settlement_for_unknown_user_is_permanent_failure() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let ghost = Uuid::new_v4();
    let reference = format!("cs_{}", Uuid::new_v4());

    let result = service
        .append_settlement(&settlement(ghost, &reference, 10))
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));

    // Nothing must have been logged for the failed attempt
    assert!(service.find_settlement(&reference).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn consumption_debits_balance() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;

    service
        .append_settlement(&settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 10))
        .await
        .unwrap();

    let credits_after = service
        .append_consumption(user_id, 4, "general_english")
        .await
        .unwrap();

    assert_eq!(credits_after, 6);
    assert_eq!(service.get_balance(user_id).await.unwrap(), 6);

    let entries = service.transactions(user_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].kind, TransactionKind::Consumption);
    assert_eq!(entries[1].amount, -4);
    assert_audit_chain(&service, user_id).await;
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn consumption_rejects_overdraft() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;

    service
        .append_settlement(&settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 5))
        .await
        .unwrap();

    let result = service.append_consumption(user_id, 10, "mock_test").await;
    assert!(matches!(result, Err(ApiError::InsufficientCredits(_))));

    // Balance and ledger untouched by the rejected attempt
    assert_eq!(service.get_balance(user_id).await.unwrap(), 5);
    assert_eq!(service.transactions(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn mixed_workload_keeps_ledger_reconstructable() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;

    service
        .append_settlement(&settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 10))
        .await
        .unwrap();
    service
        .append_settlement(&settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 5))
        .await
        .unwrap();
    service
        .append_consumption(user_id, 3, "general_english")
        .await
        .unwrap();
    service
        .append_adjustment(user_id, -2, "support: double-billed minute")
        .await
        .unwrap();
    service
        .append_adjustment(user_id, 1, "support: goodwill credit")
        .await
        .unwrap();

    assert_eq!(service.get_balance(user_id).await.unwrap(), 11);
    assert_audit_chain(&service, user_id).await;
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn negative_adjustment_clamps_at_zero() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;

    service
        .append_settlement(&settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 5))
        .await
        .unwrap();

    let credits_after = service
        .append_adjustment(user_id, -50, "support: revoke promo")
        .await
        .unwrap();

    assert_eq!(credits_after, 0);
    assert_audit_chain(&service, user_id).await;
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn refund_reverses_purchase_once() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;
    let reference = format!("cs_{}", Uuid::new_v4());
    let event = settlement(user_id, &reference, 10);
    let payment_intent = event.payment_intent.clone().unwrap();
    let charge_id = format!("ch_{}", Uuid::new_v4());

    service.append_settlement(&event).await.unwrap();

    let outcome = service
        .refund_by_payment_intent(&payment_intent, &charge_id)
        .await
        .unwrap()
        .expect("purchase should be found");

    assert!(outcome.applied);
    assert_eq!(outcome.user_id, user_id);
    assert_eq!(outcome.credits_refunded, 10);
    assert_eq!(outcome.credits_after, 0);

    // Redelivered refund event: no further mutation
    let again = service
        .refund_by_payment_intent(&payment_intent, &charge_id)
        .await
        .unwrap()
        .expect("purchase should still be found");
    assert!(!again.applied);

    assert_eq!(service.get_balance(user_id).await.unwrap(), 0);
    assert_eq!(service.transactions(user_id).await.unwrap().len(), 2);
    assert_audit_chain(&service, user_id).await;
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn refund_clamps_to_remaining_balance() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());
    let user_id = create_test_account(&db).await;
    let reference = format!("cs_{}", Uuid::new_v4());
    let event = settlement(user_id, &reference, 10);
    let payment_intent = event.payment_intent.clone().unwrap();

    service.append_settlement(&event).await.unwrap();
    service
        .append_consumption(user_id, 8, "mock_test")
        .await
        .unwrap();

    // Only 2 of the original 10 credits are left to reverse
    let outcome = service
        .refund_by_payment_intent(&payment_intent, &format!("ch_{}", Uuid::new_v4()))
        .await
        .unwrap()
        .expect("purchase should be found");

    assert!(outcome.applied);
    assert_eq!(outcome.credits_refunded, 2);
    assert_eq!(outcome.credits_after, 0);
    assert_audit_chain(&service, user_id).await;
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn refund_for_unknown_payment_is_ignored() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

    let outcome = service
        .refund_by_payment_intent(&format!("pi_{}", Uuid::new_v4()), "ch_unknown")
        .await
        .unwrap();

    assert!(outcome.is_none());
}
