//! Race behavior of the settlement path.
//!
//! Stripe delivers at-least-once and redeliveries can overlap, so the
//! unique index on `external_reference` is what keeps the balance from
//! being credited twice. These tests drive that path with genuinely
//! concurrent writers.

use std::sync::Arc;

use fluenta::services::LedgerService;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{create_test_account, settlement, setup_test_db};

#[tokio::test]
#[ignore] // Run only when database is available
async fn concurrent_duplicate_settlements_apply_once() {
    let db = setup_test_db().await;
    let service = Arc::new(LedgerService::new(db.clone()));
    let user_id = create_test_account(&db).await;
    let reference = format!("cs_{}", Uuid::new_v4());

    // Five overlapping deliveries of the SAME checkout event
    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let service = service.clone();
        let event = settlement(user_id, &reference, 10);
        tasks.spawn(async move { service.append_settlement(&event).await });
    }

    let mut applied_count = 0;
    let mut duplicate_count = 0;

    while let Some(result) = tasks.join_next().await {
        let outcome = result
            .expect("settlement task panicked")
            .expect("settlement must not error on duplicates");

        // Every delivery reports the same final snapshot
        assert_eq!(outcome.credits_after, 10);

        if outcome.applied {
            applied_count += 1;
        } else {
            duplicate_count += 1;
        }
    }

    assert_eq!(applied_count, 1, "Expected exactly 1 applied settlement");
    assert_eq!(duplicate_count, 4, "Expected 4 duplicate no-ops");

    assert_eq!(service.get_balance(user_id).await.unwrap(), 10);
    assert_eq!(service.transactions(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn concurrent_distinct_settlements_both_apply() {
    let db = setup_test_db().await;
    let service = Arc::new(LedgerService::new(db.clone()));
    let user_id = create_test_account(&db).await;

    let first = settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 10);
    let second = settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 5);

    let (a, b) = futures::future::join(
        service.append_settlement(&first),
        service.append_settlement(&second),
    )
    .await;

    assert!(a.unwrap().applied);
    assert!(b.unwrap().applied);

    // Commit order between the two may vary; the final balance and the
    // snapshot chain may not.
    assert_eq!(service.get_balance(user_id).await.unwrap(), 15);

    let entries = service.transactions(user_id).await.unwrap();
    assert_eq!(entries.len(), 2);

    let mut running = 0;
    for entry in &entries {
        running += entry.amount;
        assert_eq!(entry.credits_after, running);
    }
    assert_eq!(running, 15);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn purchase_racing_consumption_stays_consistent() {
    let db = setup_test_db().await;
    let service = Arc::new(LedgerService::new(db.clone()));
    let user_id = create_test_account(&db).await;

    service
        .append_settlement(&settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 10))
        .await
        .unwrap();

    let purchase = settlement(user_id, &format!("cs_{}", Uuid::new_v4()), 5);
    let (settled, consumed) = futures::future::join(
        service.append_settlement(&purchase),
        service.append_consumption(user_id, 8, "mock_test"),
    )
    .await;

    assert!(settled.unwrap().applied);
    consumed.unwrap();

    assert_eq!(service.get_balance(user_id).await.unwrap(), 7);

    let entries = service.transactions(user_id).await.unwrap();
    assert_eq!(entries.len(), 3);

    let mut running = 0;
    for entry in &entries {
        running += entry.amount;
        assert_eq!(entry.credits_after, running);
    }

    assert_eq!(
        service.reconstructed_balance(user_id).await.unwrap(),
        service.get_balance(user_id).await.unwrap()
    );
}
