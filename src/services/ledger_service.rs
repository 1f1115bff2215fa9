use crate::{
    error::{ApiError, Result},
    models::webhooks::SettlementEvent,
};
use anyhow::anyhow;
use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};
use sea_orm::{
    entity::*, query::*, sea_query::OnConflict, DatabaseConnection, DatabaseTransaction, DbErr,
    TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Owns all reads and writes of the credits ledger.
///
/// Two rules hold everywhere in this file: the cached `accounts.credits`
/// value is only written in the same database transaction as its
/// `credit_transactions` insert, and duplicate payment references are
/// resolved by the unique index on `external_reference`, never by an
/// application-level existence check.
pub struct LedgerService {
    db: DatabaseConnection,
}

/// Result of a settlement attempt. `applied == false` means the reference
/// was already settled; the balance was not touched.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub applied: bool,
    pub credits_after: i32,
    pub transaction_id: Uuid,
}

/// Result of a refund attempt against a located purchase.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub applied: bool,
    pub user_id: Uuid,
    /// Credits actually reversed; can be less than the purchase amount
    /// when part of the balance was already spent.
    pub credits_refunded: i32,
    pub credits_after: i32,
}

impl LedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch the account row without locking (read path).
    #[instrument(skip(self))]
    pub async fn get_account(&self, user_id: Uuid) -> Result<Option<entity::accounts::Model>> {
        let account = entity::accounts::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?;
        Ok(account)
    }

    /// Current cached balance; 0 for a user with no ledger activity yet.
    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_id: Uuid) -> Result<i32> {
        Ok(self
            .get_account(user_id)
            .await?
            .map(|a| a.credits)
            .unwrap_or(0))
    }

    /// Audit log for a user in `created_at` order.
    #[instrument(skip(self))]
    pub async fn transactions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entity::credit_transactions::Model>> {
        let entries = entity::credit_transactions::Entity::find()
            .filter(entity::credit_transactions::Column::UserId.eq(user_id))
            .order_by_asc(entity::credit_transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(entries)
    }

    /// Fold the ledger's signed amounts. Must always equal the cached
    /// balance; integration tests assert this after mixed workloads.
    #[instrument(skip(self))]
    pub async fn reconstructed_balance(&self, user_id: Uuid) -> Result<i32> {
        let entries = self.transactions(user_id).await?;
        Ok(entries.iter().map(|e| e.amount).sum())
    }

    /// Fast-path probe for an already-settled reference. Optimization
    /// only: the unique index inside `append_settlement` is what actually
    /// guarantees at-most-once.
    #[instrument(skip(self))]
    pub async fn find_settlement(
        &self,
        external_reference: &str,
    ) -> Result<Option<entity::credit_transactions::Model>> {
        let existing = entity::credit_transactions::Entity::find()
            .filter(
                entity::credit_transactions::Column::ExternalReference.eq(external_reference),
            )
            .one(&self.db)
            .await?;
        Ok(existing)
    }

    /// Credit a verified purchase exactly once.
    ///
    /// Balance update and ledger insert commit atomically. A duplicate
    /// `external_reference` (sequential or concurrent redelivery) leaves
    /// everything untouched and reports `applied = false`.
    #[instrument(skip(self, event), fields(reference = %event.external_reference, user_id = %event.user_id))]
    pub async fn append_settlement(&self, event: &SettlementEvent) -> Result<SettlementOutcome> {
        // Fast path: already settled, skip the write transaction entirely
        if let Some(existing) = self.find_settlement(&event.external_reference).await? {
            return Ok(SettlementOutcome {
                applied: false,
                credits_after: existing.credits_after,
                transaction_id: existing.id,
            });
        }

        let txn = self.db.begin().await?;

        // Serialize concurrent writers for this user on the balance row
        let account = Self::lock_account(event.user_id, &txn).await?;
        let credits_after = account.credits + event.credits;

        let now = time::OffsetDateTime::now_utc();
        let transaction_id = Uuid::new_v4();

        let entry = entity::credit_transactions::ActiveModel {
            id: Set(transaction_id),
            user_id: Set(event.user_id),
            kind: Set(TransactionKind::Purchase),
            amount: Set(event.credits),
            credits_after: Set(credits_after),
            external_reference: Set(Some(event.external_reference.clone())),
            payment_intent: Set(event.payment_intent.clone()),
            package_name: Set(event.package_name.clone()),
            price_cents: Set(event.price_cents),
            currency: Set(event.currency.clone()),
            status: Set(TransactionStatus::Completed),
            metadata: Set(event.metadata.clone()),
            created_at: Set(now),
        };

        match Self::insert_keyed_entry(entry, &txn).await? {
            KeyedInsert::Inserted => {}
            KeyedInsert::Conflicted => {
                // Another delivery won the race between our fast-path read
                // and this insert. Re-read to report its snapshot.
                let existing = Self::find_by_reference(&event.external_reference, &txn).await?;
                txn.rollback().await?;
                return Ok(SettlementOutcome {
                    applied: false,
                    credits_after: existing.credits_after,
                    transaction_id: existing.id,
                });
            }
        }

        Self::write_balance(account, credits_after, now, &txn).await?;
        txn.commit().await?;

        info!(
            "Settled purchase: user={}, reference={}, credits=+{}, balance={}",
            event.user_id, event.external_reference, event.credits, credits_after
        );

        Ok(SettlementOutcome {
            applied: true,
            credits_after,
            transaction_id,
        })
    }

    /// Debit minutes consumed by a finished activity.
    ///
    /// Rejects (and leaves the balance unchanged) when the debit would
    /// drive the balance below zero.
    #[instrument(skip(self))]
    pub async fn append_consumption(
        &self,
        user_id: Uuid,
        credits: i32,
        activity: &str,
    ) -> Result<i32> {
        let txn = self.db.begin().await?;

        let account = Self::lock_account(user_id, &txn).await?;

        if account.credits < credits {
            txn.rollback().await?;
            return Err(ApiError::InsufficientCredits(format!(
                "needed {}, have {}",
                credits, account.credits
            )));
        }

        let credits_after = account.credits - credits;
        let now = time::OffsetDateTime::now_utc();

        let entry = entity::credit_transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            kind: Set(TransactionKind::Consumption),
            amount: Set(-credits),
            credits_after: Set(credits_after),
            external_reference: Set(None),
            payment_intent: Set(None),
            package_name: Set(None),
            price_cents: Set(None),
            currency: Set(None),
            status: Set(TransactionStatus::Completed),
            metadata: Set(Some(serde_json::json!({ "activity": activity }))),
            created_at: Set(now),
        };
        entity::credit_transactions::Entity::insert(entry)
            .exec(&txn)
            .await?;

        Self::write_balance(account, credits_after, now, &txn).await?;
        txn.commit().await?;

        info!(
            "Consumed credits: user={}, activity={}, credits=-{}, balance={}",
            user_id, activity, credits, credits_after
        );

        Ok(credits_after)
    }

    /// Support-tooling entry: signed manual correction of a balance.
    /// Negative adjustments clamp to the available balance so the
    /// non-negativity invariant holds.
    #[instrument(skip(self))]
    pub async fn append_adjustment(&self, user_id: Uuid, amount: i32, reason: &str) -> Result<i32> {
        let txn = self.db.begin().await?;

        let account = Self::lock_account(user_id, &txn).await?;

        let applied_amount = amount.max(-account.credits);
        if applied_amount != amount {
            warn!(
                "Adjustment clamped: user={}, requested={}, applied={}",
                user_id, amount, applied_amount
            );
        }

        let credits_after = account.credits + applied_amount;
        let now = time::OffsetDateTime::now_utc();

        let entry = entity::credit_transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            kind: Set(TransactionKind::Adjustment),
            amount: Set(applied_amount),
            credits_after: Set(credits_after),
            external_reference: Set(None),
            payment_intent: Set(None),
            package_name: Set(None),
            price_cents: Set(None),
            currency: Set(None),
            status: Set(TransactionStatus::Completed),
            metadata: Set(Some(serde_json::json!({ "reason": reason }))),
            created_at: Set(now),
        };
        entity::credit_transactions::Entity::insert(entry)
            .exec(&txn)
            .await?;

        Self::write_balance(account, credits_after, now, &txn).await?;
        txn.commit().await?;

        info!(
            "Adjusted balance: user={}, amount={}, balance={}",
            user_id, applied_amount, credits_after
        );

        Ok(credits_after)
    }

    /// Reverse a settled purchase identified by its payment intent.
    ///
    /// Returns `None` when no purchase matches (a refund for a charge we
    /// never credited; acknowledged upstream, nothing to do here). The
    /// refund reference (charge id) goes through the same unique-index
    /// discipline as settlements, so redelivered refund events are no-ops.
    /// The reversal clamps to the available balance.
    #[instrument(skip(self))]
    pub async fn refund_by_payment_intent(
        &self,
        payment_intent: &str,
        refund_reference: &str,
    ) -> Result<Option<RefundOutcome>> {
        let txn = self.db.begin().await?;

        let Some(purchase) = entity::credit_transactions::Entity::find()
            .filter(entity::credit_transactions::Column::PaymentIntent.eq(payment_intent))
            .filter(
                entity::credit_transactions::Column::Kind.eq(TransactionKind::Purchase),
            )
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let account = Self::lock_account(purchase.user_id, &txn).await?;

        let credits_refunded = purchase.amount.min(account.credits);
        let credits_after = account.credits - credits_refunded;
        let now = time::OffsetDateTime::now_utc();
        let transaction_id = Uuid::new_v4();

        let entry = entity::credit_transactions::ActiveModel {
            id: Set(transaction_id),
            user_id: Set(purchase.user_id),
            kind: Set(TransactionKind::Refund),
            amount: Set(-credits_refunded),
            credits_after: Set(credits_after),
            external_reference: Set(Some(refund_reference.to_string())),
            payment_intent: Set(Some(payment_intent.to_string())),
            package_name: Set(purchase.package_name.clone()),
            price_cents: Set(purchase.price_cents),
            currency: Set(purchase.currency.clone()),
            status: Set(TransactionStatus::Completed),
            metadata: Set(Some(serde_json::json!({
                "refunded_transaction_id": purchase.id,
            }))),
            created_at: Set(now),
        };

        match Self::insert_keyed_entry(entry, &txn).await? {
            KeyedInsert::Inserted => {}
            KeyedInsert::Conflicted => {
                let existing = Self::find_by_reference(refund_reference, &txn).await?;
                txn.rollback().await?;
                return Ok(Some(RefundOutcome {
                    applied: false,
                    user_id: existing.user_id,
                    credits_refunded: -existing.amount,
                    credits_after: existing.credits_after,
                }));
            }
        }

        Self::write_balance(account, credits_after, now, &txn).await?;
        txn.commit().await?;

        info!(
            "Refunded purchase: user={}, reference={}, credits=-{}, balance={}",
            purchase.user_id, refund_reference, credits_refunded, credits_after
        );

        Ok(Some(RefundOutcome {
            applied: true,
            user_id: purchase.user_id,
            credits_refunded,
            credits_after,
        }))
    }

    /// Lock the account row for the duration of the ledger transaction.
    /// Concurrent writers for the same user queue here, which is what
    /// keeps `credits_after` snapshots consistent.
    async fn lock_account(
        user_id: Uuid,
        txn: &DatabaseTransaction,
    ) -> Result<entity::accounts::Model> {
        entity::accounts::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No account for user {}", user_id)))
    }

    /// Insert a ledger entry whose `external_reference` must be unique.
    /// The unique index is the idempotency guard; a conflict is an
    /// expected outcome, not an error.
    async fn insert_keyed_entry(
        entry: entity::credit_transactions::ActiveModel,
        txn: &DatabaseTransaction,
    ) -> Result<KeyedInsert> {
        let insert = entity::credit_transactions::Entity::insert(entry)
            .on_conflict(
                OnConflict::column(entity::credit_transactions::Column::ExternalReference)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(txn)
            .await;

        match insert {
            Ok(_) => Ok(KeyedInsert::Inserted),
            Err(DbErr::RecordNotInserted) => Ok(KeyedInsert::Conflicted),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_reference(
        external_reference: &str,
        txn: &DatabaseTransaction,
    ) -> Result<entity::credit_transactions::Model> {
        entity::credit_transactions::Entity::find()
            .filter(
                entity::credit_transactions::Column::ExternalReference.eq(external_reference),
            )
            .one(txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Ledger entry for reference {} vanished mid-transaction",
                    external_reference
                ))
            })
    }

    async fn write_balance(
        account: entity::accounts::Model,
        credits_after: i32,
        now: time::OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<()> {
        let mut active: entity::accounts::ActiveModel = account.into();
        active.credits = Set(credits_after);
        active.updated_at = Set(now);
        active.update(txn).await?;
        Ok(())
    }
}

enum KeyedInsert {
    Inserted,
    Conflicted,
}
