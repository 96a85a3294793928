//! Point balance and ledger operations.
//!
//! The balance in `user_points` is never assigned directly. Every change goes through
//! a function here (or through redemption) that appends a ledger entry and adjusts
//! the balance in the same database transaction, so the balance always equals the
//! sum of the user's completed ledger entries.

use crate::{
    entities::{
        TransactionHistory, TransactionStatus, TransactionType, UserPoints, transaction_history,
        user_points,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ConnectionTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use tracing::{info, warn};

/// Stored balance compared with what the ledger says it should be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReconciliation {
    /// User the figures belong to
    pub user_id: String,
    /// Balance held in `user_points`
    pub recorded: i64,
    /// Sum of the user's completed ledger entries
    pub ledger_sum: i64,
}

impl BalanceReconciliation {
    /// Recorded balance minus ledger sum; zero when consistent.
    #[must_use]
    pub const fn drift(&self) -> i64 {
        self.recorded - self.ledger_sum
    }

    /// Whether the balance matches the ledger.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.drift() == 0
    }
}

/// Returns the user's current balance. Users without a balance row have 0 points.
pub async fn get_balance<C>(db: &C, user_id: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    let balance = UserPoints::find_by_id(user_id.to_string()).one(db).await?;
    Ok(balance.map_or(0, |b| b.points))
}

/// Credits `amount` points to the user and appends the matching ledger entry.
///
/// Pass an open transaction as `db` when the credit must commit together with other
/// writes (see [`crate::core::scan::record_scan`]). The balance row is created on
/// first credit with an `INSERT .. ON CONFLICT DO UPDATE`, so a concurrent first
/// credit cannot lose an update.
///
/// # Errors
/// Returns [`Error::InvalidPoints`] if `amount` is not positive or `kind` is not an
/// earning type.
pub async fn award_points<C>(
    db: &C,
    user_id: &str,
    amount: i64,
    kind: TransactionType,
    description: String,
    metadata: Option<Json>,
) -> Result<transaction_history::Model>
where
    C: ConnectionTrait,
{
    if amount <= 0 || !kind.is_earning() {
        return Err(Error::InvalidPoints { points: amount });
    }

    let now = chrono::Utc::now();

    let entry = transaction_history::ActiveModel {
        user_id: Set(user_id.to_string()),
        transaction_type: Set(kind),
        amount: Set(amount),
        status: Set(TransactionStatus::Completed),
        description: Set(description),
        metadata: Set(metadata),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let balance = user_points::ActiveModel {
        user_id: Set(user_id.to_string()),
        points: Set(amount),
        updated_at: Set(now),
    };

    // points = user_points.points + amount
    UserPoints::insert(balance)
        .on_conflict(
            OnConflict::column(user_points::Column::UserId)
                .value(
                    user_points::Column::Points,
                    Expr::col((UserPoints, user_points::Column::Points)).add(amount),
                )
                .update_column(user_points::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!("Credited {amount} points ({kind:?}) to user {user_id}");
    Ok(entry)
}

/// Credits the ad-watch reward in its own transaction.
pub async fn record_ad_watch(
    db: &DatabaseConnection,
    user_id: &str,
    reward: i64,
) -> Result<transaction_history::Model> {
    let txn = db.begin().await?;

    let entry = award_points(
        &txn,
        user_id,
        reward,
        TransactionType::AdWatch,
        "Watched an ad".to_string(),
        None,
    )
    .await?;

    txn.commit().await?;
    Ok(entry)
}

/// Retrieves the user's ledger, newest entry first.
pub async fn get_history<C>(db: &C, user_id: &str) -> Result<Vec<transaction_history::Model>>
where
    C: ConnectionTrait,
{
    TransactionHistory::find()
        .filter(transaction_history::Column::UserId.eq(user_id))
        .order_by_desc(transaction_history::Column::CreatedAt)
        .order_by_desc(transaction_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Compares the stored balance with the sum of completed ledger entries.
///
/// Drift is logged but not corrected; fixing it needs a human to decide which side
/// is wrong.
pub async fn reconcile_balance<C>(db: &C, user_id: &str) -> Result<BalanceReconciliation>
where
    C: ConnectionTrait,
{
    let recorded = get_balance(db, user_id).await?;

    let ledger_sum = TransactionHistory::find()
        .filter(transaction_history::Column::UserId.eq(user_id))
        .filter(transaction_history::Column::Status.eq(TransactionStatus::Completed))
        .all(db)
        .await?
        .iter()
        .map(|entry| entry.amount)
        .sum();

    let reconciliation = BalanceReconciliation {
        user_id: user_id.to_string(),
        recorded,
        ledger_sum,
    };

    if !reconciliation.is_consistent() {
        warn!(
            "Balance drift for user {user_id}: recorded {recorded}, ledger {ledger_sum}"
        );
    }

    Ok(reconciliation)
}
