//! Coupon redemption - Spends points on a catalog coupon in one atomic step.
//!
//! A redemption has three effects: the balance is debited, an owned coupon is created
//! and a `coupon_redemption` ledger entry is appended. They commit together in one
//! database transaction or not at all.
//!
//! The same user can redeem from several devices at once, so nothing here relies on
//! the caller having run [`crate::core::eligibility::can_redeem`] first. Every
//! redemption, free coupons included, first locks the user's balance row
//! (`SELECT .. FOR UPDATE`, creating a zero row if needed). That lock is held until
//! commit and serializes the ownership check for one user. The debit itself is a
//! conditional `UPDATE .. WHERE points >= cost`, so a request working from a stale
//! balance affects no rows instead of driving the balance negative.

use crate::{
    core::{eligibility::RedemptionPolicy, points},
    entities::{
        Coupon, OwnedCoupon, OwnedCouponStatus, TransactionStatus, TransactionType, UserPoints,
        owned_coupon, transaction_history, user_points,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    ConnectionTrait, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde_json::json;
use tracing::{debug, info};

/// Redeems `coupon_id` for `user_id`, judging expiry against today's UTC date.
///
/// On success the new owned coupon is returned so the caller can show it without
/// re-reading the wallet.
///
/// # Errors
/// * [`Error::CouponUnavailable`] - unknown, inactive or expired coupon
/// * [`Error::InsufficientPoints`] - the balance at commit time does not cover the cost
/// * [`Error::AlreadyOwned`] - an active copy is held and the policy forbids another
/// * [`Error::BackendUnavailable`] - the backend failed; nothing was applied
pub async fn redeem(
    db: &DatabaseConnection,
    user_id: &str,
    coupon_id: i64,
    policy: RedemptionPolicy,
) -> Result<owned_coupon::Model> {
    redeem_as_of(db, user_id, coupon_id, policy, chrono::Utc::now().date_naive()).await
}

/// [`redeem`] with an explicit "today" for the expiry check.
pub async fn redeem_as_of(
    db: &DatabaseConnection,
    user_id: &str,
    coupon_id: i64,
    policy: RedemptionPolicy,
    today: NaiveDate,
) -> Result<owned_coupon::Model> {
    // Dropping `txn` on any early return rolls everything back
    let txn = db.begin().await?;

    let coupon = Coupon::find_by_id(coupon_id)
        .one(&txn)
        .await?
        .filter(|c| c.is_available_on(today))
        .ok_or(Error::CouponUnavailable { coupon_id })?;

    lock_balance(&txn, user_id).await?;

    if coupon.points_cost > 0 {
        debit_points(&txn, user_id, coupon.points_cost).await?;
    }

    if policy.one_active_per_coupon {
        let active_copy = OwnedCoupon::find()
            .filter(owned_coupon::Column::UserId.eq(user_id))
            .filter(owned_coupon::Column::CouponId.eq(coupon_id))
            .filter(owned_coupon::Column::Status.eq(OwnedCouponStatus::Active))
            .one(&txn)
            .await?;

        if active_copy.is_some() {
            return Err(Error::AlreadyOwned { coupon_id });
        }
    }

    let now = chrono::Utc::now();

    let owned = owned_coupon::ActiveModel {
        user_id: Set(user_id.to_string()),
        coupon_id: Set(coupon.id),
        product_name: Set(coupon.product_name.clone()),
        shop_name: Set(coupon.shop_name.clone()),
        points_cost: Set(coupon.points_cost),
        original_price: Set(coupon.original_price),
        discounted_price: Set(coupon.discounted_price),
        redeemed_date: Set(now),
        expiry_date: Set(coupon.expiry_date),
        status: Set(OwnedCouponStatus::Active),
        used_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    transaction_history::ActiveModel {
        user_id: Set(user_id.to_string()),
        transaction_type: Set(TransactionType::CouponRedemption),
        amount: Set(-coupon.points_cost),
        status: Set(TransactionStatus::Completed),
        description: Set(format!(
            "Redeemed {} at {}",
            coupon.product_name, coupon.shop_name
        )),
        metadata: Set(Some(json!({
            "coupon_id": coupon.id,
            "owned_coupon_id": owned.id,
        }))),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        "User {user_id} redeemed coupon {coupon_id} for {} points",
        coupon.points_cost
    );
    Ok(owned)
}

/// Makes sure the user has a balance row and locks it until the transaction ends.
///
/// Returns the locked balance. `SQLite` has no row locks; its writers are already
/// serialized, and the lock clause is left out of the generated SQL.
async fn lock_balance<C>(db: &C, user_id: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    UserPoints::insert(user_points::ActiveModel {
        user_id: Set(user_id.to_string()),
        points: Set(0),
        updated_at: Set(chrono::Utc::now()),
    })
    .on_conflict(
        OnConflict::column(user_points::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    let balance = UserPoints::find_by_id(user_id.to_string())
        .lock_exclusive()
        .one(db)
        .await?;

    Ok(balance.map_or(0, |b| b.points))
}

/// Subtracts `cost` from the balance only if the balance covers it.
async fn debit_points<C>(db: &C, user_id: &str, cost: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = UserPoints::update_many()
        .col_expr(
            user_points::Column::Points,
            Expr::col(user_points::Column::Points).sub(cost),
        )
        .col_expr(
            user_points::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(user_points::Column::UserId.eq(user_id))
        .filter(user_points::Column::Points.gte(cost))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let available = points::get_balance(db, user_id).await?;
        debug!("Debit of {cost} refused for user {user_id}, balance {available}");
        return Err(Error::InsufficientPoints {
            available,
            required: cost,
        });
    }

    Ok(())
}

/// Looks for a redemption of `coupon_id` by `user_id` committed at or after `since`.
///
/// Use this when a [`redeem`] call ended without a confirmed result, for example after
/// a timeout. A `Some` means the redemption did apply and must not be retried.
pub async fn confirm_redemption<C>(
    db: &C,
    user_id: &str,
    coupon_id: i64,
    since: DateTimeUtc,
) -> Result<Option<owned_coupon::Model>>
where
    C: ConnectionTrait,
{
    OwnedCoupon::find()
        .filter(owned_coupon::Column::UserId.eq(user_id))
        .filter(owned_coupon::Column::CouponId.eq(coupon_id))
        .filter(owned_coupon::Column::RedeemedDate.gte(since))
        .order_by_desc(owned_coupon::Column::RedeemedDate)
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{points::get_balance, wallet::get_wallet};
    use crate::entities::{TransactionHistory, coupon};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    async fn redemption_entries(
        db: &DatabaseConnection,
        user_id: &str,
    ) -> Result<Vec<transaction_history::Model>> {
        TransactionHistory::find()
            .filter(transaction_history::Column::UserId.eq(user_id))
            .filter(
                transaction_history::Column::TransactionType.eq(TransactionType::CouponRedemption),
            )
            .all(db)
            .await
            .map_err(Into::into)
    }

    async fn owned_by(db: &DatabaseConnection, user_id: &str) -> Result<Vec<owned_coupon::Model>> {
        OwnedCoupon::find()
            .filter(owned_coupon::Column::UserId.eq(user_id))
            .all(db)
            .await
            .map_err(Into::into)
    }

    #[tokio::test]
    async fn test_redeem_debits_and_records() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 100).await?;

        let owned = redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await?;

        assert_eq!(owned.user_id, "user1");
        assert_eq!(owned.coupon_id, coupon.id);
        assert_eq!(owned.status, OwnedCouponStatus::Active);
        assert_eq!(owned.points_cost, 50);
        assert_eq!(owned.expiry_date, coupon.expiry_date);
        assert!(owned.used_at.is_none());

        assert_eq!(get_balance(&db, "user1").await?, 50);

        let all_owned = owned_by(&db, "user1").await?;
        assert_eq!(all_owned, vec![owned.clone()]);

        let entries = redemption_entries(&db, "user1").await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, -50);
        assert_eq!(entries[0].status, TransactionStatus::Completed);
        assert_eq!(
            entries[0].metadata,
            Some(json!({ "coupon_id": coupon.id, "owned_coupon_id": owned.id }))
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_insufficient_points_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 30).await?;

        let result = redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientPoints {
                available: 30,
                required: 50
            })
        ));

        assert_eq!(get_balance(&db, "user1").await?, 30);
        assert!(owned_by(&db, "user1").await?.is_empty());
        assert!(redemption_entries(&db, "user1").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_without_balance_row() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;

        let result = redeem(&db, "newcomer", coupon.id, RedemptionPolicy::default()).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientPoints {
                available: 0,
                required: 50
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_exact_balance_leaves_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 50).await?;

        redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await?;
        assert_eq!(get_balance(&db, "user1").await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_free_coupon() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Sticker", 0).await?;

        let owned = redeem(&db, "newcomer", coupon.id, RedemptionPolicy::default()).await?;
        assert_eq!(owned.points_cost, 0);
        assert_eq!(get_balance(&db, "newcomer").await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_free_coupon_respects_one_active_policy() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Sticker", 0).await?;

        redeem(&db, "newcomer", coupon.id, RedemptionPolicy::default()).await?;
        let result = redeem(&db, "newcomer", coupon.id, RedemptionPolicy::default()).await;

        assert!(matches!(result, Err(Error::AlreadyOwned { .. })));
        assert_eq!(owned_by(&db, "newcomer").await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_free_redemption_creates_locked_balance_row() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Sticker", 0).await?;

        redeem(&db, "newcomer", coupon.id, RedemptionPolicy::default()).await?;

        let balance = UserPoints::find_by_id("newcomer".to_string())
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(balance.points, 0);
        assert!(points::reconcile_balance(&db, "newcomer").await?.is_consistent());

        Ok(())
    }

    #[tokio::test]
    async fn test_lock_balance_keeps_existing_points() -> Result<()> {
        let db = setup_test_db().await?;
        give_points(&db, "user1", 40).await?;

        let txn = db.begin().await?;
        assert_eq!(lock_balance(&txn, "user1").await?, 40);
        assert_eq!(lock_balance(&txn, "newcomer").await?, 0);
        txn.commit().await?;

        assert_eq!(get_balance(&db, "user1").await?, 40);

        Ok(())
    }

    #[tokio::test]
    async fn test_debit_refuses_stale_balance() -> Result<()> {
        let db = setup_test_db().await?;
        give_points(&db, "user1", 60).await?;

        // Both requests decide from the same read: 60 covers a cost of 50
        let txn = db.begin().await?;
        let seen = get_balance(&txn, "user1").await?;
        assert_eq!(seen, 60);

        debit_points(&txn, "user1", 50).await?;
        let stale = debit_points(&txn, "user1", 50).await;
        assert!(matches!(
            stale,
            Err(Error::InsufficientPoints {
                available: 10,
                required: 50
            })
        ));
        txn.commit().await?;

        assert_eq!(get_balance(&db, "user1").await?, 10);

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_expired_coupon_is_unavailable() -> Result<()> {
        let db = setup_test_db().await?;
        let yesterday = today().pred_opt().unwrap();
        let coupon = create_custom_coupon(&db, new_coupon("Old Tote", 10, yesterday)).await?;
        give_points(&db, "user1", 100).await?;

        let result = redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await;
        assert!(matches!(result, Err(Error::CouponUnavailable { .. })));
        assert_eq!(get_balance(&db, "user1").await?, 100);

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_on_expiry_day_succeeds() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_custom_coupon(&db, new_coupon("Last Day", 10, today())).await?;
        give_points(&db, "user1", 10).await?;

        redeem_as_of(
            &db,
            "user1",
            coupon.id,
            RedemptionPolicy::default(),
            today(),
        )
        .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_inactive_or_unknown_coupon() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = new_coupon("Paused", 10, today().succ_opt().unwrap());
        input.is_active = false;
        let paused = create_custom_coupon(&db, input).await?;
        give_points(&db, "user1", 100).await?;

        let result = redeem(&db, "user1", paused.id, RedemptionPolicy::default()).await;
        assert!(matches!(result, Err(Error::CouponUnavailable { .. })));

        let result = redeem(&db, "user1", 999, RedemptionPolicy::default()).await;
        assert!(matches!(
            result,
            Err(Error::CouponUnavailable { coupon_id: 999 })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_already_owned_rolls_back_debit() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 200).await?;

        redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await?;
        let result = redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await;

        assert!(matches!(result, Err(Error::AlreadyOwned { .. })));
        assert_eq!(get_balance(&db, "user1").await?, 150);
        assert_eq!(owned_by(&db, "user1").await?.len(), 1);
        assert_eq!(redemption_entries(&db, "user1").await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_policy_allows_repeat_redemption() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 200).await?;
        let policy = RedemptionPolicy {
            one_active_per_coupon: false,
        };

        redeem(&db, "user1", coupon.id, policy).await?;
        redeem(&db, "user1", coupon.id, policy).await?;

        assert_eq!(get_balance(&db, "user1").await?, 100);
        assert_eq!(owned_by(&db, "user1").await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_succeed_once() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 60).await?;

        let (first, second) = tokio::join!(
            redeem(&db, "user1", coupon.id, RedemptionPolicy::default()),
            redeem(&db, "user1", coupon.id, RedemptionPolicy::default()),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(Error::InsufficientPoints { .. } | Error::AlreadyOwned { .. })
        )));

        assert_eq!(get_balance(&db, "user1").await?, 10);
        assert_eq!(owned_by(&db, "user1").await?.len(), 1);
        assert_eq!(redemption_entries(&db, "user1").await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_of_different_coupons() -> Result<()> {
        let db = setup_test_db().await?;
        let tote = create_test_coupon(&db, "Tote", 50).await?;
        let brush = create_test_coupon(&db, "Brush", 50).await?;
        give_points(&db, "user1", 60).await?;

        let (first, second) = tokio::join!(
            redeem(&db, "user1", tote.id, RedemptionPolicy::default()),
            redeem(&db, "user1", brush.id, RedemptionPolicy::default()),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(Error::InsufficientPoints { .. })))
        );
        assert_eq!(get_balance(&db, "user1").await?, 10);

        Ok(())
    }

    #[tokio::test]
    async fn test_owned_coupon_keeps_price_snapshot() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 50).await?;

        let owned = redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await?;

        let mut edited: coupon::ActiveModel = coupon.clone().into();
        edited.discounted_price = Set(1.0);
        edited.shop_name = Set("Renamed Shop".to_string());
        edited.update(&db).await?;

        let wallet = get_wallet(&db, "user1").await?;
        assert_eq!(wallet.owned_coupons, vec![owned]);
        assert_eq!(wallet.owned_coupons[0].discounted_price, coupon.discounted_price);
        assert_eq!(wallet.owned_coupons[0].shop_name, coupon.shop_name);

        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_reconciles_after_redemptions() -> Result<()> {
        let db = setup_test_db().await?;
        let tote = create_test_coupon(&db, "Tote", 50).await?;
        let brush = create_test_coupon(&db, "Brush", 30).await?;
        give_points(&db, "user1", 70).await?;
        points::record_ad_watch(&db, "user1", 15).await?;

        redeem(&db, "user1", tote.id, RedemptionPolicy::default()).await?;
        redeem(&db, "user1", brush.id, RedemptionPolicy::default()).await?;
        let failed = redeem(&db, "user1", brush.id, RedemptionPolicy::default()).await;
        assert!(failed.is_err());

        let reconciliation = points::reconcile_balance(&db, "user1").await?;
        assert_eq!(reconciliation.recorded, 5);
        assert!(reconciliation.is_consistent());

        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_redemption() -> Result<()> {
        let db = setup_test_db().await?;
        let coupon = create_test_coupon(&db, "Tote", 50).await?;
        give_points(&db, "user1", 50).await?;
        let since = chrono::Utc::now();

        assert!(confirm_redemption(&db, "user1", coupon.id, since).await?.is_none());

        let owned = redeem(&db, "user1", coupon.id, RedemptionPolicy::default()).await?;

        let confirmed = confirm_redemption(&db, "user1", coupon.id, since).await?;
        assert_eq!(confirmed, Some(owned));
        assert!(confirm_redemption(&db, "user2", coupon.id, since).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_backend_failure_is_retryable() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();

        let result = redeem(&db, "user1", 1, RedemptionPolicy::default()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable { .. }));
        assert!(err.is_retryable());
    }
}
