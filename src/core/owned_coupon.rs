//! Owned coupon lifecycle - Moves redeemed coupons to `used` or `expired`.
//!
//! Transitions follow [`OwnedCouponStatus::can_transition_to`]; terminal states are
//! never left.

use crate::{
    entities::{OwnedCoupon, OwnedCouponStatus, owned_coupon},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Marks a coupon as presented at the shop.
///
/// The move is a single conditional `UPDATE .. WHERE status = 'active' AND
/// expiry_date >= today`, so two devices presenting the same coupon cannot both
/// succeed and an expiry sweep that already ran is never overwritten. A coupon
/// whose `expiry_date` is before `today` is expired here and the call fails, so
/// stale coupons cannot be used even before the sweep has run.
///
/// # Errors
/// * [`Error::CouponNotFound`] - no such coupon for this user
/// * [`Error::InvalidStatusTransition`] - the coupon is not active or is past its
///   expiry date; `from` is the status found in the database
pub async fn mark_used<C>(
    db: &C,
    user_id: &str,
    owned_coupon_id: i64,
    today: NaiveDate,
) -> Result<owned_coupon::Model>
where
    C: ConnectionTrait,
{
    let result = OwnedCoupon::update_many()
        .col_expr(
            owned_coupon::Column::Status,
            Expr::value(OwnedCouponStatus::Used),
        )
        .col_expr(
            owned_coupon::Column::UsedAt,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(owned_coupon::Column::Id.eq(owned_coupon_id))
        .filter(owned_coupon::Column::UserId.eq(user_id))
        .filter(owned_coupon::Column::Status.eq(OwnedCouponStatus::Active))
        .filter(owned_coupon::Column::ExpiryDate.gte(today))
        .exec(db)
        .await?;

    let owned = OwnedCoupon::find_by_id(owned_coupon_id)
        .filter(owned_coupon::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::CouponNotFound { owned_coupon_id })?;

    if result.rows_affected == 1 {
        info!("User {user_id} used owned coupon {owned_coupon_id}");
        return Ok(owned);
    }

    if owned.status == OwnedCouponStatus::Active && owned.expiry_date < today {
        expire_one(db, owned_coupon_id).await?;
    }

    Err(Error::InvalidStatusTransition {
        from: owned.status.to_string(),
        to: OwnedCouponStatus::Used.to_string(),
    })
}

/// Moves one coupon from `active` to `expired`; a no-op for any other status.
async fn expire_one<C>(db: &C, owned_coupon_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    OwnedCoupon::update_many()
        .col_expr(
            owned_coupon::Column::Status,
            Expr::value(OwnedCouponStatus::Expired),
        )
        .filter(owned_coupon::Column::Id.eq(owned_coupon_id))
        .filter(owned_coupon::Column::Status.eq(OwnedCouponStatus::Active))
        .exec(db)
        .await?;

    Ok(())
}

/// Moves every active coupon with `expiry_date < today` to `expired`.
///
/// Returns the number of coupons expired.
pub async fn expire_overdue<C>(db: &C, today: NaiveDate) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = OwnedCoupon::update_many()
        .col_expr(
            owned_coupon::Column::Status,
            Expr::value(OwnedCouponStatus::Expired),
        )
        .filter(owned_coupon::Column::Status.eq(OwnedCouponStatus::Active))
        .filter(owned_coupon::Column::ExpiryDate.lt(today))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Expired {} overdue coupons", result.rows_affected);
    }
    Ok(result.rows_affected)
}
