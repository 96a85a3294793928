//! Redemption precondition checks.
//!
//! [`can_redeem`] answers "should the redeem button be enabled?" for a client. It is
//! advisory only: the balance can change between this check and the commit, so
//! [`crate::core::redemption::redeem`] runs the same rules again inside its transaction.

use crate::{
    core::{catalog, points},
    entities::{OwnedCoupon, OwnedCouponColumn, OwnedCouponStatus, coupon, owned_coupon},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, prelude::*};
use serde::Deserialize;

/// Product rules applied on top of the balance check.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RedemptionPolicy {
    /// Reject a redemption while the user still holds an `active` copy of the same coupon.
    // TODO: confirm with product whether repeat redemptions of one coupon are allowed
    #[serde(default = "default_one_active_per_coupon")]
    pub one_active_per_coupon: bool,
}

impl Default for RedemptionPolicy {
    fn default() -> Self {
        Self {
            one_active_per_coupon: default_one_active_per_coupon(),
        }
    }
}

const fn default_one_active_per_coupon() -> bool {
    true
}

/// Checks whether a user holding `points` and `owned` may redeem `coupon` on `today`.
///
/// Rules are checked in order and the first failure is returned:
/// 1. the coupon is active and not expired, else [`Error::CouponUnavailable`]
/// 2. `points >= coupon.points_cost`, else [`Error::InsufficientPoints`]
/// 3. under [`RedemptionPolicy::one_active_per_coupon`], no active copy is owned,
///    else [`Error::AlreadyOwned`]
pub fn can_redeem(
    points: i64,
    coupon: &coupon::Model,
    owned: &[owned_coupon::Model],
    policy: RedemptionPolicy,
    today: NaiveDate,
) -> Result<()> {
    if !coupon.is_available_on(today) {
        return Err(Error::CouponUnavailable {
            coupon_id: coupon.id,
        });
    }

    if points < coupon.points_cost {
        return Err(Error::InsufficientPoints {
            available: points,
            required: coupon.points_cost,
        });
    }

    if policy.one_active_per_coupon
        && owned
            .iter()
            .any(|o| o.coupon_id == coupon.id && o.status == OwnedCouponStatus::Active)
    {
        return Err(Error::AlreadyOwned {
            coupon_id: coupon.id,
        });
    }

    Ok(())
}

/// Loads the user's current state from the backend and runs [`can_redeem`].
///
/// An unknown coupon id is reported as [`Error::CouponUnavailable`].
pub async fn check_redemption<C>(
    db: &C,
    user_id: &str,
    coupon_id: i64,
    policy: RedemptionPolicy,
    today: NaiveDate,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let coupon = catalog::get_coupon(db, coupon_id)
        .await?
        .ok_or(Error::CouponUnavailable { coupon_id })?;

    let balance = points::get_balance(db, user_id).await?;

    let owned = OwnedCoupon::find()
        .filter(OwnedCouponColumn::UserId.eq(user_id))
        .filter(OwnedCouponColumn::CouponId.eq(coupon_id))
        .filter(OwnedCouponColumn::Status.eq(OwnedCouponStatus::Active))
        .all(db)
        .await?;

    can_redeem(balance, &coupon, &owned, policy, today)
}
