//! Wallet view - Everything the wallet screen shows for one user.
//!
//! Pure reads. Coupon `status` is reported exactly as stored; this module never
//! derives it from `expiry_date`.

use crate::{
    core::{points, scan},
    entities::{OwnedCoupon, owned_coupon, scan_history, transaction_history},
    errors::Result,
};
use sea_orm::{ConnectionTrait, QueryOrder, prelude::*};
use serde::Serialize;

/// Snapshot of a user's wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
    /// Current point balance
    pub points: i64,
    /// Redeemed coupons, most recent first
    pub owned_coupons: Vec<owned_coupon::Model>,
    /// Bin scans, most recent first
    pub scan_history: Vec<scan_history::Model>,
    /// Ledger entries, most recent first
    pub transaction_history: Vec<transaction_history::Model>,
}

/// Loads the wallet for `user_id`.
pub async fn get_wallet<C>(db: &C, user_id: &str) -> Result<Wallet>
where
    C: ConnectionTrait,
{
    let owned_coupons = get_owned_coupons(db, user_id).await?;
    let scan_history = scan::get_scan_history(db, user_id).await?;
    let transaction_history = points::get_history(db, user_id).await?;
    let points = points::get_balance(db, user_id).await?;

    Ok(Wallet {
        points,
        owned_coupons,
        scan_history,
        transaction_history,
    })
}

/// Retrieves the user's owned coupons, most recently redeemed first.
pub async fn get_owned_coupons<C>(db: &C, user_id: &str) -> Result<Vec<owned_coupon::Model>>
where
    C: ConnectionTrait,
{
    OwnedCoupon::find()
        .filter(owned_coupon::Column::UserId.eq(user_id))
        .order_by_desc(owned_coupon::Column::RedeemedDate)
        .order_by_desc(owned_coupon::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
