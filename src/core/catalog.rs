//! Coupon catalog - Reads redeemable coupons and seeds the catalog.
//!
//! Consumer reads go through [`list_coupons`], which pushes the availability filter
//! into the query itself. Creation is an administrative path used by seeding.

use crate::{
    config::settings::CouponConfig,
    entities::{Coupon, coupon},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Input for an administrative coupon insert.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    /// Product on offer
    pub product_name: String,
    /// Partner shop
    pub shop_name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional image location
    pub image_url: Option<String>,
    /// Points needed to redeem, `>= 0`
    pub points_cost: i64,
    /// Shelf price, `>= 0`
    pub original_price: f64,
    /// Price with the coupon, `>= 0`
    pub discounted_price: f64,
    /// Last redeemable day
    pub expiry_date: NaiveDate,
    /// Whether the coupon is offered right away
    pub is_active: bool,
}

impl From<&CouponConfig> for NewCoupon {
    fn from(config: &CouponConfig) -> Self {
        Self {
            product_name: config.product_name.clone(),
            shop_name: config.shop_name.clone(),
            description: config.description.clone(),
            image_url: config.image_url.clone(),
            points_cost: config.points_cost,
            original_price: config.original_price,
            discounted_price: config.discounted_price,
            expiry_date: config.expiry_date,
            is_active: config.is_active,
        }
    }
}

/// Lists coupons a user could redeem on `today`, cheapest first.
///
/// Only active coupons whose `expiry_date` is today or later are returned.
///
/// # Errors
/// Any backend failure is reported as [`Error::CatalogUnavailable`].
pub async fn list_coupons<C>(db: &C, today: NaiveDate) -> Result<Vec<coupon::Model>>
where
    C: ConnectionTrait,
{
    let coupons = Coupon::find()
        .filter(coupon::Column::IsActive.eq(true))
        .filter(coupon::Column::ExpiryDate.gte(today))
        .order_by_asc(coupon::Column::PointsCost)
        .order_by_asc(coupon::Column::Id)
        .all(db)
        .await
        .map_err(|e| Error::CatalogUnavailable {
            message: e.to_string(),
        })?;

    debug!("Catalog query returned {} coupons", coupons.len());
    Ok(coupons)
}

/// Finds a coupon by id regardless of whether it is still available.
pub async fn get_coupon<C>(db: &C, coupon_id: i64) -> Result<Option<coupon::Model>>
where
    C: ConnectionTrait,
{
    Coupon::find_by_id(coupon_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a catalog coupon, validating names and amounts.
///
/// # Errors
/// Returns an error if:
/// - The product or shop name is empty or whitespace-only
/// - `points_cost` is negative
/// - Either price is negative or not finite
/// - The database insert fails
pub async fn create_coupon<C>(db: &C, new_coupon: NewCoupon) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    if new_coupon.product_name.trim().is_empty() {
        return Err(Error::Config {
            message: "Coupon product name cannot be empty".to_string(),
        });
    }

    if new_coupon.shop_name.trim().is_empty() {
        return Err(Error::Config {
            message: "Coupon shop name cannot be empty".to_string(),
        });
    }

    if new_coupon.points_cost < 0 {
        return Err(Error::InvalidPoints {
            points: new_coupon.points_cost,
        });
    }

    for price in [new_coupon.original_price, new_coupon.discounted_price] {
        if price < 0.0 || !price.is_finite() {
            return Err(Error::InvalidAmount { amount: price });
        }
    }

    let coupon = coupon::ActiveModel {
        product_name: Set(new_coupon.product_name.trim().to_string()),
        shop_name: Set(new_coupon.shop_name.trim().to_string()),
        description: Set(new_coupon.description),
        image_url: Set(new_coupon.image_url),
        points_cost: Set(new_coupon.points_cost),
        original_price: Set(new_coupon.original_price),
        discounted_price: Set(new_coupon.discounted_price),
        expiry_date: Set(new_coupon.expiry_date),
        is_active: Set(new_coupon.is_active),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    coupon.insert(db).await.map_err(Into::into)
}

/// Inserts configured coupons that are not in the catalog yet.
///
/// A coupon is considered present when a row with the same product and shop name
/// exists. Returns the number of coupons inserted.
pub async fn seed_catalog<C>(db: &C, coupons: &[CouponConfig]) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut inserted = 0;

    for config in coupons {
        let existing = Coupon::find()
            .filter(coupon::Column::ProductName.eq(config.product_name.trim()))
            .filter(coupon::Column::ShopName.eq(config.shop_name.trim()))
            .one(db)
            .await?;

        if existing.is_some() {
            debug!(
                "Coupon '{}' from '{}' already seeded",
                config.product_name, config.shop_name
            );
            continue;
        }

        create_coupon(db, NewCoupon::from(config)).await?;
        inserted += 1;
    }

    info!("Seeded {inserted} of {} configured coupons", coupons.len());
    Ok(inserted)
}
