//! Coupon entity - A catalog offer that users can redeem for points.
//!
//! Coupons are created by an administrative process and are read-only to
//! consumers. Only rows that are active and not past `expiry_date` are listed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coupon catalog model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Unique identifier for the coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product on offer
    pub product_name: String,
    /// Partner shop that honors the coupon
    pub shop_name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional image location in object storage
    pub image_url: Option<String>,
    /// Points needed to redeem
    pub points_cost: i64,
    /// Shelf price of the product
    pub original_price: f64,
    /// Price when the coupon is presented
    pub discounted_price: f64,
    /// Last day on which the coupon can be redeemed
    pub expiry_date: Date,
    /// Whether the coupon is currently offered
    pub is_active: bool,
    /// When the coupon was added to the catalog
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether the coupon can still be redeemed on `today`.
    #[must_use]
    pub fn is_available_on(&self, today: Date) -> bool {
        self.is_active && self.expiry_date >= today
    }
}

/// Defines relationships between Coupon and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One coupon fans out to many owned coupons
    #[sea_orm(has_many = "super::owned_coupon::Entity")]
    OwnedCoupons,
}

impl Related<super::owned_coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedCoupons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
