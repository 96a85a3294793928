//! Owned coupon entity - A user's redeemed instance of a catalog coupon.
//!
//! Price and shop fields are snapshotted at redemption time so later catalog
//! edits do not change what the user was sold. `status` is authoritative here;
//! readers display it rather than recomputing it from `expiry_date`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an owned coupon. `Used` and `Expired` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum OwnedCouponStatus {
    /// Redeemed and not yet presented
    #[sea_orm(string_value = "active")]
    Active,
    /// Passed its expiry date before being presented
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Presented or scanned at the shop
    #[sea_orm(string_value = "used")]
    Used,
}

impl OwnedCouponStatus {
    /// Whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Used)
    }

    /// `active -> used` and `active -> expired` are the only legal moves.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Active, Self::Used | Self::Expired))
    }

    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Used => "used",
        }
    }
}

impl fmt::Display for OwnedCouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned coupon database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "owned_coupons")]
pub struct Model {
    /// Unique identifier for the owned coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who redeemed the coupon
    pub user_id: String,
    /// Catalog coupon this was redeemed from
    pub coupon_id: i64,
    /// Product name at redemption time
    pub product_name: String,
    /// Shop name at redemption time
    pub shop_name: String,
    /// Points paid
    pub points_cost: i64,
    /// Shelf price at redemption time
    pub original_price: f64,
    /// Discounted price at redemption time
    pub discounted_price: f64,
    /// When the redemption committed
    pub redeemed_date: DateTimeUtc,
    /// Copied from the catalog coupon
    pub expiry_date: Date,
    /// Current lifecycle state
    pub status: OwnedCouponStatus,
    /// When the coupon was presented, if it has been
    pub used_at: Option<DateTimeUtc>,
}

/// Defines relationships between `OwnedCoupon` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each owned coupon comes from one catalog coupon
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id"
    )]
    Coupon,
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
