//! Transaction history entity - The append-only points ledger.
//!
//! Each row records a signed `amount` (positive for earning, negative for spending).
//! The sum of a user's `completed` rows equals their `user_points` balance.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What produced a ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Points spent on a catalog coupon
    #[sea_orm(string_value = "coupon_redemption")]
    CouponRedemption,
    /// Generic credit
    #[sea_orm(string_value = "points_earned")]
    PointsEarned,
    /// Generic debit
    #[sea_orm(string_value = "points_spent")]
    PointsSpent,
    /// Reward for watching an ad
    #[sea_orm(string_value = "ad_watch")]
    AdWatch,
    /// Reward for scanning a collection bin
    #[sea_orm(string_value = "scan_reward")]
    ScanReward,
}

impl TransactionType {
    /// Whether entries of this type add points to the balance.
    #[must_use]
    pub const fn is_earning(self) -> bool {
        matches!(self, Self::PointsEarned | Self::AdWatch | Self::ScanReward)
    }
}

/// Settlement state of a ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Applied to the balance
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Recorded but not yet applied
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Never applied
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_history")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance this entry affects
    pub user_id: String,
    /// What produced the entry
    pub transaction_type: TransactionType,
    /// Signed point amount
    pub amount: i64,
    /// Settlement state
    pub status: TransactionStatus,
    /// Human-readable description
    pub description: String,
    /// Free-form details, e.g. the coupon ids of a redemption
    pub metadata: Option<Json>,
    /// When the entry was appended
    pub created_at: DateTimeUtc,
}

/// Ledger entries reference users only, which live in the auth provider
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
