//! User points entity - The typed balance backing each user's wallet.
//!
//! Rows are only mutated through the ledger operations in `core::points` and
//! `core::redemption`, always inside the same database transaction as the
//! matching ledger entry.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Point balance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_points")]
pub struct Model {
    /// Auth provider user id
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Current balance, never negative
    pub points: i64,
    /// When the balance last changed
    pub updated_at: DateTimeUtc,
}

/// No relations; rows are joined by `user_id` in queries
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
