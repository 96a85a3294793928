//! Scan history entity - One row per collection-bin QR scan.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scan_history")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who scanned
    pub user_id: String,
    /// Code printed on the bin's QR label
    pub bin_code: String,
    /// Kind of waste deposited (e.g. "plastic", "glass")
    pub waste_type: String,
    /// Points credited for this scan
    pub points_awarded: i64,
    /// When the scan was recorded
    pub scanned_at: DateTimeUtc,
}

/// No relations; rows are joined by `user_id` in queries
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
