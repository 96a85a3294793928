//! Bin scans - Records a QR scan at a collection bin and credits the scan reward.

use crate::{
    core::points,
    entities::{ScanHistory, TransactionType, scan_history},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::info;

/// Stores a scan and credits `reward` points, both in one transaction.
///
/// # Errors
/// Returns [`Error::Config`] for an empty bin code and [`Error::InvalidPoints`] for a
/// non-positive reward.
pub async fn record_scan(
    db: &DatabaseConnection,
    user_id: &str,
    bin_code: &str,
    waste_type: &str,
    reward: i64,
) -> Result<scan_history::Model> {
    let bin_code = bin_code.trim();
    if bin_code.is_empty() {
        return Err(Error::Config {
            message: "Bin code cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let scan = scan_history::ActiveModel {
        user_id: Set(user_id.to_string()),
        bin_code: Set(bin_code.to_string()),
        waste_type: Set(waste_type.trim().to_string()),
        points_awarded: Set(reward),
        scanned_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    points::award_points(
        &txn,
        user_id,
        reward,
        TransactionType::ScanReward,
        format!("Scanned bin {bin_code}"),
        Some(json!({ "scan_id": scan.id, "bin_code": bin_code })),
    )
    .await?;

    txn.commit().await?;

    info!("User {user_id} scanned bin {bin_code} for {reward} points");
    Ok(scan)
}

/// Retrieves the user's scans, most recent first.
pub async fn get_scan_history<C>(db: &C, user_id: &str) -> Result<Vec<scan_history::Model>>
where
    C: ConnectionTrait,
{
    ScanHistory::find()
        .filter(scan_history::Column::UserId.eq(user_id))
        .order_by_desc(scan_history::Column::ScannedAt)
        .order_by_desc(scan_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
