//! Shared test utilities for the wallet core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        catalog::{self, NewCoupon},
        points,
    },
    entities::{self, TransactionType},
    errors::Result,
};
use chrono::{Days, NaiveDate};
use sea_orm::{ConnectionTrait, DatabaseConnection};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Today's UTC date, the same clock `redeem` uses.
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Builds coupon input with sensible defaults.
///
/// # Defaults
/// * `shop_name`: "Green Market"
/// * `original_price`: 12.0, `discounted_price`: 6.0
/// * `is_active`: true
pub fn new_coupon(product_name: &str, points_cost: i64, expiry_date: NaiveDate) -> NewCoupon {
    NewCoupon {
        product_name: product_name.to_string(),
        shop_name: "Green Market".to_string(),
        description: None,
        image_url: None,
        points_cost,
        original_price: 12.0,
        discounted_price: 6.0,
        expiry_date,
        is_active: true,
    }
}

/// An in-memory coupon model for pure checks that never touch the database.
pub fn coupon_model(id: i64, points_cost: i64, expiry_date: NaiveDate) -> entities::coupon::Model {
    entities::coupon::Model {
        id,
        product_name: "Tote".to_string(),
        shop_name: "Green Market".to_string(),
        description: None,
        image_url: None,
        points_cost,
        original_price: 12.0,
        discounted_price: 6.0,
        expiry_date,
        is_active: true,
        created_at: chrono::Utc::now(),
    }
}

/// Creates an active coupon that expires a year from today.
pub async fn create_test_coupon<C>(
    db: &C,
    product_name: &str,
    points_cost: i64,
) -> Result<entities::coupon::Model>
where
    C: ConnectionTrait,
{
    let expiry = today()
        .checked_add_days(Days::new(365))
        .unwrap_or(NaiveDate::MAX);
    catalog::create_coupon(db, new_coupon(product_name, points_cost, expiry)).await
}

/// Creates a coupon from custom input.
pub async fn create_custom_coupon<C>(
    db: &C,
    new_coupon: NewCoupon,
) -> Result<entities::coupon::Model>
where
    C: ConnectionTrait,
{
    catalog::create_coupon(db, new_coupon).await
}

/// Credits `amount` generic points to a user through the ledger.
pub async fn give_points<C>(
    db: &C,
    user_id: &str,
    amount: i64,
) -> Result<entities::transaction_history::Model>
where
    C: ConnectionTrait,
{
    points::award_points(
        db,
        user_id,
        amount,
        TransactionType::PointsEarned,
        "Test credit".to_string(),
        None,
    )
    .await
}
