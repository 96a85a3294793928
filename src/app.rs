//! Application context - the entry point client surfaces call into.
//!
//! [`AppContext`] holds the shared database handle and settings and wraps each core
//! operation in the configured backend timeout. A call that times out is reported
//! as [`Error::BackendUnavailable`]; the backend may still have committed, so callers
//! recover from an unconfirmed redemption with [`AppContext::confirm_redemption`]
//! instead of redeeming again.

use crate::{
    config::{database, settings::Settings},
    core::{catalog, eligibility, owned_coupon, points, redemption, scan, wallet},
    entities::{coupon, owned_coupon as owned, scan_history, transaction_history},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, prelude::DateTimeUtc};
use std::future::Future;
use tracing::warn;

/// Shared state for every wallet request.
pub struct AppContext {
    /// Database connection for all backend operations
    pub database: DatabaseConnection,
    /// Loaded configuration
    pub settings: Settings,
}

impl AppContext {
    /// Wraps an open connection and loaded settings.
    #[must_use]
    pub const fn new(database: DatabaseConnection, settings: Settings) -> Self {
        Self { database, settings }
    }

    /// Connects using `DATABASE_URL` and makes sure all tables exist.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let database = database::create_connection().await?;
        database::create_tables(&database).await?;
        Ok(Self::new(database, settings))
    }

    /// Runs `operation` under the configured backend timeout.
    pub async fn bounded<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.settings.backend.timeout();
        tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
            warn!("{operation} timed out after {limit:?}");
            Err(Error::BackendUnavailable {
                message: format!("{operation} timed out after {}s", limit.as_secs()),
            })
        })
    }

    /// Redeemable coupons for today.
    pub async fn list_coupons(&self) -> Result<Vec<coupon::Model>> {
        let today = chrono::Utc::now().date_naive();
        self.bounded("list_coupons", catalog::list_coupons(&self.database, today))
            .await
            .map_err(|e| match e {
                Error::BackendUnavailable { message } => Error::CatalogUnavailable { message },
                other => other,
            })
    }

    /// Advisory check used to enable or disable the redeem action.
    pub async fn check_redemption(&self, user_id: &str, coupon_id: i64) -> Result<()> {
        let today = chrono::Utc::now().date_naive();
        self.bounded(
            "check_redemption",
            eligibility::check_redemption(
                &self.database,
                user_id,
                coupon_id,
                self.settings.redemption,
                today,
            ),
        )
        .await
    }

    /// Redeems a coupon under the configured policy.
    pub async fn redeem(&self, user_id: &str, coupon_id: i64) -> Result<owned::Model> {
        self.bounded(
            "redeem",
            redemption::redeem(
                &self.database,
                user_id,
                coupon_id,
                self.settings.redemption,
            ),
        )
        .await
    }

    /// Ground truth after a redemption whose outcome was never confirmed.
    pub async fn confirm_redemption(
        &self,
        user_id: &str,
        coupon_id: i64,
        since: DateTimeUtc,
    ) -> Result<Option<owned::Model>> {
        self.bounded(
            "confirm_redemption",
            redemption::confirm_redemption(&self.database, user_id, coupon_id, since),
        )
        .await
    }

    /// Everything the wallet screen shows, read in one pass.
    pub async fn wallet(&self, user_id: &str) -> Result<wallet::Wallet> {
        self.bounded("wallet", wallet::get_wallet(&self.database, user_id))
            .await
    }

    /// Marks an owned coupon as presented at the shop.
    pub async fn use_coupon(&self, user_id: &str, owned_coupon_id: i64) -> Result<owned::Model> {
        let today = chrono::Utc::now().date_naive();
        self.bounded(
            "use_coupon",
            owned_coupon::mark_used(&self.database, user_id, owned_coupon_id, today),
        )
        .await
    }

    /// Records a bin scan worth the configured scan reward.
    pub async fn record_scan(
        &self,
        user_id: &str,
        bin_code: &str,
        waste_type: &str,
    ) -> Result<scan_history::Model> {
        self.bounded(
            "record_scan",
            scan::record_scan(
                &self.database,
                user_id,
                bin_code,
                waste_type,
                self.settings.rewards.scan_points,
            ),
        )
        .await
    }

    /// Credits the configured ad reward.
    pub async fn record_ad_watch(&self, user_id: &str) -> Result<transaction_history::Model> {
        self.bounded(
            "record_ad_watch",
            points::record_ad_watch(
                &self.database,
                user_id,
                self.settings.rewards.ad_watch_points,
            ),
        )
        .await
    }

    /// Compares the stored balance with the sum of the user's ledger.
    pub async fn reconcile_balance(&self, user_id: &str) -> Result<points::BalanceReconciliation> {
        self.bounded(
            "reconcile_balance",
            points::reconcile_balance(&self.database, user_id),
        )
        .await
    }
}
