//! Application settings loaded from config.toml
//!
//! Holds the backend timeout, the redemption policy, point rewards for the earning
//! flows, and the coupons used to seed an empty catalog. Every section is optional.

use crate::core::eligibility::RedemptionPolicy;
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Settings {
    /// Remote call behavior
    #[serde(default)]
    pub backend: BackendSettings,
    /// Redemption policy knobs
    #[serde(default)]
    pub redemption: RedemptionPolicy,
    /// Points awarded by the earning flows
    #[serde(default)]
    pub rewards: RewardSettings,
    /// Coupons to seed into the catalog
    #[serde(default)]
    pub coupons: Vec<CouponConfig>,
}

/// Remote call settings
#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    /// Upper bound on every backend call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendSettings {
    /// The configured timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    10
}

/// Points credited by the non-redemption flows
#[derive(Debug, Deserialize, Clone)]
pub struct RewardSettings {
    /// Points per collection-bin scan
    #[serde(default = "default_scan_points")]
    pub scan_points: i64,
    /// Points per completed ad
    #[serde(default = "default_ad_watch_points")]
    pub ad_watch_points: i64,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            scan_points: default_scan_points(),
            ad_watch_points: default_ad_watch_points(),
        }
    }
}

const fn default_scan_points() -> i64 {
    10
}

const fn default_ad_watch_points() -> i64 {
    5
}

/// Configuration for a single catalog coupon
#[derive(Debug, Deserialize, Clone)]
pub struct CouponConfig {
    /// Product the coupon discounts
    pub product_name: String,
    /// Partner shop
    pub shop_name: String,
    /// Optional blurb
    #[serde(default)]
    pub description: Option<String>,
    /// Optional product image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Points charged on redemption
    pub points_cost: i64,
    /// Shelf price
    pub original_price: f64,
    /// Price with the coupon
    pub discounted_price: f64,
    /// Last redeemable day, `YYYY-MM-DD`
    pub expiry_date: NaiveDate,
    /// Whether the coupon is offered; defaults to `true`
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

const fn default_is_active() -> bool {
    true
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required coupon fields are missing
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_settings(&contents)
}

/// Parses settings from TOML text
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `ECO_WALLET_CONFIG`, or ./config.toml when unset.
///
/// A missing default file is not an error; built-in defaults are used instead.
pub fn load_default_settings() -> Result<Settings> {
    match std::env::var("ECO_WALLET_CONFIG") {
        Ok(path) => load_settings(path),
        Err(_) if Path::new("config.toml").exists() => load_settings("config.toml"),
        Err(_) => Ok(Settings::default()),
    }
}
