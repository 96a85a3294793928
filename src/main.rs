#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use eco_wallet::{
    app::AppContext,
    config::settings,
    core::{catalog, owned_coupon},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load settings (config.toml or ECO_WALLET_CONFIG, defaults otherwise)
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!(
        "Loaded settings: timeout {}s, {} seed coupons",
        settings.backend.timeout_secs,
        settings.coupons.len()
    );

    // 4. Connect and make sure all tables exist
    let ctx = AppContext::connect(settings)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the catalog from configuration
    catalog::seed_catalog(&ctx.database, &ctx.settings.coupons)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Expire owned coupons whose date has passed
    let today = chrono::Utc::now().date_naive();
    let expired = owned_coupon::expire_overdue(&ctx.database, today).await?;
    info!("Expired {expired} overdue coupons");

    // 7. Summarize what users can redeem today
    let coupons = ctx.list_coupons().await?;
    info!("{} coupons redeemable today", coupons.len());
    for coupon in &coupons {
        info!(
            "  #{} {} at {}: {} points, {:.2} -> {:.2}, until {}",
            coupon.id,
            coupon.product_name,
            coupon.shop_name,
            coupon.points_cost,
            coupon.original_price,
            coupon.discounted_price,
            coupon.expiry_date
        );
    }

    Ok(())
}
