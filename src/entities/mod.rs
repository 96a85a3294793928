//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities mirror the backend tables the wallet reads and writes.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coupon;
pub mod owned_coupon;
pub mod scan_history;
pub mod transaction_history;
pub mod user_points;

// Re-export specific types to avoid conflicts
pub use coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel};
pub use owned_coupon::{
    Column as OwnedCouponColumn, Entity as OwnedCoupon, Model as OwnedCouponModel,
    OwnedCouponStatus,
};
pub use scan_history::{
    Column as ScanHistoryColumn, Entity as ScanHistory, Model as ScanHistoryModel,
};
pub use transaction_history::{
    Column as TransactionHistoryColumn, Entity as TransactionHistory,
    Model as TransactionHistoryModel, TransactionStatus, TransactionType,
};
pub use user_points::{Column as UserPointsColumn, Entity as UserPoints, Model as UserPointsModel};
