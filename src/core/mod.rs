//! Core business logic - framework-agnostic catalog, redemption, ledger and wallet operations.
//!
//! Every function takes a `SeaORM` connection (or an open transaction) and returns
//! the crate's [`Result`](crate::errors::Result).

/// Coupon catalog reads and administrative seeding
pub mod catalog;
/// Advisory redemption precondition checks
pub mod eligibility;
/// Owned coupon status transitions
pub mod owned_coupon;
/// Point balance, earning flows and ledger reconciliation
pub mod points;
/// Atomic coupon redemption
pub mod redemption;
/// Bin scan recording and rewards
pub mod scan;
/// Read-only wallet view
pub mod wallet;
