//! # Sale Service Layer
//!
//! Orchestrates whole sale operations on top of the repository functions
//! and the pure logic in salon-core. This is the only place transactions
//! are opened: each public operation is exactly one commit-or-rollback.

pub mod request;
pub mod sale;

pub use request::{
    AdjustmentInput, CreateSaleRequest, ProductSelection, ServiceSelection, StaffSelection,
    UpdateSaleRequest,
};
pub use sale::{SaleError, SaleResult, SaleService};
