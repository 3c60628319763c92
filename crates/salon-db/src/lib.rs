//! # salon-db: Database Layer for Salon POS
//!
//! This crate provides database access for the Salon POS system.
//! It uses SQLite for local storage with sqlx for async operations, and
//! hosts the sale service that orchestrates whole sale transactions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon POS Data Flow                              │
//! │                                                                         │
//! │  Transport layer (create_sale request)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     salon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  SaleService  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ one tx per    │    │ free fns over │    │ 001_initial_ │  │   │
//! │  │   │ operation     │    │ &mut conn     │    │ schema.sql   │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ calls salon-core for pricing/discounts/payments   │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │        WAL mode, foreign keys ON, pooled connections           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository functions (customer, catalog, rules, sale)
//! - [`service`] - The sale service: transaction orchestration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use salon_db::{Database, DbConfig};
//!
//! // Create database with default config (migrations run automatically)
//! let config = DbConfig::new("path/to/salon.db");
//! let db = Database::new(config).await?;
//!
//! // Record a sale
//! let detail = db.sales().create(request).await?;
//! assert_eq!(
//!     detail.payments.iter().map(|p| p.amount).sum::<i64>(),
//!     detail.sale.final_amount
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Service re-exports for convenience
pub use service::{
    AdjustmentInput, CreateSaleRequest, ProductSelection, SaleError, SaleResult, SaleService,
    ServiceSelection, StaffSelection, UpdateSaleRequest,
};
