//! # salon-core: Pure Business Logic for Salon POS
//!
//! This crate is the **heart** of the salon point-of-sale system. It
//! contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Salon POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Transport layer (HTTP / desktop shell)            │   │
//! │  │                      (out of this repo)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 salon-db :: SaleService                         │   │
//! │  │        one transaction per create/update/delete/complete        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │  discount │  │  payment  │  │   │
//! │  │   │ Sale, ... │  │  resolver │  │  policy   │  │ allocator │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Sale, DiscountRule, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Unit price resolution for tiered services
//! - [`discount`] - The layered discount policy engine
//! - [`payment`] - Payment normalization and reconciliation
//! - [`error`] - Domain error types
//! - [`validation`] - Payload validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic - same input =
//!    same output. Historical state (visit counts, monthly discount usage)
//!    arrives as snapshot values, never as queries.
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are i64 in the smallest
//!    currency unit, so reconciliation checks are exact
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use salon_core::Money` instead of
// `use salon_core::money::Money`

pub use discount::{AppliedDiscount, DiscountContext, ManualAdjustment};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payment::{AllocatedPayment, PaymentInput};
pub use pricing::{PricedProductLine, PricedServiceLine};
pub use types::*;
