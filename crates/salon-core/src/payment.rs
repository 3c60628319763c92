//! # Payment Allocator
//!
//! Normalizes one or more payment-method/amount pairs and validates that
//! they reconcile against the sale's final amount.
//!
//! ## Two Input Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Legacy single method          Explicit split                           │
//! │  ────────────────────          ──────────────────────────────────────   │
//! │  { "paymentMethod": "card" }   { "payments": [                          │
//! │                                    { "method": "CASH",  "amount": 5000 }│
//! │  amount is implied:                { "method": "card",  "amount": 3000 }│
//! │  the whole final amount          ] }                                    │
//! │                                                                         │
//! │  Both normalize to Vec<AllocatedPayment> that must sum exactly to      │
//! │  the final amount. Money is integer, so "within 0.01" is exact.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Method strings are trimmed, uppercased and mapped onto the
//! [`PaymentMethod`] enum; anything unrecognized falls back to CASH.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::validate_payment_amount;

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// A raw payment entry as it arrives from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInput {
    pub method: String,
    pub amount: i64,
}

/// A normalized payment ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocatedPayment {
    pub method: PaymentMethod,
    pub amount: Money,
}

// =============================================================================
// Method Normalization
// =============================================================================

impl PaymentMethod {
    /// Normalizes a raw method string: trim, uppercase, unknown → CASH.
    pub fn normalize(raw: &str) -> PaymentMethod {
        match raw.trim().to_uppercase().as_str() {
            "CASH" => PaymentMethod::Cash,
            "CARD" | "CREDIT" | "DEBIT" | "CREDIT_CARD" => PaymentMethod::Card,
            "TRANSFER" | "BANK" | "BANK_TRANSFER" => PaymentMethod::Transfer,
            "MOBILE" | "MOBILE_PAY" => PaymentMethod::Mobile,
            _ => PaymentMethod::Cash,
        }
    }
}

// =============================================================================
// Allocation
// =============================================================================

/// Normalizes the payment set and validates it sums to the final amount.
///
/// - Explicit list given: validate each row and the exact sum.
/// - Empty list: a single legacy payment of the full final amount, using
///   `legacy_method` (or CASH). A zero final amount yields no rows at all.
///
/// ## Errors
/// - `PaymentMismatch` when the sum differs from the final amount
/// - `Validation` when a row's amount is not positive
pub fn allocate(
    final_amount: Money,
    legacy_method: Option<&str>,
    payments: &[PaymentInput],
) -> CoreResult<Vec<AllocatedPayment>> {
    if payments.is_empty() {
        if final_amount.is_zero() {
            return Ok(Vec::new());
        }

        return Ok(vec![AllocatedPayment {
            method: PaymentMethod::normalize(legacy_method.unwrap_or("CASH")),
            amount: final_amount,
        }]);
    }

    let mut allocated = Vec::with_capacity(payments.len());
    for input in payments {
        validate_payment_amount(input.amount)?;
        allocated.push(AllocatedPayment {
            method: PaymentMethod::normalize(&input.method),
            amount: Money::new(input.amount),
        });
    }

    let paid: Money = allocated.iter().map(|p| p.amount).sum();
    if paid != final_amount {
        return Err(CoreError::PaymentMismatch {
            expected: final_amount.amount(),
            paid: paid.amount(),
        });
    }

    Ok(allocated)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_methods() {
        assert_eq!(PaymentMethod::normalize("cash"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::normalize("  CARD "), PaymentMethod::Card);
        assert_eq!(PaymentMethod::normalize("debit"), PaymentMethod::Card);
        assert_eq!(PaymentMethod::normalize("bank"), PaymentMethod::Transfer);
        assert_eq!(PaymentMethod::normalize("mobile"), PaymentMethod::Mobile);
        // Unknown values fall back to cash
        assert_eq!(PaymentMethod::normalize("bitcoin"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::normalize(""), PaymentMethod::Cash);
    }

    #[test]
    fn test_legacy_single_payment() {
        let allocated = allocate(Money::new(8000), Some("card"), &[]).unwrap();
        assert_eq!(allocated.len(), 1);
        assert_eq!(allocated[0].method, PaymentMethod::Card);
        assert_eq!(allocated[0].amount.amount(), 8000);

        // No legacy method: cash
        let allocated = allocate(Money::new(8000), None, &[]).unwrap();
        assert_eq!(allocated[0].method, PaymentMethod::Cash);
    }

    #[test]
    fn test_zero_final_no_payments() {
        let allocated = allocate(Money::zero(), None, &[]).unwrap();
        assert!(allocated.is_empty());
    }

    #[test]
    fn test_split_payment_reconciles() {
        let inputs = [
            PaymentInput {
                method: "cash".to_string(),
                amount: 5000,
            },
            PaymentInput {
                method: "card".to_string(),
                amount: 3000,
            },
        ];

        let allocated = allocate(Money::new(8000), None, &inputs).unwrap();
        assert_eq!(allocated.len(), 2);
        assert_eq!(allocated[0].method, PaymentMethod::Cash);
        assert_eq!(allocated[1].method, PaymentMethod::Card);
    }

    #[test]
    fn test_mismatch_rejected() {
        let inputs = [PaymentInput {
            method: "cash".to_string(),
            amount: 7000,
        }];

        let err = allocate(Money::new(8000), None, &inputs).unwrap_err();
        assert!(matches!(
            err,
            CoreError::PaymentMismatch {
                expected: 8000,
                paid: 7000
            }
        ));
    }

    #[test]
    fn test_non_positive_row_rejected() {
        let inputs = [PaymentInput {
            method: "cash".to_string(),
            amount: 0,
        }];

        let err = allocate(Money::zero(), None, &inputs).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
