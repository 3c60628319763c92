//! # Domain Types
//!
//! Core domain types used throughout Salon POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Sale       │   │  DiscountRule   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  visit_count    │   │  total_amount   │   │  discount_type  │       │
//! │  │  loyalty_points │   │  discount_amount│   │  value (bps/flat│       │
//! │  │  total_spent    │   │  final_amount   │   │  validity window│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Sale child rows: SaleServiceLine, SaleProductLine, SaleDiscount,      │
//! │  SalePayment, SaleStaff, SaleAdjustment, DiscountUsage                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has an `id`: UUID v4, immutable, used for database relations.
//!
//! ## Sale Invariants
//! - `final_amount == max(0, total_amount - discount_amount + manual_increment)`
//! - `sum(payments.amount) == final_amount`
//! These are established by the sale service and asserted by its tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Discount Type
// =============================================================================

/// Stable tag for every discount a sale can carry.
///
/// The first four fire automatically from customer history and line items,
/// `Manual` is operator-entered, and `Promotion` covers operator-defined
/// configurable rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Every 6th visit earns 20% off.
    SixthVisit,
    /// 20% off during the customer's birth month, once per calendar month.
    BirthdayMonth,
    /// Flat amount off when shampoo is combined with another service.
    ServiceCombo,
    /// Flat amount off when the customer brings their own product.
    BringOwnProduct,
    /// Operator-entered amount with a mandatory reason.
    Manual,
    /// Configurable promotional rule.
    Promotion,
}

impl DiscountType {
    /// Automatic discounts are recomputed on create but preserved verbatim
    /// on edit. Manual is the only type the operator may replace on edit.
    pub fn is_automatic(&self) -> bool {
        !matches!(self, DiscountType::Manual)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment. Also the fallback for unknown method strings.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Mobile payment app.
    Mobile,
}

// =============================================================================
// Adjustment Kind
// =============================================================================

/// Operator-entered adjustment rows on a sale.
///
/// Both kinds require a non-empty reason; the reason lives in the structured
/// audit row, not in the free-text notes field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    ManualDiscount,
    ManualIncrement,
}

// =============================================================================
// Customer
// =============================================================================

/// A salon customer.
///
/// ## Denormalized Aggregates
/// `visit_count`, `loyalty_points`, `total_spent` and `last_visit_at` are
/// rolling statistics maintained by signed deltas as sales are created,
/// edited and deleted. They are mutated only by the statistics reconciler,
/// inside the same transaction as the triggering sale write.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// 1-12, None when unknown. Drives the birthday-month discount.
    pub birth_month: Option<i64>,
    pub birth_day: Option<i64>,
    pub visit_count: i64,
    pub loyalty_points: i64,
    pub total_spent: i64,
    #[ts(as = "Option<String>")]
    pub last_visit_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A salon service with tiered pricing.
///
/// ## Price Tiers
/// - `single_price`: base adult price, always present
/// - `child_price`: child tier, falls back to `single_price`
/// - `combined_price`: adult price when the shampoo addon is applied
/// - `child_combined_price`: child price with the addon
///
/// A missing tier silently falls back to the base tier; the pricing
/// resolver owns that logic.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub single_price: i64,
    pub child_price: Option<i64>,
    pub combined_price: Option<i64>,
    pub child_combined_price: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A retail product.
///
/// `stock_quantity` is mutated exclusively through the inventory ledger's
/// guarded decrement/increment; it never goes negative at a committed state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub stock_quantity: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::new(self.price)
    }
}

/// A staff member who can be attributed on sales.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Discount Rule
// =============================================================================

/// A configurable discount rule.
///
/// Automatic types get one active row each (auto-created the first time the
/// type fires); promotions are operator-defined and may overlap. Rules are
/// soft-deleted (renamed + deactivated) so historical sales keep a valid
/// reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiscountRule {
    pub id: String,
    pub name: String,
    pub discount_type: DiscountType,
    /// When true, `value` is basis points (2000 = 20%); otherwise a flat
    /// amount in currency units.
    pub is_percentage: bool,
    pub value: i64,
    /// Minimum sale subtotal for the rule to fire.
    pub min_purchase: Option<i64>,
    /// Upper bound on the computed discount amount.
    pub max_cap: Option<i64>,
    #[ts(as = "Option<String>")]
    pub valid_from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<DateTime<Utc>>,
    /// When false the rule only counts line totals of its scoped services.
    pub apply_to_all_services: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl DiscountRule {
    /// Checks whether the optional validity window includes `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }
}

/// A discount rule together with its explicit service scope.
///
/// `service_ids` is empty when `rule.apply_to_all_services` is true.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScopedRule {
    pub rule: DiscountRule,
    pub service_ids: Vec<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// One customer visit: the aggregate root of the sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_id: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    /// Subtotal: sum of all line totals before discounts.
    pub total_amount: i64,
    /// Aggregate of all applied discounts.
    pub discount_amount: i64,
    /// Operator-entered surcharge, added back after discounts.
    pub manual_increment: i64,
    /// `max(0, total_amount - discount_amount + manual_increment)`.
    pub final_amount: i64,
    pub loyalty_points_earned: i64,
    /// Operator free text only; adjustments carry their own audit rows.
    pub notes: Option<String>,
    pub is_completed: bool,
    /// Legacy single payment-method field, kept alongside sale_payments.
    pub payment_method: PaymentMethod,
    pub birthday_discount_applied: bool,
    pub bring_own_product_applied: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::new(self.final_amount)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::new(self.total_amount)
    }
}

/// A service line item, owned exclusively by one sale.
///
/// Replaced as a whole set on edit, never partially patched. `unit_price`
/// and `line_total` are frozen at pricing time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleServiceLine {
    pub id: String,
    pub sale_id: String,
    pub service_id: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
    pub is_child: bool,
    /// Whether a combined-price tier was actually applied.
    pub is_combined: bool,
    /// Whether the shampoo addon was requested.
    pub add_shampoo: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product line item. Each unit sold is mirrored by a stock decrement;
/// deleting or replacing the line restores stock first.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleProductLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A discount applied to a sale, ordered by policy order via `position`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleDiscount {
    pub id: String,
    pub sale_id: String,
    pub rule_id: Option<String>,
    pub discount_type: DiscountType,
    pub amount: i64,
    pub description: String,
    pub position: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Per-customer discount usage record.
///
/// Appended once per applied discount so eligibility checks like "has this
/// customer used the birthday discount this month" are a single indexed
/// query. Cascade-deleted with the sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiscountUsage {
    pub id: String,
    pub customer_id: String,
    pub sale_id: String,
    pub discount_type: DiscountType,
    pub amount: i64,
    #[ts(as = "String")]
    pub used_at: DateTime<Utc>,
}

/// A payment towards a sale. The set must sum to the sale's final amount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    pub amount: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Staff attribution: a system staff member XOR a free-text custom name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleStaff {
    pub id: String,
    pub sale_id: String,
    pub staff_id: Option<String>,
    pub custom_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Structured audit row for an operator-entered adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleAdjustment {
    pub id: String,
    pub sale_id: String,
    pub kind: AdjustmentKind,
    pub amount: i64,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Hydrated Aggregate
// =============================================================================

/// The fully hydrated sale aggregate returned by every sale operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub customer: Customer,
    pub services: Vec<SaleServiceLine>,
    pub products: Vec<SaleProductLine>,
    pub discounts: Vec<SaleDiscount>,
    pub payments: Vec<SalePayment>,
    pub staff: Vec<SaleStaff>,
    pub adjustments: Vec<SaleAdjustment>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_type_is_automatic() {
        assert!(DiscountType::SixthVisit.is_automatic());
        assert!(DiscountType::BirthdayMonth.is_automatic());
        assert!(DiscountType::Promotion.is_automatic());
        assert!(!DiscountType::Manual.is_automatic());
    }

    #[test]
    fn test_rule_validity_window() {
        let now = Utc::now();
        let mut rule = DiscountRule {
            id: "r1".to_string(),
            name: "Spring promo".to_string(),
            discount_type: DiscountType::Promotion,
            is_percentage: true,
            value: 1000,
            min_purchase: None,
            max_cap: None,
            valid_from: None,
            valid_until: None,
            apply_to_all_services: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        // No window: always valid
        assert!(rule.is_valid_at(now));

        // Window in the future
        rule.valid_from = Some(now + chrono::Duration::days(1));
        assert!(!rule.is_valid_at(now));

        // Window that includes now
        rule.valid_from = Some(now - chrono::Duration::days(1));
        rule.valid_until = Some(now + chrono::Duration::days(1));
        assert!(rule.is_valid_at(now));

        // Expired window
        rule.valid_until = Some(now - chrono::Duration::hours(1));
        assert!(!rule.is_valid_at(now));
    }

    #[test]
    fn test_serde_snake_case_tags() {
        let json = serde_json::to_string(&DiscountType::SixthVisit).unwrap();
        assert_eq!(json, "\"sixth_visit\"");
        let json = serde_json::to_string(&PaymentMethod::Card).unwrap();
        assert_eq!(json, "\"card\"");
    }
}
