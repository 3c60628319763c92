//! # Pricing Resolver
//!
//! Resolves unit prices for sale line items from the catalog entry and the
//! selection flags, and freezes them into priced lines.
//!
//! ## Service Price Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Service Price Resolution                             │
//! │                                                                         │
//! │            is_child?                                                    │
//! │           ┌────┴─────┐                                                  │
//! │          yes         no                                                 │
//! │           │           │                                                 │
//! │   add_shampoo &&   add_shampoo &&                                      │
//! │   child_combined?  combined?                                            │
//! │    ┌────┴───┐      ┌────┴───┐                                          │
//! │   yes       no    yes       no                                          │
//! │    │        │      │        │                                           │
//! │  child_  child_  combined  single_price                                │
//! │  combined price            (base tier)                                  │
//! │           ?? single                                                     │
//! │                                                                         │
//! │  A missing combined tier silently falls back to the base tier.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products have no tiering: unit price = catalog price.
//!
//! Everything here is pure and side-effect-free.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Product, Service};

// =============================================================================
// Priced Lines
// =============================================================================

/// A canonical, priced service line item.
///
/// Both request shapes (detailed selections and bare service-id lists) are
/// normalized into this one type before any discount logic runs. Carries
/// the service name because the combo discount matches on it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedServiceLine {
    pub service_id: String,
    pub service_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub is_child: bool,
    /// True when a combined-price tier was actually applied (not merely
    /// requested).
    pub is_combined: bool,
    pub add_shampoo: bool,
}

/// A canonical, priced product line item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedProductLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves a service unit price from the selection flags.
///
/// Returns the price and whether a combined tier was applied.
///
/// ## Fallback Chain
/// - child + addon: child_combined_price, else child_price, else single_price
/// - child: child_price, else single_price
/// - adult + addon: combined_price, else single_price
/// - adult: single_price
pub fn resolve_service_price(service: &Service, is_child: bool, add_shampoo: bool) -> (Money, bool) {
    if is_child {
        if add_shampoo {
            if let Some(price) = service.child_combined_price {
                return (Money::new(price), true);
            }
        }
        let price = service.child_price.unwrap_or(service.single_price);
        (Money::new(price), false)
    } else {
        if add_shampoo {
            if let Some(price) = service.combined_price {
                return (Money::new(price), true);
            }
        }
        (Money::new(service.single_price), false)
    }
}

/// Prices a service selection into a canonical line.
pub fn price_service_line(
    service: &Service,
    quantity: i64,
    is_child: bool,
    add_shampoo: bool,
) -> PricedServiceLine {
    let (unit_price, is_combined) = resolve_service_price(service, is_child, add_shampoo);

    PricedServiceLine {
        service_id: service.id.clone(),
        service_name: service.name.clone(),
        quantity,
        unit_price,
        line_total: unit_price.multiply_quantity(quantity),
        is_child,
        is_combined,
        add_shampoo,
    }
}

/// Prices a product selection into a canonical line.
pub fn price_product_line(product: &Product, quantity: i64) -> PricedProductLine {
    let unit_price = product.unit_price();

    PricedProductLine {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        quantity,
        unit_price,
        line_total: unit_price.multiply_quantity(quantity),
    }
}

/// Sums the subtotal over priced service and product lines.
pub fn subtotal(services: &[PricedServiceLine], products: &[PricedProductLine]) -> Money {
    let service_total: Money = services.iter().map(|l| l.line_total).sum();
    let product_total: Money = products.iter().map(|l| l.line_total).sum();
    service_total + product_total
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(
        single: i64,
        child: Option<i64>,
        combined: Option<i64>,
        child_combined: Option<i64>,
    ) -> Service {
        let now = Utc::now();
        Service {
            id: "s-1".to_string(),
            name: "Cut".to_string(),
            single_price: single,
            child_price: child,
            combined_price: combined,
            child_combined_price: child_combined,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_adult_base_price() {
        let s = service(10000, None, None, None);
        let (price, combined) = resolve_service_price(&s, false, false);
        assert_eq!(price.amount(), 10000);
        assert!(!combined);
    }

    #[test]
    fn test_adult_combined_tier() {
        let s = service(10000, None, Some(12000), None);
        let (price, combined) = resolve_service_price(&s, false, true);
        assert_eq!(price.amount(), 12000);
        assert!(combined);
    }

    #[test]
    fn test_adult_addon_without_tier_falls_back() {
        // Addon requested but no combined tier configured: base price, quietly
        let s = service(10000, None, None, None);
        let (price, combined) = resolve_service_price(&s, false, true);
        assert_eq!(price.amount(), 10000);
        assert!(!combined);
    }

    #[test]
    fn test_child_price_and_fallback() {
        let s = service(10000, Some(7000), None, None);
        let (price, _) = resolve_service_price(&s, true, false);
        assert_eq!(price.amount(), 7000);

        // No child tier: child pays the single price
        let s = service(10000, None, None, None);
        let (price, _) = resolve_service_price(&s, true, false);
        assert_eq!(price.amount(), 10000);
    }

    #[test]
    fn test_child_combined_tier_and_fallback() {
        let s = service(10000, Some(7000), Some(12000), Some(8500));
        let (price, combined) = resolve_service_price(&s, true, true);
        assert_eq!(price.amount(), 8500);
        assert!(combined);

        // Missing child combined tier falls back to child price, not the
        // adult combined price
        let s = service(10000, Some(7000), Some(12000), None);
        let (price, combined) = resolve_service_price(&s, true, true);
        assert_eq!(price.amount(), 7000);
        assert!(!combined);
    }

    #[test]
    fn test_line_totals_and_subtotal() {
        let s = service(10000, None, None, None);
        let line = price_service_line(&s, 2, false, false);
        assert_eq!(line.line_total.amount(), 20000);

        let now = Utc::now();
        let p = Product {
            id: "p-1".to_string(),
            name: "Hair Essence".to_string(),
            price: 15000,
            stock_quantity: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let product_line = price_product_line(&p, 3);
        assert_eq!(product_line.line_total.amount(), 45000);

        let total = subtotal(&[line], &[product_line]);
        assert_eq!(total.amount(), 65000);
    }
}
