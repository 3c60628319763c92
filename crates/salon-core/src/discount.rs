//! # Discount Policy Engine
//!
//! Computes the ordered set of discounts applicable to a sale from a
//! snapshot of customer history plus the priced line items.
//!
//! ## Policy Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Discount Evaluation Order                          │
//! │                                                                         │
//! │  1. Sixth visit      (prior_visits + 1) % 6 == 0       → 20%           │
//! │  2. Birthday month   only if (1) did NOT fire          → 20%           │
//! │  3. Service combo    shampoo + other, subtotal ≥ 2000  → flat 2000     │
//! │  4. Bring own product flag, subtotal ≥ 1000            → flat 1000     │
//! │  5. Manual           amount + non-empty reason                          │
//! │  6. Promotions       every active rule valid now                        │
//! │                                                                         │
//! │  (1) and (2) are mutually exclusive: a sale never carries both 20%     │
//! │  discounts. The order is load-bearing, not cosmetic.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## History Snapshot
//! The engine is pure: everything it needs from storage (prior visit count,
//! whether the birthday discount was already used this calendar month, the
//! active promotional rules) is queried by the caller and passed in as
//! [`DiscountContext`] / [`ScopedRule`] values.
//!
//! ## Create vs Edit Asymmetry
//! On create, everything is recomputed. On edit, pre-existing automatic
//! discount rows are preserved verbatim and only the manual adjustment may
//! be replaced — see [`retained_on_edit`]. This is a deliberate policy:
//! editing line items must not retroactively grant or revoke a one-time
//! discount the customer already received.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::PricedServiceLine;
use crate::types::{DiscountType, SaleDiscount, ScopedRule};

// =============================================================================
// Policy Constants
// =============================================================================

/// Sixth-visit and birthday-month discounts, in basis points (20%).
pub const VISIT_MILESTONE_BPS: u32 = 2000;

/// Every Nth visit earns the milestone discount.
pub const VISIT_MILESTONE_INTERVAL: i64 = 6;

/// Flat amount off for the shampoo + service combo.
pub const SERVICE_COMBO_AMOUNT: i64 = 2000;

/// Minimum subtotal for the combo discount.
pub const SERVICE_COMBO_MIN_SUBTOTAL: i64 = 2000;

/// Flat amount off when the customer brings their own product.
pub const BRING_OWN_PRODUCT_AMOUNT: i64 = 1000;

/// Minimum subtotal for the bring-own-product discount.
pub const BRING_OWN_PRODUCT_MIN_SUBTOTAL: i64 = 1000;

/// Case-insensitive keyword identifying shampoo services for the combo.
const SHAMPOO_KEYWORD: &str = "shampoo";

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Snapshot of everything the automatic rules need to evaluate one sale.
#[derive(Debug, Clone)]
pub struct DiscountContext<'a> {
    /// Visit count BEFORE this sale.
    pub prior_visit_count: i64,
    /// Customer's birth month (1-12), if known.
    pub birth_month: Option<i64>,
    /// Whether a birthday-month discount was already recorded for this
    /// customer since the 1st of the current calendar month.
    pub birthday_used_this_month: bool,
    /// Evaluation instant (month checks, rule validity windows).
    pub now: DateTime<Utc>,
    /// Sale subtotal before any discount.
    pub subtotal: Money,
    /// Priced service lines (products never trigger automatic discounts).
    pub services: &'a [PricedServiceLine],
    /// Operator flag: the customer brought their own product.
    pub bring_own_product: bool,
}

/// One discount the policy decided to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedDiscount {
    pub discount_type: DiscountType,
    pub amount: Money,
    pub description: String,
    /// The originating rule for promotions; automatic types get their rule
    /// attached later, when the per-type rule row is auto-vivified.
    pub rule_id: Option<String>,
}

/// An operator-entered adjustment that passed the reason gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ManualAdjustment {
    pub amount: Money,
    pub reason: String,
}

// =============================================================================
// Automatic Rules (1-4)
// =============================================================================

/// Evaluates the automatic discount rules in policy order.
pub fn automatic_discounts(ctx: &DiscountContext<'_>) -> Vec<AppliedDiscount> {
    let mut applied = Vec::new();

    // Rule 1: sixth visit. The sale being created is visit prior+1.
    let milestone_fired = (ctx.prior_visit_count + 1) % VISIT_MILESTONE_INTERVAL == 0;
    if milestone_fired {
        applied.push(AppliedDiscount {
            discount_type: DiscountType::SixthVisit,
            amount: ctx.subtotal.percentage(VISIT_MILESTONE_BPS),
            description: format!(
                "{}th visit discount (20%)",
                ctx.prior_visit_count + 1
            ),
            rule_id: None,
        });
    }

    // Rule 2: birthday month. Mutually exclusive with rule 1 — at most one
    // of the two 20% discounts per sale.
    if !milestone_fired {
        let is_birth_month = ctx
            .birth_month
            .map(|m| m == ctx.now.month() as i64)
            .unwrap_or(false);

        if is_birth_month && ctx.prior_visit_count >= 1 && !ctx.birthday_used_this_month {
            applied.push(AppliedDiscount {
                discount_type: DiscountType::BirthdayMonth,
                amount: ctx.subtotal.percentage(VISIT_MILESTONE_BPS),
                description: "Birthday month discount (20%)".to_string(),
                rule_id: None,
            });
        }
    }

    // Rule 3: shampoo + another service combo.
    if has_service_combo(ctx.services) && ctx.subtotal.amount() >= SERVICE_COMBO_MIN_SUBTOTAL {
        applied.push(AppliedDiscount {
            discount_type: DiscountType::ServiceCombo,
            amount: Money::new(SERVICE_COMBO_AMOUNT),
            description: "Shampoo + service combo discount".to_string(),
            rule_id: None,
        });
    }

    // Rule 4: bring your own product.
    if ctx.bring_own_product && ctx.subtotal.amount() >= BRING_OWN_PRODUCT_MIN_SUBTOTAL {
        applied.push(AppliedDiscount {
            discount_type: DiscountType::BringOwnProduct,
            amount: Money::new(BRING_OWN_PRODUCT_AMOUNT),
            description: "Bring-your-own-product discount".to_string(),
            rule_id: None,
        });
    }

    applied
}

/// The combo requires at least one shampoo-named service and at least one
/// other service on the same sale.
fn has_service_combo(services: &[PricedServiceLine]) -> bool {
    let has_shampoo = services
        .iter()
        .any(|l| l.service_name.to_lowercase().contains(SHAMPOO_KEYWORD));
    let has_other = services
        .iter()
        .any(|l| !l.service_name.to_lowercase().contains(SHAMPOO_KEYWORD));

    has_shampoo && has_other
}

// =============================================================================
// Manual Adjustment Gate (Rule 5)
// =============================================================================

/// Gates an operator-entered discount or increment.
///
/// Returns `None` when the amount is not positive OR the reason is blank
/// after trimming. The blank-reason case is a silent drop, never an error:
/// the operator simply doesn't get the adjustment without writing down why.
pub fn manual_adjustment(amount: i64, reason: &str) -> Option<ManualAdjustment> {
    let reason = reason.trim();
    if amount <= 0 || reason.is_empty() {
        return None;
    }

    Some(ManualAdjustment {
        amount: Money::new(amount),
        reason: reason.to_string(),
    })
}

// =============================================================================
// Promotional Rules (Rule 6)
// =============================================================================

/// Evaluates every configurable promotional rule against the sale.
///
/// For each rule valid at `ctx.now`:
/// - eligible amount = full subtotal, or the scoped services' line totals
/// - min-purchase gate on the subtotal
/// - percentage (basis points) or flat amount
/// - clamped to the rule's max cap and to the eligible amount
/// - dropped entirely when the result is not positive
pub fn promotional_discounts(
    rules: &[ScopedRule],
    ctx: &DiscountContext<'_>,
) -> Vec<AppliedDiscount> {
    let mut applied = Vec::new();

    for scoped in rules {
        let rule = &scoped.rule;

        if !rule.is_active || !rule.is_valid_at(ctx.now) {
            continue;
        }

        let eligible = if rule.apply_to_all_services {
            ctx.subtotal
        } else {
            ctx.services
                .iter()
                .filter(|l| scoped.service_ids.contains(&l.service_id))
                .map(|l| l.line_total)
                .sum()
        };

        if !eligible.is_positive() {
            continue;
        }

        if let Some(min) = rule.min_purchase {
            if ctx.subtotal.amount() < min {
                continue;
            }
        }

        let mut amount = if rule.is_percentage {
            // The value column carries no range CHECK; an out-of-range
            // operator entry must not wrap into a huge percentage
            eligible.percentage(u32::try_from(rule.value).unwrap_or(0))
        } else {
            Money::new(rule.value)
        };

        if let Some(cap) = rule.max_cap {
            amount = amount.min(Money::new(cap));
        }
        amount = amount.min(eligible);

        if !amount.is_positive() {
            continue;
        }

        applied.push(AppliedDiscount {
            discount_type: DiscountType::Promotion,
            amount,
            description: rule.name.clone(),
            rule_id: Some(rule.id.clone()),
        });
    }

    applied
}

// =============================================================================
// Edit Policy
// =============================================================================

/// The discounts an edit keeps, verbatim.
///
/// Create recomputes every discount from scratch; edit preserves the
/// automatic rows exactly as they were granted and only lets the manual
/// adjustment change. Changing line items on an edit must not retroactively
/// grant or revoke a one-time discount (sixth visit, birthday month), so
/// this asymmetry is policy, not a missed recomputation path. Revisit here
/// if that ever changes.
pub fn retained_on_edit(existing: &[SaleDiscount]) -> Vec<SaleDiscount> {
    existing
        .iter()
        .filter(|d| d.discount_type.is_automatic())
        .cloned()
        .collect()
}

// =============================================================================
// Totals
// =============================================================================

/// Computes the final amount: `max(0, subtotal - discounts + increment)`.
pub fn final_amount(subtotal: Money, discount_total: Money, manual_increment: Money) -> Money {
    (subtotal - discount_total + manual_increment).clamp_non_negative()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiscountRule;
    use chrono::TimeZone;

    fn line(service_id: &str, name: &str, total: i64) -> PricedServiceLine {
        PricedServiceLine {
            service_id: service_id.to_string(),
            service_name: name.to_string(),
            quantity: 1,
            unit_price: Money::new(total),
            line_total: Money::new(total),
            is_child: false,
            is_combined: false,
            add_shampoo: false,
        }
    }

    fn ctx<'a>(
        prior_visits: i64,
        birth_month: Option<i64>,
        subtotal: i64,
        services: &'a [PricedServiceLine],
    ) -> DiscountContext<'a> {
        DiscountContext {
            prior_visit_count: prior_visits,
            birth_month,
            birthday_used_this_month: false,
            // Fixed date: June 15th
            now: Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap(),
            subtotal: Money::new(subtotal),
            services,
            bring_own_product: false,
        }
    }

    #[test]
    fn test_sixth_visit_fires_on_every_sixth() {
        let services = [line("s1", "Cut", 10000)];

        // 5 prior visits -> this is visit 6
        let applied = automatic_discounts(&ctx(5, None, 10000, &services));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].discount_type, DiscountType::SixthVisit);
        assert_eq!(applied[0].amount.amount(), 2000);

        // 11 prior visits -> visit 12, fires again
        let applied = automatic_discounts(&ctx(11, None, 10000, &services));
        assert_eq!(applied[0].discount_type, DiscountType::SixthVisit);

        // 4 prior visits -> visit 5, nothing
        let applied = automatic_discounts(&ctx(4, None, 10000, &services));
        assert!(applied.is_empty());
    }

    #[test]
    fn test_birthday_month_requires_prior_visit_and_month_match() {
        let services = [line("s1", "Cut", 10000)];

        // Birth month June, ctx is June, 1 prior visit
        let applied = automatic_discounts(&ctx(1, Some(6), 10000, &services));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].discount_type, DiscountType::BirthdayMonth);
        assert_eq!(applied[0].amount.amount(), 2000);

        // First-ever visit: no birthday discount
        let applied = automatic_discounts(&ctx(0, Some(6), 10000, &services));
        assert!(applied.is_empty());

        // Wrong month
        let applied = automatic_discounts(&ctx(1, Some(7), 10000, &services));
        assert!(applied.is_empty());

        // No birth month on file
        let applied = automatic_discounts(&ctx(1, None, 10000, &services));
        assert!(applied.is_empty());
    }

    #[test]
    fn test_birthday_blocked_when_used_this_month() {
        let services = [line("s1", "Cut", 10000)];
        let mut c = ctx(1, Some(6), 10000, &services);
        c.birthday_used_this_month = true;

        assert!(automatic_discounts(&c).is_empty());
    }

    #[test]
    fn test_sixth_visit_and_birthday_are_mutually_exclusive() {
        // 5 prior visits AND birth month matches: only the milestone fires
        let services = [line("s1", "Cut", 10000)];
        let applied = automatic_discounts(&ctx(5, Some(6), 10000, &services));

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].discount_type, DiscountType::SixthVisit);
    }

    #[test]
    fn test_service_combo() {
        let services = [line("s1", "Shampoo", 3000), line("s2", "Cut", 10000)];
        let applied = automatic_discounts(&ctx(0, None, 13000, &services));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].discount_type, DiscountType::ServiceCombo);
        assert_eq!(applied[0].amount.amount(), SERVICE_COMBO_AMOUNT);

        // Shampoo alone: no combo
        let solo = [line("s1", "Shampoo", 3000)];
        assert!(automatic_discounts(&ctx(0, None, 3000, &solo)).is_empty());

        // Below the subtotal gate
        let cheap = [line("s1", "Shampoo", 500), line("s2", "Cut", 1000)];
        assert!(automatic_discounts(&ctx(0, None, 1500, &cheap)).is_empty());
    }

    #[test]
    fn test_bring_own_product() {
        let services = [line("s1", "Cut", 10000)];
        let mut c = ctx(0, None, 10000, &services);
        c.bring_own_product = true;

        let applied = automatic_discounts(&c);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].discount_type, DiscountType::BringOwnProduct);
        assert_eq!(applied[0].amount.amount(), BRING_OWN_PRODUCT_AMOUNT);

        // Below the subtotal gate
        let small = [line("s1", "Cut", 900)];
        let mut c = ctx(0, None, 900, &small);
        c.bring_own_product = true;
        assert!(automatic_discounts(&c).is_empty());
    }

    #[test]
    fn test_manual_adjustment_gate() {
        assert!(manual_adjustment(1000, "VIP customer").is_some());
        // Blank reason silently drops the adjustment, any amount
        assert!(manual_adjustment(1000, "").is_none());
        assert!(manual_adjustment(1000, "   ").is_none());
        assert!(manual_adjustment(0, "reason").is_none());
        assert!(manual_adjustment(-500, "reason").is_none());

        let adj = manual_adjustment(500, "  regular  ").unwrap();
        assert_eq!(adj.reason, "regular");
        assert_eq!(adj.amount.amount(), 500);
    }

    fn promo_rule(is_percentage: bool, value: i64) -> DiscountRule {
        let now = Utc::now();
        DiscountRule {
            id: "r-1".to_string(),
            name: "Spring promo".to_string(),
            discount_type: DiscountType::Promotion,
            is_percentage,
            value,
            min_purchase: None,
            max_cap: None,
            valid_from: None,
            valid_until: None,
            apply_to_all_services: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_promotion_percentage_and_flat() {
        let services = [line("s1", "Cut", 10000)];
        let c = ctx(0, None, 10000, &services);

        // 10% of full subtotal
        let rules = [ScopedRule {
            rule: promo_rule(true, 1000),
            service_ids: vec![],
        }];
        let applied = promotional_discounts(&rules, &c);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].amount.amount(), 1000);
        assert_eq!(applied[0].discount_type, DiscountType::Promotion);

        // Flat 3000
        let rules = [ScopedRule {
            rule: promo_rule(false, 3000),
            service_ids: vec![],
        }];
        let applied = promotional_discounts(&rules, &c);
        assert_eq!(applied[0].amount.amount(), 3000);
    }

    #[test]
    fn test_promotion_scoped_services() {
        let services = [line("s1", "Cut", 10000), line("s2", "Perm", 50000)];
        let c = ctx(0, None, 60000, &services);

        // 10% scoped to the perm only
        let mut rule = promo_rule(true, 1000);
        rule.apply_to_all_services = false;
        let rules = [ScopedRule {
            rule,
            service_ids: vec!["s2".to_string()],
        }];

        let applied = promotional_discounts(&rules, &c);
        assert_eq!(applied[0].amount.amount(), 5000);

        // Scope matches nothing: rule is skipped
        let mut rule = promo_rule(true, 1000);
        rule.apply_to_all_services = false;
        let rules = [ScopedRule {
            rule,
            service_ids: vec!["s9".to_string()],
        }];
        assert!(promotional_discounts(&rules, &c).is_empty());
    }

    #[test]
    fn test_promotion_min_purchase_and_caps() {
        let services = [line("s1", "Cut", 10000)];
        let c = ctx(0, None, 10000, &services);

        // Min purchase above subtotal: skipped
        let mut rule = promo_rule(true, 1000);
        rule.min_purchase = Some(20000);
        let rules = [ScopedRule {
            rule,
            service_ids: vec![],
        }];
        assert!(promotional_discounts(&rules, &c).is_empty());

        // Max cap clamps the amount
        let mut rule = promo_rule(true, 5000); // 50% = 5000
        rule.max_cap = Some(3000);
        let rules = [ScopedRule {
            rule,
            service_ids: vec![],
        }];
        assert_eq!(promotional_discounts(&rules, &c)[0].amount.amount(), 3000);

        // Flat amount larger than eligible clamps to eligible
        let rule = promo_rule(false, 99999);
        let rules = [ScopedRule {
            rule,
            service_ids: vec![],
        }];
        assert_eq!(promotional_discounts(&rules, &c)[0].amount.amount(), 10000);

        // A negative percentage value yields nothing instead of wrapping
        // into a huge unsigned percentage
        let rule = promo_rule(true, -1000);
        let rules = [ScopedRule {
            rule,
            service_ids: vec![],
        }];
        assert!(promotional_discounts(&rules, &c).is_empty());

        // Expired rule is skipped
        let mut rule = promo_rule(true, 1000);
        rule.valid_until = Some(c.now - chrono::Duration::days(1));
        let rules = [ScopedRule {
            rule,
            service_ids: vec![],
        }];
        assert!(promotional_discounts(&rules, &c).is_empty());
    }

    #[test]
    fn test_retained_on_edit_keeps_automatic_only() {
        let now = Utc::now();
        let make = |t: DiscountType| SaleDiscount {
            id: format!("{:?}", t),
            sale_id: "sale-1".to_string(),
            rule_id: None,
            discount_type: t,
            amount: 1000,
            description: String::new(),
            position: 0,
            created_at: now,
        };

        let existing = vec![
            make(DiscountType::SixthVisit),
            make(DiscountType::Manual),
            make(DiscountType::Promotion),
        ];

        let kept = retained_on_edit(&existing);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| d.discount_type.is_automatic()));
    }

    #[test]
    fn test_final_amount_floors_at_zero() {
        assert_eq!(
            final_amount(Money::new(10000), Money::new(2000), Money::zero()).amount(),
            8000
        );
        assert_eq!(
            final_amount(Money::new(1000), Money::new(5000), Money::zero()).amount(),
            0
        );
        assert_eq!(
            final_amount(Money::new(10000), Money::new(2000), Money::new(500)).amount(),
            8500
        );
    }
}
