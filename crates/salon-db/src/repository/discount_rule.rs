//! # Discount Rule Repository
//!
//! Database operations for configurable discount rules.
//!
//! ## Rule Auto-Vivification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  First time a sixth-visit discount fires:                               │
//! │                                                                         │
//! │  ensure_automatic(SixthVisit)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... ON CONFLICT DO NOTHING   ← idempotent upsert               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT the active row                                                 │
//! │                                                                         │
//! │  A partial unique index (one active row per automatic type) turns the  │
//! │  old check-then-create race into a single harmless no-op insert: two   │
//! │  concurrent sales both end up pointing at the same rule row.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules are soft-deleted (renamed + deactivated) so the sale_discounts
//! rows of historical sales keep a resolvable reference.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use salon_core::discount::{
    BRING_OWN_PRODUCT_AMOUNT, SERVICE_COMBO_AMOUNT, VISIT_MILESTONE_BPS,
};
use salon_core::{DiscountRule, DiscountType, ScopedRule};

const RULE_COLUMNS: &str = "id, name, discount_type, is_percentage, value, min_purchase, \
     max_cap, valid_from, valid_until, apply_to_all_services, is_active, created_at, updated_at";

/// Default configuration for an auto-vivified rule row.
fn automatic_defaults(discount_type: DiscountType) -> (&'static str, bool, i64) {
    match discount_type {
        DiscountType::SixthVisit => ("Sixth visit discount", true, VISIT_MILESTONE_BPS as i64),
        DiscountType::BirthdayMonth => {
            ("Birthday month discount", true, VISIT_MILESTONE_BPS as i64)
        }
        DiscountType::ServiceCombo => ("Shampoo + service combo", false, SERVICE_COMBO_AMOUNT),
        DiscountType::BringOwnProduct => {
            ("Bring-your-own-product", false, BRING_OWN_PRODUCT_AMOUNT)
        }
        // The manual rule row only anchors sale_discounts references;
        // its value is per-sale.
        DiscountType::Manual => ("Manual discount", false, 0),
        DiscountType::Promotion => ("Promotion", false, 0),
    }
}

/// Ensures the single active rule row for an automatic type exists and
/// returns it.
///
/// Idempotent: concurrent callers race into `ON CONFLICT DO NOTHING` and
/// then read the same row.
pub async fn ensure_automatic(
    conn: &mut SqliteConnection,
    discount_type: DiscountType,
) -> DbResult<DiscountRule> {
    let (name, is_percentage, value) = automatic_defaults(discount_type);
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO discount_rules (
            id, name, discount_type, is_percentage, value,
            apply_to_all_services, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 1, 1, ?6, ?7)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(discount_type)
    .bind(is_percentage)
    .bind(value)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let rule = sqlx::query_as::<_, DiscountRule>(&format!(
        "SELECT {RULE_COLUMNS} FROM discount_rules \
         WHERE discount_type = ?1 AND is_active = 1 LIMIT 1"
    ))
    .bind(discount_type)
    .fetch_one(&mut *conn)
    .await?;

    Ok(rule)
}

/// Inserts a rule (promotions; automatic rows use [`ensure_automatic`]).
pub async fn insert(conn: &mut SqliteConnection, rule: &DiscountRule) -> DbResult<()> {
    debug!(id = %rule.id, name = %rule.name, "Inserting discount rule");

    sqlx::query(
        r#"
        INSERT INTO discount_rules (
            id, name, discount_type, is_percentage, value, min_purchase,
            max_cap, valid_from, valid_until, apply_to_all_services,
            is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&rule.id)
    .bind(&rule.name)
    .bind(rule.discount_type)
    .bind(rule.is_percentage)
    .bind(rule.value)
    .bind(rule.min_purchase)
    .bind(rule.max_cap)
    .bind(rule.valid_from)
    .bind(rule.valid_until)
    .bind(rule.apply_to_all_services)
    .bind(rule.is_active)
    .bind(rule.created_at)
    .bind(rule.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Replaces the explicit service scope of a promotion.
pub async fn set_scope(
    conn: &mut SqliteConnection,
    rule_id: &str,
    service_ids: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM discount_rule_services WHERE rule_id = ?1")
        .bind(rule_id)
        .execute(&mut *conn)
        .await?;

    for service_id in service_ids {
        sqlx::query("INSERT INTO discount_rule_services (rule_id, service_id) VALUES (?1, ?2)")
            .bind(rule_id)
            .bind(service_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Fetches all active promotional rules with their service scopes.
///
/// Validity-window filtering happens in the discount engine, not here, so
/// the window check has exactly one implementation.
pub async fn find_active_promotions(conn: &mut SqliteConnection) -> DbResult<Vec<ScopedRule>> {
    let rules = sqlx::query_as::<_, DiscountRule>(&format!(
        "SELECT {RULE_COLUMNS} FROM discount_rules \
         WHERE discount_type = 'promotion' AND is_active = 1 \
         ORDER BY created_at"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut scoped = Vec::with_capacity(rules.len());
    for rule in rules {
        let service_ids: Vec<String> = if rule.apply_to_all_services {
            Vec::new()
        } else {
            sqlx::query_scalar("SELECT service_id FROM discount_rule_services WHERE rule_id = ?1")
                .bind(&rule.id)
                .fetch_all(&mut *conn)
                .await?
        };

        scoped.push(ScopedRule { rule, service_ids });
    }

    Ok(scoped)
}

/// Soft-deletes a rule: renamed and deactivated, never removed.
///
/// Historical sale_discounts rows keep pointing at the row; the rename
/// keeps the old name available for a replacement rule.
pub async fn deactivate(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE discount_rules
        SET is_active = 0, name = name || ' (deleted)', updated_at = ?1
        WHERE id = ?2 AND is_active = 1
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("DiscountRule", id));
    }

    Ok(())
}
