//! # Sale Repository
//!
//! Database operations for sales and their child rows.
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Aggregate                                    │
//! │                                                                         │
//! │  sales ─┬── sale_services          (line items, replaced as a set)     │
//! │         ├── sale_products          (line items, mirror stock moves)    │
//! │         ├── sale_discounts         (ordered by position)               │
//! │         ├── sale_payments          (must sum to final_amount)          │
//! │         ├── sale_staff             (staff_id XOR custom_name)          │
//! │         ├── sale_adjustments       (manual discount/increment audit)   │
//! │         └── customer_discount_usages                                   │
//! │                                                                         │
//! │  All child tables cascade on sale delete: one DELETE statement         │
//! │  removes the whole aggregate.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orchestration (pricing, discounts, stock, reconciliation) lives in the
//! sale service; this module is plain SQL.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use salon_core::{
    AdjustmentKind, DiscountType, DiscountUsage, Sale, SaleAdjustment, SaleDiscount,
    SalePayment, SaleProductLine, SaleServiceLine, SaleStaff,
};

const SALE_COLUMNS: &str = "id, customer_id, sale_date, total_amount, discount_amount, \
     manual_increment, final_amount, loyalty_points_earned, notes, is_completed, \
     payment_method, birthday_discount_applied, bring_own_product_applied, \
     created_at, updated_at";

// =============================================================================
// Sale Row
// =============================================================================

/// Gets a sale by ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

/// Inserts a sale row.
pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, customer_id = %sale.customer_id, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, customer_id, sale_date, total_amount, discount_amount,
            manual_increment, final_amount, loyalty_points_earned, notes,
            is_completed, payment_method, birthday_discount_applied,
            bring_own_product_applied, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(sale.sale_date)
    .bind(sale.total_amount)
    .bind(sale.discount_amount)
    .bind(sale.manual_increment)
    .bind(sale.final_amount)
    .bind(sale.loyalty_points_earned)
    .bind(&sale.notes)
    .bind(sale.is_completed)
    .bind(sale.payment_method)
    .bind(sale.birthday_discount_applied)
    .bind(sale.bring_own_product_applied)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Rewrites the mutable columns of a sale row.
pub async fn update(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, final_amount = sale.final_amount, "Updating sale");

    sqlx::query(
        r#"
        UPDATE sales SET
            sale_date = ?1, total_amount = ?2, discount_amount = ?3,
            manual_increment = ?4, final_amount = ?5, loyalty_points_earned = ?6,
            notes = ?7, payment_method = ?8, birthday_discount_applied = ?9,
            bring_own_product_applied = ?10, updated_at = ?11
        WHERE id = ?12
        "#,
    )
    .bind(sale.sale_date)
    .bind(sale.total_amount)
    .bind(sale.discount_amount)
    .bind(sale.manual_increment)
    .bind(sale.final_amount)
    .bind(sale.loyalty_points_earned)
    .bind(&sale.notes)
    .bind(sale.payment_method)
    .bind(sale.birthday_discount_applied)
    .bind(sale.bring_own_product_applied)
    .bind(sale.updated_at)
    .bind(&sale.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes a sale. Child rows cascade. Returns whether a row existed.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Marks a sale completed. Returns whether a row existed.
pub async fn mark_completed(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let result = sqlx::query("UPDATE sales SET is_completed = 1, updated_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Most recent sale date of a customer, if any sales remain.
pub async fn latest_sale_date(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Option<DateTime<Utc>>> {
    let latest: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MAX(sale_date) FROM sales WHERE customer_id = ?1")
            .bind(customer_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(latest)
}

// =============================================================================
// Service Lines
// =============================================================================

pub async fn insert_service_line(
    conn: &mut SqliteConnection,
    line: &SaleServiceLine,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_services (
            id, sale_id, service_id, quantity, unit_price, line_total,
            is_child, is_combined, add_shampoo, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.service_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.line_total)
    .bind(line.is_child)
    .bind(line.is_combined)
    .bind(line.add_shampoo)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn service_lines(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleServiceLine>> {
    let lines = sqlx::query_as::<_, SaleServiceLine>(
        r#"
        SELECT id, sale_id, service_id, quantity, unit_price, line_total,
               is_child, is_combined, add_shampoo, created_at
        FROM sale_services
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

pub async fn delete_service_lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_services WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Product Lines
// =============================================================================

pub async fn insert_product_line(
    conn: &mut SqliteConnection,
    line: &SaleProductLine,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_products (
            id, sale_id, product_id, quantity, unit_price, line_total, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.line_total)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn product_lines(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleProductLine>> {
    let lines = sqlx::query_as::<_, SaleProductLine>(
        r#"
        SELECT id, sale_id, product_id, quantity, unit_price, line_total, created_at
        FROM sale_products
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

pub async fn delete_product_lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_products WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Discounts
// =============================================================================

pub async fn insert_discount(conn: &mut SqliteConnection, discount: &SaleDiscount) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_discounts (
            id, sale_id, rule_id, discount_type, amount, description,
            position, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&discount.id)
    .bind(&discount.sale_id)
    .bind(&discount.rule_id)
    .bind(discount.discount_type)
    .bind(discount.amount)
    .bind(&discount.description)
    .bind(discount.position)
    .bind(discount.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn discounts(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleDiscount>> {
    let rows = sqlx::query_as::<_, SaleDiscount>(
        r#"
        SELECT id, sale_id, rule_id, discount_type, amount, description,
               position, created_at
        FROM sale_discounts
        WHERE sale_id = ?1
        ORDER BY position
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn delete_discounts_of_type(
    conn: &mut SqliteConnection,
    sale_id: &str,
    discount_type: DiscountType,
) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_discounts WHERE sale_id = ?1 AND discount_type = ?2")
        .bind(sale_id)
        .bind(discount_type)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Discount Usages
// =============================================================================

pub async fn insert_usage(conn: &mut SqliteConnection, usage: &DiscountUsage) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO customer_discount_usages (
            id, customer_id, sale_id, discount_type, amount, used_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&usage.id)
    .bind(&usage.customer_id)
    .bind(&usage.sale_id)
    .bind(usage.discount_type)
    .bind(usage.amount)
    .bind(usage.used_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete_usages_of_type(
    conn: &mut SqliteConnection,
    sale_id: &str,
    discount_type: DiscountType,
) -> DbResult<()> {
    sqlx::query("DELETE FROM customer_discount_usages WHERE sale_id = ?1 AND discount_type = ?2")
        .bind(sale_id)
        .bind(discount_type)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Payments
// =============================================================================

pub async fn insert_payment(conn: &mut SqliteConnection, payment: &SalePayment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_payments (id, sale_id, method, amount, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.method)
    .bind(payment.amount)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn payments(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SalePayment>> {
    let rows = sqlx::query_as::<_, SalePayment>(
        r#"
        SELECT id, sale_id, method, amount, created_at
        FROM sale_payments
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn delete_payments(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_payments WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Staff Attribution
// =============================================================================

pub async fn insert_staff(conn: &mut SqliteConnection, staff: &SaleStaff) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_staff (id, sale_id, staff_id, custom_name, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&staff.id)
    .bind(&staff.sale_id)
    .bind(&staff.staff_id)
    .bind(&staff.custom_name)
    .bind(staff.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn staff_rows(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleStaff>> {
    let rows = sqlx::query_as::<_, SaleStaff>(
        r#"
        SELECT id, sale_id, staff_id, custom_name, created_at
        FROM sale_staff
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn delete_staff(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_staff WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Adjustments
// =============================================================================

pub async fn insert_adjustment(
    conn: &mut SqliteConnection,
    adjustment: &SaleAdjustment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_adjustments (id, sale_id, kind, amount, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&adjustment.id)
    .bind(&adjustment.sale_id)
    .bind(adjustment.kind)
    .bind(adjustment.amount)
    .bind(&adjustment.reason)
    .bind(adjustment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn adjustments(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleAdjustment>> {
    let rows = sqlx::query_as::<_, SaleAdjustment>(
        r#"
        SELECT id, sale_id, kind, amount, reason, created_at
        FROM sale_adjustments
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn delete_adjustments_of_kind(
    conn: &mut SqliteConnection,
    sale_id: &str,
    kind: AdjustmentKind,
) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_adjustments WHERE sale_id = ?1 AND kind = ?2")
        .bind(sale_id)
        .bind(kind)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
