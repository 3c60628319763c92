//! # Customer Repository
//!
//! Database operations for customers, including the statistics reconciler.
//!
//! ## Statistics Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Denormalized Customer Aggregates                             │
//! │                                                                         │
//! │  customers.visit_count      ◄── +1 on create, -1 on delete             │
//! │  customers.loyalty_points   ◄── ± points earned by the sale            │
//! │  customers.total_spent      ◄── ± the sale's final amount              │
//! │  customers.last_visit_at    ◄── bumped on create,                      │
//! │                                  recomputed from history on delete     │
//! │                                                                         │
//! │  All deltas are clamped at zero in SQL: repeated deletes can never     │
//! │  drive an aggregate negative.                                          │
//! │                                                                         │
//! │  The delta is applied in the SAME transaction as the sale write, so    │
//! │  a failed sale never moves the aggregates.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use salon_core::{Customer, DiscountType};

/// Signed adjustment to a customer's rolling statistics.
#[derive(Debug, Clone, Default)]
pub struct StatsDelta {
    pub visits: i64,
    pub points: i64,
    pub spent: i64,
    /// When set, becomes the new last visit timestamp. `None` leaves the
    /// stored value alone (deletes recompute it separately).
    pub last_visit_at: Option<DateTime<Utc>>,
}

const CUSTOMER_COLUMNS: &str = "id, name, phone, birth_month, birth_day, visit_count, \
     loyalty_points, total_spent, last_visit_at, is_active, created_at, updated_at";

/// Gets a customer by ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Inserts a customer.
pub async fn insert(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, name = %customer.name, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, phone, birth_month, birth_day,
            visit_count, loyalty_points, total_spent, last_visit_at,
            is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(customer.birth_month)
    .bind(customer.birth_day)
    .bind(customer.visit_count)
    .bind(customer.loyalty_points)
    .bind(customer.total_spent)
    .bind(customer.last_visit_at)
    .bind(customer.is_active)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Applies a signed statistics delta, clamped at zero.
///
/// The clamping happens in SQL so concurrent writers can never observe an
/// intermediate negative aggregate.
pub async fn apply_stats_delta(
    conn: &mut SqliteConnection,
    customer_id: &str,
    delta: &StatsDelta,
) -> DbResult<()> {
    debug!(
        customer_id = %customer_id,
        visits = delta.visits,
        points = delta.points,
        spent = delta.spent,
        "Applying customer stats delta"
    );

    sqlx::query(
        r#"
        UPDATE customers SET
            visit_count    = MAX(0, visit_count + ?1),
            loyalty_points = MAX(0, loyalty_points + ?2),
            total_spent    = MAX(0, total_spent + ?3),
            last_visit_at  = COALESCE(?4, last_visit_at),
            updated_at     = ?5
        WHERE id = ?6
        "#,
    )
    .bind(delta.visits)
    .bind(delta.points)
    .bind(delta.spent)
    .bind(delta.last_visit_at)
    .bind(Utc::now())
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrites the last visit timestamp (including clearing it).
///
/// Used by the delete path, which recomputes the value from the remaining
/// sale history instead of guessing.
pub async fn set_last_visit(
    conn: &mut SqliteConnection,
    customer_id: &str,
    last_visit_at: Option<DateTime<Utc>>,
) -> DbResult<()> {
    sqlx::query("UPDATE customers SET last_visit_at = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(last_visit_at)
        .bind(Utc::now())
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Counts usages of a discount type by this customer since `since`.
///
/// Backs the "birthday discount at most once per calendar month" check.
/// Usage rows cascade-delete with their sale, so a deleted sale gives the
/// allowance back automatically.
pub async fn discount_usage_count_since(
    conn: &mut SqliteConnection,
    customer_id: &str,
    discount_type: DiscountType,
    since: DateTime<Utc>,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM customer_discount_usages
        WHERE customer_id = ?1 AND discount_type = ?2 AND used_at >= ?3
        "#,
    )
    .bind(customer_id)
    .bind(discount_type)
    .bind(since)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}
