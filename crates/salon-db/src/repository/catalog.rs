//! # Catalog Repository
//!
//! Database operations for services, products and staff, including the
//! inventory ledger.
//!
//! ## Inventory Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Guarded Stock Movements                                │
//! │                                                                         │
//! │  reserve_stock(product, qty)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products                                                       │
//! │     SET stock_quantity = stock_quantity - qty                          │
//! │   WHERE id = ? AND stock_quantity >= qty    ← the guard                │
//! │       │                                                                 │
//! │       ├── rows_affected = 1 → Reserved                                 │
//! │       └── rows_affected = 0 → Insufficient { available }               │
//! │                                                                         │
//! │  The guard makes check-and-decrement one atomic statement: two         │
//! │  concurrent sales can never both take the last unit. Committed stock   │
//! │  is never negative (a CHECK constraint backs this up).                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use salon_core::{Product, Service, Staff};

/// Outcome of a guarded stock reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockReservation {
    /// The decrement was applied.
    Reserved,
    /// Not enough stock; nothing was changed.
    Insufficient { available: i64 },
}

// =============================================================================
// Services
// =============================================================================

/// Gets a service by ID.
pub async fn get_service(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Service>> {
    let service = sqlx::query_as::<_, Service>(
        r#"
        SELECT id, name, single_price, child_price, combined_price,
               child_combined_price, is_active, created_at, updated_at
        FROM services
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(service)
}

/// Inserts a service.
pub async fn insert_service(conn: &mut SqliteConnection, service: &Service) -> DbResult<()> {
    debug!(id = %service.id, name = %service.name, "Inserting service");

    sqlx::query(
        r#"
        INSERT INTO services (
            id, name, single_price, child_price, combined_price,
            child_combined_price, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&service.id)
    .bind(&service.name)
    .bind(service.single_price)
    .bind(service.child_price)
    .bind(service.combined_price)
    .bind(service.child_combined_price)
    .bind(service.is_active)
    .bind(service.created_at)
    .bind(service.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Products
// =============================================================================

/// Gets a product by ID.
pub async fn get_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, price, stock_quantity, is_active, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Inserts a product.
pub async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, name = %product.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, price, stock_quantity, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.stock_quantity)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Atomically decrements stock if enough is available.
///
/// Never leaves stock partially decremented: either the whole quantity is
/// reserved or nothing changes and the caller learns how much was left.
pub async fn reserve_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<StockReservation> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?1, updated_at = ?2
        WHERE id = ?3 AND stock_quantity >= ?1
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_one(&mut *conn)
                .await?;

        debug!(
            product_id = %product_id,
            requested = quantity,
            available,
            "Stock reservation refused"
        );

        return Ok(StockReservation::Insufficient { available });
    }

    debug!(product_id = %product_id, quantity, "Stock reserved");
    Ok(StockReservation::Reserved)
}

/// Returns previously reserved stock (delete / line replacement paths).
pub async fn release_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    debug!(product_id = %product_id, quantity, "Releasing stock");

    sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?1, updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Staff
// =============================================================================

/// Gets a staff member by ID.
pub async fn get_staff(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, name, is_active, created_at FROM staff WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(staff)
}

/// Inserts a staff member.
pub async fn insert_staff(conn: &mut SqliteConnection, staff: &Staff) -> DbResult<()> {
    sqlx::query("INSERT INTO staff (id, name, is_active, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&staff.id)
        .bind(&staff.name)
        .bind(staff.is_active)
        .bind(staff.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
