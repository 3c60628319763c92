//! # Sale Service
//!
//! Orchestrates the full sale lifecycle on top of salon-core's pure logic
//! and the repository functions.
//!
//! ## One Operation, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SaleService::create()                               │
//! │                                                                         │
//! │  begin transaction                                                      │
//! │       │                                                                 │
//! │       ├── 1. load + check customer (active)                            │
//! │       ├── 2. price service/product lines      (salon-core::pricing)    │
//! │       ├── 3. evaluate discounts in order      (salon-core::discount)   │
//! │       ├── 4. reconcile payments               (salon-core::payment)    │
//! │       ├── 5. insert sale + child rows                                  │
//! │       ├── 6. reserve stock (guarded decrement)                         │
//! │       ├── 7. apply customer statistics delta                           │
//! │       │                                                                 │
//! │  commit ── any error above rolls everything back: stock, stats,        │
//! │            usage history and the sale itself move together.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Create vs Update
//! Create recomputes every discount from the current customer snapshot.
//! Update preserves automatic discount rows verbatim and only lets the
//! manual adjustment, line items, staff, payments and notes change; omitted
//! request fields leave their part of the sale untouched.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::catalog::{self, StockReservation};
use crate::repository::customer::{self, StatsDelta};
use crate::repository::{discount_rule, sale as sale_repo};
use crate::service::request::{
    CreateSaleRequest, ProductSelection, ServiceSelection, StaffSelection, UpdateSaleRequest,
};
use salon_core::discount::{
    automatic_discounts, final_amount, manual_adjustment, promotional_discounts,
    retained_on_edit,
};
use salon_core::payment::allocate;
use salon_core::pricing::{price_product_line, price_service_line, subtotal};
use salon_core::validation::{validate_quantity, validate_selection, validate_uuid};
use salon_core::{
    AdjustmentKind, CoreError, DiscountType, DiscountUsage, Money, PaymentMethod,
    PricedProductLine, PricedServiceLine, Sale, SaleAdjustment, SaleDetail, SaleDiscount,
    SalePayment, SaleProductLine, SaleServiceLine, SaleStaff, ValidationError,
};

// =============================================================================
// Error Type
// =============================================================================

/// Errors from sale operations: domain rules or storage.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for sale operations.
pub type SaleResult<T> = Result<T, SaleError>;

// =============================================================================
// Sale Service
// =============================================================================

/// Orchestrates sale create/update/delete/complete.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
}

impl SaleService {
    /// Creates a new SaleService.
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    /// Records a new sale.
    ///
    /// Prices the selections, evaluates the discount policy against the
    /// customer's history snapshot, reconciles payments, reserves stock
    /// and applies the customer statistics delta - all in one transaction.
    pub async fn create(&self, req: CreateSaleRequest) -> SaleResult<SaleDetail> {
        validate_uuid(&req.customer_id, "customer_id").map_err(CoreError::from)?;

        let selections = req.service_selections();
        let mut tx = self.db.begin().await?;

        let cust = customer::get(&mut tx, &req.customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", req.customer_id.as_str()))?;
        if !cust.is_active {
            return Err(CoreError::inactive("Customer", cust.id.as_str()).into());
        }

        let priced_services = price_services(&mut tx, &selections).await?;
        let priced_products = price_products(&mut tx, &req.products).await?;
        validate_selection(priced_services.len(), priced_products.len())
            .map_err(CoreError::from)?;

        let sale_subtotal = subtotal(&priced_services, &priced_products);
        let sale_date = req.sale_date.unwrap_or_else(Utc::now);

        // History snapshot for the birthday-month once-per-month gate.
        // Usage rows cascade-delete with their sale, so a deleted sale
        // gives the allowance back.
        let birthday_used = customer::discount_usage_count_since(
            &mut tx,
            &cust.id,
            DiscountType::BirthdayMonth,
            month_start(sale_date),
        )
        .await?
            > 0;

        let ctx = salon_core::DiscountContext {
            prior_visit_count: cust.visit_count,
            birth_month: cust.birth_month,
            birthday_used_this_month: birthday_used,
            now: sale_date,
            subtotal: sale_subtotal,
            services: &priced_services,
            bring_own_product: req.bring_own_product,
        };

        let automatic = automatic_discounts(&ctx);
        let manual = req
            .manual_discount
            .as_ref()
            .and_then(|input| manual_adjustment(input.amount, &input.reason));
        let increment = req
            .manual_increment
            .as_ref()
            .and_then(|input| manual_adjustment(input.amount, &input.reason));
        let promotions =
            promotional_discounts(&discount_rule::find_active_promotions(&mut tx).await?, &ctx);

        let auto_total: Money = automatic.iter().map(|d| d.amount).sum();
        let promo_total: Money = promotions.iter().map(|d| d.amount).sum();
        let manual_total = manual.as_ref().map(|m| m.amount).unwrap_or_else(Money::zero);
        let increment_total = increment
            .as_ref()
            .map(|m| m.amount)
            .unwrap_or_else(Money::zero);

        let discount_total = auto_total + manual_total + promo_total;
        let final_total = final_amount(sale_subtotal, discount_total, increment_total);
        let points = final_total.loyalty_points();

        let allocated = allocate(final_total, req.payment_method.as_deref(), &req.payments)?;
        let legacy_method = allocated.first().map(|p| p.method).unwrap_or_else(|| {
            PaymentMethod::normalize(req.payment_method.as_deref().unwrap_or("CASH"))
        });

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            customer_id: cust.id.clone(),
            sale_date,
            total_amount: sale_subtotal.amount(),
            discount_amount: discount_total.amount(),
            manual_increment: increment_total.amount(),
            final_amount: final_total.amount(),
            loyalty_points_earned: points,
            notes: req.notes.clone(),
            is_completed: false,
            payment_method: legacy_method,
            birthday_discount_applied: automatic
                .iter()
                .any(|d| d.discount_type == DiscountType::BirthdayMonth),
            bring_own_product_applied: automatic
                .iter()
                .any(|d| d.discount_type == DiscountType::BringOwnProduct),
            created_at: now,
            updated_at: now,
        };

        sale_repo::insert(&mut tx, &sale).await?;
        persist_service_lines(&mut tx, &sale.id, &priced_services, now).await?;
        persist_product_lines(&mut tx, &sale.id, &priced_products, now).await?;
        reserve_products(&mut tx, &priced_products).await?;

        // Discount rows in policy order: automatic, manual, promotions.
        // Automatic types resolve their rule row lazily (idempotent upsert).
        let mut position = 0i64;
        for applied in &automatic {
            let rule = discount_rule::ensure_automatic(&mut tx, applied.discount_type).await?;
            record_discount(
                &mut tx,
                &sale,
                applied.discount_type,
                Some(rule.id),
                applied.amount,
                &applied.description,
                position,
                now,
            )
            .await?;
            position += 1;
        }

        if let Some(adj) = &manual {
            let rule = discount_rule::ensure_automatic(&mut tx, DiscountType::Manual).await?;
            record_discount(
                &mut tx,
                &sale,
                DiscountType::Manual,
                Some(rule.id),
                adj.amount,
                &adj.reason,
                position,
                now,
            )
            .await?;
            record_adjustment(&mut tx, &sale.id, AdjustmentKind::ManualDiscount, adj, now)
                .await?;
            position += 1;
        }

        for applied in &promotions {
            record_discount(
                &mut tx,
                &sale,
                DiscountType::Promotion,
                applied.rule_id.clone(),
                applied.amount,
                &applied.description,
                position,
                now,
            )
            .await?;
            position += 1;
        }

        if let Some(adj) = &increment {
            record_adjustment(&mut tx, &sale.id, AdjustmentKind::ManualIncrement, adj, now)
                .await?;
        }

        for payment in &allocated {
            sale_repo::insert_payment(
                &mut tx,
                &SalePayment {
                    id: Uuid::new_v4().to_string(),
                    sale_id: sale.id.clone(),
                    method: payment.method,
                    amount: payment.amount.amount(),
                    created_at: now,
                },
            )
            .await?;
        }

        insert_staff_rows(&mut tx, &sale.id, &req.staff, now).await?;

        // Statistics reconciler: same transaction as the sale write
        customer::apply_stats_delta(
            &mut tx,
            &cust.id,
            &StatsDelta {
                visits: 1,
                points,
                spent: final_total.amount(),
                last_visit_at: Some(sale_date),
            },
        )
        .await?;

        let detail = hydrate(&mut tx, sale).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %detail.sale.id,
            customer_id = %detail.sale.customer_id,
            final_amount = detail.sale.final_amount,
            "Sale created"
        );

        Ok(detail)
    }

    /// Edits an existing sale.
    ///
    /// Omitted fields preserve stored state. Automatic discounts are kept
    /// verbatim (editing line items never retroactively grants or revokes
    /// a one-time discount); only the manual adjustment may be replaced.
    pub async fn update(&self, sale_id: &str, req: UpdateSaleRequest) -> SaleResult<SaleDetail> {
        validate_uuid(sale_id, "sale_id").map_err(CoreError::from)?;

        let mut tx = self.db.begin().await?;

        let mut sale = sale_repo::get(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        let old_final = sale.final_amount;
        let old_points = sale.loyalty_points_earned;
        let now = Utc::now();

        let service_rows = if let Some(selections) = req.service_selections() {
            let priced = price_services(&mut tx, &selections).await?;
            sale_repo::delete_service_lines(&mut tx, &sale.id).await?;
            persist_service_lines(&mut tx, &sale.id, &priced, now).await?
        } else {
            sale_repo::service_lines(&mut tx, &sale.id).await?
        };

        // Replacing product lines releases the old reservations first, so
        // availability is checked against post-release stock.
        let product_rows = if let Some(selections) = &req.products {
            let old_lines = sale_repo::product_lines(&mut tx, &sale.id).await?;
            for line in &old_lines {
                catalog::release_stock(&mut tx, &line.product_id, line.quantity).await?;
            }
            sale_repo::delete_product_lines(&mut tx, &sale.id).await?;

            let priced = price_products(&mut tx, selections).await?;
            reserve_products(&mut tx, &priced).await?;
            persist_product_lines(&mut tx, &sale.id, &priced, now).await?
        } else {
            sale_repo::product_lines(&mut tx, &sale.id).await?
        };

        validate_selection(service_rows.len(), product_rows.len()).map_err(CoreError::from)?;

        let new_subtotal: i64 = service_rows.iter().map(|l| l.line_total).sum::<i64>()
            + product_rows.iter().map(|l| l.line_total).sum::<i64>();

        let existing = sale_repo::discounts(&mut tx, &sale.id).await?;
        let retained = retained_on_edit(&existing);
        let retained_total: i64 = retained.iter().map(|d| d.amount).sum();

        let manual_total = match &req.manual_discount {
            Some(input) => {
                sale_repo::delete_discounts_of_type(&mut tx, &sale.id, DiscountType::Manual)
                    .await?;
                sale_repo::delete_usages_of_type(&mut tx, &sale.id, DiscountType::Manual).await?;
                sale_repo::delete_adjustments_of_kind(
                    &mut tx,
                    &sale.id,
                    AdjustmentKind::ManualDiscount,
                )
                .await?;

                match manual_adjustment(input.amount, &input.reason) {
                    Some(adj) => {
                        let rule =
                            discount_rule::ensure_automatic(&mut tx, DiscountType::Manual).await?;
                        let position =
                            existing.iter().map(|d| d.position + 1).max().unwrap_or(0);
                        record_discount(
                            &mut tx,
                            &sale,
                            DiscountType::Manual,
                            Some(rule.id),
                            adj.amount,
                            &adj.reason,
                            position,
                            now,
                        )
                        .await?;
                        record_adjustment(
                            &mut tx,
                            &sale.id,
                            AdjustmentKind::ManualDiscount,
                            &adj,
                            now,
                        )
                        .await?;
                        adj.amount.amount()
                    }
                    // The reason gate failed: the replacement is silently
                    // nothing, same as on create
                    None => 0,
                }
            }
            None => existing
                .iter()
                .filter(|d| d.discount_type == DiscountType::Manual)
                .map(|d| d.amount)
                .sum(),
        };

        let increment_total = match &req.manual_increment {
            Some(input) => {
                sale_repo::delete_adjustments_of_kind(
                    &mut tx,
                    &sale.id,
                    AdjustmentKind::ManualIncrement,
                )
                .await?;

                match manual_adjustment(input.amount, &input.reason) {
                    Some(adj) => {
                        record_adjustment(
                            &mut tx,
                            &sale.id,
                            AdjustmentKind::ManualIncrement,
                            &adj,
                            now,
                        )
                        .await?;
                        adj.amount.amount()
                    }
                    None => 0,
                }
            }
            None => sale.manual_increment,
        };

        let discount_total = retained_total + manual_total;
        let new_final = final_amount(
            Money::new(new_subtotal),
            Money::new(discount_total),
            Money::new(increment_total),
        );
        let new_points = new_final.loyalty_points();

        if let Some(staff) = &req.staff {
            sale_repo::delete_staff(&mut tx, &sale.id).await?;
            insert_staff_rows(&mut tx, &sale.id, staff, now).await?;
        }

        if let Some(method) = &req.payment_method {
            sale.payment_method = PaymentMethod::normalize(method);
        }

        match &req.payments {
            Some(inputs) => {
                let allocated = allocate(new_final, req.payment_method.as_deref(), inputs)?;
                sale_repo::delete_payments(&mut tx, &sale.id).await?;
                for payment in &allocated {
                    sale_repo::insert_payment(
                        &mut tx,
                        &SalePayment {
                            id: Uuid::new_v4().to_string(),
                            sale_id: sale.id.clone(),
                            method: payment.method,
                            amount: payment.amount.amount(),
                            created_at: now,
                        },
                    )
                    .await?;
                }
                if let Some(first) = allocated.first() {
                    sale.payment_method = first.method;
                }
            }
            None => {
                // No explicit payments but the total moved: rewrite as a
                // single payment so the reconciliation invariant holds
                if new_final.amount() != old_final {
                    sale_repo::delete_payments(&mut tx, &sale.id).await?;
                    if new_final.is_positive() {
                        sale_repo::insert_payment(
                            &mut tx,
                            &SalePayment {
                                id: Uuid::new_v4().to_string(),
                                sale_id: sale.id.clone(),
                                method: sale.payment_method,
                                amount: new_final.amount(),
                                created_at: now,
                            },
                        )
                        .await?;
                    }
                }
            }
        }

        if let Some(date) = req.sale_date {
            sale.sale_date = date;
        }
        if let Some(notes) = &req.notes {
            sale.notes = Some(notes.clone());
        }
        sale.total_amount = new_subtotal;
        sale.discount_amount = discount_total;
        sale.manual_increment = increment_total;
        sale.final_amount = new_final.amount();
        sale.loyalty_points_earned = new_points;
        sale.birthday_discount_applied = retained
            .iter()
            .any(|d| d.discount_type == DiscountType::BirthdayMonth);
        sale.bring_own_product_applied = retained
            .iter()
            .any(|d| d.discount_type == DiscountType::BringOwnProduct);
        sale.updated_at = now;
        sale_repo::update(&mut tx, &sale).await?;

        // Reconcile the customer aggregates with signed deltas; visits and
        // last visit don't move on edit
        let spent_delta = new_final.amount() - old_final;
        let points_delta = new_points - old_points;
        if spent_delta != 0 || points_delta != 0 {
            customer::apply_stats_delta(
                &mut tx,
                &sale.customer_id,
                &StatsDelta {
                    visits: 0,
                    points: points_delta,
                    spent: spent_delta,
                    last_visit_at: None,
                },
            )
            .await?;
        }

        let detail = hydrate(&mut tx, sale).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %detail.sale.id,
            final_amount = detail.sale.final_amount,
            "Sale updated"
        );

        Ok(detail)
    }

    /// Deletes a sale, restoring stock and rolling back its statistics.
    pub async fn delete(&self, sale_id: &str) -> SaleResult<()> {
        let mut tx = self.db.begin().await?;

        let sale = sale_repo::get(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        // Restore stock before the cascade removes the line rows
        let product_lines = sale_repo::product_lines(&mut tx, &sale.id).await?;
        for line in &product_lines {
            catalog::release_stock(&mut tx, &line.product_id, line.quantity).await?;
        }

        sale_repo::delete(&mut tx, &sale.id).await?;

        customer::apply_stats_delta(
            &mut tx,
            &sale.customer_id,
            &StatsDelta {
                visits: -1,
                points: -sale.loyalty_points_earned,
                spent: -sale.final_amount,
                last_visit_at: None,
            },
        )
        .await?;

        // Last visit is recomputed from the remaining history, not guessed;
        // it becomes NULL when this was the only sale
        let latest = sale_repo::latest_sale_date(&mut tx, &sale.customer_id).await?;
        customer::set_last_visit(&mut tx, &sale.customer_id, latest).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(sale_id = %sale.id, customer_id = %sale.customer_id, "Sale deleted");
        Ok(())
    }

    /// Marks a sale completed.
    pub async fn complete(&self, sale_id: &str) -> SaleResult<Sale> {
        let mut tx = self.db.begin().await?;

        if !sale_repo::mark_completed(&mut tx, sale_id).await? {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }
        let sale = sale_repo::get(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(sale_id = %sale.id, "Sale completed");
        Ok(sale)
    }

    /// Fetches the fully hydrated sale aggregate.
    pub async fn get(&self, sale_id: &str) -> SaleResult<SaleDetail> {
        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;

        let sale = sale_repo::get(&mut conn, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        hydrate(&mut conn, sale).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// First instant of the calendar month containing `at`.
fn month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(at)
}

/// Resolves and prices service selections against the catalog.
async fn price_services(
    conn: &mut SqliteConnection,
    selections: &[ServiceSelection],
) -> SaleResult<Vec<PricedServiceLine>> {
    let mut priced = Vec::with_capacity(selections.len());
    for sel in selections {
        validate_quantity(sel.quantity).map_err(CoreError::from)?;

        let service = catalog::get_service(&mut *conn, &sel.service_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Service", sel.service_id.as_str()))?;
        if !service.is_active {
            return Err(CoreError::inactive("Service", sel.service_id.as_str()).into());
        }

        priced.push(price_service_line(
            &service,
            sel.quantity,
            sel.is_child,
            sel.add_shampoo,
        ));
    }
    Ok(priced)
}

/// Resolves and prices product selections against the catalog.
async fn price_products(
    conn: &mut SqliteConnection,
    selections: &[ProductSelection],
) -> SaleResult<Vec<PricedProductLine>> {
    let mut priced = Vec::with_capacity(selections.len());
    for sel in selections {
        validate_quantity(sel.quantity).map_err(CoreError::from)?;

        let product = catalog::get_product(&mut *conn, &sel.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", sel.product_id.as_str()))?;
        if !product.is_active {
            return Err(CoreError::inactive("Product", sel.product_id.as_str()).into());
        }

        priced.push(price_product_line(&product, sel.quantity));
    }
    Ok(priced)
}

/// Reserves stock for every product line or fails with the shortage.
async fn reserve_products(
    conn: &mut SqliteConnection,
    lines: &[PricedProductLine],
) -> SaleResult<()> {
    for line in lines {
        match catalog::reserve_stock(&mut *conn, &line.product_id, line.quantity).await? {
            StockReservation::Reserved => {}
            StockReservation::Insufficient { available } => {
                return Err(CoreError::OutOfStock {
                    product: line.product_name.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Freezes priced service lines into sale child rows.
async fn persist_service_lines(
    conn: &mut SqliteConnection,
    sale_id: &str,
    priced: &[PricedServiceLine],
    now: DateTime<Utc>,
) -> SaleResult<Vec<SaleServiceLine>> {
    let mut rows = Vec::with_capacity(priced.len());
    for line in priced {
        let row = SaleServiceLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            service_id: line.service_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.amount(),
            line_total: line.line_total.amount(),
            is_child: line.is_child,
            is_combined: line.is_combined,
            add_shampoo: line.add_shampoo,
            created_at: now,
        };
        sale_repo::insert_service_line(&mut *conn, &row).await?;
        rows.push(row);
    }
    Ok(rows)
}

/// Freezes priced product lines into sale child rows.
async fn persist_product_lines(
    conn: &mut SqliteConnection,
    sale_id: &str,
    priced: &[PricedProductLine],
    now: DateTime<Utc>,
) -> SaleResult<Vec<SaleProductLine>> {
    let mut rows = Vec::with_capacity(priced.len());
    for line in priced {
        let row = SaleProductLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.amount(),
            line_total: line.line_total.amount(),
            created_at: now,
        };
        sale_repo::insert_product_line(&mut *conn, &row).await?;
        rows.push(row);
    }
    Ok(rows)
}

/// Validates and persists staff attribution rows.
async fn insert_staff_rows(
    conn: &mut SqliteConnection,
    sale_id: &str,
    selections: &[StaffSelection],
    now: DateTime<Utc>,
) -> SaleResult<Vec<SaleStaff>> {
    let mut rows = Vec::with_capacity(selections.len());
    for sel in selections {
        let (staff_id, custom_name) = match (&sel.staff_id, &sel.custom_name) {
            (Some(id), None) => {
                let staff = catalog::get_staff(&mut *conn, id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Staff", id.as_str()))?;
                if !staff.is_active {
                    return Err(CoreError::inactive("Staff", id.as_str()).into());
                }
                (Some(id.clone()), None)
            }
            (None, Some(name)) if !name.trim().is_empty() => {
                (None, Some(name.trim().to_string()))
            }
            _ => {
                return Err(CoreError::Validation(ValidationError::InvalidFormat {
                    field: "staff".to_string(),
                    reason: "exactly one of staffId or customName is required".to_string(),
                })
                .into());
            }
        };

        let row = SaleStaff {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            staff_id,
            custom_name,
            created_at: now,
        };
        sale_repo::insert_staff(&mut *conn, &row).await?;
        rows.push(row);
    }
    Ok(rows)
}

/// Persists one applied discount plus its customer usage record.
#[allow(clippy::too_many_arguments)]
async fn record_discount(
    conn: &mut SqliteConnection,
    sale: &Sale,
    discount_type: DiscountType,
    rule_id: Option<String>,
    amount: Money,
    description: &str,
    position: i64,
    now: DateTime<Utc>,
) -> SaleResult<()> {
    sale_repo::insert_discount(
        &mut *conn,
        &SaleDiscount {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            rule_id,
            discount_type,
            amount: amount.amount(),
            description: description.to_string(),
            position,
            created_at: now,
        },
    )
    .await?;

    // used_at follows the sale date so month-based gates survive backdated
    // sales
    sale_repo::insert_usage(
        &mut *conn,
        &DiscountUsage {
            id: Uuid::new_v4().to_string(),
            customer_id: sale.customer_id.clone(),
            sale_id: sale.id.clone(),
            discount_type,
            amount: amount.amount(),
            used_at: sale.sale_date,
        },
    )
    .await?;

    Ok(())
}

/// Persists the structured audit row for a manual adjustment.
async fn record_adjustment(
    conn: &mut SqliteConnection,
    sale_id: &str,
    kind: AdjustmentKind,
    adj: &salon_core::ManualAdjustment,
    now: DateTime<Utc>,
) -> SaleResult<()> {
    sale_repo::insert_adjustment(
        &mut *conn,
        &SaleAdjustment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            kind,
            amount: adj.amount.amount(),
            reason: adj.reason.clone(),
            created_at: now,
        },
    )
    .await?;

    Ok(())
}

/// Assembles the full sale aggregate.
async fn hydrate(conn: &mut SqliteConnection, sale: Sale) -> SaleResult<SaleDetail> {
    let cust = customer::get(&mut *conn, &sale.customer_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Customer", sale.customer_id.as_str()))?;

    let services = sale_repo::service_lines(&mut *conn, &sale.id).await?;
    let products = sale_repo::product_lines(&mut *conn, &sale.id).await?;
    let discounts = sale_repo::discounts(&mut *conn, &sale.id).await?;
    let payments = sale_repo::payments(&mut *conn, &sale.id).await?;
    let staff = sale_repo::staff_rows(&mut *conn, &sale.id).await?;
    let adjustments = sale_repo::adjustments(&mut *conn, &sale.id).await?;

    Ok(SaleDetail {
        sale,
        customer: cust,
        services,
        products,
        discounts,
        payments,
        staff,
        adjustments,
    })
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::Duration;
    use salon_core::{Customer, DiscountRule, Product, Service, Staff};
    use serde_json::json;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_customer(db: &Database, visit_count: i64, birth_month: Option<i64>) -> Customer {
        let now = Utc::now();
        let cust = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Test Customer".to_string(),
            phone: None,
            birth_month,
            birth_day: None,
            visit_count,
            loyalty_points: 0,
            total_spent: 0,
            last_visit_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        customer::insert(&mut conn, &cust).await.unwrap();
        cust
    }

    async fn seed_service(db: &Database, name: &str, price: i64, child: Option<i64>) -> Service {
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            single_price: price,
            child_price: child,
            combined_price: None,
            child_combined_price: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        catalog::insert_service(&mut conn, &service).await.unwrap();
        service
    }

    async fn seed_product(db: &Database, name: &str, price: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price,
            stock_quantity: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        catalog::insert_product(&mut conn, &product).await.unwrap();
        product
    }

    async fn stock_of(db: &Database, product_id: &str) -> i64 {
        let mut conn = db.pool().acquire().await.unwrap();
        catalog::get_product(&mut conn, product_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    async fn customer_row(db: &Database, id: &str) -> Customer {
        let mut conn = db.pool().acquire().await.unwrap();
        customer::get(&mut conn, id).await.unwrap().unwrap()
    }

    fn basic_request(customer_id: &str, service_id: &str) -> CreateSaleRequest {
        serde_json::from_value(json!({
            "customerId": customer_id,
            "serviceIds": [service_id],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_sixth_visit_milestone() {
        let db = test_db().await;
        let cust = seed_customer(&db, 5, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let detail = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();

        assert_eq!(detail.sale.total_amount, 10000);
        assert_eq!(detail.sale.discount_amount, 2000);
        assert_eq!(detail.sale.final_amount, 8000);
        assert_eq!(detail.sale.loyalty_points_earned, 8);

        assert_eq!(detail.discounts.len(), 1);
        assert_eq!(detail.discounts[0].discount_type, DiscountType::SixthVisit);
        assert!(detail.discounts[0].rule_id.is_some());

        // Single legacy cash payment covering the full final amount
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].amount, 8000);
        assert_eq!(detail.payments[0].method, PaymentMethod::Cash);

        // Statistics moved in the same transaction
        assert_eq!(detail.customer.visit_count, 6);
        assert_eq!(detail.customer.loyalty_points, 8);
        assert_eq!(detail.customer.total_spent, 8000);
        assert!(detail.customer.last_visit_at.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_selection() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;

        let req: CreateSaleRequest =
            serde_json::from_value(json!({ "customerId": cust.id })).unwrap();
        let err = db.sales().create(req).await.unwrap_err();

        assert!(matches!(
            err,
            SaleError::Domain(CoreError::Validation(ValidationError::EmptySelection))
        ));
    }

    #[tokio::test]
    async fn test_create_out_of_stock_rolls_back() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let product = seed_product(&db, "Hair Essence", 15000, 3).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "products": [{ "productId": product.id, "quantity": 5 }],
        }))
        .unwrap();
        let err = db.sales().create(req).await.unwrap_err();

        assert!(matches!(
            err,
            SaleError::Domain(CoreError::OutOfStock {
                available: 3,
                requested: 5,
                ..
            })
        ));

        // Nothing committed: stock and statistics are untouched
        assert_eq!(stock_of(&db, &product.id).await, 3);
        assert_eq!(customer_row(&db, &cust.id).await.visit_count, 0);
    }

    #[tokio::test]
    async fn test_create_product_sale_decrements_stock() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let product = seed_product(&db, "Hair Essence", 15000, 5).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "products": [{ "productId": product.id, "quantity": 2 }],
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        assert_eq!(detail.sale.total_amount, 30000);
        assert_eq!(detail.products.len(), 1);
        assert_eq!(stock_of(&db, &product.id).await, 3);
    }

    #[tokio::test]
    async fn test_split_payment_mismatch_rejected() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "payments": [{ "method": "cash", "amount": 5000 }],
        }))
        .unwrap();
        let err = db.sales().create(req).await.unwrap_err();

        assert!(matches!(
            err,
            SaleError::Domain(CoreError::PaymentMismatch {
                expected: 10000,
                paid: 5000
            })
        ));
        assert_eq!(customer_row(&db, &cust.id).await.visit_count, 0);
    }

    #[tokio::test]
    async fn test_split_payments_persisted() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "payments": [
                { "method": "cash", "amount": 4000 },
                { "method": "card", "amount": 6000 },
            ],
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        assert_eq!(detail.payments.len(), 2);
        assert_eq!(
            detail.payments.iter().map(|p| p.amount).sum::<i64>(),
            detail.sale.final_amount
        );
        // Legacy field mirrors the first payment
        assert_eq!(detail.sale.payment_method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_manual_discount_reason_gate() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        // Blank reason: silently no discount
        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "manualDiscount": { "amount": 2000, "reason": "   " },
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();
        assert_eq!(detail.sale.final_amount, 10000);
        assert!(detail.discounts.is_empty());
        assert!(detail.adjustments.is_empty());

        // With a reason: discount row plus structured audit row
        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "manualDiscount": { "amount": 2000, "reason": "VIP customer" },
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();
        assert_eq!(detail.sale.final_amount, 8000);
        assert_eq!(detail.discounts.len(), 1);
        assert_eq!(detail.discounts[0].discount_type, DiscountType::Manual);
        assert_eq!(detail.adjustments.len(), 1);
        assert_eq!(detail.adjustments[0].kind, AdjustmentKind::ManualDiscount);
        assert_eq!(detail.adjustments[0].reason, "VIP customer");
    }

    #[tokio::test]
    async fn test_manual_increment_raises_final() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "manualIncrement": { "amount": 1500, "reason": "extra-long hair" },
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        assert_eq!(detail.sale.final_amount, 11500);
        assert_eq!(detail.sale.manual_increment, 1500);
        assert_eq!(detail.adjustments.len(), 1);
        assert_eq!(detail.adjustments[0].kind, AdjustmentKind::ManualIncrement);
        // The increment is not a discount row
        assert!(detail.discounts.is_empty());
    }

    #[tokio::test]
    async fn test_combo_and_bring_own_product() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let shampoo = seed_service(&db, "Shampoo", 3000, None).await;
        let cut = seed_service(&db, "Cut", 10000, None).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [shampoo.id, cut.id],
            "bringOwnProduct": true,
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        // 13000 - 2000 (combo) - 1000 (bring own) = 10000
        assert_eq!(detail.sale.final_amount, 10000);
        assert_eq!(detail.discounts.len(), 2);
        assert_eq!(detail.discounts[0].discount_type, DiscountType::ServiceCombo);
        assert_eq!(
            detail.discounts[1].discount_type,
            DiscountType::BringOwnProduct
        );
        // Policy order is frozen into positions
        assert_eq!(detail.discounts[0].position, 0);
        assert_eq!(detail.discounts[1].position, 1);
        assert!(detail.sale.bring_own_product_applied);
    }

    #[tokio::test]
    async fn test_birthday_once_per_month_and_restored_on_delete() {
        let db = test_db().await;
        let month = Utc::now().month() as i64;
        let cust = seed_customer(&db, 1, Some(month)).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        // First sale this month: birthday discount fires
        let d1 = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();
        assert_eq!(d1.discounts.len(), 1);
        assert_eq!(d1.discounts[0].discount_type, DiscountType::BirthdayMonth);
        assert!(d1.sale.birthday_discount_applied);

        // Second sale same month: blocked
        let d2 = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();
        assert!(d2.discounts.is_empty());

        // Deleting the first sale returns the monthly allowance
        db.sales().delete(&d1.sale.id).await.unwrap();
        let d3 = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();
        assert_eq!(d3.discounts.len(), 1);
        assert_eq!(d3.discounts[0].discount_type, DiscountType::BirthdayMonth);
    }

    #[tokio::test]
    async fn test_delete_restores_stock_and_recomputes_last_visit() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;
        let product = seed_product(&db, "Hair Essence", 15000, 10).await;

        let older = Utc::now() - Duration::days(2);
        let req1: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "saleDate": older,
        }))
        .unwrap();
        let d1 = db.sales().create(req1).await.unwrap();

        let req2: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "products": [{ "productId": product.id, "quantity": 2 }],
        }))
        .unwrap();
        let d2 = db.sales().create(req2).await.unwrap();

        assert_eq!(stock_of(&db, &product.id).await, 8);
        assert_eq!(d2.customer.visit_count, 2);

        // Delete the recent sale: stock back, stats rolled back, last
        // visit falls back to the older sale
        db.sales().delete(&d2.sale.id).await.unwrap();
        assert_eq!(stock_of(&db, &product.id).await, 10);

        let after = customer_row(&db, &cust.id).await;
        assert_eq!(after.visit_count, 1);
        assert_eq!(after.total_spent, d1.sale.final_amount);
        assert_eq!(after.last_visit_at, Some(d1.sale.sale_date));

        // Delete the last remaining sale: aggregates zero, last visit NULL
        db.sales().delete(&d1.sale.id).await.unwrap();
        let after = customer_row(&db, &cust.id).await;
        assert_eq!(after.visit_count, 0);
        assert_eq!(after.total_spent, 0);
        assert_eq!(after.loyalty_points, 0);
        assert_eq!(after.last_visit_at, None);
    }

    #[tokio::test]
    async fn test_delete_unknown_sale_not_found() {
        let db = test_db().await;
        let err = db
            .sales()
            .delete("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap_err();

        assert!(matches!(err, SaleError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_preserves_automatic_discounts() {
        let db = test_db().await;
        let cust = seed_customer(&db, 5, None).await;
        let cut = seed_service(&db, "Cut", 10000, None).await;
        let perm = seed_service(&db, "Perm", 30000, None).await;

        let d1 = db
            .sales()
            .create(basic_request(&cust.id, &cut.id))
            .await
            .unwrap();
        assert_eq!(d1.sale.discount_amount, 2000);

        let upd: UpdateSaleRequest =
            serde_json::from_value(json!({ "serviceIds": [perm.id] })).unwrap();
        let d2 = db.sales().update(&d1.sale.id, upd).await.unwrap();

        assert_eq!(d2.sale.total_amount, 30000);
        // The sixth-visit discount stays at its granted amount; it is NOT
        // recomputed to 20% of the new subtotal
        assert_eq!(d2.sale.discount_amount, 2000);
        assert_eq!(d2.sale.final_amount, 28000);
        assert_eq!(d2.discounts.len(), 1);
        assert_eq!(d2.discounts[0].amount, 2000);

        // Payments were rewritten to match the new final amount
        assert_eq!(d2.payments.iter().map(|p| p.amount).sum::<i64>(), 28000);

        // Customer spend/points follow the delta; visits don't move on edit
        assert_eq!(d2.customer.total_spent, 28000);
        assert_eq!(d2.customer.loyalty_points, 28);
        assert_eq!(d2.customer.visit_count, 6);
    }

    #[tokio::test]
    async fn test_update_replaces_manual_discount_only() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "manualDiscount": { "amount": 2000, "reason": "VIP customer" },
        }))
        .unwrap();
        let d1 = db.sales().create(req).await.unwrap();
        assert_eq!(d1.sale.final_amount, 8000);

        // Replace the manual discount
        let upd: UpdateSaleRequest = serde_json::from_value(json!({
            "manualDiscount": { "amount": 1000, "reason": "regular" },
        }))
        .unwrap();
        let d2 = db.sales().update(&d1.sale.id, upd).await.unwrap();
        assert_eq!(d2.sale.final_amount, 9000);
        assert_eq!(d2.discounts.len(), 1);
        assert_eq!(d2.discounts[0].amount, 1000);
        assert_eq!(d2.adjustments.len(), 1);
        assert_eq!(d2.adjustments[0].reason, "regular");

        // A blank-reason replacement silently removes it
        let upd: UpdateSaleRequest = serde_json::from_value(json!({
            "manualDiscount": { "amount": 500, "reason": "" },
        }))
        .unwrap();
        let d3 = db.sales().update(&d1.sale.id, upd).await.unwrap();
        assert_eq!(d3.sale.final_amount, 10000);
        assert!(d3.discounts.is_empty());
        assert!(d3.adjustments.is_empty());
    }

    #[tokio::test]
    async fn test_update_checks_stock_against_post_release_quantity() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let product = seed_product(&db, "Hair Essence", 15000, 3).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "products": [{ "productId": product.id, "quantity": 2 }],
        }))
        .unwrap();
        let d1 = db.sales().create(req).await.unwrap();
        assert_eq!(stock_of(&db, &product.id).await, 1);

        // Raising the quantity to 3 works: the old 2 units are released
        // first, so 3 are available
        let upd: UpdateSaleRequest = serde_json::from_value(json!({
            "products": [{ "productId": product.id, "quantity": 3 }],
        }))
        .unwrap();
        db.sales().update(&d1.sale.id, upd).await.unwrap();
        assert_eq!(stock_of(&db, &product.id).await, 0);

        // 4 exceeds post-release availability: rejected, everything as-is
        let upd: UpdateSaleRequest = serde_json::from_value(json!({
            "products": [{ "productId": product.id, "quantity": 4 }],
        }))
        .unwrap();
        let err = db.sales().update(&d1.sale.id, upd).await.unwrap_err();
        assert!(matches!(
            err,
            SaleError::Domain(CoreError::OutOfStock {
                available: 3,
                requested: 4,
                ..
            })
        ));
        assert_eq!(stock_of(&db, &product.id).await, 0);

        let detail = db.sales().get(&d1.sale.id).await.unwrap();
        assert_eq!(detail.products[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_child_pricing_through_create() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, Some(7000)).await;

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "services": [{ "serviceId": service.id, "isChild": true }],
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        assert_eq!(detail.sale.total_amount, 7000);
        assert!(detail.services[0].is_child);
        assert_eq!(detail.services[0].unit_price, 7000);
    }

    #[tokio::test]
    async fn test_promotion_rule_applies() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let now = Utc::now();
        let rule = DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: "Spring promo".to_string(),
            discount_type: DiscountType::Promotion,
            is_percentage: true,
            value: 1000, // 10%
            min_purchase: None,
            max_cap: None,
            valid_from: None,
            valid_until: None,
            apply_to_all_services: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        discount_rule::insert(&mut conn, &rule).await.unwrap();
        drop(conn);

        let detail = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();

        assert_eq!(detail.sale.final_amount, 9000);
        assert_eq!(detail.discounts.len(), 1);
        assert_eq!(detail.discounts[0].discount_type, DiscountType::Promotion);
        assert_eq!(detail.discounts[0].rule_id, Some(rule.id));
        assert_eq!(detail.discounts[0].description, "Spring promo");
    }

    #[tokio::test]
    async fn test_scoped_promotion_discounts_only_scoped_lines() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let cut = seed_service(&db, "Cut", 10000, None).await;
        let perm = seed_service(&db, "Perm", 30000, None).await;

        let now = Utc::now();
        let rule = DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: "Perm promo".to_string(),
            discount_type: DiscountType::Promotion,
            is_percentage: true,
            value: 1000, // 10%
            min_purchase: None,
            max_cap: None,
            valid_from: None,
            valid_until: None,
            apply_to_all_services: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        discount_rule::insert(&mut conn, &rule).await.unwrap();
        discount_rule::set_scope(&mut conn, &rule.id, &[perm.id.clone()])
            .await
            .unwrap();
        drop(conn);

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [cut.id, perm.id],
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        // 10% of the perm line only, not of the 40000 subtotal
        assert_eq!(detail.sale.total_amount, 40000);
        assert_eq!(detail.sale.discount_amount, 3000);
        assert_eq!(detail.sale.final_amount, 37000);
        assert_eq!(detail.discounts.len(), 1);
        assert_eq!(detail.discounts[0].rule_id, Some(rule.id));
    }

    #[tokio::test]
    async fn test_deactivated_promotion_stops_applying() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let now = Utc::now();
        let rule = DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: "Flash sale".to_string(),
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
        let mut conn = db.pool().acquire().await.unwrap();
        discount_rule::insert(&mut conn, &rule).await.unwrap();
        drop(conn);

        let detail = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();
        assert_eq!(detail.sale.final_amount, 9000);

        let mut conn = db.pool().acquire().await.unwrap();
        discount_rule::deactivate(&mut conn, &rule.id).await.unwrap();

        // Soft delete: the row survives, renamed and inactive
        let (name, is_active): (String, bool) = sqlx::query_as(
            "SELECT name, is_active FROM discount_rules WHERE id = ?1",
        )
        .bind(&rule.id)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
        assert_eq!(name, "Flash sale (deleted)");
        assert!(!is_active);

        // Deactivating again, or an unknown id, reports not-found
        let err = discount_rule::deactivate(&mut conn, &rule.id)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DbError::NotFound { .. }));
        let err = discount_rule::deactivate(&mut conn, &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DbError::NotFound { .. }));
        drop(conn);

        let detail = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();
        assert_eq!(detail.sale.final_amount, 10000);
        assert!(detail.discounts.is_empty());
    }

    #[tokio::test]
    async fn test_staff_attribution() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let now = Utc::now();
        let staff = Staff {
            id: Uuid::new_v4().to_string(),
            name: "Mina".to_string(),
            is_active: true,
            created_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        catalog::insert_staff(&mut conn, &staff).await.unwrap();
        drop(conn);

        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "staff": [
                { "staffId": staff.id },
                { "customName": "Guest stylist" },
            ],
        }))
        .unwrap();
        let detail = db.sales().create(req).await.unwrap();

        assert_eq!(detail.staff.len(), 2);
        assert!(detail
            .staff
            .iter()
            .any(|s| s.staff_id.as_deref() == Some(staff.id.as_str())));
        assert!(detail
            .staff
            .iter()
            .any(|s| s.custom_name.as_deref() == Some("Guest stylist")));

        // Both or neither set is rejected
        let req: CreateSaleRequest = serde_json::from_value(json!({
            "customerId": cust.id,
            "serviceIds": [service.id],
            "staff": [{}],
        }))
        .unwrap();
        let err = db.sales().create(req).await.unwrap_err();
        assert!(matches!(
            err,
            SaleError::Domain(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_marks_sale() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;
        let service = seed_service(&db, "Cut", 10000, None).await;

        let detail = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap();
        assert!(!detail.sale.is_completed);

        let sale = db.sales().complete(&detail.sale.id).await.unwrap();
        assert!(sale.is_completed);

        let err = db
            .sales()
            .complete("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, SaleError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_inactive_service_rejected() {
        let db = test_db().await;
        let cust = seed_customer(&db, 0, None).await;

        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4().to_string(),
            name: "Retired Perm".to_string(),
            single_price: 30000,
            child_price: None,
            combined_price: None,
            child_combined_price: None,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        catalog::insert_service(&mut conn, &service).await.unwrap();
        drop(conn);

        let err = db
            .sales()
            .create(basic_request(&cust.id, &service.id))
            .await
            .unwrap_err();
        assert!(matches!(err, SaleError::Domain(CoreError::Inactive { .. })));
    }
}
