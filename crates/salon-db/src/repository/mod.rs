//! # Repository Functions
//!
//! SQL access grouped by aggregate. Every function takes
//! `&mut SqliteConnection` instead of owning a pool, so the sale service
//! can compose any number of them inside a single transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleService::create()                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  let mut tx = db.begin().await?;                                       │
//! │       │                                                                 │
//! │       ├── customer::get(&mut tx, ..)                                   │
//! │       ├── catalog::get_service(&mut tx, ..)                            │
//! │       ├── catalog::reserve_stock(&mut tx, ..)                          │
//! │       ├── sale::insert(&mut tx, ..)                                    │
//! │       ├── customer::apply_stats_delta(&mut tx, ..)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit().await?;   // or drop → rollback, stock untouched          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod customer;
pub mod discount_rule;
pub mod sale;
