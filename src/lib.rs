//! # pharma-ledger
//!
//! Sales ledger and inventory reconciliation service of a pharmacy.
//!
//! # What It Does
//!
//! - Keeps the drug inventory: every stock item carries a quantity, a price, an expiry date and a status derived
//!   from them (`active`, `low-stock` or `expired`).
//! - Records sales. A sale and the debit of the inventory item it sells are one atomic unit: either both are
//!   persisted, or none. Concurrent sales of the same drug never oversell it.
//! - Tracks the shipment status of each sale (`Processing`, `In Transit`, `Delivered`).
//! - Computes the sales summary: total revenue, order count, average order, month-over-month growth and the latest
//!   transactions.
//! - Proxies demand forecasts to an external prediction service.
//!
//! # The Basics
//!
//! The services are generic over a [`DatabaseDriver`](db::driver::DatabaseDriver), which is created once by the
//! bootstrap and handed to them explicitly:
//!
//! ```ignore
//! let db = Arc::new(Sqlite::connect(&dir, "pharma.db").await?);
//! app::prepare_db(db.as_ref()).await?;
//!
//! let ledger = Ledger::builder().db(db.clone()).build()?;
//! let sale = ledger.create_sale("Paracetamol", 2, 20.0, None).await?;
//! let summary = ledger.compute_sales_summary().await?;
//! ```
//!
//! SQLite is the default backend (the `sqlite` feature); PostgreSQL is available with the `pg` feature.
//!
//! # Low Stock
//!
//! An item with [`LOW_STOCK_THRESHOLD`](types::LOW_STOCK_THRESHOLD) units or less is marked `low-stock`. The status is
//! recomputed from the current quantity on every change of the item, so restocking flips it back to `active`.
pub mod app;
pub mod catalog;
pub mod db;
pub mod error;
pub mod forecast;
pub mod http;
pub mod inventory;
pub mod ledger;
pub mod summary;
pub mod types;

#[doc(inline)]
pub use error::LedgerError;
#[doc(inline)]
pub use inventory::Inventory;
#[doc(inline)]
pub use ledger::Ledger;

pub mod prelude {
    pub use crate::db::driver::DatabaseDriver;
    pub use crate::db::prelude::*;
    pub use crate::error::LedgerError;
    pub use crate::inventory::Inventory;
    pub use crate::inventory::InventoryItem;
    pub use crate::ledger::Ledger;
    pub use crate::summary::SummaryReport;
    pub use crate::types::*;
}
