//! Products, invoices and invoice line items over SQLite, with invoices read
//! back as nested records priced at current product prices.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, ReferencePolicy};
pub use db::Database;
pub use error::{Result, StoreError};
