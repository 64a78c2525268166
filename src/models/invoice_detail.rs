use chrono::NaiveDateTime;
use serde::Serialize;

use super::LineItemInput;

/// An invoice read back with its resolved line items and total
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvoiceDetail {
    pub id: i64,
    pub date: NaiveDateTime,
    pub total: f64,
    pub products: Vec<InvoiceProduct>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvoiceProduct {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub subtotal: f64,
}

/// Total of one invoice as computed by the engine.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct InvoiceTotal {
    pub id: i64,
    pub total: f64,
}

/// Result of an invoice write: the id and the items as accepted
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvoiceReceipt {
    pub id: i64,
    pub items: Vec<LineItemInput>,
}
