use chrono::NaiveDateTime;
use serde::Serialize;

/// Invoice header row; line items live in `invoice_line_items`
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: i64,
    pub date: NaiveDateTime,
}
