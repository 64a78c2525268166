use chrono::NaiveDateTime;

use crate::models::{InvoiceDetail, InvoiceProduct};

/// One flat row of the invoices × line items × products join
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub invoice_id: i64,
    pub date: NaiveDateTime,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub subtotal: f64,
    /// Sum of the subtotals of the row's invoice, repeated on every row
    pub total: f64,
}

/// Fold join rows, already ordered by invoice id, into nested invoices.
///
/// A new invoice starts each time the invoice id changes; rows for the same
/// invoice must be contiguous. The invoice total is carried from its first
/// row, so it matches the engine's sum exactly.
pub fn fold<I>(rows: I) -> Vec<InvoiceDetail>
where
    I: IntoIterator<Item = InvoiceRow>,
{
    let mut invoices: Vec<InvoiceDetail> = Vec::new();

    for row in rows {
        let starts_new = invoices.last().is_none_or(|last| last.id != row.invoice_id);
        if starts_new {
            invoices.push(InvoiceDetail {
                id: row.invoice_id,
                date: row.date,
                total: row.total,
                products: Vec::new(),
            });
        }

        if let Some(current) = invoices.last_mut() {
            current.products.push(InvoiceProduct {
                name: row.name,
                quantity: row.quantity,
                price: row.price,
                subtotal: row.subtotal,
            });
        }
    }

    invoices
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn row(invoice_id: i64, name: &str, quantity: i64, price: f64, total: f64) -> InvoiceRow {
        InvoiceRow {
            invoice_id,
            date: date(),
            name: name.to_string(),
            quantity,
            price,
            subtotal: quantity as f64 * price,
            total,
        }
    }

    #[test]
    fn no_rows_no_invoices() {
        assert!(fold(Vec::new()).is_empty());
    }

    #[test]
    fn groups_contiguous_rows_by_invoice() {
        let invoices = fold(vec![
            row(1, "Gadget", 3, 15.0, 65.0),
            row(1, "Widget", 2, 10.0, 65.0),
            row(2, "Widget", 1, 10.0, 10.0),
        ]);

        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].id, 1);
        assert_eq!(invoices[0].products.len(), 2);
        assert_eq!(invoices[0].products[0].name, "Gadget");
        assert_eq!(invoices[0].total, 65.0);
        assert_eq!(invoices[1].id, 2);
        assert_eq!(invoices[1].total, 10.0);
    }

    #[test]
    fn keeps_row_order_within_invoice() {
        let invoices = fold(vec![
            row(7, "A", 1, 1.0, 6.0),
            row(7, "B", 1, 2.0, 6.0),
            row(7, "C", 1, 3.0, 6.0),
        ]);

        let names: Vec<_> = invoices[0].products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(invoices[0].total, 6.0);
    }

    #[test]
    fn subtotal_is_carried_from_row() {
        let invoices = fold(vec![row(1, "Widget", 4, 2.5, 10.0)]);
        let product = &invoices[0].products[0];
        assert_eq!(product.quantity, 4);
        assert_eq!(product.price, 2.5);
        assert_eq!(product.subtotal, 10.0);
    }

    #[test]
    fn total_is_taken_from_rows_not_resummed() {
        // 0.1 + 0.2 + 0.3 summed left to right gives 0.6000000000000001
        let invoices = fold(vec![
            row(1, "A", 1, 0.1, 0.6),
            row(1, "B", 1, 0.2, 0.6),
            row(1, "C", 1, 0.3, 0.6),
        ]);
        assert_eq!(invoices[0].total, 0.6);
    }
}
