mod product;
mod invoice;
mod line_item;
mod invoice_detail;

pub use product::{Product, ProductInput};
pub use invoice::Invoice;
pub use line_item::{LineItem, LineItemInput};
pub use invoice_detail::{InvoiceDetail, InvoiceProduct, InvoiceReceipt, InvoiceTotal};
