pub mod aggregate;

use std::collections::BTreeSet;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::config::{Config, ReferencePolicy};
use crate::error::{Result, StoreError};
use crate::models::{
    Invoice, InvoiceDetail, InvoiceReceipt, InvoiceTotal, LineItem, LineItemInput, Product,
    ProductInput,
};
use aggregate::InvoiceRow;

const CREATE_PRODUCTS: &str = r#"
    CREATE TABLE IF NOT EXISTS products (
        id    INTEGER PRIMARY KEY,
        name  TEXT NOT NULL,
        price REAL NOT NULL
    )
"#;

const CREATE_INVOICES: &str = r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id   INTEGER PRIMARY KEY,
        date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const CREATE_LINE_ITEMS: &str = r#"
    CREATE TABLE IF NOT EXISTS invoice_line_items (
        invoice_id INTEGER NOT NULL REFERENCES invoices(id),
        product_id INTEGER NOT NULL REFERENCES products(id),
        quantity   INTEGER NOT NULL
    )
"#;

const CREATE_LINE_ITEMS_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS invoice_line_items_invoice_id
    ON invoice_line_items (invoice_id)
"#;

// Join rows with each invoice's total. The window sums in a fixed order so
// every query built on this fragment computes bit-identical totals.
macro_rules! invoice_rows_sql {
    () => {
        r#"
        SELECT
            invoices.id AS invoice_id,
            invoices.date AS date,
            products.name AS name,
            invoice_line_items.quantity AS quantity,
            products.price AS price,
            invoice_line_items.quantity * products.price AS subtotal,
            TOTAL(invoice_line_items.quantity * products.price) OVER (
                PARTITION BY invoices.id
                ORDER BY products.name, invoice_line_items.rowid
                ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING
            ) AS total
        FROM invoices
        JOIN invoice_line_items ON invoices.id = invoice_line_items.invoice_id
        JOIN products ON invoice_line_items.product_id = products.id
        WHERE ?1 IS NULL OR invoices.id = ?1
        "#
    };
}

const SELECT_INVOICE_ROWS: &str = concat!(
    invoice_rows_sql!(),
    "ORDER BY invoices.id, products.name, invoice_line_items.rowid"
);

const SELECT_INVOICE_TOTALS: &str = concat!(
    "SELECT DISTINCT invoice_id AS id, total FROM (",
    invoice_rows_sql!(),
    ") ORDER BY id"
);

/// The invoice store: schema, product and invoice operations over one SQLite
/// connection.
///
/// The pool is capped at a single connection, so every operation runs to
/// completion before the next one starts. Cloning shares that connection.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    policy: ReferencePolicy,
}

impl Database {
    /// Open the database named by the config, creating the file if needed
    pub async fn new(config: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(config.database_url())?.create_if_missing(true);

        Self::connect(options, config.reference_policy).await
    }

    /// Open a private in-memory database
    pub async fn in_memory(policy: ReferencePolicy) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        Self::connect(options, policy).await
    }

    async fn connect(options: SqliteConnectOptions, policy: ReferencePolicy) -> Result<Self> {
        let options = options.foreign_keys(policy.is_strict());

        // An in-memory database lives only as long as its connection, so the
        // single connection is never retired.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        debug!(?policy, "database connection established");

        Ok(Self { pool, policy })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Policy applied to dangling references on writes
    pub fn reference_policy(&self) -> ReferencePolicy {
        self.policy
    }

    /// Close the pool, waiting for the connection to be returned
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // Schema operations

    /// Create the tables if they are missing. Existing rows are untouched.
    pub async fn initialize(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for statement in [
            CREATE_PRODUCTS,
            CREATE_INVOICES,
            CREATE_LINE_ITEMS,
            CREATE_LINE_ITEMS_INDEX,
        ] {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("schema initialized");

        Ok(())
    }

    /// Delete every row from every table. Meant for test harnesses.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Line items first so foreign keys never dangle mid-transaction
        for table in ["invoice_line_items", "invoices", "products"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        warn!("all tables emptied");

        Ok(())
    }

    /// Insert three sample products and one invoice referencing two of them.
    /// Returns the new invoice id.
    pub async fn seed_samples(&self) -> Result<i64> {
        let mut ids = Vec::with_capacity(3);
        for (name, price) in [("Prodotto 1", 10.0), ("Prodotto 2", 15.0), ("Prodotto 3", 20.0)] {
            let product = self.add_product(&ProductInput::new(name, price)).await?;
            ids.push(product.id);
        }

        let receipt = self
            .add_invoice(&[LineItemInput::new(ids[0], 2), LineItemInput::new(ids[2], 1)])
            .await?;

        Ok(receipt.id)
    }

    // Product operations

    pub async fn add_product(&self, input: &ProductInput) -> Result<Product> {
        input.validate()?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO products (name, price) VALUES (?, ?) RETURNING id",
        )
        .bind(&input.name)
        .bind(input.price)
        .fetch_one(self.get_pool())
        .await?;

        info!(id, name = %input.name, "product added");

        Ok(input.clone().into_product(id))
    }

    /// All products in id order, or the one matching `id` (possibly none)
    pub async fn get_products(&self, id: Option<i64>) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price FROM products WHERE ?1 IS NULL OR id = ?1 ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(products)
    }

    /// Replace both name and price of a product
    pub async fn update_product(&self, id: i64, input: &ProductInput) -> Result<Product> {
        input.validate()?;

        let updated = sqlx::query("UPDATE products SET name = ?, price = ? WHERE id = ?")
            .bind(&input.name)
            .bind(input.price)
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();

        if updated == 0 {
            if self.policy.is_strict() {
                return Err(StoreError::NotFound {
                    entity: "product",
                    id,
                });
            }
            debug!(id, "update of unknown product ignored");
        } else {
            info!(id, "product updated");
        }

        Ok(input.clone().into_product(id))
    }

    // Invoice operations

    /// Create an invoice and its line items in one transaction
    pub async fn add_invoice(&self, items: &[LineItemInput]) -> Result<InvoiceReceipt> {
        let mut tx = self.pool.begin().await?;

        if self.policy.is_strict() {
            ensure_products_exist(&mut *tx, items).await?;
        }

        let id = sqlx::query_scalar::<_, i64>("INSERT INTO invoices DEFAULT VALUES RETURNING id")
            .fetch_one(&mut *tx)
            .await?;

        insert_line_items(&mut *tx, id, items).await?;

        tx.commit().await?;
        info!(id, items = items.len(), "invoice added");

        Ok(InvoiceReceipt {
            id,
            items: items.to_vec(),
        })
    }

    /// Replace the whole line-item set of an invoice in one transaction
    pub async fn update_invoice(&self, id: i64, items: &[LineItemInput]) -> Result<InvoiceReceipt> {
        let mut tx = self.pool.begin().await?;

        if self.policy.is_strict() {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                warn!(id, "update of unknown invoice rejected");
                return Err(StoreError::NotFound {
                    entity: "invoice",
                    id,
                });
            }
            ensure_products_exist(&mut *tx, items).await?;
        }

        let removed = sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        insert_line_items(&mut *tx, id, items).await?;

        tx.commit().await?;
        info!(id, removed, inserted = items.len(), "invoice line items replaced");

        Ok(InvoiceReceipt {
            id,
            items: items.to_vec(),
        })
    }

    /// Invoice header by id, whether or not it has line items
    pub async fn get_invoice(&self, id: i64) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT id, date FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;

        Ok(invoice)
    }

    /// Raw line items of an invoice in insertion order
    pub async fn get_line_items(&self, invoice_id: i64) -> Result<Vec<LineItem>> {
        let line_items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT invoice_id, product_id, quantity
            FROM invoice_line_items
            WHERE invoice_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(line_items)
    }

    /// Invoices with their products and totals, priced at current product
    /// prices.
    ///
    /// Only invoices with at least one resolvable line item are returned;
    /// filtering by an id without line items yields an empty vec.
    pub async fn get_invoices(&self, id: Option<i64>) -> Result<Vec<InvoiceDetail>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(SELECT_INVOICE_ROWS)
            .bind(id)
            .fetch_all(self.get_pool())
            .await?;

        debug!(rows = rows.len(), ?id, "folding invoice rows");

        Ok(aggregate::fold(rows))
    }

    /// Per-invoice totals without the line items, identical to the totals of
    /// [`Database::get_invoices`].
    pub async fn get_invoice_totals(&self, id: Option<i64>) -> Result<Vec<InvoiceTotal>> {
        let totals = sqlx::query_as::<_, InvoiceTotal>(SELECT_INVOICE_TOTALS)
            .bind(id)
            .fetch_all(self.get_pool())
            .await?;

        Ok(totals)
    }
}

async fn ensure_products_exist(conn: &mut SqliteConnection, items: &[LineItemInput]) -> Result<()> {
    let product_ids: BTreeSet<i64> = items.iter().map(|item| item.product_id).collect();

    for product_id in product_ids {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;

        if found == 0 {
            warn!(product_id, "line item references unknown product");
            return Err(StoreError::IntegrityViolation { product_id });
        }
    }

    Ok(())
}

async fn insert_line_items(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    items: &[LineItemInput],
) -> Result<()> {
    for item in items {
        sqlx::query(
            "INSERT INTO invoice_line_items (invoice_id, product_id, quantity) VALUES (?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Open the database and make sure the schema exists
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;

    db.initialize().await?;

    Ok(db)
}
