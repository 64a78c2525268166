use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use invoice_store::config::{self, ReferencePolicy};
use invoice_store::db::{self, Database};
use invoice_store::models::{LineItemInput, ProductInput};

#[derive(Parser)]
#[command(name = "invoice-store", version, about = "Products and invoices over SQLite")]
struct Cli {
    /// Database URL, overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Use a throwaway in-memory database
    #[arg(long, global = true, conflicts_with = "database_url")]
    in_memory: bool,

    /// Accept line items that reference unknown products or invoices
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the tables if missing
    Init,
    #[command(subcommand)]
    Product(ProductCommand),
    #[command(subcommand)]
    Invoice(InvoiceCommand),
    /// Insert sample products and one sample invoice
    Seed,
    /// Delete every row from every table
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProductCommand {
    Add(ProductFields),
    List {
        #[arg(long)]
        id: Option<i64>,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
}

#[derive(Args)]
struct ProductFields {
    #[arg(long)]
    name: String,
    #[arg(long, allow_negative_numbers = true)]
    price: f64,
}

impl From<ProductFields> for ProductInput {
    fn from(fields: ProductFields) -> Self {
        ProductInput::new(fields.name, fields.price)
    }
}

#[derive(Subcommand)]
enum InvoiceCommand {
    Add {
        /// Line item as PRODUCT_ID:QUANTITY, repeatable
        #[arg(long = "item")]
        items: Vec<LineItemInput>,
    },
    List {
        #[arg(long)]
        id: Option<i64>,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long = "item")]
        items: Vec<LineItemInput>,
    },
    /// Totals summed by the database engine
    Totals {
        #[arg(long)]
        id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("invoice_store=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = config::init()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if cli.lenient {
        config.reference_policy = ReferencePolicy::Lenient;
    }

    let db = if cli.in_memory {
        let db = Database::in_memory(config.reference_policy).await?;
        db.initialize().await?;
        db
    } else {
        db::init(&config).await?
    };

    let result = run(&db, cli.command).await;
    db.close().await;

    result
}

async fn run(db: &Database, command: Command) -> Result<()> {
    match command {
        Command::Init => print_json(&serde_json::json!({ "initialized": true })),
        Command::Seed => {
            let id = db.seed_samples().await?;
            print_json(&serde_json::json!({ "invoice_id": id }))
        }
        Command::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete all rows without --yes");
            }
            db.reset().await?;
            print_json(&serde_json::json!({ "reset": true }))
        }
        Command::Product(command) => match command {
            ProductCommand::Add(fields) => print_json(&db.add_product(&fields.into()).await?),
            ProductCommand::List { id } => print_json(&db.get_products(id).await?),
            ProductCommand::Update { id, fields } => {
                print_json(&db.update_product(id, &fields.into()).await?)
            }
        },
        Command::Invoice(command) => match command {
            InvoiceCommand::Add { items } => print_json(&db.add_invoice(&items).await?),
            InvoiceCommand::List { id } => print_json(&db.get_invoices(id).await?),
            InvoiceCommand::Update { id, items } => {
                print_json(&db.update_invoice(id, &items).await?)
            }
            InvoiceCommand::Totals { id } => print_json(&db.get_invoice_totals(id).await?),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
