//! # Invoice CLI
//!
//! Runs one invoice call against a local database and prints the response
//! body to stdout. Logs and the status line go to stderr.
//!
//! ## Usage
//! ```bash
//! export STOCKBOOK_SHOP_ID=...            # printed by the seed binary
//! echo '{"customerId": "...", "items": [...]}' | cargo run -p stockbook-invoice --bin invoice -- create
//! cargo run -p stockbook-invoice --bin invoice -- get <invoice-id>
//! cargo run -p stockbook-invoice --bin invoice -- list --limit 10 --customer <customer-id>
//! ```
//!
//! Exits non-zero when the call answers with a status of 400 or above.

use std::env;
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use stockbook_db::Database;
use stockbook_invoice::{
    init_tracing, EngineConfig, InvoiceApi, InvoiceTransactionCoordinator, ListQuery, QueueNotifier,
};
use tracing::info;

enum Command {
    Create,
    Get(String),
    List(ListQuery),
}

fn usage() {
    eprintln!("Stockbook Invoice CLI");
    eprintln!();
    eprintln!("Usage: invoice [--shop <ID>] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  create                 Read an invoice.create body from stdin");
    eprintln!("  get <ID>               Show one invoice");
    eprintln!("  list [OPTIONS]         List invoices, newest first");
    eprintln!("      --customer <ID>");
    eprintln!("      --offset <N>");
    eprintln!("      --limit <N>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --shop <ID>        Shop id (default: $STOCKBOOK_SHOP_ID)");
    eprintln!("  -h, --help             Show this help message");
}

fn parse_args(args: &[String]) -> Result<(Option<String>, Command), String> {
    let mut shop_id = None;
    let mut query = ListQuery::default();
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i).cloned().ok_or_else(|| format!("{} needs a value", flag))
        };
        match flag {
            "--shop" | "-s" => shop_id = Some(value()?),
            "--customer" => query.customer_id = Some(value()?),
            "--offset" => query.offset = Some(number(flag, &value()?)?),
            "--limit" => query.limit = Some(number(flag, &value()?)?),
            other if other.starts_with('-') => return Err(format!("unknown option: {}", other)),
            other => positional.push(other),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        ["create"] => Command::Create,
        ["get", id] => Command::Get(id.to_string()),
        ["get"] => return Err("get needs an invoice id".to_string()),
        ["list"] => Command::List(query),
        [] => return Err("missing command".to_string()),
        other => return Err(format!("unexpected arguments: {}", other.join(" "))),
    };

    Ok((shop_id, command))
}

fn number(flag: &str, raw: &str) -> Result<i64, String> {
    raw.parse().map_err(|_| format!("{} must be an integer", flag))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return Ok(ExitCode::SUCCESS);
    }

    let (shop_id, command) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {}", message);
            usage();
            return Ok(ExitCode::from(2));
        }
    };
    let Some(shop_id) = shop_id.or_else(|| env::var("STOCKBOOK_SHOP_ID").ok()) else {
        eprintln!("error: no shop id; pass --shop or set STOCKBOOK_SHOP_ID");
        return Ok(ExitCode::from(2));
    };

    init_tracing();

    let config = EngineConfig::load()?;
    info!(db = %config.database_path.display(), "Configuration loaded");

    let db = Database::new(config.db_config()).await?;

    let (notifier, mut events) = QueueNotifier::channel(config.notify_queue_capacity);
    let consumer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(
                invoice_id = %event.invoice_id,
                customer_id = %event.customer_id,
                items = event.item_count,
                total_cents = event.total_amount_after_discount_cents,
                "Invoice created"
            );
        }
    });

    let coordinator = InvoiceTransactionCoordinator::new(db.clone(), config.policy(), Arc::new(notifier));
    let api = InvoiceApi::new(Arc::new(coordinator));

    let response = match command {
        Command::Create => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            api.create(&shop_id, &body).await
        }
        Command::Get(invoice_id) => api.get(&shop_id, &invoice_id).await,
        Command::List(query) => api.list(&shop_id, &query).await,
    };

    // Dropping the api drops the last sender, which ends the consumer.
    drop(api);
    consumer.await?;
    db.close().await;

    eprintln!("status: {}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
