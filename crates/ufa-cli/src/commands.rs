use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};
use ufa_ledger::{EngineConfig, UfaLedger};
use ufa_store::InMemoryLedgerStore;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let store = Arc::new(
        InMemoryLedgerStore::load(&cli.store)
            .with_context(|| format!("opening ledger {}", cli.store.display()))?,
    );
    let ledger = UfaLedger::new(Arc::clone(&store), config);

    match cli.command {
        Command::Invoke(call) => {
            ledger.invoke(&call.function, &call.args)?;
            store
                .save(&cli.store)
                .with_context(|| format!("saving ledger {}", cli.store.display()))?;
            print_invoked(&call.function, &cli.format);
        }
        Command::Query(call) => {
            let document = ledger.query(&call.function, &call.args)?;
            print_document(&document, &cli.format)?;
        }
    }
    Ok(())
}

fn print_invoked(function: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{} {}", "✓".green().bold(), function.bold()),
        OutputFormat::Json => println!("{}", json!({ "status": "Success", "function": function })),
    }
}

fn print_document(document: &Value, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{document}"),
        OutputFormat::Text => {
            if let Some(verdict) = document.get("validation").and_then(Value::as_str) {
                let msg = document.get("msg").and_then(Value::as_str).unwrap_or_default();
                if verdict == "Success" {
                    println!("{} valid", "✓".green().bold());
                } else {
                    println!("{} {}", "✗".red().bold(), msg.trim().red());
                }
            } else {
                println!("{}", serde_json::to_string_pretty(document)?);
            }
        }
    }
    Ok(())
}
