use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use dstore_db::RemoteTable;
use dstore_server::ServerConfig;
use dstore_store::{FileKvpHost, ResourceStore, Store};
use dstore_types::{Identity, TypedValue};
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Identity(args) => cmd_identity(args, format),
        Command::Local(args) => cmd_local(args, format).await,
        Command::Table(args) => cmd_table(args, format).await,
    }
}

fn cmd_identity(args: IdentityArgs, format: OutputFormat) -> anyhow::Result<()> {
    let identity = Identity::parse(&args.text, None)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "unprefixed": identity.unprefixed(),
                "prefixed": identity.prefixed(),
                "global": identity.is_global(),
            })
        ),
        OutputFormat::Text => {
            println!("{} {}", "unprefixed:".bold(), identity.unprefixed());
            println!("{} {}", "prefixed:  ".bold(), identity.prefixed().cyan());
            if identity.is_global() {
                println!("  ({})", "global identity".yellow());
            }
        }
    }
    Ok(())
}

fn open_local(args: &LocalArgs) -> anyhow::Result<ResourceStore> {
    let host = FileKvpHost::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    Ok(ResourceStore::new(Arc::new(host), args.namespace.as_deref()))
}

async fn cmd_local(args: LocalArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_local(&args)?;
    store.init().await?;
    debug!(file = %args.file.display(), namespace = ?store.namespace(), "local store opened");

    match args.action {
        LocalAction::Get { key } => {
            let value = store.get(&key).await?;
            print_value(&key, &value, format);
        }
        LocalAction::Set { key, value, kind } => {
            let value = TypedValue::parse(&value, kind)?;
            store.set(&key, value.clone()).await?;
            print_written(&key, Some(&value), format);
        }
        LocalAction::Delete { key } => {
            store.delete(&key).await?;
            print_written(&key, None, format);
        }
        LocalAction::List { prefix, kind } => {
            let entries = store.get_all(prefix.as_deref(), kind).await?;
            print_entries(entries, format);
        }
    }
    Ok(())
}

fn open_table(args: &TableArgs) -> anyhow::Result<(Arc<dyn RemoteTable>, String)> {
    let config = ServerConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let store = config
        .store(&args.store)
        .with_context(|| format!("no store named {:?} in {}", args.store, args.config.display()))?;
    let db = config.database.open()?;
    let table = store.table.open(db)?;

    let identity = match &args.identity {
        Some(text) => Identity::parse(text, None)?,
        None => Identity::global(),
    };
    let partition = identity.to_text(config.prefix_identities);
    debug!(store = %args.store, table = table.name(), %partition, "table opened");
    Ok((table, partition))
}

async fn cmd_table(args: TableArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (table, partition) = open_table(&args)?;

    match args.action {
        TableAction::Create => {
            table.create().await?;
            match format {
                OutputFormat::Json => println!("{}", json!({ "created": table.name() })),
                OutputFormat::Text => {
                    println!("{} Table {} ready", "✓".green().bold(), table.name().bold())
                }
            }
        }
        TableAction::List => {
            let entries = table.get_all(&partition).await?;
            print_entries(entries, format);
        }
        TableAction::Set { key, value, kind } => {
            let value = TypedValue::parse(&value, kind)?;
            table.set(&partition, &key, value.clone()).await?;
            print_written(&key, Some(&value), format);
        }
        TableAction::Delete { key } => {
            table.delete(&partition, &key).await?;
            print_written(&key, None, format);
        }
    }
    Ok(())
}

fn print_value(key: &str, value: &TypedValue, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json!({ key: value.to_json() })),
        OutputFormat::Text => println!("{} ({})", value.to_text(), value.kind().to_string().dimmed()),
    }
}

fn print_written(key: &str, value: Option<&TypedValue>, format: OutputFormat) {
    match (format, value) {
        (OutputFormat::Json, Some(value)) => println!("{}", json!({ "set": { key: value.to_json() } })),
        (OutputFormat::Json, None) => println!("{}", json!({ "deleted": key })),
        (OutputFormat::Text, Some(value)) => {
            println!("{} {} = {}", "✓".green().bold(), key.bold(), value.to_text())
        }
        (OutputFormat::Text, None) => println!("{} Deleted {}", "✓".green().bold(), key.bold()),
    }
}

fn print_entries(entries: HashMap<String, TypedValue>, format: OutputFormat) {
    let sorted: BTreeMap<String, TypedValue> = entries.into_iter().collect();
    match format {
        OutputFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = sorted
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect();
            println!("{}", serde_json::Value::Object(object));
        }
        OutputFormat::Text if sorted.is_empty() => println!("No entries."),
        OutputFormat::Text => {
            for (key, value) in &sorted {
                println!(
                    "{} = {} ({})",
                    key.bold(),
                    value.to_text(),
                    value.kind().to_string().dimmed()
                );
            }
        }
    }
}
