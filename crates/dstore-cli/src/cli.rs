use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dstore_types::ValueKind;

#[derive(Parser)]
#[command(
    name = "dstore",
    about = "dstore: typed key-value stores, local and relational",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize an identity and print both textual forms
    Identity(IdentityArgs),
    /// Work with a file-backed local store
    Local(LocalArgs),
    /// Work with a configured relational store
    Table(TableArgs),
}

#[derive(Args)]
pub struct IdentityArgs {
    /// Identity text, with or without the `license:` prefix
    pub text: String,
}

#[derive(Args)]
pub struct LocalArgs {
    /// Host file holding the local store
    #[arg(long, default_value = "dstore.json")]
    pub file: PathBuf,
    /// Namespace qualifying every key
    #[arg(short, long)]
    pub namespace: Option<String>,
    #[command(subcommand)]
    pub action: LocalAction,
}

#[derive(Subcommand)]
pub enum LocalAction {
    /// Print one value
    Get { key: String },
    /// Store a value of the given kind
    Set {
        key: String,
        value: String,
        #[arg(short, long, value_parser = parse_kind, default_value = "string")]
        kind: ValueKind,
    },
    /// Remove a key
    Delete { key: String },
    /// List entries, optionally filtered by key prefix and kind
    List {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<ValueKind>,
    },
}

#[derive(Args)]
pub struct TableArgs {
    /// Server configuration file (TOML)
    #[arg(short, long, default_value = "dstore.toml")]
    pub config: PathBuf,
    /// Name of the configured store
    pub store: String,
    /// Identity whose partition is used; the global identity when omitted
    #[arg(short, long)]
    pub identity: Option<String>,
    #[command(subcommand)]
    pub action: TableAction,
}

#[derive(Subcommand)]
pub enum TableAction {
    /// Create the table if it does not exist
    Create,
    /// List the identity's entries
    List,
    /// Store a value of the given kind
    Set {
        key: String,
        value: String,
        #[arg(short, long, value_parser = parse_kind, default_value = "string")]
        kind: ValueKind,
    },
    /// Remove a key
    Delete { key: String },
}

fn parse_kind(text: &str) -> Result<ValueKind, String> {
    text.parse::<ValueKind>().map_err(|e| e.to_string())
}
