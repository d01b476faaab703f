use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ufa",
    about = "Upfront agreements and paired invoices over a snapshot ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger snapshot file; created on the first successful invoke
    #[arg(long, global = true, default_value = "ufa-ledger.json")]
    pub store: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a mutating function (createUFA, createNewUFA, updateUFA, ...)
    Invoke(CallArgs),
    /// Run a read or preview (getUFADetails, getInvoices, probe, ...)
    Query(CallArgs),
}

#[derive(Args)]
pub struct CallArgs {
    /// Function name
    pub function: String,
    /// Positional arguments passed to the function
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
