use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tally",
    about = "Tally — item, price, and sales counter",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the item ledger.
    #[arg(long, global = true, env = "TALLY_DATA_DIR", default_value = ".tally")]
    pub data_dir: PathBuf,

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
    /// List items with counts and revenue
    List,
    /// Add a new item
    Add(AddArgs),
    /// Show a single item
    Show(ItemArgs),
    /// Change an item's name or price
    Edit(EditArgs),
    /// Record sales for an item
    Inc(CountArgs),
    /// Take back sales for an item
    Dec(CountArgs),
    /// Delete an item
    Rm(ItemArgs),
    /// Show total units and revenue
    Total,
}

#[derive(Args)]
pub struct AddArgs {
    pub name: String,
    pub price: String,
}

#[derive(Args)]
pub struct ItemArgs {
    /// Item id or a unique prefix of at least 4 characters
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
}

/// Upper bound for `inc`/`dec -n`.
pub const MAX_TIMES: u32 = 10_000;

#[derive(Args)]
pub struct CountArgs {
    pub id: String,
    #[arg(
        short = 'n',
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..=MAX_TIMES as i64),
    )]
    pub times: u32,
}
