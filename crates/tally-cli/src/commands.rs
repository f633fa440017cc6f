use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tally_ledger::{LedgerConfig, LedgerError, LedgerStore};
use tally_store::FileAdapter;
use tally_types::{Item, ItemId};

use crate::cli::*;

type Ledger = LedgerStore<FileAdapter>;

const MIN_PREFIX: usize = 4;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ledger = open_ledger(&cli)?;
    let loaded = ledger.load().await;

    let read_only = matches!(cli.command, Command::List | Command::Show(_) | Command::Total);
    if let (false, Err(err)) = (read_only, &loaded) {
        bail!("refusing to modify the ledger: {err}");
    }

    let result = match cli.command {
        Command::List => cmd_list(&ledger, &cli.format),
        Command::Show(args) => cmd_show(&ledger, args, &cli.format),
        Command::Total => cmd_total(&ledger, &cli.format),
        Command::Add(args) => cmd_add(&ledger, args, &cli.format).await,
        Command::Edit(args) => cmd_edit(&ledger, args, &cli.format).await,
        Command::Inc(args) => cmd_count(&ledger, args, true, &cli.format).await,
        Command::Dec(args) => cmd_count(&ledger, args, false, &cli.format).await,
        Command::Rm(args) => cmd_rm(&ledger, args, &cli.format).await,
    };

    settle(result, ledger.close().await)
}

/// The command's own error wins; a close failure is only reported when the
/// command succeeded.
pub(crate) fn settle(
    result: anyhow::Result<()>,
    closed: Result<(), LedgerError>,
) -> anyhow::Result<()> {
    result?;
    closed.context("ledger did not shut down cleanly")
}

fn open_ledger(cli: &Cli) -> anyhow::Result<Ledger> {
    let config = LedgerConfig::default();
    let adapter = FileAdapter::new(&cli.data_dir, &config.storage_key)
        .with_context(|| format!("cannot use data dir {}", cli.data_dir.display()))?;
    Ok(LedgerStore::new(Arc::new(adapter), config))
}

fn warn_if_degraded(ledger: &Ledger) {
    if ledger.is_degraded() {
        eprintln!("{} stored items could not be read; showing an empty ledger", "!".yellow().bold());
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

fn cmd_list(ledger: &Ledger, format: &OutputFormat) -> anyhow::Result<()> {
    warn_if_degraded(ledger);
    let items = ledger.snapshot();
    match format {
        OutputFormat::Json => print_json(&json!({
            "items": items,
            "total_units": ledger.total_units(),
            "total_revenue": ledger.total_revenue(),
        })),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No items yet. Add one with {}.", "tally add <name> <price>".bold());
                return Ok(());
            }
            for item in &items {
                print_item_line(item);
            }
            println!();
            print_totals(ledger);
            Ok(())
        }
    }
}

fn cmd_show(ledger: &Ledger, args: ItemArgs, format: &OutputFormat) -> anyhow::Result<()> {
    warn_if_degraded(ledger);
    let id = resolve_id(&ledger.snapshot(), &args.id)?;
    let item = ledger
        .get(&id)
        .ok_or_else(|| LedgerError::NotFound { id: id.clone() })?;
    match format {
        OutputFormat::Json => print_json(&json!({ "item": item, "revenue": item.revenue() })),
        OutputFormat::Text => {
            println!("{}  {}", item.name.bold(), item.id.to_string().dimmed());
            println!("  Price:   {}", format_amount(item.price));
            println!("  Sold:    {}", item.count.to_string().cyan());
            println!("  Revenue: {}", format_amount(item.revenue()).green());
            Ok(())
        }
    }
}

fn cmd_total(ledger: &Ledger, format: &OutputFormat) -> anyhow::Result<()> {
    warn_if_degraded(ledger);
    match format {
        OutputFormat::Json => print_json(&json!({
            "total_units": ledger.total_units(),
            "total_revenue": ledger.total_revenue(),
        })),
        OutputFormat::Text => {
            print_totals(ledger);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

async fn cmd_add(ledger: &Ledger, args: AddArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let item = ledger.add_from_text(&args.name, &args.price)?.await?;
    report(format, "Added", &item)
}

async fn cmd_edit(ledger: &Ledger, args: EditArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let id = resolve_id(&ledger.snapshot(), &args.id)?;
    let current = ledger
        .get(&id)
        .ok_or_else(|| LedgerError::NotFound { id: id.clone() })?;
    if args.name.is_none() && args.price.is_none() {
        bail!("nothing to change; pass --name and/or --price");
    }
    let name = args.name.unwrap_or(current.name);
    let price = args.price.unwrap_or_else(|| current.price.to_string());
    let item = ledger.update_from_text(&id, &name, &price)?.await?;
    report(format, "Updated", &item)
}

async fn cmd_count(
    ledger: &Ledger,
    args: CountArgs,
    up: bool,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let id = resolve_id(&ledger.snapshot(), &args.id)?;
    let mut tickets = Vec::with_capacity(args.times as usize);
    for _ in 0..args.times {
        let ticket = if up {
            ledger.increment(&id)?
        } else {
            ledger.decrement(&id)?
        };
        tickets.push(ticket);
    }

    let mut latest = None;
    for ticket in tickets {
        latest = Some(ticket.await?);
    }
    match latest {
        Some(item) => report(format, if up { "Sold" } else { "Returned" }, &item),
        None => Ok(()),
    }
}

async fn cmd_rm(ledger: &Ledger, args: ItemArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let id = resolve_id(&ledger.snapshot(), &args.id)?;
    let item = ledger.remove(&id)?.await?;
    report(format, "Removed", &item)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Match an exact id, or a unique prefix of at least `MIN_PREFIX` characters.
pub(crate) fn resolve_id(items: &[Item], query: &str) -> anyhow::Result<ItemId> {
    if let Some(item) = items.iter().find(|item| item.id.as_str() == query) {
        return Ok(item.id.clone());
    }
    if query.chars().count() < MIN_PREFIX {
        bail!("no item with id {query:?} (prefixes need at least {MIN_PREFIX} characters)");
    }
    let mut matches = items.iter().filter(|item| item.id.as_str().starts_with(query));
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item.id.clone()),
        (Some(_), Some(_)) => bail!("id prefix {query:?} is ambiguous"),
        (None, _) => bail!("no item with id {query:?}"),
    }
}

/// Whole-unit amount with thousands separators.
pub(crate) fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn print_item_line(item: &Item) {
    println!(
        "{}  {:<24} {:>10}  x{:<5} {:>12}",
        item.id.short_id().dimmed(),
        item.name.bold(),
        format_amount(item.price),
        item.count,
        format_amount(item.revenue()).green(),
    );
}

fn print_totals(ledger: &Ledger) {
    println!("Units sold: {}", ledger.total_units().to_string().cyan().bold());
    println!("Revenue:    {}", format_amount(ledger.total_revenue()).green().bold());
}

fn report(format: &OutputFormat, verb: &str, item: &Item) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "action": verb.to_lowercase(), "item": item })),
        OutputFormat::Text => {
            println!("{} {} {} ({} sold)", "✓".green().bold(), verb, item.name.bold(), item.count);
            Ok(())
        }
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
