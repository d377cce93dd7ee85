//! `kbt inv` command - Invoice management
//!
//! Invoices usually arrive in bulk from the bookkeeping export, so the
//! primary entry point is CSV import. The resolution layer treats invoices
//! as a read-only feed; a merge never rewrites them.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use csv::{ReaderBuilder, StringRecord};
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{escape_csv, format_short_id, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::RecordPrefix;
use crate::core::loader;
use crate::core::project::Project;
use crate::core::Config;
use crate::entities::{Invoice, InvoiceStatus};

#[derive(Subcommand, Debug)]
pub enum InvCommands {
    /// List invoices with filtering
    List(ListArgs),

    /// Show an invoice's details
    Show(ShowArgs),

    /// Import invoices from a CSV export
    Import(ImportArgs),

    /// Mark an invoice as approved (counts toward revenue figures)
    Approve(ShowArgs),

    /// Mark an invoice as rejected
    Reject(ShowArgs),
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Draft,
    Submitted,
    Approved,
    Rejected,
    /// All statuses
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by supplier name (exact match)
    #[arg(long)]
    pub supplier: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Invoice ID (full or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file with columns: supplier_name, total_amount, invoice_date
    /// (YYYY-MM-DD), and optionally number, supplier_vat, status
    pub file: PathBuf,

    /// Parse and report without writing any records
    #[arg(long)]
    pub dry_run: bool,

    /// Continue past rows that fail to parse
    #[arg(long)]
    pub skip_errors: bool,
}

/// Run an invoice subcommand
pub fn run(cmd: InvCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        InvCommands::List(args) => run_list(args, global),
        InvCommands::Show(args) => run_show(args, global),
        InvCommands::Import(args) => run_import(args, global),
        InvCommands::Approve(args) => run_set_status(args, InvoiceStatus::Approved, global),
        InvCommands::Reject(args) => run_set_status(args, InvoiceStatus::Rejected, global),
    }
}

fn resolve_invoice(project: &Project, id: &str) -> Result<(PathBuf, Invoice)> {
    loader::load_record(&project.record_dir(RecordPrefix::Inv), id)?
        .ok_or_else(|| miette::miette!("invoice '{}' not found", id))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let mut invoices: Vec<Invoice> = loader::load_all(&project.record_dir(RecordPrefix::Inv))?;

    invoices.retain(|inv| match args.status {
        StatusFilter::Draft => inv.status == InvoiceStatus::Draft,
        StatusFilter::Submitted => inv.status == InvoiceStatus::Submitted,
        StatusFilter::Approved => inv.status == InvoiceStatus::Approved,
        StatusFilter::Rejected => inv.status == InvoiceStatus::Rejected,
        StatusFilter::All => true,
    });
    invoices.retain(|inv| {
        args.supplier
            .as_deref()
            .is_none_or(|name| inv.supplier_name == name)
    });

    invoices.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date));
    if let Some(limit) = args.limit {
        invoices.truncate(limit);
    }

    if args.count {
        println!("{}", invoices.len());
        return Ok(());
    }
    if invoices.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&invoices).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&invoices).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("id,number,supplier_name,supplier_vat,status,total_amount,invoice_date");
            for inv in &invoices {
                println!(
                    "{},{},{},{},{},{:.2},{}",
                    inv.id,
                    inv.number.as_deref().unwrap_or(""),
                    escape_csv(&inv.supplier_name),
                    inv.supplier_vat.as_deref().unwrap_or(""),
                    inv.status,
                    inv.total_amount,
                    inv.invoice_date
                );
            }
        }
        OutputFormat::Id => {
            for inv in &invoices {
                println!("{}", inv.id);
            }
        }
        OutputFormat::Md => {
            println!("| ID | Supplier | Status | Amount | Date |");
            println!("|---|---|---|---|---|");
            for inv in &invoices {
                println!(
                    "| {} | {} | {} | {:.2} | {} |",
                    format_short_id(&inv.id),
                    inv.supplier_name,
                    inv.status,
                    inv.total_amount,
                    inv.invoice_date
                );
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<17} {:<28} {:<10} {:>12} {:<12}",
                style("ID").bold(),
                style("SUPPLIER").bold(),
                style("STATUS").bold(),
                style("AMOUNT").bold(),
                style("DATE").bold()
            );
            println!("{}", "-".repeat(84));
            for inv in &invoices {
                println!(
                    "{:<17} {:<28} {:<10} {:>12.2} {:<12}",
                    style(format_short_id(&inv.id)).cyan(),
                    truncate_str(&inv.supplier_name, 26),
                    inv.status,
                    inv.total_amount,
                    inv.invoice_date
                );
            }
            println!();
            println!("{} invoice(s) found.", style(invoices.len()).cyan());
        }
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (_, invoice) = resolve_invoice(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&invoice).into_diagnostic()?
            );
        }
        _ => {
            print!("{}", serde_yml::to_string(&invoice).into_diagnostic()?);
        }
    }
    Ok(())
}

fn run_set_status(args: ShowArgs, status: InvoiceStatus, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (path, mut invoice) = resolve_invoice(&project, &args.id)?;

    invoice.status = status;
    loader::save_record(&path, &invoice)?;

    println!(
        "{} Invoice {} from '{}' is now {}",
        style("✓").green(),
        style(format_short_id(&invoice.id)).cyan(),
        invoice.supplier_name,
        status
    );
    Ok(())
}

/// Map header names (lowercased, trimmed) to their column index
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_lowercase(), idx))
        .collect()
}

/// Get a non-empty field value by header name
fn get_field(record: &StringRecord, map: &HashMap<String, usize>, name: &str) -> Option<String> {
    map.get(name)
        .and_then(|&idx| record.get(idx))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let config = Config::load();

    let file = File::open(&args.file).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);

    let mut created = 0usize;
    let mut errors = 0usize;

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // header is row 1

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{} Row {}: CSV parse error: {}", style("✗").red(), row_num, e);
                errors += 1;
                if !args.skip_errors {
                    return Err(miette::miette!("CSV parse error at row {}: {}", row_num, e));
                }
                continue;
            }
        };

        let parsed = parse_row(&record, &header_map);
        let (supplier_name, amount, date, number, vat, status) = match parsed {
            Ok(fields) => fields,
            Err(reason) => {
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, reason);
                errors += 1;
                if !args.skip_errors {
                    return Err(miette::miette!("invalid row {}: {}", row_num, reason));
                }
                continue;
            }
        };

        if args.dry_run {
            println!(
                "{} Row {}: Would import {} - {:.2} ({})",
                style("○").dim(),
                row_num,
                truncate_str(&supplier_name, 30),
                amount,
                date
            );
            continue;
        }

        let mut invoice = Invoice::new(supplier_name, amount, date, config.author());
        invoice.number = number;
        invoice.supplier_vat = vat;
        invoice.status = status;

        loader::save_record(&project.record_path(&invoice.id), &invoice)?;
        println!(
            "{} Row {}: Imported {} - {} ({:.2})",
            style("✓").green(),
            row_num,
            style(format_short_id(&invoice.id)).cyan(),
            truncate_str(&invoice.supplier_name, 30),
            invoice.total_amount
        );
        created += 1;
    }

    println!();
    if args.dry_run {
        println!("Dry run: nothing written ({} error(s))", errors);
    } else {
        println!(
            "{} Imported {} invoice(s), {} error(s)",
            style("✓").green(),
            created,
            errors
        );
    }
    Ok(())
}

type ParsedRow = (
    String,
    f64,
    NaiveDate,
    Option<String>,
    Option<String>,
    InvoiceStatus,
);

fn parse_row(record: &StringRecord, map: &HashMap<String, usize>) -> Result<ParsedRow, String> {
    let supplier_name = get_field(record, map, "supplier_name")
        .ok_or_else(|| "missing required field 'supplier_name'".to_string())?;

    let amount: f64 = get_field(record, map, "total_amount")
        .ok_or_else(|| "missing required field 'total_amount'".to_string())?
        .parse()
        .map_err(|_| "'total_amount' is not a number".to_string())?;

    let date_str = get_field(record, map, "invoice_date")
        .ok_or_else(|| "missing required field 'invoice_date'".to_string())?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", date_str))?;

    let status = match get_field(record, map, "status") {
        Some(s) => s.parse::<InvoiceStatus>().map_err(|e| e.to_string())?,
        None => InvoiceStatus::default(),
    };

    Ok((
        supplier_name,
        amount,
        date,
        get_field(record, map, "number"),
        get_field(record, map, "supplier_vat"),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn header_map() -> HashMap<String, usize> {
        build_header_map(&record(&[
            "Supplier_Name",
            "total_amount",
            "invoice_date",
            "status",
            "supplier_vat",
        ]))
    }

    #[test]
    fn test_header_map_is_case_insensitive() {
        let map = header_map();
        assert_eq!(map.get("supplier_name"), Some(&0));
        assert_eq!(map.get("supplier_vat"), Some(&4));
    }

    #[test]
    fn test_parse_row_full() {
        let map = header_map();
        let row = record(&["Verfgroothandel BV", "512.50", "2026-03-14", "approved", "BE0123456789"]);
        let (name, amount, date, _, vat, status) = parse_row(&row, &map).unwrap();
        assert_eq!(name, "Verfgroothandel BV");
        assert_eq!(amount, 512.50);
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(vat.as_deref(), Some("BE0123456789"));
        assert_eq!(status, InvoiceStatus::Approved);
    }

    #[test]
    fn test_parse_row_missing_supplier() {
        let map = header_map();
        let row = record(&["", "512.50", "2026-03-14", "", ""]);
        let err = parse_row(&row, &map).unwrap_err();
        assert!(err.contains("supplier_name"));
    }

    #[test]
    fn test_parse_row_bad_date() {
        let map = header_map();
        let row = record(&["ABC Verf", "10", "14/03/2026", "", ""]);
        let err = parse_row(&row, &map).unwrap_err();
        assert!(err.contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_parse_row_defaults_to_draft() {
        let map = header_map();
        let row = record(&["ABC Verf", "10", "2026-03-14", "", ""]);
        let (_, _, _, _, _, status) = parse_row(&row, &map).unwrap();
        assert_eq!(status, InvoiceStatus::Draft);
    }
}
