//! `kbt sup` command - Supplier management
//!
//! Besides plain CRUD this command owns the identity-resolution surface:
//! `sup dups` (duplicate detection), `sup stats` (usage/revenue per
//! identity) and `sup merge` (consolidation).

use chrono::Local;
use clap::{Subcommand, ValueEnum};
use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{escape_csv, format_eur, format_short_id, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::RecordPrefix;
use crate::core::loader;
use crate::core::project::Project;
use crate::core::Config;
use crate::entities::{Invoice, Material, Supplier, SupplierStatus};
use crate::resolve::{
    compute_usage_stats, detect_duplicates, duplicate_pairs, merge_suppliers, pending_intents,
    resume_merge, synthesize_identities, MergeError, SupplierIdentity,
};

#[derive(Subcommand, Debug)]
pub enum SupCommands {
    /// List suppliers with filtering
    List(ListArgs),

    /// Create a new supplier
    New(NewArgs),

    /// Show a supplier's details
    Show(ShowArgs),

    /// Edit a supplier in your editor
    Edit(EditArgs),

    /// Suspend a supplier (kept for history, hidden from active lists)
    Suspend(IdArgs),

    /// Reactivate a suspended supplier
    Activate(IdArgs),

    /// Delete a supplier (blocked while materials or invoices reference it)
    Delete(IdArgs),

    /// Detect possible duplicate suppliers
    Dups(DupsArgs),

    /// Show per-supplier usage and approved-invoice revenue
    Stats(StatsArgs),

    /// Merge a duplicate supplier into another
    Merge(MergeArgs),
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Active,
    Suspended,
    /// All statuses
    All,
}

/// Sort key for list output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortField {
    Name,
    Status,
    Created,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Search in name, email and notes
    #[arg(long)]
    pub search: Option<String>,

    /// Also list identities inferred from material/invoice references
    #[arg(long, short = 'i')]
    pub include_inferred: bool,

    /// Sort by field
    #[arg(long, default_value = "name")]
    pub sort: SortField,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Supplier name (required)
    #[arg(long, short = 'n')]
    pub name: String,

    /// Contact email (required)
    #[arg(long, short = 'e')]
    pub email: String,

    /// VAT number (e.g., BE0123456789)
    #[arg(long)]
    pub vat: Option<String>,

    /// Contact phone
    #[arg(long)]
    pub phone: Option<String>,

    /// Postal address
    #[arg(long)]
    pub address: Option<String>,

    /// Specialty tag (can be given multiple times)
    #[arg(long = "specialty")]
    pub specialties: Vec<String>,

    /// Notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Open in editor after creation
    #[arg(long)]
    pub edit: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Supplier ID (full or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Supplier ID (full or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Supplier ID (full or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct DupsArgs {}

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Only identities with at least one material or invoice
    #[arg(long)]
    pub used: bool,
}

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Source: a persisted supplier ID, or the exact name of an inferred supplier
    pub source: Option<String>,

    /// Target supplier ID (must be a persisted supplier)
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Resume interrupted merges from the journal instead of starting a new one
    #[arg(long)]
    pub resume: bool,
}

/// Run a supplier subcommand
pub fn run(cmd: SupCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SupCommands::List(args) => run_list(args, global),
        SupCommands::New(args) => run_new(args, global),
        SupCommands::Show(args) => run_show(args, global),
        SupCommands::Edit(args) => run_edit(args, global),
        SupCommands::Suspend(args) => run_set_status(args, SupplierStatus::Suspended, global),
        SupCommands::Activate(args) => run_set_status(args, SupplierStatus::Active, global),
        SupCommands::Delete(args) => run_delete(args, global),
        SupCommands::Dups(args) => run_dups(args, global),
        SupCommands::Stats(args) => run_stats(args, global),
        SupCommands::Merge(args) => run_merge(args, global),
    }
}

fn load_suppliers(project: &Project) -> Result<Vec<Supplier>> {
    loader::load_all(&project.record_dir(RecordPrefix::Sup))
}

fn load_materials(project: &Project) -> Result<Vec<Material>> {
    loader::load_all(&project.record_dir(RecordPrefix::Mat))
}

fn load_invoices(project: &Project) -> Result<Vec<Invoice>> {
    loader::load_all(&project.record_dir(RecordPrefix::Inv))
}

fn resolve_supplier(project: &Project, id: &str) -> Result<(PathBuf, Supplier)> {
    loader::load_record(&project.record_dir(RecordPrefix::Sup), id)?
        .ok_or_else(|| miette::miette!("supplier '{}' not found", id))
}

/// Flat row over persisted and inferred identities, for list output
#[derive(Serialize)]
struct IdentityRow {
    key: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    vat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    inferred: bool,
    possible_duplicate: bool,
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let suppliers = load_suppliers(&project)?;
    let materials = load_materials(&project)?;
    let invoices = load_invoices(&project)?;

    let identities = synthesize_identities(&suppliers, &materials, &invoices);
    let flagged = detect_duplicates(&identities);

    let mut rows: Vec<IdentityRow> = identities
        .iter()
        .filter(|ident| args.include_inferred || !ident.is_inferred())
        .filter(|ident| match (args.status, ident.as_persisted()) {
            (StatusFilter::All, _) => true,
            (StatusFilter::Active, Some(s)) => s.status == SupplierStatus::Active,
            (StatusFilter::Suspended, Some(s)) => s.status == SupplierStatus::Suspended,
            // inferred identities have no lifecycle status
            (_, None) => false,
        })
        .filter(|ident| {
            let Some(ref search) = args.search else {
                return true;
            };
            let needle = search.to_lowercase();
            let sup = ident.as_persisted();
            ident.name().to_lowercase().contains(&needle)
                || sup.is_some_and(|s| s.email.to_lowercase().contains(&needle))
                || sup.and_then(|s| s.notes.as_ref())
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .map(|ident| IdentityRow {
            key: ident.key().to_string(),
            name: ident.name().to_string(),
            vat: ident.vat().map(str::to_string),
            email: ident.as_persisted().map(|s| s.email.clone()),
            status: ident.as_persisted().map(|s| s.status.to_string()),
            inferred: ident.is_inferred(),
            possible_duplicate: flagged.contains(&ident.key()),
        })
        .collect();

    match args.sort {
        SortField::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        SortField::Status => rows.sort_by(|a, b| a.status.cmp(&b.status)),
        // inferred identities have no creation time; key order keeps them stable
        SortField::Created => rows.sort_by(|a, b| a.key.cmp(&b.key)),
    }
    if args.reverse {
        rows.reverse();
    }
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if args.count {
        println!("{}", rows.len());
        return Ok(());
    }
    if rows.is_empty() {
        println!("No suppliers found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rows).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&rows).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => {
            println!("key,name,vat,email,status,inferred,possible_duplicate");
            for row in &rows {
                println!(
                    "{},{},{},{},{},{},{}",
                    escape_csv(&row.key),
                    escape_csv(&row.name),
                    row.vat.as_deref().unwrap_or(""),
                    row.email.as_deref().unwrap_or(""),
                    row.status.as_deref().unwrap_or(""),
                    row.inferred,
                    row.possible_duplicate
                );
            }
        }
        OutputFormat::Id => {
            for row in &rows {
                println!("{}", row.key);
            }
        }
        OutputFormat::Md => {
            println!("| ID | Name | VAT | Status | Dup? |");
            println!("|---|---|---|---|---|");
            for row in &rows {
                println!(
                    "| {} | {} | {} | {} | {} |",
                    row.key,
                    row.name,
                    row.vat.as_deref().unwrap_or("-"),
                    row.status.as_deref().unwrap_or("inferred"),
                    if row.possible_duplicate { "!" } else { "" }
                );
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<17} {:<30} {:<16} {:<10} {:<4}",
                style("ID").bold(),
                style("NAME").bold(),
                style("VAT").bold(),
                style("STATUS").bold(),
                style("DUP").bold()
            );
            println!("{}", "-".repeat(80));
            for row in &rows {
                let id_col = if row.inferred {
                    "(inferred)".to_string()
                } else {
                    truncate_str(&row.key, 16)
                };
                println!(
                    "{:<17} {:<30} {:<16} {:<10} {:<4}",
                    style(id_col).cyan(),
                    truncate_str(&row.name, 28),
                    truncate_str(row.vat.as_deref().unwrap_or("-"), 14),
                    row.status.as_deref().unwrap_or("-"),
                    if row.possible_duplicate {
                        style("!").red().to_string()
                    } else {
                        String::new()
                    }
                );
            }
            println!();
            println!(
                "{} supplier(s) found. Run {} to inspect flagged duplicates.",
                style(rows.len()).cyan(),
                style("kbt sup dups").yellow()
            );
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let config = Config::load();

    let mut supplier = Supplier::new(args.name, args.email, config.author());
    supplier.vat = args.vat;
    supplier.phone = args.phone;
    supplier.address = args.address;
    supplier.specialties = args.specialties;
    supplier.notes = args.notes;

    // Validation happens before anything touches the store
    supplier.validate().map_err(|e| miette::miette!("{}", e))?;

    let path = project.record_path(&supplier.id);
    loader::save_record(&path, &supplier)?;

    println!(
        "{} Created supplier {} - {}",
        style("✓").green(),
        style(&supplier.id).cyan(),
        supplier.name
    );

    if args.edit {
        config.run_editor(&path).into_diagnostic()?;
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (_, supplier) = resolve_supplier(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&supplier).into_diagnostic()?
            );
        }
        _ => {
            print!("{}", serde_yml::to_string(&supplier).into_diagnostic()?);
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (path, _) = resolve_supplier(&project, &args.id)?;

    let config = Config::load();
    config.run_editor(&path).into_diagnostic()?;

    // Re-check the edited file so malformed records are caught now, not at
    // the next load
    let content = fs::read_to_string(&path).into_diagnostic()?;
    match serde_yml::from_str::<Supplier>(&content) {
        Ok(edited) => edited.validate().map_err(|e| miette::miette!("{}", e))?,
        Err(e) => {
            return Err(miette::miette!("edited file no longer parses: {}", e));
        }
    }

    Ok(())
}

fn run_set_status(args: IdArgs, status: SupplierStatus, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (path, mut supplier) = resolve_supplier(&project, &args.id)?;

    supplier.status = status;
    loader::save_record(&path, &supplier)?;

    println!(
        "{} Supplier {} is now {}",
        style("✓").green(),
        style(&supplier.name).cyan(),
        status
    );
    Ok(())
}

fn run_delete(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (path, supplier) = resolve_supplier(&project, &args.id)?;

    let material_refs = load_materials(&project)?
        .iter()
        .filter(|m| m.supplier == supplier.name)
        .count();
    let invoice_refs = load_invoices(&project)?
        .iter()
        .filter(|i| i.supplier_name == supplier.name)
        .count();

    if material_refs > 0 || invoice_refs > 0 {
        return Err(miette::miette!(
            "cannot delete '{}': {} material(s) and {} invoice(s) still reference it.\n\
             Suspend it with 'kbt sup suspend {}' or merge it into another supplier.",
            supplier.name,
            material_refs,
            invoice_refs,
            supplier.id
        ));
    }

    fs::remove_file(&path).into_diagnostic()?;
    println!(
        "{} Deleted supplier {} - {}",
        style("✓").green(),
        style(&supplier.id).cyan(),
        supplier.name
    );
    Ok(())
}

fn run_dups(_args: DupsArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let suppliers = load_suppliers(&project)?;
    let materials = load_materials(&project)?;
    let invoices = load_invoices(&project)?;

    let identities = synthesize_identities(&suppliers, &materials, &invoices);
    let pairs = duplicate_pairs(&identities);

    if pairs.is_empty() {
        println!("No possible duplicates found.");
        return Ok(());
    }

    if global.format == OutputFormat::Json {
        let items: Vec<serde_json::Value> = pairs
            .iter()
            .map(|p| {
                serde_json::json!({
                    "left": p.left.to_string(),
                    "right": p.right.to_string(),
                    "reason": p.reason.to_string(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&items).into_diagnostic()?
        );
        return Ok(());
    }

    let describe = |key: &crate::resolve::IdentityKey| {
        let name = identities
            .iter()
            .find(|i| &i.key() == key)
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| key.to_string());
        match key {
            crate::resolve::IdentityKey::Id(id) => {
                format!("{} [{}]", name, format_short_id(id))
            }
            crate::resolve::IdentityKey::Name(_) => format!("{} [inferred]", name),
        }
    };

    for pair in &pairs {
        println!(
            "{} {}  {}  {}  ({})",
            style("!").red(),
            describe(&pair.left),
            style("<->").dim(),
            describe(&pair.right),
            style(&pair.reason).yellow()
        );
    }
    println!();
    println!(
        "{} possible duplicate pair(s). Consolidate with {}.",
        style(pairs.len()).cyan(),
        style("kbt sup merge <SOURCE> <TARGET>").yellow()
    );
    Ok(())
}

fn run_stats(args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let suppliers = load_suppliers(&project)?;
    let materials = load_materials(&project)?;
    let invoices = load_invoices(&project)?;

    let identities = synthesize_identities(&suppliers, &materials, &invoices);
    let today = Local::now().date_naive();
    let stats = compute_usage_stats(&identities, &materials, &invoices, today);

    let rows: Vec<(&String, &crate::resolve::UsageStats, bool)> = stats
        .iter()
        .map(|(name, s)| {
            let inferred = identities
                .iter()
                .find(|i| i.name() == name.as_str())
                .is_some_and(|i| i.is_inferred());
            (name, s, inferred)
        })
        .filter(|(_, s, _)| !args.used || s.material_count > 0 || s.approved_invoice_count > 0)
        .collect();

    match global.format {
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = rows
                .iter()
                .map(|(name, s, inferred)| {
                    serde_json::json!({
                        "name": name,
                        "inferred": inferred,
                        "material_count": s.material_count,
                        "approved_invoice_count": s.approved_invoice_count,
                        "total_approved_revenue": s.total_approved_revenue,
                        "current_month_approved_revenue": s.current_month_approved_revenue,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&items).into_diagnostic()?
            );
        }
        OutputFormat::Csv => {
            println!("name,inferred,materials,approved_invoices,total_revenue,month_revenue");
            for (name, s, inferred) in &rows {
                println!(
                    "{},{},{},{},{:.2},{:.2}",
                    escape_csv(name),
                    inferred,
                    s.material_count,
                    s.approved_invoice_count,
                    s.total_approved_revenue,
                    s.current_month_approved_revenue
                );
            }
        }
        _ => {
            println!(
                "{:<30} {:>9} {:>9} {:>14} {:>14}",
                style("NAME").bold(),
                style("MATERIALS").bold(),
                style("INVOICES").bold(),
                style("TOTAL").bold(),
                style("THIS MONTH").bold()
            );
            println!("{}", "-".repeat(80));
            for (name, s, inferred) in &rows {
                let label = if *inferred {
                    format!("{} (inferred)", truncate_str(name, 16))
                } else {
                    truncate_str(name, 28)
                };
                println!(
                    "{:<30} {:>9} {:>9} {:>14} {:>14}",
                    label,
                    s.material_count,
                    s.approved_invoice_count,
                    format_eur(s.total_approved_revenue),
                    format_eur(s.current_month_approved_revenue)
                );
            }
        }
    }

    Ok(())
}

fn run_merge(args: MergeArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;

    if args.resume {
        return run_merge_resume(&project);
    }

    let (Some(source_ref), Some(target_ref)) = (args.source.as_deref(), args.target.as_deref())
    else {
        return Err(miette::miette!(
            "merge requires <SOURCE> and <TARGET> (or --resume)"
        ));
    };

    // Target must resolve to a persisted supplier; merging into an inferred
    // identity has no record to attach to
    let (_, target) = loader::load_record::<Supplier>(
        &project.record_dir(RecordPrefix::Sup),
        target_ref,
    )?
    .ok_or_else(|| {
        miette::miette!(
            "merge target '{}' not found: the target must be a persisted supplier",
            target_ref
        )
    })?;

    let source = resolve_source(&project, source_ref)?;

    let materials = load_materials(&project)?;
    let dependent = materials
        .iter()
        .filter(|m| m.supplier == source.name())
        .count();
    let invoice_refs = load_invoices(&project)?
        .iter()
        .filter(|i| i.supplier_name == source.name())
        .count();

    if !global.quiet {
        println!(
            "Merging {} into {}:",
            style(source.name()).cyan(),
            style(&target.name).cyan()
        );
        println!("  {} material(s) will be repointed", dependent);
        if source.as_persisted().is_some() {
            println!("  the source supplier record will be deleted");
        }
        if invoice_refs > 0 {
            println!(
                "  {} invoice(s) keep their original supplier text and stay attributed to '{}'",
                invoice_refs,
                source.name()
            );
        }
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt("Proceed with merge?")
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Merge cancelled.");
            return Ok(());
        }
    }

    match merge_suppliers(&project, &source, &target) {
        Ok(outcome) => {
            println!(
                "{} Merged '{}' into '{}' ({} material(s) migrated)",
                style("✓").green(),
                source.name(),
                target.name,
                outcome.materials_migrated
            );
            Ok(())
        }
        Err(MergeError::PartialFailure {
            migrated,
            total,
            target,
            failed,
        }) => {
            eprintln!(
                "{} Partially merged: {} of {} material(s) migrated to '{}'",
                style("✗").red(),
                migrated,
                total,
                target
            );
            for failure in &failed {
                eprintln!("    {}: {}", failure.material, failure.reason);
            }
            Err(miette::miette!(
                "{} material(s) failed to migrate; fix the records and run 'kbt sup merge --resume'",
                failed.len()
            ))
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn run_merge_resume(project: &Project) -> Result<()> {
    let intents = pending_intents(project).map_err(|e| miette::miette!("{}", e))?;
    if intents.is_empty() {
        println!("No pending merges.");
        return Ok(());
    }

    for (_, intent) in intents {
        let label = format!("'{}' -> '{}'", intent.source_name, intent.target_name);
        match resume_merge(project, intent) {
            Ok(outcome) => {
                println!(
                    "{} Resumed merge {} ({} material(s) migrated)",
                    style("✓").green(),
                    label,
                    outcome.materials_migrated
                );
            }
            Err(e) => {
                eprintln!("{} Could not finish merge {}: {}", style("✗").red(), label, e);
            }
        }
    }
    Ok(())
}

/// Resolve a merge source: a persisted supplier by id, or an identity
/// inferred from references by exact name
fn resolve_source(project: &Project, source_ref: &str) -> Result<SupplierIdentity> {
    if let Some((_, supplier)) =
        loader::load_record::<Supplier>(&project.record_dir(RecordPrefix::Sup), source_ref)?
    {
        return Ok(SupplierIdentity::Persisted(supplier));
    }

    let suppliers = load_suppliers(project)?;
    let materials = load_materials(project)?;
    let invoices = load_invoices(project)?;
    synthesize_identities(&suppliers, &materials, &invoices)
        .into_iter()
        .find(|i| i.is_inferred() && i.name() == source_ref)
        .ok_or_else(|| {
            miette::miette!(
                "merge source '{}' not found: give a persisted supplier ID or the exact name of a referenced supplier",
                source_ref
            )
        })
}
