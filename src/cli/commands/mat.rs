//! `kbt mat` command - Material management

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{escape_csv, format_short_id, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::RecordPrefix;
use crate::core::loader;
use crate::core::project::Project;
use crate::core::Config;
use crate::entities::Material;

#[derive(Subcommand, Debug)]
pub enum MatCommands {
    /// List materials with filtering
    List(ListArgs),

    /// Create a new material
    New(NewArgs),

    /// Show a material's details
    Show(ShowArgs),

    /// Edit a material in your editor
    Edit(ShowArgs),
}

/// Sort key for list output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortField {
    Name,
    Supplier,
    Created,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by supplier name (exact match)
    #[arg(long)]
    pub supplier: Option<String>,

    /// Search in name and category
    #[arg(long)]
    pub search: Option<String>,

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
    /// Material name (required)
    #[arg(long, short = 'n')]
    pub name: String,

    /// Supplier name (weak reference; does not need a persisted supplier)
    #[arg(long, short = 's', default_value = "")]
    pub supplier: String,

    /// Unit of purchase (e.g., liter, piece)
    #[arg(long)]
    pub unit: Option<String>,

    /// Price per unit
    #[arg(long)]
    pub price: Option<f64>,

    /// Category (e.g., paint, primer, tools)
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Material ID (full or unique prefix)
    pub id: String,
}

/// Run a material subcommand
pub fn run(cmd: MatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MatCommands::List(args) => run_list(args, global),
        MatCommands::New(args) => run_new(args, global),
        MatCommands::Show(args) => run_show(args, global),
        MatCommands::Edit(args) => run_edit(args, global),
    }
}

fn resolve_material(project: &Project, id: &str) -> Result<(PathBuf, Material)> {
    loader::load_record(&project.record_dir(RecordPrefix::Mat), id)?
        .ok_or_else(|| miette::miette!("material '{}' not found", id))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let mut materials: Vec<Material> = loader::load_all(&project.record_dir(RecordPrefix::Mat))?;

    materials.retain(|m| {
        args.supplier
            .as_deref()
            .is_none_or(|supplier| m.supplier == supplier)
    });
    materials.retain(|m| {
        let Some(ref search) = args.search else {
            return true;
        };
        let needle = search.to_lowercase();
        m.name.to_lowercase().contains(&needle)
            || m.category
                .as_ref()
                .is_some_and(|c| c.to_lowercase().contains(&needle))
    });

    match args.sort {
        SortField::Name => materials.sort_by(|a, b| a.name.cmp(&b.name)),
        SortField::Supplier => materials.sort_by(|a, b| a.supplier.cmp(&b.supplier)),
        SortField::Created => materials.sort_by(|a, b| a.created.cmp(&b.created)),
    }
    if args.reverse {
        materials.reverse();
    }
    if let Some(limit) = args.limit {
        materials.truncate(limit);
    }

    if args.count {
        println!("{}", materials.len());
        return Ok(());
    }
    if materials.is_empty() {
        println!("No materials found.");
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
                serde_json::to_string_pretty(&materials).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&materials).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("id,name,supplier,unit,unit_price,category");
            for mat in &materials {
                println!(
                    "{},{},{},{},{},{}",
                    mat.id,
                    escape_csv(&mat.name),
                    escape_csv(&mat.supplier),
                    mat.unit.as_deref().unwrap_or(""),
                    mat.unit_price.map(|p| p.to_string()).unwrap_or_default(),
                    mat.category.as_deref().unwrap_or("")
                );
            }
        }
        OutputFormat::Id => {
            for mat in &materials {
                println!("{}", mat.id);
            }
        }
        OutputFormat::Md => {
            println!("| ID | Name | Supplier | Category |");
            println!("|---|---|---|---|");
            for mat in &materials {
                println!(
                    "| {} | {} | {} | {} |",
                    format_short_id(&mat.id),
                    mat.name,
                    mat.supplier,
                    mat.category.as_deref().unwrap_or("-")
                );
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<17} {:<32} {:<26} {:<12}",
                style("ID").bold(),
                style("NAME").bold(),
                style("SUPPLIER").bold(),
                style("CATEGORY").bold()
            );
            println!("{}", "-".repeat(90));
            for mat in &materials {
                println!(
                    "{:<17} {:<32} {:<26} {:<12}",
                    style(format_short_id(&mat.id)).cyan(),
                    truncate_str(&mat.name, 30),
                    truncate_str(&mat.supplier, 24),
                    mat.category.as_deref().unwrap_or("-")
                );
            }
            println!();
            println!("{} material(s) found.", style(materials.len()).cyan());
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let config = Config::load();

    let mut material = Material::new(args.name, args.supplier, config.author());
    material.unit = args.unit;
    material.unit_price = args.price;
    material.category = args.category;

    let path = project.record_path(&material.id);
    loader::save_record(&path, &material)?;

    println!(
        "{} Created material {} - {}",
        style("✓").green(),
        style(&material.id).cyan(),
        material.name
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (_, material) = resolve_material(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&material).into_diagnostic()?
            );
        }
        _ => {
            print!("{}", serde_yml::to_string(&material).into_diagnostic()?);
        }
    }
    Ok(())
}

fn run_edit(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = global.resolve_project().map_err(|e| miette::miette!("{}", e))?;
    let (path, _) = resolve_material(&project, &args.id)?;

    let config = Config::load();
    config.run_editor(&path).into_diagnostic()?;
    Ok(())
}
