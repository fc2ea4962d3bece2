//! Operator CLI for the collection catalog
//!
//! Usage:
//!   coinslot types
//!   coinslot options pennies
//!   coinslot generate pennies --set include_d=true --as-of 2024
//!   coinslot migrate my_pennies.json --write

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinslot_core::{CollectionInstance, DeltaOutcome, OptionValue, PersistedCollection};
use coinslot_service::{CollectionService, EngineConfig};
use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coinslot")]
#[command(about = "Inspect collection types and upgrade persisted collections", long_about = None)]
struct Args {
    /// Path to a TOML engine configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// "As of" year, overriding the configuration and the clock
    #[arg(long, global = true)]
    as_of: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered collection types
    Types,

    /// Print the option schema of a collection type
    Options {
        /// Collection type id
        type_id: String,
    },

    /// Print the canonical slot list of a collection type
    Generate {
        /// Collection type id
        type_id: String,

        /// Option value as `name=value`, repeatable
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Upgrade a persisted collection file and print the report
    Migrate {
        /// Persisted collection, as JSON
        file: PathBuf,

        /// Write progress back to the file after every delta
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.as_of.is_some() {
        config.as_of_year = args.as_of;
    }
    let service = CollectionService::from_config(&config).context("failed to build the collection registry")?;

    match args.command {
        Command::Types => list_types(&service),
        Command::Options { type_id } => print_options(&service, &type_id),
        Command::Generate { type_id, set } => generate(&service, &type_id, &set),
        Command::Migrate { file, write } => migrate(&service, &file, write),
    }
}

fn list_types(service: &CollectionService) -> Result<()> {
    for (index, template) in service.registry().types().enumerate() {
        println!(
            "{index:>2}  {:<26} {:<28} v{}",
            template.type_id,
            template.metadata.display_name,
            template.latest_version()
        );
    }
    Ok(())
}

fn print_options(service: &CollectionService, type_id: &str) -> Result<()> {
    let schema = service.option_schema(type_id)?;
    for (name, decl) in schema.iter() {
        println!("{name:<20} {:<8} default {}", format!("{:?}", decl.kind).to_lowercase(), decl.default);
    }
    Ok(())
}

fn generate(service: &CollectionService, type_id: &str, set: &[String]) -> Result<()> {
    let raw = parse_assignments(set)?;
    let specs = service.generate(type_id, &raw)?;
    for spec in &specs {
        println!("{:>5}  {}", spec.order, spec.key);
    }
    println!("{} slots as of {}", specs.len(), service.as_of_year());
    Ok(())
}

fn migrate(service: &CollectionService, file: &Path, write: bool) -> Result<()> {
    let content = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let record: PersistedCollection =
        serde_json::from_str(&content).with_context(|| format!("{} is not a persisted collection", file.display()))?;

    let mut checkpoint = |instance: &CollectionInstance, _: &DeltaOutcome| -> Result<()> {
        if write {
            save(file, instance)?;
        }
        Ok(())
    };
    let (instance, report) = service.open_persisted(record, &mut checkpoint)?;

    println!(
        "{} ({}): v{} -> v{}, {} added, {} renamed, {} slots",
        instance.name,
        report.type_id,
        report.from_version,
        report.to_version,
        report.added_count(),
        report.renamed_count(),
        instance.store.len()
    );
    for delta in &report.deltas {
        for key in &delta.added {
            println!("  v{:<3} + {key}", delta.version);
        }
        for (from, to) in &delta.renamed {
            println!("  v{:<3} ~ {from} -> {to}", delta.version);
        }
    }
    Ok(())
}

fn save(file: &Path, instance: &CollectionInstance) -> Result<()> {
    let record = instance.to_persisted()?;
    let json = serde_json::to_string_pretty(&record)?;
    let staging = file.with_extension("json.tmp");
    fs::write(&staging, json).with_context(|| format!("failed to write {}", staging.display()))?;
    fs::rename(&staging, file).with_context(|| format!("failed to replace {}", file.display()))?;
    Ok(())
}

/// Parse `name=value` pairs; booleans and integers are recognized, anything
/// else is text
fn parse_assignments(set: &[String]) -> Result<IndexMap<String, OptionValue>> {
    let mut raw = IndexMap::new();
    for assignment in set {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got '{assignment}'"))?;
        let value = match value {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            other => other
                .parse::<i64>()
                .map_or_else(|_| OptionValue::Text(other.to_string()), OptionValue::Int),
        };
        raw.insert(name.trim().to_string(), value);
    }
    Ok(raw)
}
