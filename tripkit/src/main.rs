//! tripkit - offline-first drug combination and timing reference
//!
//! Answers from whatever the catalog synchronizer is serving: the last
//! successful sync from the local cache, or the copy built into the binary.
//! Pass `--refresh` to try the network first.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Cache: $XDG_DATA_HOME/tripkit/cache.db (~/.local/share/tripkit/cache.db)
//! - Logs: $XDG_STATE_HOME/tripkit/tripkit.<date>.log
//! - Config: $XDG_CONFIG_HOME/tripkit/config.toml (~/.config/tripkit/config.toml)

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tripkit_core::format::{format_last_synced, format_offset_label};
use tripkit_core::sync::HttpCatalogSource;
use tripkit_core::{
    canonical_name, CatalogStore, CatalogSynchronizer, Citation, Config, DefinitionTable,
    InteractionEntry, InteractionResolver, SqliteCatalogStore, StatusCode, Substance,
    SubstanceCatalog, Timeline,
};

#[derive(Parser)]
#[command(name = "tripkit")]
#[command(about = "Look up drug combinations and effect timelines")]
#[command(version)]
struct Args {
    /// Refresh datasets from the network before answering
    #[arg(short, long, global = true)]
    refresh: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show where each dataset is being served from
    Status,

    /// Search substances by name or alias
    Search {
        /// Text to look for; omit to list everything
        query: Option<String>,

        /// Only substances in this category (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,
    },

    /// List every category in the catalog
    Categories,

    /// Show one substance
    Info {
        /// Name or alias
        name: String,

        /// Fetch full details from the network instead of the catalog
        #[arg(long)]
        online: bool,
    },

    /// Look up how two substances interact
    Combo {
        first: String,
        second: String,
    },

    /// List every documented interaction for one substance
    Combos {
        name: String,
    },

    /// Show the onset, peak and after-effects timeline for one substance
    Timeline {
        name: String,
    },

    /// Explain each interaction status
    Statuses,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        tripkit_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let source =
        Arc::new(HttpCatalogSource::new(&config).context("failed to create catalog source")?);
    let store = open_store(&Config::cache_path())?;
    let sync = CatalogSynchronizer::new(store, source.clone());

    let runtime = if args.refresh || matches!(args.command, Command::Info { online: true, .. }) {
        Some(tokio::runtime::Runtime::new().context("failed to start async runtime")?)
    } else {
        None
    };

    if let (true, Some(runtime)) = (args.refresh, runtime.as_ref()) {
        refresh(runtime, &sync);
    }

    let format = args.format;
    match args.command {
        Command::Status => cmd_status(&sync, format),
        Command::Search { query, categories } => {
            cmd_search(&sync, query.as_deref().unwrap_or(""), &categories, format)
        }
        Command::Categories => cmd_categories(&sync, format),
        Command::Info { name, online } => {
            let fetched = match (online, runtime.as_ref()) {
                (true, Some(runtime)) if !config.sync.offline => {
                    fetch_online(runtime, &source, &name)
                }
                (true, _) => {
                    eprintln!("Offline mode is set; showing catalog data");
                    None
                }
                _ => None,
            };
            cmd_info(&sync, &name, fetched, format)
        }
        Command::Combo { first, second } => cmd_combo(&sync, &first, &second, format),
        Command::Combos { name } => cmd_combos(&sync, &name, format),
        Command::Timeline { name } => cmd_timeline(&sync, &name, format),
        Command::Statuses => cmd_statuses(&sync, format),
    }
}

/// Open the on-disk cache, or an empty in-memory one if that fails.
///
/// Lookups still work from bundled data without a cache.
fn open_store(path: &Path) -> Result<Arc<dyn CatalogStore>> {
    match SqliteCatalogStore::open(path) {
        Ok(store) => Ok(Arc::new(store)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cache unavailable, using memory");
            eprintln!("Warning: cache unavailable ({}); using built-in data", e);
            let store = SqliteCatalogStore::open_in_memory()
                .context("failed to open in-memory cache")?;
            Ok(Arc::new(store))
        }
    }
}

fn refresh(runtime: &tokio::runtime::Runtime, sync: &CatalogSynchronizer) {
    let report = runtime.block_on(sync.refresh_all());
    if report.is_offline() {
        eprintln!("Offline; using saved data");
    }
    for (dataset, error) in report.failures() {
        eprintln!("Warning: {} refresh failed: {}", dataset, error);
    }
}

fn fetch_online(
    runtime: &tokio::runtime::Runtime,
    source: &HttpCatalogSource,
    name: &str,
) -> Option<Substance> {
    match runtime.block_on(source.fetch_substance(name)) {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Warning: online lookup failed ({}); showing catalog data", e);
            None
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

// ============================================
// Commands
// ============================================

fn cmd_status(sync: &CatalogSynchronizer, format: OutputFormat) -> Result<()> {
    let summary = sync.summary();

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!("Cache: {}", Config::cache_path().display());
    println!();
    println!(
        "{:<14} {:<14} {:>8}  Last synced",
        "Dataset", "State", "Records"
    );
    for line in &summary {
        println!(
            "{:<14} {:<14} {:>8}  {}",
            line.dataset.key(),
            line.state.as_str(),
            line.records,
            format_last_synced(line.last_synced_at)
        );
    }
    Ok(())
}

fn cmd_search(
    sync: &CatalogSynchronizer,
    query: &str,
    categories: &[String],
    format: OutputFormat,
) -> Result<()> {
    let catalog = sync.load::<SubstanceCatalog>();
    let matches = catalog.data.filter(query, categories);

    if format == OutputFormat::Json {
        return print_json(&matches);
    }

    if matches.is_empty() {
        println!("No substances match.");
        return Ok(());
    }
    for substance in matches {
        println!(
            "{:<14} {:<20} {}",
            substance.name,
            substance.display_name,
            substance.categories.join(", ")
        );
    }
    Ok(())
}

fn cmd_categories(sync: &CatalogSynchronizer, format: OutputFormat) -> Result<()> {
    let catalog = sync.load::<SubstanceCatalog>();
    let categories = catalog.data.categories();

    if format == OutputFormat::Json {
        return print_json(&categories);
    }
    for category in categories {
        println!("{}", category);
    }
    Ok(())
}

fn cmd_info(
    sync: &CatalogSynchronizer,
    name: &str,
    fetched: Option<Substance>,
    format: OutputFormat,
) -> Result<()> {
    let catalog = sync.load::<SubstanceCatalog>();
    let substance = match fetched.as_ref().or_else(|| catalog.data.get(name)) {
        Some(s) => s,
        None => anyhow::bail!("no substance named '{}' in the catalog", name.trim()),
    };

    if format == OutputFormat::Json {
        return print_json(substance);
    }

    println!("{}", substance.display_name);
    println!("{}", "=".repeat(substance.display_name.chars().count()));
    if !substance.summary.is_empty() {
        println!("{}", substance.summary);
    }
    println!();
    if !substance.aliases.is_empty() {
        println!("Aliases:     {}", substance.aliases.join(", "));
    }
    if !substance.categories.is_empty() {
        println!("Categories:  {}", substance.categories.join(", "));
    }

    let timing = &substance.timing;
    for (label, text) in [
        ("Onset:", &timing.onset),
        ("Duration:", &timing.duration),
        ("After:", &timing.after_effects),
    ] {
        if let Some(text) = text {
            println!("{:<12} {}", label, text);
        }
    }

    print_dose_table(&substance.dose_table);

    if let Some(effects) = substance.effects.as_array() {
        let effects: Vec<&str> = effects.iter().filter_map(Value::as_str).collect();
        if !effects.is_empty() {
            println!();
            println!("Effects: {}", effects.join(", "));
        }
    }
    Ok(())
}

/// Dose tiers in the order people read them
const DOSE_TIERS: [&str; 5] = ["Threshold", "Light", "Common", "Strong", "Heavy"];

fn print_dose_table(dose_table: &Value) {
    let Some(routes) = dose_table.as_object() else {
        return;
    };
    if routes.is_empty() {
        return;
    }

    println!();
    println!("Dosage:");
    for (route, tiers) in routes {
        let Some(tiers) = tiers.as_object() else {
            continue;
        };
        println!("  {}", route);

        let mut ordered: Vec<(&String, &Value)> = tiers.iter().collect();
        ordered.sort_by_key(|(tier, _)| {
            DOSE_TIERS
                .iter()
                .position(|t| *t == tier.as_str())
                .unwrap_or(DOSE_TIERS.len())
        });
        for (tier, amount) in ordered {
            let amount = amount.as_str().map(str::to_string).unwrap_or_else(|| amount.to_string());
            println!("    {:<10} {}", tier, amount);
        }
    }
}

#[derive(Serialize)]
struct ComboReport<'a> {
    first: String,
    second: String,
    documented: bool,
    status: Option<StatusCode>,
    label: Option<&'static str>,
    note: Option<&'a str>,
    definition: Option<&'a str>,
    sources: &'a [Citation],
}

fn cmd_combo(
    sync: &CatalogSynchronizer,
    first: &str,
    second: &str,
    format: OutputFormat,
) -> Result<()> {
    let catalog = sync.load::<SubstanceCatalog>();
    let resolver = InteractionResolver::from_synchronizer(sync);

    // Aliases resolve to catalog names; unknown names pass through as typed
    let first = catalog_name(&catalog.data, first);
    let second = catalog_name(&catalog.data, second);
    let entry = resolver.resolve(&first, &second);

    if format == OutputFormat::Json {
        return print_json(&ComboReport {
            documented: entry.is_some(),
            status: entry.map(|e| e.status),
            label: entry.map(|e| e.status.label()),
            note: entry.and_then(|e| e.note.as_deref()),
            definition: entry.map(|e| resolver.describe(e.status)),
            sources: entry.map(|e| e.sources.as_slice()).unwrap_or(&[]),
            first,
            second,
        });
    }

    let Some(entry) = entry else {
        println!("No interaction data available for {} + {}.", first, second);
        println!("Undocumented does not mean safe.");
        for name in [&first, &second] {
            if catalog.data.get(name).is_none() {
                println!("'{}' is not in the catalog.", name);
            }
        }
        return Ok(());
    };

    let emoji = resolver
        .definition_for(entry.status)
        .map(|d| format!("{} ", d.emoji))
        .unwrap_or_default();
    println!("{} + {}: {}{}", first, second, emoji, entry.status.label());
    if entry.status == StatusCode::Unknown && !entry.raw_status.is_empty() {
        println!("Published as: {}", entry.raw_status);
    }
    println!();
    println!("{}", resolver.describe(entry.status));
    if let Some(note) = &entry.note {
        println!();
        println!("{}", note);
    }
    print_citations(&entry.sources);
    Ok(())
}

fn print_citations(sources: &[Citation]) {
    if sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for source in sources {
        let title = if source.title.is_empty() {
            source.url.as_str()
        } else {
            source.title.as_str()
        };
        if source.author.is_empty() {
            println!("  - {}", title);
        } else {
            println!("  - {} ({})", title, source.author);
        }
        if !source.url.is_empty() && title != source.url {
            println!("    {}", source.url);
        }
    }
}

fn catalog_name(catalog: &SubstanceCatalog, name: &str) -> String {
    catalog
        .get(name)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| canonical_name(name))
}

fn cmd_combos(sync: &CatalogSynchronizer, name: &str, format: OutputFormat) -> Result<()> {
    let catalog = sync.load::<SubstanceCatalog>();
    let resolver = InteractionResolver::from_synchronizer(sync);
    let name = catalog_name(&catalog.data, name);
    let entries: Vec<&InteractionEntry> = resolver.interactions_for(&name);

    if format == OutputFormat::Json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No documented interactions for {}.", name);
        return Ok(());
    }

    for entry in entries {
        let partner = entry.partner_of(&name).unwrap_or("?");
        println!("{:<24} {}", entry.status.label(), partner);
    }
    Ok(())
}

fn cmd_timeline(sync: &CatalogSynchronizer, name: &str, format: OutputFormat) -> Result<()> {
    let catalog = sync.load::<SubstanceCatalog>();
    let Some(substance) = catalog.data.get(name) else {
        anyhow::bail!("no substance named '{}' in the catalog", name.trim());
    };
    let timeline = substance.timeline();

    if format == OutputFormat::Json {
        return print_json(&timeline);
    }

    let Some(timeline) = timeline else {
        println!("No timing data for {}.", substance.display_name);
        return Ok(());
    };

    println!("{} timeline (from dosing)", substance.display_name);
    println!();
    for phase in &timeline.phases {
        if phase.range.is_zero() {
            println!("  {:<14} no data", phase.name.label());
            continue;
        }
        println!(
            "  {:<14} {:>5} - {:<5} ({})",
            phase.name.label(),
            format_offset_label(phase.start_minutes),
            format_offset_label(phase.end_minutes),
            phase.range
        );
    }

    print_intensity(&timeline);
    Ok(())
}

/// Intensity at each axis label, read off the nearest sample
fn print_intensity(timeline: &Timeline) {
    if timeline.samples.is_empty() {
        return;
    }

    println!();
    println!("  Intensity");
    for label in &timeline.labels {
        let nearest = timeline.samples.iter().min_by(|x, y| {
            let dx = (x.offset_minutes - label.offset_minutes).abs();
            let dy = (y.offset_minutes - label.offset_minutes).abs();
            dx.total_cmp(&dy)
        });
        if let Some(sample) = nearest {
            println!("  {:>5}  {:>3.0}%", label.text, sample.intensity);
        }
    }
}

fn cmd_statuses(sync: &CatalogSynchronizer, format: OutputFormat) -> Result<()> {
    let definitions = sync.load::<DefinitionTable>();
    let entries: Vec<_> = definitions.data.iter().collect();

    if format == OutputFormat::Json {
        return print_json(&entries);
    }

    for definition in entries {
        println!("{} {}", definition.emoji, definition.status.label());
        println!("  {}", definition.definition);
    }
    Ok(())
}
