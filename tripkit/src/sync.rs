//! tripkit-sync - refresh the local dataset cache from the network
//!
//! Fetches the substance catalog, the interaction table and the status
//! definitions, and saves whatever arrives intact. A dataset that fails to
//! refresh keeps its previous cached copy.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Cache: $XDG_DATA_HOME/tripkit/cache.db (~/.local/share/tripkit/cache.db)
//! - Logs: $XDG_STATE_HOME/tripkit/tripkit.<date>.log
//! - Config: $XDG_CONFIG_HOME/tripkit/config.toml (~/.config/tripkit/config.toml)

mod process_lock;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use process_lock::acquire_sync_guard;
use tokio::sync::watch;
use tripkit_core::error::SyncError;
use tripkit_core::format::format_last_synced;
use tripkit_core::sync::HttpCatalogSource;
use tripkit_core::{
    CatalogStore, CatalogSynchronizer, Config, Dataset, DefinitionTable, InteractionTable,
    RefreshOutcome, SqliteCatalogStore, SubstanceCatalog,
};

#[derive(Parser)]
#[command(name = "tripkit-sync")]
#[command(about = "Refresh the tripkit dataset cache")]
#[command(version)]
struct Args {
    /// Verbose output (-v shows the served state of every dataset afterwards)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only refresh this dataset (repeatable): substances, interactions, definitions
    #[arg(short, long = "dataset")]
    datasets: Vec<Dataset>,

    /// Drop cached copies first, so a failed refresh falls back to built-in data
    #[arg(long)]
    reset: bool,

    /// Watch mode - keep refreshing until interrupted
    #[arg(short, long)]
    watch: bool,

    /// Seconds between refreshes (only with --watch)
    #[arg(long, default_value = "3600")]
    interval: u64,

    /// Give up on a dataset after this many seconds, retries included
    #[arg(long, default_value = "60")]
    fetch_timeout: u64,
}

type Outcome = std::result::Result<RefreshOutcome, SyncError>;

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        tripkit_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("tripkit-sync starting");

    let cache_path = Config::cache_path();
    let _sync_guard = acquire_sync_guard(&cache_path).context("failed to acquire process lock")?;

    tracing::info!(path = %cache_path.display(), "Opening cache");
    let store =
        Arc::new(SqliteCatalogStore::open(&cache_path).context("failed to open cache database")?);

    println!("Cache: {}", cache_path.display());

    let selected = if args.datasets.is_empty() {
        Dataset::ALL.to_vec()
    } else {
        args.datasets.clone()
    };

    if args.reset {
        for &dataset in &selected {
            store
                .clear(dataset)
                .with_context(|| format!("failed to clear cached {}", dataset))?;
        }
        println!("Cleared cached {}", join_keys(&selected));
    }

    let source = Arc::new(HttpCatalogSource::new(&config).context("failed to create catalog source")?);
    let sync = CatalogSynchronizer::new(store, source)
        .with_fetch_timeout(Duration::from_secs(args.fetch_timeout.max(1)));

    let cancel = install_cancel_handler()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    if args.watch {
        runtime.block_on(run_watch_mode(&sync, &selected, &args, cancel))
    } else {
        runtime.block_on(run_single_sync(&sync, &selected, &args, cancel))
    }
}

/// Ctrl+C flips the returned flag; refreshes in flight are dropped, which
/// leaves the cache as it was.
fn install_cancel_handler() -> Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        let _ = tx.send(true);
    })
    .context("failed to set Ctrl+C handler")?;
    Ok(rx)
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    // A closed channel means the handler is gone; treat as never cancelled
    if rx.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run one refresh with a spinner
async fn run_single_sync(
    sync: &CatalogSynchronizer,
    selected: &[Dataset],
    args: &Args,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid progress template")?,
    );
    pb.set_message(format!("Refreshing {}...", join_keys(selected)));
    pb.enable_steady_tick(Duration::from_millis(100));

    let results = tokio::select! {
        results = refresh_selected(sync, selected) => results,
        _ = cancelled(&mut cancel) => {
            pb.finish_and_clear();
            println!("Sync cancelled; cache unchanged.");
            tracing::info!("tripkit-sync cancelled");
            return Ok(());
        }
    };

    pb.finish_and_clear();

    print_sync_result(&results);
    if args.verbose >= 1 {
        print_served_state(sync);
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    tracing::info!(
        datasets = results.len(),
        failed,
        "tripkit-sync complete"
    );

    if failed > 0 {
        anyhow::bail!("{} of {} dataset(s) failed to refresh", failed, results.len());
    }
    Ok(())
}

/// Refresh every `interval` seconds until Ctrl+C
async fn run_watch_mode(
    sync: &CatalogSynchronizer,
    selected: &[Dataset],
    args: &Args,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let interval = Duration::from_secs(args.interval.max(1));

    println!(
        "Watch mode active (refresh every {}s). Press Ctrl+C to stop.",
        interval.as_secs()
    );
    println!();

    let mut iteration = 0u64;
    loop {
        iteration += 1;

        let results = tokio::select! {
            results = refresh_selected(sync, selected) => results,
            _ = cancelled(&mut cancel) => break,
        };

        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let summary: Vec<String> = results
            .iter()
            .map(|(dataset, result)| format!("{} {}", dataset, outcome_word(result)))
            .collect();
        println!("[{}] {}", timestamp, summary.join(", "));

        if args.verbose >= 1 {
            for (dataset, result) in &results {
                if let Err(e) = result {
                    println!("  {}: {}", dataset, e);
                }
            }
        }

        tracing::info!(iteration, "watch sync iteration");

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancelled(&mut cancel) => break,
        }
    }

    println!("Watch mode stopped.");
    tracing::info!("tripkit-sync watch mode stopped");
    Ok(())
}

/// Refresh the selected datasets concurrently, in [`Dataset::ALL`] order
async fn refresh_selected(
    sync: &CatalogSynchronizer,
    selected: &[Dataset],
) -> Vec<(Dataset, Outcome)> {
    let wanted = |d: Dataset| selected.contains(&d);

    let (substances, interactions, definitions) = tokio::join!(
        run_if(wanted(Dataset::Substances), sync.refresh::<SubstanceCatalog>()),
        run_if(wanted(Dataset::Interactions), sync.refresh::<InteractionTable>()),
        run_if(wanted(Dataset::Definitions), sync.refresh::<DefinitionTable>()),
    );

    [
        (Dataset::Substances, substances),
        (Dataset::Interactions, interactions),
        (Dataset::Definitions, definitions),
    ]
    .into_iter()
    .filter_map(|(dataset, result)| result.map(|r| (dataset, r)))
    .collect()
}

/// Futures are lazy, so an unselected refresh never starts
async fn run_if<F: Future>(run: bool, fut: F) -> Option<F::Output> {
    if run {
        Some(fut.await)
    } else {
        None
    }
}

fn outcome_word(result: &Outcome) -> &'static str {
    match result {
        Ok(RefreshOutcome::Offline) => "offline",
        Ok(RefreshOutcome::Updated { persisted: true }) => "updated",
        Ok(RefreshOutcome::Updated { persisted: false }) => "updated (not saved)",
        Ok(RefreshOutcome::Joined) => "joined",
        Err(_) => "failed",
    }
}

/// Print sync result summary
fn print_sync_result(results: &[(Dataset, Outcome)]) {
    println!("\nSync complete:");
    for (dataset, result) in results {
        let detail = match result {
            Ok(RefreshOutcome::Offline) => "offline, kept saved copy".to_string(),
            Ok(RefreshOutcome::Updated { persisted: true }) => "updated".to_string(),
            Ok(RefreshOutcome::Updated { persisted: false }) => {
                "updated for this run only (cache write failed)".to_string()
            }
            Ok(RefreshOutcome::Joined) => "refreshed by another caller".to_string(),
            Err(e) => format!("failed: {}", e),
        };
        println!("  {:<14} {}", format!("{}:", dataset), detail);
    }
}

fn print_served_state(sync: &CatalogSynchronizer) {
    println!("\nServing:");
    for line in sync.summary() {
        println!(
            "  {:<14} {:<14} {:>6} records, last synced {}",
            format!("{}:", line.dataset),
            line.state.as_str(),
            line.records,
            format_last_synced(line.last_synced_at)
        );
    }
}

fn join_keys(datasets: &[Dataset]) -> String {
    datasets
        .iter()
        .map(|d| d.key())
        .collect::<Vec<_>>()
        .join(", ")
}
