use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use compat_ingest::app::ingest_use_case::{run_all, run_source};
use compat_ingest::config::IngestConfig;
use compat_ingest::fetch::CachedFetcher;
use compat_ingest::merge::{discover_inputs, merge_files};
use compat_ingest::schema::write_json;
use compat_ingest::sources::{IngestContext, RunOptions, SourceRegistry};
use compat_ingest::{logging, metrics};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "compat-ingest")]
#[command(about = "Game compatibility and per-game settings ingestion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write a Prometheus text snapshot here when the command finishes
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,
}

#[derive(Args)]
struct FetchArgs {
    /// Cache directory shared across sources
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Days before a cached response is revalidated
    #[arg(long)]
    max_age_days: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one source and write its canonical document
    Ingest {
        /// Source id (see `sources`)
        source: String,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        fetch: FetchArgs,
        /// Emit at most N items
        #[arg(long)]
        limit: Option<usize>,
        /// Local checkout to read instead of the network (dolphin-gameini)
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },
    /// Run every source, continuing past failures
    RunAll {
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        fetch: FetchArgs,
        /// Only sources whose id contains one of these (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },
    /// Merge compat.*.json documents into one collection
    Merge {
        #[arg(long)]
        in_dir: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// List available sources
    Sources,
}

fn load_config(fetch: &FetchArgs) -> Result<IngestConfig> {
    let mut config = IngestConfig::load().context("loading ingest config")?;
    if let Some(dir) = &fetch.cache_dir {
        config.cache.dir = dir.clone();
    }
    if let Some(days) = fetch.max_age_days {
        config.cache.max_age_days = days;
    }
    Ok(config)
}

fn run_options() -> RunOptions {
    RunOptions {
        github_token: std::env::var("GITHUB_TOKEN").ok(),
        ..RunOptions::default()
    }
}

fn write_metrics(path: Option<&Path>) {
    if let Some(path) = path {
        if let Err(e) = metrics::write_textfile(path) {
            error!("Failed to write metrics to {}: {}", path.display(), e);
        }
    }
}

fn execute(command: Commands) -> Result<bool> {
    let registry = SourceRegistry::new();
    match command {
        Commands::Ingest {
            source,
            out,
            fetch,
            limit,
            local_dir,
        } => {
            let config = load_config(&fetch)?;
            let fetcher = CachedFetcher::from_config(&config)?;
            let ctx = IngestContext::new(
                &fetcher,
                RunOptions {
                    limit,
                    local_dir,
                    ..run_options()
                },
            );
            let adapter = registry.get(&source)?;
            let run = run_source(adapter, &ctx, &out).with_context(|| format!("source {source} failed"))?;
            println!("✅ {}: wrote {} records → {}", run.source_id, run.records, run.output.display());
            Ok(true)
        }
        Commands::RunAll { out_dir, fetch, only } => {
            let config = load_config(&fetch)?;
            let out_dir = out_dir.unwrap_or_else(|| config.output.dir.clone());
            let fetcher = CachedFetcher::from_config(&config)?;
            let ctx = IngestContext::new(&fetcher, run_options());
            let summary = run_all(&registry, &ctx, &out_dir, &only);

            println!("\n📊 Batch results:");
            for run in &summary.succeeded {
                println!("   ✅ {} ({} records) → {}", run.source_id, run.records, run.output.display());
            }
            for (id, reason) in &summary.failed {
                println!("   ❌ {id}: {reason}");
            }
            if !summary.is_success() {
                println!("{} source(s) failed.", summary.failed.len());
            }
            Ok(summary.is_success())
        }
        Commands::Merge { in_dir, out } => {
            let inputs = discover_inputs(&in_dir)?;
            info!(inputs = inputs.len(), "merging");
            let (merged, report) = merge_files(&inputs, Utc::now())?;
            write_json(&out, &merged)?;
            for skipped in &report.skipped {
                println!("   ⚠️  skipped {}: {}", skipped.path.display(), skipped.reason);
            }
            println!(
                "✅ merged {} file(s), {} items ({} duplicates dropped) → {}",
                report.files_merged,
                merged.items.len(),
                report.duplicates_dropped,
                out.display()
            );
            Ok(true)
        }
        Commands::Sources => {
            for source in registry.iter() {
                println!("{:<22} {}", source.source_id(), source.schema_version());
            }
            Ok(true)
        }
    }
}

fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();
    let metrics_out = cli.metrics_out.clone();

    let code = match execute(cli.command) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {:#}", e);
            1
        }
    };
    write_metrics(metrics_out.as_deref());
    std::process::exit(code);
}
