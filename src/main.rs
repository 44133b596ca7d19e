//! KBBI Harvest main entry point
//!
//! This is the command-line interface for harvesting the KBBI headword
//! inventory and enriching word lists with dictionary senses.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use kbbi_harvest::config::{load_config_with_hash, Config};
use kbbi_harvest::crawler::{BatchScheduler, EntryFetcher, Harvester, RetryPolicy, Session};
use kbbi_harvest::output::{load_statistics, print_statistics};
use kbbi_harvest::proxy::{Provider, ProxyConfig, ProxyMode, ProxySelector};
use kbbi_harvest::source::WordSource;
use kbbi_harvest::state::{CheckpointStore, NoResultStore};
use kbbi_harvest::storage::{self, open_storage, RunMode, RunStatus, SharedStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use url::Url;

/// KBBI Harvest: dictionary inventory and enrichment
///
/// Walks the alphabetical index of the KBBI online dictionary to build a
/// headword inventory, and enriches word lists with the senses found on
/// each entry page. Results are stored in SQLite.
#[derive(Parser, Debug)]
#[command(name = "kbbi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "KBBI headword harvest and enrichment", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the alphabetical index into the headword inventory
    Harvest,

    /// Look up every word of a list and store its senses
    Enrich(EnrichArgs),

    /// Show statistics from the database and side files
    Stats,

    /// Validate the configuration and show what would run
    Check,
}

#[derive(Args, Debug)]
struct EnrichArgs {
    /// Where the words come from
    #[arg(long, value_enum, default_value_t = SourceArg::File)]
    source: SourceArg,

    /// Word list to read instead of the configured one
    #[arg(long, value_name = "PATH")]
    wordlist: Option<PathBuf>,

    /// Proxy mode: none, residential or datacenter
    #[arg(long)]
    proxy: Option<ProxyMode>,

    /// Proxy-API provider for datacenter mode
    #[arg(long)]
    provider: Option<Provider>,

    /// Words per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum words in flight
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    /// Local newline-delimited file
    File,
    /// Headwords harvested into the database
    Storage,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let start = Instant::now();

    match cli.command {
        Command::Harvest => handle_harvest(&config, &config_hash).await?,
        Command::Enrich(args) => handle_enrich(&config, &config_hash, &args).await?,
        Command::Stats => handle_stats(&config)?,
        Command::Check => handle_check(&config)?,
    }

    tracing::info!("Total execution time: {:?}", start.elapsed());
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kbbi_harvest=info,warn"),
            1 => EnvFilter::new("kbbi_harvest=debug,info"),
            2 => EnvFilter::new("kbbi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_shared_storage(config: &Config) -> anyhow::Result<SharedStorage> {
    let path = Path::new(&config.storage.database_path);
    let storage = open_storage(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(storage::shared(storage))
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::new(
        config.enrich.max_retries,
        Duration::from_secs(config.enrich.retry_delay_secs),
    )
}

/// Proxy choice for an enrichment run: command-line flags over the config file
fn effective_proxy(config: &Config, args: &EnrichArgs) -> ProxyConfig {
    let mode = args.proxy.unwrap_or(config.proxy.mode);
    let provider = match mode {
        ProxyMode::Datacenter => Some(args.provider.unwrap_or(config.proxy.provider)),
        _ => None,
    };
    ProxyConfig { mode, provider }
}

/// Batch size and concurrency: explicit flag, else the provider default, else the config
fn effective_limits(config: &Config, args: &EnrichArgs, proxy: &ProxyConfig) -> (usize, usize) {
    let hint = proxy.batch_hint();
    let batch_size = args
        .batch_size
        .or(hint.map(|(batch, _)| batch))
        .unwrap_or(config.enrich.batch_size);
    let concurrency = args
        .concurrency
        .or(hint.map(|(_, concurrency)| concurrency))
        .unwrap_or(config.enrich.concurrency);
    (batch_size.max(1), concurrency.max(1))
}

/// Status recorded in the run ledger for a finished run
fn final_status(halted: bool) -> RunStatus {
    if halted {
        RunStatus::Halted
    } else {
        RunStatus::Completed
    }
}

/// Handles the `harvest` command: crawls the alphabet index
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let storage = open_shared_storage(config)?;
    let run_id = storage::lock(&storage).create_run(RunMode::Harvest, config_hash)?;
    tracing::info!("Starting harvest run {}", run_id);

    let result = run_harvest(config, storage.clone()).await;
    let status = match &result {
        Ok(summary) => final_status(summary.halted),
        Err(_) => RunStatus::Failed,
    };
    storage::lock(&storage).finish_run(run_id, status)?;

    let summary = result?;
    tracing::info!("Harvest run {} finished: {}", run_id, summary);
    Ok(())
}

async fn run_harvest(
    config: &Config,
    storage: SharedStorage,
) -> anyhow::Result<kbbi_harvest::crawler::HarvestSummary> {
    let base_url = Url::parse(&config.site.base_url)?;
    let session = Session::new(
        base_url.clone(),
        Duration::from_secs(config.site.request_timeout_secs),
    )?;

    match config.credentials.login() {
        Some((email, password)) => session
            .login(email, password)
            .await
            .context("Login to the dictionary site failed")?,
        None => tracing::warn!("No site credentials configured, harvesting without login"),
    }

    let checkpoint = Arc::new(CheckpointStore::load(&config.storage.checkpoint_path));
    let letters: Vec<char> = config.harvest.letters.chars().collect();

    let harvester = Harvester::new(
        session.client().clone(),
        base_url,
        storage,
        checkpoint,
        retry_policy(config),
    );

    Ok(harvester.run(&letters, config.harvest.concurrency).await)
}

/// Handles the `enrich` command: looks up every word of the list
async fn handle_enrich(config: &Config, config_hash: &str, args: &EnrichArgs) -> anyhow::Result<()> {
    let storage = open_shared_storage(config)?;

    let source = match args.source {
        SourceArg::File => WordSource::File(
            args.wordlist
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.enrich.wordlist_path)),
        ),
        SourceArg::Storage => WordSource::Storage,
    };
    let words = source
        .load(&storage)
        .with_context(|| format!("Failed to read words from {}", source))?;
    if words.is_empty() {
        tracing::warn!("No words to process from {}", source);
        return Ok(());
    }

    let proxy = effective_proxy(config, args);
    let (batch_size, concurrency) = effective_limits(config, args, &proxy);

    // fails on missing provider credentials before any request is made
    let fetcher = EntryFetcher::from_config(config, proxy).await?;
    let no_results = Arc::new(NoResultStore::load(&config.storage.no_result_path));

    let run_id = storage::lock(&storage).create_run(RunMode::Enrich, config_hash)?;
    tracing::info!(
        "Starting enrichment run {}: {} words from {}",
        run_id,
        words.len(),
        source
    );

    let scheduler = BatchScheduler::new(Arc::new(fetcher), storage.clone(), no_results);
    let summary = scheduler.run(words, batch_size, concurrency).await;

    storage::lock(&storage).finish_run(run_id, final_status(summary.halted))?;
    tracing::info!("Enrichment run {} finished: {}", run_id, summary);
    Ok(())
}

/// Handles the `stats` command: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let no_results = NoResultStore::load(&config.storage.no_result_path);
    let checkpoint = CheckpointStore::load(&config.storage.checkpoint_path);

    let stats = load_statistics(&storage, &no_results, &checkpoint)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the `check` command: validates config and shows what would run
fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== KBBI Harvest Check ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Request timeout: {}s", config.site.request_timeout_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Checkpoint: {}", config.storage.checkpoint_path);
    println!("  No-result list: {}", config.storage.no_result_path);

    println!("\nHarvest:");
    println!("  Letters: {}", config.harvest.letters);
    println!("  Concurrency: {}", config.harvest.concurrency);
    println!(
        "  Login: {}",
        if config.credentials.login().is_some() {
            "configured"
        } else {
            "anonymous"
        }
    );

    let proxy = ProxyConfig {
        mode: config.proxy.mode,
        provider: (config.proxy.mode == ProxyMode::Datacenter).then_some(config.proxy.provider),
    };
    let selector = ProxySelector::new(proxy, &config.proxy, &config.credentials)?;
    let (batch_size, concurrency) = proxy
        .batch_hint()
        .unwrap_or((config.enrich.batch_size, config.enrich.concurrency));

    println!("\nEnrich:");
    println!("  Word list: {}", config.enrich.wordlist_path);
    println!("  Proxy: {}", selector.config());
    println!("  Batch size: {}", batch_size);
    println!("  Concurrency: {}", concurrency);
    println!(
        "  Retries: {} attempts, {}s apart",
        config.enrich.max_retries, config.enrich.retry_delay_secs
    );
    println!(
        "  Header pool: {}",
        if config.credentials.provider_key(Provider::ScrapeOps).is_some() {
            "ScrapeOps browser headers"
        } else {
            "built-in browser headers"
        }
    );

    println!("\n✓ Configuration is valid");

    Ok(())
}
