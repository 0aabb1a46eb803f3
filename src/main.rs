use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use typeahead::coordinator::{
    LatencyBackend, ResultBatch, ResultFeed, ResultSink, SearchBackend, SearchCoordinator,
};
use typeahead::error::QueryError;
use typeahead::output;
use typeahead::store::{self, CaseMatching, LoadReport, MatchMode, StoreStats, TextIndexStore};
use typeahead::utils::{AppConfig, get_config_path};

#[derive(Parser)]
#[command(name = "typeahead")]
#[command(version, about = "Debounced search-as-you-type over a record file")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the configured match policy
#[derive(Args, Debug, Clone, Default)]
struct MatchArgs {
    /// Match anywhere in the name instead of at the start
    #[arg(long)]
    substring: bool,

    /// Compare lowercase names and terms
    #[arg(short, long)]
    ignore_case: bool,

    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Also match this payload field (e.g. iata_code) as a substring
    #[arg(long, value_name = "FIELD")]
    code_field: Option<String>,
}

impl MatchArgs {
    fn apply(&self, config: &mut AppConfig) {
        if self.substring {
            config.search.match_mode = MatchMode::Substring;
        }
        if self.ignore_case {
            config.search.case_matching = CaseMatching::Insensitive;
        }
        if let Some(limit) = self.limit {
            config.search.result_limit = limit;
        }
        if let Some(field) = &self.code_field {
            config.search.code_field = Some(field.clone());
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query against a record file
    Search {
        /// Record file (.json array or JSON lines)
        file: PathBuf,

        /// Search term (empty lists the first records)
        #[arg(default_value = "")]
        term: String,

        #[command(flatten)]
        matching: MatchArgs,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,

        /// Also print payload fields
        #[arg(long)]
        fields: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Feed a sequence of terms through a coordinator and report what it published
    Simulate {
        /// Record file (.json array or JSON lines)
        file: PathBuf,

        /// Terms in the order they are "typed"
        #[arg(required = true)]
        terms: Vec<String>,

        /// Pause between terms
        #[arg(long, default_value_t = 100)]
        gap_ms: u64,

        /// Artificial delay added to every query
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        /// Override the configured debounce delay
        #[arg(long)]
        debounce_ms: Option<u64>,

        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Show load report and store statistics for a record file
    Stats {
        /// Record file (.json array or JSON lines)
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
    /// Interactive search-as-you-type UI
    #[cfg(feature = "interactive")]
    Interactive {
        /// Record file (.json array or JSON lines)
        file: PathBuf,

        /// Initial search term
        #[arg(short, long)]
        term: Option<String>,

        /// Write logs here (the terminal is taken by the UI)
        #[arg(long)]
        log_file: Option<PathBuf>,

        #[command(flatten)]
        matching: MatchArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            file,
            term,
            matching,
            json,
            fields,
            no_color,
        } => {
            init_logging(cli.verbose);
            let config = load_config(&matching)?;
            let store = open_store(&config, &file, json)?;

            let records = store.search(&term, config.search.result_limit)?;
            if json {
                output::print_json_lines(&records)?;
            } else {
                output::print_records(&records, store.matcher(), &term, !no_color, fields)?;
            }
        }
        Commands::Simulate {
            file,
            terms,
            gap_ms,
            latency_ms,
            debounce_ms,
            matching,
        } => {
            init_logging(cli.verbose);
            let mut config = load_config(&matching)?;
            if let Some(ms) = debounce_ms {
                config.search.debounce_ms = ms;
            }
            let store = open_store(&config, &file, true)?;
            simulate(
                &config,
                store,
                terms,
                Duration::from_millis(gap_ms),
                Duration::from_millis(latency_ms),
            )?;
        }
        Commands::Stats { file, json } => {
            init_logging(cli.verbose);
            let config = AppConfig::load()?;
            let store = TextIndexStore::new(config.store_options());
            let report = store::load_path(&store, &file, json)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let stats = store.stats();

            if json {
                #[derive(Serialize)]
                struct StatsReport<'a> {
                    load: &'a LoadReport,
                    store: &'a StoreStats,
                }
                let out = StatsReport {
                    load: &report,
                    store: &stats,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_load_report(&report);
                println!();
                store::stats::show_stats(&stats);
            }
        }
        Commands::Config { path } => {
            init_logging(cli.verbose);
            if path {
                println!("{}", get_config_path()?.display());
            } else {
                let config = AppConfig::load()?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        #[cfg(feature = "interactive")]
        Commands::Interactive {
            file,
            term,
            log_file,
            matching,
        } => {
            if let Some(log_file) = &log_file {
                init_file_logging(cli.verbose, log_file)?;
            }
            let config = load_config(&matching)?;
            let store = open_store(&config, &file, false)?;
            typeahead::tui::run(file, store, config.coordinator_options(), term)?;
        }
    }

    Ok(())
}

fn filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "interactive")]
fn init_file_logging(verbose: u8, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

fn load_config(matching: &MatchArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load()?;
    matching.apply(&mut config);
    Ok(config)
}

fn open_store(config: &AppConfig, file: &Path, silent: bool) -> Result<Arc<TextIndexStore>> {
    let store = TextIndexStore::new(config.store_options());
    let report = store::load_path(&store, file, silent)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    if report.loaded == 0 {
        eprintln!("warning: no records loaded from {}", file.display());
    }
    Ok(Arc::new(store))
}

fn print_load_report(report: &LoadReport) {
    println!("Load Report");
    println!("===========");
    println!();
    println!("Loaded:           {}", report.loaded);
    println!("Malformed:        {}", report.malformed);
    println!("Duplicates:       {}", report.duplicates);
    for issue in &report.issues {
        println!("  - {}", issue);
    }
}

/// Prints every sink event with its offset from the first keystroke
struct PrintSink {
    start: Instant,
}

impl PrintSink {
    fn stamp(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl ResultSink for PrintSink {
    fn clear(&self) {
        println!("+{:>5}ms  clear", self.stamp());
    }

    fn replace(&self, batch: ResultBatch) {
        let shown: Vec<&str> = batch.names().take(5).collect();
        let more = batch.len().saturating_sub(shown.len());
        let tail = if more > 0 {
            format!(" (+{} more)", more)
        } else {
            String::new()
        };
        println!(
            "+{:>5}ms  results for '{}': {}{}",
            self.stamp(),
            batch.term,
            shown.join(", "),
            tail
        );
    }

    fn fail(&self, term: &str, error: &QueryError) {
        println!("+{:>5}ms  failed '{}': {}", self.stamp(), term, error);
    }
}

fn simulate(
    config: &AppConfig,
    store: Arc<TextIndexStore>,
    terms: Vec<String>,
    gap: Duration,
    latency: Duration,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        let backend: Arc<dyn SearchBackend> = if latency.is_zero() {
            store
        } else {
            Arc::new(LatencyBackend::new(store, latency))
        };
        let feed = Arc::new(ResultFeed::new());
        let start = Instant::now();
        let sinks: Arc<dyn ResultSink> = Arc::new(Tee {
            print: PrintSink { start },
            feed: feed.clone(),
        });
        let coordinator = SearchCoordinator::new(backend, sinks, config.coordinator_options())?;

        for (i, term) in terms.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(gap).await;
            }
            println!("+{:>5}ms  type '{}'", start.elapsed().as_millis(), term);
            coordinator.set_search_term(term);
        }
        coordinator.settle().await;

        let stats = coordinator.stats();
        println!();
        println!("Final: {}", feed.snapshot().names().join(", "));
        println!("{}", serde_json::to_string_pretty(&stats)?);
        Ok::<_, anyhow::Error>(())
    })
}

/// Forwards sink events to the printer and the feed
struct Tee {
    print: PrintSink,
    feed: Arc<ResultFeed>,
}

impl ResultSink for Tee {
    fn clear(&self) {
        self.print.clear();
        self.feed.clear();
    }

    fn replace(&self, batch: ResultBatch) {
        self.print.replace(batch.clone());
        self.feed.replace(batch);
    }

    fn fail(&self, term: &str, error: &QueryError) {
        self.print.fail(term, error);
        self.feed.fail(term, error);
    }
}
