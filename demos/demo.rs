//! Demo application: simulated traffic through a view tracker, then a report.
//!
//! Run with:
//! ```bash
//! cargo run --example demo --features demo -- --help
//! RUST_LOG=visite=debug cargo run --example demo --features demo -- --store journal --simulate 4
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use visite::format::{Formatter, NumberLocale};
use visite::gate::{RequestTarget, ViewDecisionContext};
use visite::observers::json::JsonObserver;
use visite::observers::prometheus::PrometheusObserver;
use visite::observers::table::{CompactSeparator, TableObserver, TableStyle};
use visite::store::journal::{JournalConfig, JournalStore};
use visite::store::memory::MemoryStore;
use visite::store::sqlite::{SqliteConfig, SqliteStore};
use visite::store::CounterStore;
use visite::tracker::{ViewOutcome, ViewTracker};

/// Output format for the report.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Ranked ASCII table
    Table,
    /// Compact table with multiple columns
    Compact,
    /// JSON format
    Json,
    /// Prometheus exposition format
    Prometheus,
}

/// Backing store selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreChoice {
    /// In-process only, lost on exit
    Memory,
    /// Append-only JSON-lines file
    Journal,
    /// SQLite database file
    Sqlite,
}

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Sharp,
    Modern,
    Markdown,
    Blank,
}

impl From<StyleChoice> for TableStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => TableStyle::Ascii,
            StyleChoice::Rounded => TableStyle::Rounded,
            StyleChoice::Sharp => TableStyle::Sharp,
            StyleChoice::Modern => TableStyle::Modern,
            StyleChoice::Markdown => TableStyle::Markdown,
            StyleChoice::Blank => TableStyle::Blank,
        }
    }
}

/// Number grouping selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LocaleChoice {
    #[default]
    EnUs,
    DeDe,
    FrFr,
    Plain,
}

impl From<LocaleChoice> for NumberLocale {
    fn from(choice: LocaleChoice) -> Self {
        match choice {
            LocaleChoice::EnUs => NumberLocale::en_us(),
            LocaleChoice::DeDe => NumberLocale::de_de(),
            LocaleChoice::FrFr => NumberLocale::fr_fr(),
            LocaleChoice::Plain => NumberLocale::plain(),
        }
    }
}

/// Demo application for visite - durable, concurrent view counting.
///
/// Opens a store, optionally drives simulated page views through the view
/// gate from several threads, and prints the most viewed content.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backing store
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreChoice,

    /// File for the journal or sqlite store
    #[arg(long)]
    path: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Table style (for table/compact formats)
    #[arg(short, long, value_enum, default_value = "rounded")]
    style: StyleChoice,

    /// Digit grouping for counts
    #[arg(long, value_enum, default_value = "en-us")]
    locale: LocaleChoice,

    /// Number of columns (for compact format)
    #[arg(short, long, default_value = "3")]
    columns: usize,

    /// How many items to report
    #[arg(long, default_value = "10")]
    top: usize,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Include timestamp in JSON output
    #[arg(long)]
    timestamp: bool,

    /// Prometheus metric namespace (prefix)
    #[arg(long, default_value = "demo")]
    namespace: String,

    /// Prometheus instance label
    #[arg(long)]
    instance: Option<String>,

    /// Simulate page views with N threads
    #[arg(long)]
    simulate: Option<usize>,

    /// Number of requests per thread in simulation
    #[arg(long, default_value = "10000")]
    iterations: usize,

    /// Number of distinct posts in simulation
    #[arg(long, default_value = "12")]
    posts: usize,

    /// Add a title to the output (table formats)
    #[arg(long)]
    title: Option<String>,

    /// Hide header in standard table mode
    #[arg(long)]
    no_header: bool,

    /// Also print the HTML fragment of the most viewed item
    #[arg(long)]
    render: bool,

    /// Watch mode: refresh every N milliseconds
    #[arg(short, long)]
    watch: Option<u64>,
}

fn open_store(args: &Args) -> Result<Arc<dyn CounterStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn CounterStore> = match args.store {
        StoreChoice::Memory => Arc::new(MemoryStore::new()),
        StoreChoice::Journal => {
            let path = args
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from("views.jsonl"));
            Arc::new(JournalStore::open(path, JournalConfig::new().compact_after(10_000))?)
        }
        StoreChoice::Sqlite => {
            let path = args
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from("views.sqlite3"));
            Arc::new(SqliteStore::open(path, SqliteConfig::new())?)
        }
    };
    Ok(store)
}

/// Tallies of what the gate and store did with the simulated requests.
#[derive(Debug, Default)]
struct Tally {
    counted: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// A request mix: mostly readers of single posts, some editors, listings and embeds.
fn request_for(n: usize) -> ViewDecisionContext {
    match n % 20 {
        0 => ViewDecisionContext::new(RequestTarget::Listing),
        1 => ViewDecisionContext::new(RequestTarget::single("post")).with_editor(true),
        2 => ViewDecisionContext::new(RequestTarget::single("post")).with_primary_query(false),
        3 => ViewDecisionContext::new(RequestTarget::single("page")),
        _ => ViewDecisionContext::new(RequestTarget::single("post")),
    }
}

fn simulate_traffic(
    tracker: &Arc<ViewTracker<Arc<dyn CounterStore>>>,
    num_threads: usize,
    iterations: usize,
    posts: usize,
) -> Tally {
    let tally = Arc::new(Tally::default());
    let posts = posts.max(1);

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let tracker = Arc::clone(tracker);
            let tally = Arc::clone(&tally);
            thread::spawn(move || {
                for j in 0..iterations {
                    // Skewed popularity: low-numbered posts get most traffic
                    let post = (j * j + i) % posts;
                    let id = format!("post-{post}");
                    let outcome = tracker.record_view(&id, &request_for(i * iterations + j));
                    let slot = match outcome {
                        ViewOutcome::Counted(_) => &tally.counted,
                        ViewOutcome::Skipped(_) => &tally.skipped,
                        ViewOutcome::Failed => &tally.failed,
                    };
                    slot.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            eprintln!("simulation thread panicked");
        }
    }

    Arc::try_unwrap(tally).unwrap_or_default()
}

fn render_output(args: &Args, store: &dyn CounterStore) -> String {
    let rendered = match args.format {
        OutputFormat::Table => {
            let mut observer = TableObserver::new()
                .with_style(args.style.into())
                .with_locale(args.locale.into())
                .with_header(!args.no_header);
            if let Some(ref title) = args.title {
                observer = observer.with_title(title.clone());
            }
            observer.render_top(store, args.top)
        }

        OutputFormat::Compact => {
            let mut observer = TableObserver::new()
                .compact(true)
                .columns(args.columns)
                .separator(CompactSeparator::Colon)
                .with_locale(args.locale.into())
                .with_style(args.style.into());
            if let Some(ref title) = args.title {
                observer = observer.with_title(title.clone());
            }
            observer.render_top(store, args.top)
        }

        OutputFormat::Json => JsonObserver::new()
            .pretty(args.pretty)
            .wrap_in_snapshot(args.timestamp)
            .include_timestamp(args.timestamp)
            .snapshot_json(store),

        OutputFormat::Prometheus => {
            let mut observer = PrometheusObserver::new().with_namespace(&args.namespace);
            if let Some(ref instance) = args.instance {
                observer = observer.with_const_label("instance", instance);
            }
            observer.render_top(store, args.top)
        }
    };
    rendered.unwrap_or_else(|e| format!("Error: {}", e))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let store = open_store(&args)?;
    let tracker = Arc::new(
        ViewTracker::new(Arc::clone(&store))
            .with_formatter(Formatter::new().with_locale(args.locale.into())),
    );

    if let Some(num_threads) = args.simulate {
        eprintln!(
            "Simulating {} threads × {} requests over {} posts...",
            num_threads, args.iterations, args.posts
        );
        let tally = simulate_traffic(&tracker, num_threads, args.iterations, args.posts);
        eprintln!(
            "Counted {}, skipped {}, failed {}.\n",
            tally.counted.load(Ordering::Relaxed),
            tally.skipped.load(Ordering::Relaxed),
            tally.failed.load(Ordering::Relaxed),
        );
    }

    loop {
        if args.watch.is_some() {
            // Clear screen (ANSI escape code)
            print!("\x1B[2J\x1B[1;1H");
        }

        println!("{}", render_output(&args, store.as_ref()));

        if args.render {
            if let Some(top) = store.order_by_count_descending(1, 0)?.first() {
                println!("{}", tracker.render(top.id.as_str()));
            }
        }

        match args.watch {
            Some(interval_ms) => thread::sleep(Duration::from_millis(interval_ms)),
            None => return Ok(()),
        }
    }
}
