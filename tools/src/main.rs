//! seed-runner: populate a tracker database with synthetic data.
//!
//! Usage:
//!   seed-runner --db tracker.db --seed 7
//!   seed-runner --db tracker.db --config seed.json --json
//!   seed-runner --db tracker.db --teardown window
//!
//! The database path falls back to $TRACKER_DB, then ./tracker.db.

use anyhow::{bail, Result};
use std::env;
use tracker_seed_core::{
    config::GenConfig,
    generator,
    store::TrackerStore,
    teardown::{self, TeardownMode, TeardownScope},
    types::RequestKind,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db")
        .map(str::to_string)
        .or_else(|| env::var("TRACKER_DB").ok())
        .unwrap_or_else(|| "tracker.db".to_string());
    let mut config = match flag_value(&args, "--config") {
        Some(path) => GenConfig::load(path)?,
        None => GenConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    let json = args.iter().any(|a| a == "--json");
    let mode = match flag_value(&args, "--teardown") {
        None => None,
        Some("all") => Some(TeardownMode::All),
        Some("window") => Some(TeardownMode::Window(TeardownScope::from_config(&config))),
        Some(other) => bail!("--teardown expects 'all' or 'window', got '{other}'"),
    };

    log::info!("seed-runner: db={db} seed={}", config.seed);
    let store = TrackerStore::open(&db)?;
    store.migrate()?;

    if let Some(mode) = mode {
        let report = teardown::teardown(&store, &mode)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Teardown of {db}");
            for (table, n) in &report.deleted {
                println!("  {table:<22} {n:>8} deleted");
            }
            println!("  {:<22} {:>8} deleted", "total", report.total());
        }
        return Ok(());
    }

    let report = generator::generate(&store, &config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Tracker seed run");
    println!("  db:    {db}");
    println!("  seed:  {}", report.seed);
    println!();
    println!("  {:<22} {:>10} {:>10}", "entity", "requested", "persisted");
    for (label, count) in report.entities() {
        println!(
            "  {label:<22} {:>10} {:>10}",
            count.requested.0, count.persisted.0
        );
    }
    println!("  {:<22} {:>10}", "fallback allocations", report.fallback_allocations);
    println!();

    println!("Store totals");
    for (table, n) in store.row_counts()? {
        println!("  {table:<22} {n:>10}");
    }
    println!(
        "  max specialties per engineer: {}",
        store.max_specialties_held()?
    );
    for kind in [RequestKind::Feature, RequestKind::Bug] {
        println!(
            "  max {} submissions per submitter-day: {}",
            kind.name(),
            store.max_daily_submissions(kind)?
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
