//! Genealogy Engine Benchmark
//!
//! Generates a synthetic population and times each query against it.
//! An optional first argument names a JSON engine configuration.

use std::time::Instant;

use chrono::Local;
use genealogy::{
    build_subtree, compute_stats_with, generate_population, kinship_with, upcoming_events_with,
    Direction, EngineConfig, EventOptions, PersonId, PopulationSpec, SnapshotStore,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn physical_memory_mb() -> f64 {
    memory_stats::memory_stats()
        .map(|stats| stats.physical_mem as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let config = EngineConfig::from_json(&std::fs::read_to_string(&path)?)?;
            info!("Loaded configuration from {}", path);
            config
        }
        None => EngineConfig::default(),
    };

    info!("Genealogy engine benchmark starting...");
    let spec = PopulationSpec {
        founder_couples: 2_000,
        generations: 8,
        ..PopulationSpec::default()
    };

    let start = Instant::now();
    let records = generate_population(&spec)?;
    info!("Generated {} people in {:?}", records.len(), start.elapsed());

    let start = Instant::now();
    let (store, report) = SnapshotStore::new(records)?;
    if !report.is_empty() {
        warn!("Validation reported {} issues", report.len());
    }
    let snapshot = store.current();
    info!(
        "Snapshot built in {:?}, {:.1} MB resident",
        start.elapsed(),
        physical_memory_mb()
    );

    let ids: Vec<PersonId> = snapshot.persons().map(|p| p.id).collect();
    let (Some(&first), Some(&last)) = (ids.first(), ids.last()) else {
        warn!("Empty population, nothing to benchmark");
        return Ok(());
    };

    let start = Instant::now();
    let mut related = 0;
    for (a, b) in ids.iter().zip(ids.iter().rev()).take(1_000) {
        if kinship_with(&snapshot, *a, *b, &config)?.is_related() {
            related += 1;
        }
    }
    info!("1000 kinship queries in {:?}, {} related", start.elapsed(), related);

    let start = Instant::now();
    let tree = build_subtree(&snapshot, first, Direction::Descendants, config.tree_max_depth)?;
    let ancestors = build_subtree(&snapshot, last, Direction::Ancestors, config.tree_max_depth)?;
    info!(
        "Subtrees in {:?}: {} descendants, {} ancestors",
        start.elapsed(),
        tree.size(),
        ancestors.size()
    );

    let today = Local::now().date_naive();
    let start = Instant::now();
    let events = upcoming_events_with(&snapshot, &EventOptions::from(&config), today);
    info!("{} upcoming events in {:?}", events.len(), start.elapsed());

    let start = Instant::now();
    let stats = compute_stats_with(&snapshot, today, &config);
    info!(
        "Stats in {:?}: {} alive, {} deceased, average lifespan {:?}",
        start.elapsed(),
        stats.alive_count,
        stats.deceased_count,
        stats.average_lifespan
    );

    info!("Benchmark complete, {:.1} MB resident", physical_memory_mb());
    Ok(())
}
