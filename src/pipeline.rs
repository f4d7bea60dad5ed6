use crate::apis::neo_feed::{fetch_approaches, FeedSource};
use crate::config::Config;
use crate::error::{Result, ScraperError};
use crate::normalize::{clean, CleanOutcome};
use crate::storage::{LoadStats, NeoStore};
use crate::types::RawApproachRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Result of a complete ingestion run.
#[derive(Debug, Serialize)]
pub struct PipelineSummary {
    pub fetched_records: usize,
    pub dump_path: String,
    pub cleaned_records: usize,
    pub dropped_records: usize,
    pub load: LoadStats,
}

/// Runs the full pipeline: fetch every page, write the raw JSON audit dump,
/// clean, then load. Stages are strictly sequential; any transport or storage
/// error aborts the run.
#[instrument(skip(config, source, store))]
pub async fn run(
    config: &Config,
    source: &dyn FeedSource,
    store: &mut NeoStore,
) -> Result<PipelineSummary> {
    let start_date =
        NaiveDate::parse_from_str(&config.feed.start_date, "%Y-%m-%d").map_err(|e| {
            ScraperError::Config(format!(
                "invalid feed.start_date '{}': {}",
                config.feed.start_date, e
            ))
        })?;

    info!(
        "Fetching close-approach records from {} (target {})",
        start_date, config.feed.target_count
    );
    let raw = fetch_approaches(source, start_date, config.feed.target_count).await?;

    write_raw_dump(&config.output.raw_json_path, &raw)?;

    let CleanOutcome { records, dropped } = clean(&raw);
    if !dropped.is_empty() {
        warn!(
            "Dropped {} of {} records during cleaning",
            dropped.len(),
            raw.len()
        );
        for (index, reason) in &dropped {
            debug!("Record {} dropped: {}", index, reason);
        }
    }

    let load = store.load(&records)?;

    Ok(PipelineSummary {
        fetched_records: raw.len(),
        dump_path: config.output.raw_json_path.clone(),
        cleaned_records: records.len(),
        dropped_records: dropped.len(),
        load,
    })
}

/// Writes the flattened raw records as pretty-printed JSON for audit/replay.
fn write_raw_dump(path: &str, records: &[RawApproachRecord]) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    info!("Wrote {} raw records to {}", records.len(), path);
    Ok(())
}
