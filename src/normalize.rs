use crate::types::{CleanedRecord, RawApproachRecord};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// Why a raw record was excluded from the cleaned output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DropReason {
    InvalidNumber { field: &'static str, value: String },
    MissingDate,
    InvalidDate { value: String },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::InvalidNumber { field, value } => {
                write!(f, "field '{}' is not numeric: '{}'", field, value)
            }
            DropReason::MissingDate => write!(f, "close_approach_date is missing"),
            DropReason::InvalidDate { value } => {
                write!(f, "close_approach_date is not a valid date: '{}'", value)
            }
        }
    }
}

/// Cleaned survivors in input order, plus the (input index, reason) pairs for
/// every dropped record so drop rates stay observable.
#[derive(Debug, Serialize)]
pub struct CleanOutcome {
    pub records: Vec<CleanedRecord>,
    pub dropped: Vec<(usize, DropReason)>,
}

/// Coerces every record's numerics and validates its approach date. A record
/// failing any coercion is dropped whole; siblings are unaffected.
pub fn clean(records: &[RawApproachRecord]) -> CleanOutcome {
    let mut cleaned = Vec::with_capacity(records.len());
    let mut dropped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match clean_record(record) {
            Ok(clean) => cleaned.push(clean),
            Err(reason) => dropped.push((index, reason)),
        }
    }

    info!(
        "Cleaned {} records, dropped {}",
        cleaned.len(),
        dropped.len()
    );
    CleanOutcome {
        records: cleaned,
        dropped,
    }
}

/// Normalizes a single record, reporting exactly which coercion failed.
pub fn clean_record(record: &RawApproachRecord) -> Result<CleanedRecord, DropReason> {
    let close_approach_date = match record.close_approach_date.as_deref() {
        None => return Err(DropReason::MissingDate),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            DropReason::InvalidDate {
                value: raw.to_string(),
            }
        })?,
    };

    Ok(CleanedRecord {
        id: record.id.clone(),
        neo_reference_id: record.neo_reference_id.clone(),
        name: record.name.clone(),
        absolute_magnitude_h: parse_optional_f64("absolute_magnitude_h", &record.absolute_magnitude_h)?,
        estimated_diameter_min_km: parse_optional_f64(
            "estimated_diameter_min_km",
            &record.estimated_diameter_min_km,
        )?,
        estimated_diameter_max_km: parse_optional_f64(
            "estimated_diameter_max_km",
            &record.estimated_diameter_max_km,
        )?,
        is_potentially_hazardous_asteroid: record
            .is_potentially_hazardous_asteroid
            .unwrap_or(false),
        close_approach_date,
        relative_velocity_kmph: parse_optional_f64(
            "relative_velocity_kmph",
            &record.relative_velocity_kmph,
        )?,
        miss_distance_km: parse_optional_f64("miss_distance_km", &record.miss_distance_km)?,
        miss_distance_lunar: parse_optional_f64("miss_distance_lunar", &record.miss_distance_lunar)?,
        miss_distance_astronomical: parse_optional_f64(
            "miss_distance_astronomical",
            &record.miss_distance_astronomical,
        )?,
        orbiting_body: record.orbiting_body.clone(),
    })
}

/// Empty or absent source values become explicit absence, never zero.
fn parse_optional_f64(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<f64>, DropReason> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DropReason::InvalidNumber {
                field,
                value: raw.to_string(),
            }),
    }
}
