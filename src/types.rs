use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One flattened (asteroid, close-approach) pair exactly as it came off the
/// feed. Numeric fields stay as strings here; coercion happens in the
/// normalize step. This is also the shape written to the raw JSON dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawApproachRecord {
    pub id: Option<String>,
    pub neo_reference_id: Option<String>,
    pub name: Option<String>,
    pub absolute_magnitude_h: Option<String>,
    pub estimated_diameter_min_km: Option<String>,
    pub estimated_diameter_max_km: Option<String>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    pub close_approach_date: Option<String>,
    pub relative_velocity_kmph: Option<String>,
    pub miss_distance_km: Option<String>,
    pub miss_distance_lunar: Option<String>,
    pub miss_distance_astronomical: Option<String>,
    pub orbiting_body: Option<String>,
}

/// A record that survived normalization: numerics coerced, date validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub id: Option<String>,
    pub neo_reference_id: Option<String>,
    pub name: Option<String>,
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter_min_km: Option<f64>,
    pub estimated_diameter_max_km: Option<f64>,
    pub is_potentially_hazardous_asteroid: bool,
    pub close_approach_date: NaiveDate,
    pub relative_velocity_kmph: Option<f64>,
    pub miss_distance_km: Option<f64>,
    pub miss_distance_lunar: Option<f64>,
    pub miss_distance_astronomical: Option<f64>,
    pub orbiting_body: Option<String>,
}

impl From<&CleanedRecord> for RawApproachRecord {
    /// Renders a cleaned record back into feed shape, e.g. for replaying a
    /// dump through the normalize step.
    fn from(record: &CleanedRecord) -> Self {
        let fmt = |v: Option<f64>| v.map(|f| f.to_string());
        RawApproachRecord {
            id: record.id.clone(),
            neo_reference_id: record.neo_reference_id.clone(),
            name: record.name.clone(),
            absolute_magnitude_h: fmt(record.absolute_magnitude_h),
            estimated_diameter_min_km: fmt(record.estimated_diameter_min_km),
            estimated_diameter_max_km: fmt(record.estimated_diameter_max_km),
            is_potentially_hazardous_asteroid: Some(record.is_potentially_hazardous_asteroid),
            close_approach_date: Some(record.close_approach_date.format("%Y-%m-%d").to_string()),
            relative_velocity_kmph: fmt(record.relative_velocity_kmph),
            miss_distance_km: fmt(record.miss_distance_km),
            miss_distance_lunar: fmt(record.miss_distance_lunar),
            miss_distance_astronomical: fmt(record.miss_distance_astronomical),
            orbiting_body: record.orbiting_body.clone(),
        }
    }
}
