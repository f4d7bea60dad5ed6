use crate::config::Config;
use crate::error::{Result, ScraperError};
use crate::types::RawApproachRecord;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// One page of the NeoWs feed: a date-keyed map of asteroid objects plus the
/// pagination link to the next page.
#[derive(Debug, Deserialize)]
pub struct FeedPage {
    pub links: PageLinks,
    /// BTreeMap so flattening walks dates in a deterministic order.
    pub near_earth_objects: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct PageLinks {
    pub next: Option<String>,
}

/// Source of feed pages. The production implementation is `NeoFeedClient`;
/// tests inject scripted sources to exercise the pagination loop offline.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// URL of the first feed page for the given start date.
    fn first_page_url(&self, start_date: NaiveDate) -> String;

    /// Fetch and deserialize a single feed page.
    async fn fetch_page(&self, url: &str) -> Result<FeedPage>;
}

pub struct NeoFeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NeoFeedClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.feed.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.feed.base_url.clone(),
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl FeedSource for NeoFeedClient {
    fn first_page_url(&self, start_date: NaiveDate) -> String {
        format!(
            "{}?start_date={}&api_key={}",
            self.base_url,
            start_date.format("%Y-%m-%d"),
            self.api_key
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<FeedPage> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Api {
                message: format!("feed page request returned status {}", status.as_u16()),
            });
        }
        let page = response.json::<FeedPage>().await?;
        Ok(page)
    }
}

/// Walks feed pages from `start_date`, flattening every (asteroid, approach)
/// pair, until `target_count` records have accumulated or the feed reports no
/// further page. Overshoot from the last page batch is truncated.
#[instrument(skip(source))]
pub async fn fetch_approaches(
    source: &dyn FeedSource,
    start_date: NaiveDate,
    target_count: usize,
) -> Result<Vec<RawApproachRecord>> {
    let mut records: Vec<RawApproachRecord> = Vec::new();
    let mut next_url = Some(source.first_page_url(start_date));

    loop {
        if records.len() >= target_count {
            break;
        }
        let url = match next_url.take() {
            Some(url) => url,
            None => break,
        };
        let page = source.fetch_page(&url).await?;
        let batch = flatten_page(&page);
        debug!("Flattened {} approach records from feed page", batch.len());
        records.extend(batch);
        next_url = page.links.next;
    }

    records.truncate(target_count);
    info!("Fetched {} flattened approach records", records.len());
    Ok(records)
}

/// Flattens one page into per-approach records. Asteroids without a
/// `close_approach_data` list contribute nothing.
pub fn flatten_page(page: &FeedPage) -> Vec<RawApproachRecord> {
    let mut records = Vec::new();
    for asteroids in page.near_earth_objects.values() {
        for asteroid in asteroids {
            let approaches = match asteroid.get("close_approach_data").and_then(Value::as_array) {
                Some(list) if !list.is_empty() => list,
                _ => continue,
            };
            for approach in approaches {
                records.push(flatten_approach(asteroid, approach));
            }
        }
    }
    records
}

fn flatten_approach(asteroid: &Value, approach: &Value) -> RawApproachRecord {
    RawApproachRecord {
        id: field(asteroid, &["id"]),
        neo_reference_id: field(asteroid, &["neo_reference_id"]),
        name: field(asteroid, &["name"]),
        absolute_magnitude_h: field(asteroid, &["absolute_magnitude_h"]),
        estimated_diameter_min_km: field(
            asteroid,
            &["estimated_diameter", "kilometers", "estimated_diameter_min"],
        ),
        estimated_diameter_max_km: field(
            asteroid,
            &["estimated_diameter", "kilometers", "estimated_diameter_max"],
        ),
        is_potentially_hazardous_asteroid: asteroid
            .get("is_potentially_hazardous_asteroid")
            .and_then(Value::as_bool),
        close_approach_date: field(approach, &["close_approach_date"]),
        relative_velocity_kmph: field(approach, &["relative_velocity", "kilometers_per_hour"]),
        miss_distance_km: field(approach, &["miss_distance", "kilometers"]),
        miss_distance_lunar: field(approach, &["miss_distance", "lunar"]),
        miss_distance_astronomical: field(approach, &["miss_distance", "astronomical"]),
        orbiting_body: field(approach, &["orbiting_body"]),
    }
}

/// Looks up a nested scalar and captures it as a string. The feed serves most
/// numerics as strings already; bare JSON numbers are stringified so the raw
/// record shape stays uniform.
fn field(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asteroid_with_approaches(id: &str, approaches: Vec<Value>) -> Value {
        json!({
            "id": id,
            "neo_reference_id": id,
            "name": format!("({} XB1)", id),
            "absolute_magnitude_h": 21.5,
            "estimated_diameter": {
                "kilometers": {
                    "estimated_diameter_min": "0.146",
                    "estimated_diameter_max": "0.327"
                }
            },
            "is_potentially_hazardous_asteroid": false,
            "close_approach_data": approaches
        })
    }

    fn approach(date: &str) -> Value {
        json!({
            "close_approach_date": date,
            "relative_velocity": { "kilometers_per_hour": "45000.5" },
            "miss_distance": {
                "astronomical": "0.3",
                "lunar": "116.7",
                "kilometers": "44880000"
            },
            "orbiting_body": "Earth"
        })
    }

    fn page(next: Option<&str>, asteroids: Vec<Value>) -> FeedPage {
        let mut near_earth_objects = BTreeMap::new();
        near_earth_objects.insert("2024-01-01".to_string(), asteroids);
        FeedPage {
            links: PageLinks {
                next: next.map(String::from),
            },
            near_earth_objects,
        }
    }

    #[test]
    fn flattening_emits_one_record_per_approach() {
        let page = page(
            None,
            vec![asteroid_with_approaches(
                "3542519",
                vec![approach("2024-01-01"), approach("2024-01-05"), approach("2024-02-11")],
            )],
        );

        let records = flatten_page(&page);
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.id.as_deref(), Some("3542519"));
            assert_eq!(record.name.as_deref(), Some("(3542519 XB1)"));
            assert_eq!(record.absolute_magnitude_h.as_deref(), Some("21.5"));
            assert_eq!(record.estimated_diameter_min_km.as_deref(), Some("0.146"));
            assert_eq!(record.orbiting_body.as_deref(), Some("Earth"));
        }
        let dates: Vec<_> = records
            .iter()
            .map(|r| r.close_approach_date.clone().unwrap())
            .collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-05", "2024-02-11"]);
    }

    #[test]
    fn asteroid_without_approaches_is_skipped() {
        let empty = asteroid_with_approaches("1", vec![]);
        let mut absent = asteroid_with_approaches("2", vec![]);
        absent.as_object_mut().unwrap().remove("close_approach_data");
        let page = page(None, vec![empty, absent]);

        assert!(flatten_page(&page).is_empty());
    }

    #[test]
    fn numeric_fields_are_captured_as_strings() {
        let page = page(
            None,
            vec![asteroid_with_approaches("7", vec![approach("2024-03-02")])],
        );
        let records = flatten_page(&page);
        // absolute_magnitude_h arrives as a bare JSON number
        assert_eq!(records[0].absolute_magnitude_h.as_deref(), Some("21.5"));
        assert_eq!(records[0].relative_velocity_kmph.as_deref(), Some("45000.5"));
    }

    struct ScriptedFeed {
        pages: std::sync::Mutex<std::collections::HashMap<String, Vec<(Option<String>, usize)>>>,
    }

    impl ScriptedFeed {
        /// Each entry: url -> (next url, number of single-approach asteroids).
        fn new(script: Vec<(&str, Option<&str>, usize)>) -> Self {
            let mut pages = std::collections::HashMap::new();
            for (url, next, count) in script {
                pages
                    .entry(url.to_string())
                    .or_insert_with(Vec::new)
                    .push((next.map(String::from), count));
            }
            Self {
                pages: std::sync::Mutex::new(pages),
            }
        }
    }

    #[async_trait::async_trait]
    impl FeedSource for ScriptedFeed {
        fn first_page_url(&self, _start_date: NaiveDate) -> String {
            "page-0".to_string()
        }

        async fn fetch_page(&self, url: &str) -> Result<FeedPage> {
            let mut pages = self.pages.lock().unwrap();
            let entries = pages.get_mut(url).ok_or_else(|| ScraperError::Api {
                message: format!("unexpected page request: {}", url),
            })?;
            let (next, count) = entries.remove(0);
            let asteroids = (0..count)
                .map(|i| asteroid_with_approaches(&format!("{}-{}", url, i), vec![approach("2024-01-01")]))
                .collect();
            Ok(page(next.as_deref(), asteroids))
        }
    }

    #[tokio::test]
    async fn fetch_stops_at_target_and_truncates_overshoot() {
        let feed = ScriptedFeed::new(vec![
            ("page-0", Some("page-1"), 3),
            ("page-1", Some("page-2"), 4),
        ]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let records = fetch_approaches(&feed, start, 5).await.unwrap();
        // Page batches overshoot to 7; the result is trimmed to the target
        // and page-2 is never requested.
        assert_eq!(records.len(), 5);
    }

    #[tokio::test]
    async fn fetch_stops_when_pagination_ends() {
        let feed = ScriptedFeed::new(vec![("page-0", None, 2)]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let records = fetch_approaches(&feed, start, 100).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn fetch_propagates_page_failures() {
        let feed = ScriptedFeed::new(vec![("page-0", Some("missing"), 1)]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = fetch_approaches(&feed, start, 100).await.unwrap_err();
        assert!(matches!(err, ScraperError::Api { .. }));
    }
}
