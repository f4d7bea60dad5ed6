use crate::error::Result;
use crate::types::CleanedRecord;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info};

/// Embedded SQLite store holding the two-table NEO schema. Also the query
/// gateway: consumers read back through [`NeoStore::query`] with positional
/// bind values, never interpolated SQL.
pub struct NeoStore {
    conn: Connection,
}

/// Counts from one load pass.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct LoadStats {
    pub asteroids_inserted: usize,
    pub asteroids_ignored: usize,
    pub approaches_inserted: usize,
}

/// Column-named tabular result of a gateway query.
#[derive(Debug)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl NeoStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // WAL so a long-lived reader (the dashboard) can coexist with the
        // single ingestion writer.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS asteroids (
                id TEXT PRIMARY KEY,
                name TEXT,
                absolute_magnitude_h REAL,
                estimated_diameter_min_km REAL,
                estimated_diameter_max_km REAL,
                is_potentially_hazardous_asteroid INTEGER
            );
            CREATE TABLE IF NOT EXISTS close_approach (
                neo_reference_id TEXT,
                close_approach_date DATE,
                relative_velocity_kmph REAL,
                miss_distance_astronomical REAL,
                miss_distance_km REAL,
                miss_distance_lunar REAL,
                orbiting_body TEXT,
                FOREIGN KEY (neo_reference_id) REFERENCES asteroids (id)
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Loads cleaned records in input order. Asteroid rows are insert-or-
    /// ignore keyed by id (first write wins); approach rows always insert, so
    /// re-running over overlapping dates duplicates approaches. A storage
    /// error aborts the remainder; rows already written stay.
    pub fn load(&mut self, records: &[CleanedRecord]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        for record in records {
            let changed = self.conn.execute(
                "INSERT OR IGNORE INTO asteroids VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.absolute_magnitude_h,
                    record.estimated_diameter_min_km,
                    record.estimated_diameter_max_km,
                    record.is_potentially_hazardous_asteroid,
                ],
            )?;
            if changed == 1 {
                stats.asteroids_inserted += 1;
            } else {
                stats.asteroids_ignored += 1;
            }

            // DATE column stored as ISO-8601 text, matching SQLite's own
            // date functions.
            self.conn.execute(
                "INSERT INTO close_approach VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.neo_reference_id,
                    record.close_approach_date.format("%Y-%m-%d").to_string(),
                    record.relative_velocity_kmph,
                    record.miss_distance_astronomical,
                    record.miss_distance_km,
                    record.miss_distance_lunar,
                    record.orbiting_body,
                ],
            )?;
            stats.approaches_inserted += 1;
        }

        info!(
            "Loaded {} approach rows ({} new asteroids, {} duplicates ignored)",
            stats.approaches_inserted, stats.asteroids_inserted, stats.asteroids_ignored
        );
        Ok(stats)
    }

    /// Executes a read statement with positional binds and returns the rows
    /// with their column names. Statement errors surface to the caller.
    pub fn query(&self, sql: &str, bind_values: &[SqlValue]) -> Result<QueryRows> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(row.get::<_, SqlValue>(i)?);
            }
            out.push(values);
        }
        debug!("Query returned {} rows", out.len());
        Ok(QueryRows {
            columns,
            rows: out,
        })
    }
}
