use clap::{Parser, Subcommand};
use rusqlite::types::Value as SqlValue;
use tracing::{error, info};

use neo_scraper::apis::neo_feed::NeoFeedClient;
use neo_scraper::config::Config;
use neo_scraper::logging;
use neo_scraper::pipeline;
use neo_scraper::storage::NeoStore;

#[derive(Parser)]
#[command(name = "neo_scraper")]
#[command(about = "NASA near-Earth-object close-approach ingestion pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ingestion pipeline: fetch, dump, clean, load
    Ingest {
        /// Feed start date (YYYY-MM-DD), overriding config.toml
        #[arg(long)]
        start_date: Option<String>,
        /// Minimum number of flattened records to collect, overriding config.toml
        #[arg(long)]
        target: Option<usize>,
    },
    /// Execute a read query against the loaded database
    Query {
        /// SQL statement using ?1-style positional placeholders
        sql: String,
        /// Bind value for the next positional placeholder (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Ingest { start_date, target } => {
            if let Some(start_date) = start_date {
                config.feed.start_date = start_date;
            }
            if let Some(target) = target {
                config.feed.target_count = target;
            }

            println!("🔄 Running NEO ingestion pipeline...");
            let source = NeoFeedClient::new(&config)?;
            let mut store = NeoStore::open(&config.output.db_path)?;

            match pipeline::run(&config, &source, &mut store).await {
                Ok(summary) => {
                    info!("Pipeline finished");
                    println!("\n📊 Pipeline Results:");
                    println!("   Fetched records: {}", summary.fetched_records);
                    println!("   Raw dump: {}", summary.dump_path);
                    println!("   Cleaned records: {}", summary.cleaned_records);
                    println!("   Dropped records: {}", summary.dropped_records);
                    println!("   New asteroids: {}", summary.load.asteroids_inserted);
                    println!("   Approach rows: {}", summary.load.approaches_inserted);
                    println!("\n✅ Data saved to '{}'", config.output.db_path);
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    anyhow::bail!("ingestion failed: {}", e);
                }
            }
        }
        Commands::Query { sql, params } => {
            let store = NeoStore::open(&config.output.db_path)?;
            let bind_values: Vec<SqlValue> = params.iter().map(|p| infer_bind_value(p)).collect();
            let result = store.query(&sql, &bind_values)?;

            println!("{}", result.columns.join("\t"));
            for row in &result.rows {
                let rendered: Vec<String> = row.iter().map(render_value).collect();
                println!("{}", rendered.join("\t"));
            }
            println!("\n({} rows)", result.rows.len());
        }
    }

    Ok(())
}

/// CLI params arrive as strings; bind integers and reals natively so numeric
/// comparisons in SQL behave as expected.
fn infer_bind_value(raw: &str) -> SqlValue {
    if let Ok(n) = raw.parse::<i64>() {
        return SqlValue::Integer(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return SqlValue::Real(f);
    }
    SqlValue::Text(raw.to_string())
}

fn render_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(n) => n.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(b) => format!("<{} byte blob>", b.len()),
    }
}
