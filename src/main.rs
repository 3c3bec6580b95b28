use std::path::PathBuf;

use clap::Parser;
use db::loader::{DEFAULT_TABLE, load_csv};
use db::sqlite::SqliteDatabase;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Append the rows of a CSV file to a table of the embedded database.
#[derive(Debug, Parser)]
#[command(name = "load-employees", version)]
struct Args {
    /// CSV file with a header row
    #[arg(long, default_value = "data.csv")]
    csv: PathBuf,

    /// SQLite file to load into, created if missing.
    /// Defaults to the embedded path from the sqlchat config.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Target table, created from the CSV header if missing
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let database_path = args
        .database
        .unwrap_or_else(|| config::SqlChatConfig::get_or_default().embedded.path);

    let database = SqliteDatabase::open_writable(&database_path).await?;
    let report = load_csv(&database, &args.csv, &args.table).await?;
    database.close().await;

    info!(
        table = %report.table,
        rows = report.rows,
        created = report.created,
        database = %database_path.display(),
        "Data imported successfully!"
    );

    Ok(())
}
