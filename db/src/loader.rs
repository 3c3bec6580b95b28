//! Bulk-loads CSV rows into a table of the embedded database.

use std::path::Path;

use tracing::{debug, info};

use crate::sqlite::SqliteDatabase;
use crate::{DbError, quote_ident};

pub const DEFAULT_TABLE: &str = "EMPLOYEE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows: u64,
    /// Whether the table had to be created first.
    pub created: bool,
}

/// Column affinity for a new table, picked from the values of that column.
/// Empty cells are ignored; a column with no values at all is `TEXT`.
fn infer_affinity<'a>(values: impl Iterator<Item = &'a str>) -> &'static str {
    let mut seen = false;
    let mut integer = true;
    let mut real = true;

    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        seen = true;
        integer &= value.parse::<i64>().is_ok();
        real &= value.parse::<f64>().is_ok();
    }

    match (seen, integer, real) {
        (true, true, _) => "INTEGER",
        (true, false, true) => "REAL",
        _ => "TEXT",
    }
}

/// Appends every row of `csv_path` to `table`, creating the table when it
/// does not exist. All rows are inserted in a single transaction.
pub async fn load_csv(
    database: &SqliteDatabase,
    csv_path: &Path,
    table: &str,
) -> Result<LoadReport, DbError> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().any(String::is_empty) {
        return Err(DbError::InvalidCsv(format!(
            "{} has an empty header",
            csv_path.display()
        )));
    }

    let records = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(rows = records.len(), columns = headers.len(), "read csv");

    let pool = database.pool();
    let mut tx = pool.begin().await?;

    let exists: i64 =
        sqlx::query_scalar("SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&mut *tx)
            .await?;
    let created = exists == 0;

    if created {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let affinity = infer_affinity(records.iter().map(|r| r[i].as_str()));
                format!("{} {affinity}", quote_ident(name))
            })
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!("CREATE TABLE {} ({columns})", quote_ident(table)))
            .execute(&mut *tx)
            .await?;
        info!(table, "created table");
    }

    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        headers
            .iter()
            .map(|h| quote_ident(h))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; headers.len()].join(", ")
    );

    let mut rows = 0;
    for record in &records {
        let mut query = sqlx::query(&insert);
        for value in record {
            let value = Some(value.as_str()).filter(|v| !v.trim().is_empty());
            query = query.bind(value);
        }
        rows += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    info!(table, rows, "loaded csv");

    Ok(LoadReport {
        table: table.to_string(),
        rows,
        created,
    })
}
