pub mod loader;
pub mod mysql;
pub mod session;
pub mod sqlite;

use async_trait::async_trait;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;

pub use session::{DEFAULT_HANDLE_TTL, DatabaseHandle, HandleCache, SessionKey, configure};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("could not open database")]
    Open(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("could not read csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid csv: {0}")]
    InvalidCsv(String),
}

/// MySQL errors for a refused login or an inaccessible/unknown database.
const MYSQL_ACCESS_ERRORS: [u16; 3] = [1044, 1045, 1049];

impl DbError {
    /// True when the backend could not be reached or refused the session, as
    /// opposed to a statement that failed on a working connection.
    pub fn is_connection(&self) -> bool {
        match self {
            DbError::Config(_) | DbError::Open(_) => true,
            DbError::Query(e) => is_connection_error(e),
            DbError::Csv(_) | DbError::InvalidCsv(_) => false,
        }
    }
}

fn is_connection_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => true,
        sqlx::Error::Database(e) => e
            .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
            .is_some_and(|e| MYSQL_ACCESS_ERRORS.contains(&e.number())),
        _ => false,
    }
}

/// Trait defining the interface for database operations
#[async_trait]
pub trait Database: Send + Sync + Debug {
    /// SQL dialect spoken by the backend, e.g. `sqlite` or `mysql`
    fn dialect(&self) -> &'static str;

    /// Execute a query and return the rows as JSON values, with a
    /// (column_name, column_type) header per column
    async fn get_results(&self, query: &str) -> Result<DatabaseResult, DbError>;

    /// Execute an sql statement and return the number of affected rows
    async fn execute(&self, statement: &str) -> Result<u64, DbError>;

    /// Get the database schema information: every table with its columns, plus
    /// the foreign key references keyed by the referenced `table.column`.
    async fn get_schema(&self) -> Result<Schema, DbError>;

    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        Ok(self.get_schema().await?.tables.into_keys().collect())
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DatabaseResult {
    pub headers: Vec<(String, String)>,
    pub rows: Vec<Vec<Value>>,
}

impl DatabaseResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name, at most `limit` of them.
    pub fn to_json_rows(&self, limit: usize) -> Value {
        let rows = self
            .rows
            .iter()
            .take(limit)
            .map(|row| {
                self.headers
                    .iter()
                    .map(|(name, _)| name.clone())
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .map(Value::Object)
            .collect();
        Value::Array(rows)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(self.headers.iter().map(|(name, _)| name.as_str()));

        for row in &self.rows {
            table.add_row(row.iter().map(|value| match value {
                Value::String(s) => s.clone(),
                Value::Null => "NULL".to_string(),
                other => other.to_string(),
            }));
        }

        table
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// table name => [(column name, column type)]
    pub tables: BTreeMap<String, Vec<(String, String)>>,
    /// referenced `table.column` => [referencing `table.column`]
    pub references: BTreeMap<String, Vec<String>>,
}

impl Schema {
    /// `CREATE TABLE`-like description of the requested tables. Unknown names
    /// are reported inline instead of failing the whole description.
    pub fn describe(&self, tables: &[String]) -> String {
        let mut out = Vec::new();
        for name in tables {
            let Some(columns) = self.tables.get(name) else {
                out.push(format!("-- table {name} does not exist"));
                continue;
            };

            let columns = columns
                .iter()
                .map(|(column, ty)| format!("  {column} {ty}"))
                .collect::<Vec<_>>()
                .join(",\n");
            out.push(format!("CREATE TABLE {name} (\n{columns}\n);"));

            let prefix = format!("{name}.");
            for (referenced, referencing) in &self.references {
                for from in referencing.iter().filter(|from| from.starts_with(&prefix)) {
                    out.push(format!("-- {from} references {referenced}"));
                }
            }
        }
        out.join("\n")
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn employees() -> DatabaseResult {
        DatabaseResult {
            headers: vec![
                ("NAME".to_string(), "TEXT".to_string()),
                ("SALARY".to_string(), "INTEGER".to_string()),
            ],
            rows: vec![
                vec![json!("Madhu"), json!(95)],
                vec![json!("Krish"), Value::Null],
            ],
        }
    }

    #[test]
    fn connection_errors_are_told_apart_from_bad_statements() {
        assert!(DbError::Query(sqlx::Error::PoolTimedOut).is_connection());
        assert!(DbError::Query(sqlx::Error::PoolClosed).is_connection());
        assert!(DbError::Open(sqlx::Error::PoolClosed).is_connection());
        assert!(!DbError::Query(sqlx::Error::RowNotFound).is_connection());
        assert!(!DbError::InvalidCsv("ragged".to_string()).is_connection());
    }

    #[test]
    fn open_error_does_not_repeat_its_source() {
        let err = DbError::Open(sqlx::Error::PoolClosed);
        assert_eq!(err.to_string(), "could not open database");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn json_rows_are_keyed_and_limited() {
        let rows = employees().to_json_rows(1);
        assert_eq!(rows, json!([{ "NAME": "Madhu", "SALARY": 95 }]));
    }

    #[test]
    fn table_renders_nulls() {
        let rendered = employees().to_table().to_string();
        assert!(rendered.contains("Madhu"));
        assert!(rendered.contains("NULL"));
    }

    #[test]
    fn describe_lists_columns_and_references() {
        let mut schema = Schema::default();
        schema.tables.insert(
            "employee".to_string(),
            vec![
                ("id".to_string(), "INTEGER".to_string()),
                ("dept_id".to_string(), "INTEGER".to_string()),
            ],
        );
        schema
            .references
            .insert("dept.id".to_string(), vec!["employee.dept_id".to_string()]);

        let described = schema.describe(&["employee".to_string(), "ghost".to_string()]);
        assert!(described.contains("CREATE TABLE employee (\n  id INTEGER,\n  dept_id INTEGER\n);"));
        assert!(described.contains("-- employee.dept_id references dept.id"));
        assert!(described.contains("-- table ghost does not exist"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("EMPLOYEE"), "\"EMPLOYEE\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
