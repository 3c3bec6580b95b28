use std::time::Duration;

use config::NetworkedParams;
use serde_json::{Value, json};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo};

use crate::{Database, DatabaseResult, DbError, Schema};

/// How long a query waits for a pooled connection before giving up.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote MySQL server. Connections are opened on first use, so a wrong
/// password only shows up when the first query runs.
#[derive(Debug, Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    pub fn connect_lazy(params: &NetworkedParams) -> Self {
        Self::connect_lazy_with_timeout(params, DEFAULT_ACQUIRE_TIMEOUT)
    }

    pub fn connect_lazy_with_timeout(params: &NetworkedParams, acquire_timeout: Duration) -> Self {
        let (host, port) = params.host_and_port();
        let mut options = MySqlConnectOptions::new()
            .host(host)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database);
        if let Some(port) = port {
            options = options.port(port);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        Self { pool }
    }
}

fn decode(row: &MySqlRow, i: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| json!(v)),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| json!(v)),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "YEAR" => row
            .try_get::<Option<u64>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| json!(v)),

        "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| json!(v)),

        "DECIMAL" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| json!(v)),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| json!(v.format("%Y-%m-%d").to_string())),

        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |dt| {
                json!(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }),

        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)
            .ok()
            .flatten()
            .map_or(Value::Null, |dt| json!(dt.to_rfc3339())),

        "JSON" => row
            .try_get::<Option<Value>, _>(i)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),

        _ => match row.try_get::<Option<String>, _>(i) {
            Ok(v) => v.map_or(Value::Null, |v| json!(v)),
            Err(_) => row
                .try_get::<Option<Vec<u8>>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |bytes| json!(String::from_utf8_lossy(&bytes))),
        },
    }
}

#[async_trait::async_trait]
impl Database for MySqlDatabase {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    async fn get_results(&self, query: &str) -> Result<DatabaseResult, DbError> {
        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut results = DatabaseResult::default();

        let Some(first) = rows.first() else {
            return Ok(results);
        };

        for col in first.columns() {
            results
                .headers
                .push((col.name().to_string(), col.type_info().name().to_string()));
        }

        for row in &rows {
            let values = results
                .headers
                .iter()
                .enumerate()
                .map(|(i, (_, type_name))| decode(row, i, type_name))
                .collect();
            results.rows.push(values);
        }

        Ok(results)
    }

    async fn execute(&self, statement: &str) -> Result<u64, DbError> {
        let done = sqlx::query(statement).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn get_schema(&self) -> Result<Schema, DbError> {
        let columns = sqlx::query(
            r#"SELECT
                CAST(table_name AS CHAR) AS table_name,
                CAST(column_name AS CHAR) AS column_name,
                CAST(column_type AS CHAR) AS column_type
            FROM information_schema.columns
            WHERE table_schema = DATABASE()
            ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut schema = Schema::default();

        for row in columns {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");
            let column_type: String = row.get("column_type");

            schema
                .tables
                .entry(table_name)
                .or_default()
                .push((column_name, column_type));
        }

        let fk_rows = sqlx::query(
            r#"SELECT
                CAST(table_name AS CHAR) AS referencing_table,
                CAST(column_name AS CHAR) AS referencing_column,
                CAST(referenced_table_name AS CHAR) AS referenced_table,
                CAST(referenced_column_name AS CHAR) AS referenced_column
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
              AND referenced_table_name IS NOT NULL"#,
        )
        .fetch_all(&self.pool)
        .await?;

        for row in fk_rows {
            let referencing_table: String = row.get("referencing_table");
            let referencing_column: String = row.get("referencing_column");
            let referenced_table: String = row.get("referenced_table");
            let referenced_column: String = row.get("referenced_column");

            schema
                .references
                .entry(format!("{referenced_table}.{referenced_column}"))
                .or_default()
                .push(format!("{referencing_table}.{referencing_column}"));
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> NetworkedParams {
        NetworkedParams {
            host: "127.0.0.1:1".to_string(),
            user: "nobody".to_string(),
            password: "secret".to_string(),
            database: "hr".to_string(),
        }
    }

    #[tokio::test]
    async fn lazy_pool_does_not_touch_the_network() {
        let db = MySqlDatabase::connect_lazy(&unreachable());
        assert_eq!(db.dialect(), "mysql");
        assert_eq!(db.pool.size(), 0);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let db = MySqlDatabase::connect_lazy_with_timeout(&unreachable(), Duration::from_millis(500));

        let err = db.get_results("SELECT 1").await.unwrap_err();
        assert!(err.is_connection(), "{err:?}");
    }
}
