use std::path::Path;

use serde_json::{Value, json};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

use crate::{Database, DatabaseResult, DbError, Schema};

/// Embedded database file.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Opens an existing file without write access. A missing file is an error,
    /// it is never created.
    pub async fn open_read_only(path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);
        Self::open(path, options).await
    }

    /// Opens the file for writing, creating it when missing.
    pub async fn open_writable(path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::open(path, options).await
    }

    async fn open(path: &Path, options: SqliteConnectOptions) -> Result<Self, DbError> {
        debug!(path = %path.display(), "opening sqlite database");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DbError::Open)?;
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode(row: &SqliteRow, i: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map_or(Value::Null, |v| json!(v));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map_or(Value::Null, |v| json!(v));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map_or(Value::Null, |v| json!(v));
    }
    match row.try_get::<Option<Vec<u8>>, _>(i) {
        Ok(Some(bytes)) => json!(String::from_utf8_lossy(&bytes)),
        _ => Value::Null,
    }
}

#[async_trait::async_trait]
impl Database for SqliteDatabase {
    fn dialect(&self) -> &'static str {
        "sqlite"
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
            results
                .rows
                .push((0..row.columns().len()).map(|i| decode(row, i)).collect());
        }

        Ok(results)
    }

    async fn execute(&self, statement: &str) -> Result<u64, DbError> {
        let done = sqlx::query(statement).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn get_schema(&self) -> Result<Schema, DbError> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"SELECT name FROM sqlite_master
               WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
               ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut schema = Schema::default();

        for table in tables {
            let columns = sqlx::query(&format!(
                "SELECT name, type FROM pragma_table_info({})",
                quote_literal(&table)
            ))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| {
                (
                    row.get::<String, _>(0),
                    row.get::<Option<String>, _>(1).unwrap_or_default(),
                )
            })
            .collect();

            let references = sqlx::query(&format!(
                r#"SELECT "table", "from", "to" FROM pragma_foreign_key_list({})"#,
                quote_literal(&table)
            ))
            .fetch_all(&self.pool)
            .await?;

            for row in references {
                let referenced_table: String = row.get(0);
                let referencing_column: String = row.get(1);
                let referenced_column: Option<String> = row.get(2);

                let referenced_key = format!(
                    "{referenced_table}.{}",
                    referenced_column.unwrap_or_else(|| "rowid".to_string())
                );
                schema
                    .references
                    .entry(referenced_key)
                    .or_default()
                    .push(format!("{table}.{referencing_column}"));
            }

            schema.tables.insert(table, columns);
        }

        Ok(schema)
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("Employee.db");
        let db = SqliteDatabase::open_writable(&path).await.unwrap();
        db.execute("CREATE TABLE dept (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();
        db.execute(
            "CREATE TABLE employee (id INTEGER PRIMARY KEY, name TEXT, salary REAL, \
             dept_id INTEGER REFERENCES dept(id))",
        )
        .await
        .unwrap();
        db.execute("INSERT INTO dept VALUES (1, 'Data science')")
            .await
            .unwrap();
        db.execute(
            "INSERT INTO employee VALUES (1, 'Krish', 86.5, 1), (2, 'Madhu', NULL, 1)",
        )
        .await
        .unwrap();
        db.close().await;
        path
    }

    #[tokio::test]
    async fn results_decode_mixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::open_read_only(&seeded(&dir).await)
            .await
            .unwrap();

        let result = db
            .get_results("SELECT id, name, salary FROM employee ORDER BY id")
            .await
            .unwrap();

        let names: Vec<_> = result.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "salary"]);
        assert_eq!(result.rows[0], vec![json!(1), json!("Krish"), json!(86.5)]);
        assert_eq!(result.rows[1][2], Value::Null);
    }

    #[tokio::test]
    async fn empty_result_has_no_headers() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::open_read_only(&seeded(&dir).await)
            .await
            .unwrap();

        let result = db
            .get_results("SELECT * FROM employee WHERE id > 100")
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(result.headers.is_empty());
    }

    #[tokio::test]
    async fn read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::open_read_only(&seeded(&dir).await)
            .await
            .unwrap();

        let err = db
            .execute("INSERT INTO dept VALUES (2, 'Marketing')")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.db");

        let err = SqliteDatabase::open_read_only(&path).await.unwrap_err();
        assert!(matches!(err, DbError::Open(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn schema_lists_tables_columns_and_references() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::open_read_only(&seeded(&dir).await)
            .await
            .unwrap();

        let schema = db.get_schema().await.unwrap();
        assert_eq!(
            schema.tables.keys().collect::<Vec<_>>(),
            vec!["dept", "employee"]
        );
        assert_eq!(
            schema.tables["employee"][2],
            ("salary".to_string(), "REAL".to_string())
        );
        assert_eq!(
            schema.references["dept.id"],
            vec!["employee.dept_id".to_string()]
        );
        assert_eq!(db.list_tables().await.unwrap(), vec!["dept", "employee"]);
    }
}
