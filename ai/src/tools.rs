use db::{Database, DatabaseResult, DbError};
use tracing::{debug, warn};

use crate::{AiError, HashMap, Tool, ToolCallInfo, Value, create_tool, json};

pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLES: &str = "describe_tables";
pub const QUERY_DATABASE: &str = "query_database";

fn parameters(schema: Value) -> HashMap<String, Value> {
    match schema {
        Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}

pub fn list_tables_tool() -> Tool {
    create_tool(
        LIST_TABLES,
        "List the tables in the database. Call this first to find out what exists.",
        parameters(json!({
            "type": "object",
            "properties": {},
        })),
    )
}

pub fn describe_tables_tool() -> Tool {
    create_tool(
        DESCRIBE_TABLES,
        "Show the columns, types and foreign keys of the given tables. \
         Make sure the tables exist by calling list_tables first.",
        parameters(json!({
            "type": "object",
            "properties": {
                "tables": {
                    "type": "string",
                    "description": "Comma-separated table names, e.g. `employee, dept`.",
                },
            },
            "required": ["tables"],
        })),
    )
}

pub fn query_tool() -> Tool {
    create_tool(
        QUERY_DATABASE,
        "Execute a SQL query against the current database connection and return the rows as JSON. \
         If the query is wrong an error is returned; rewrite the query and try again.",
        parameters(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to execute against the database.",
                },
            },
            "required": ["query"],
        })),
    )
}

pub fn sql_tools() -> Vec<Tool> {
    vec![list_tables_tool(), describe_tables_tool(), query_tool()]
}

/// What a tool call produced. `output` goes back to the model; `rows` is kept
/// for display when the call was a query.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub output: String,
    pub rows: Option<DatabaseResult>,
}

impl ToolOutput {
    fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            rows: None,
        }
    }
}

fn table_names(arguments: &Value) -> Vec<String> {
    match &arguments["tables"] {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => vec![],
    }
}

/// A statement the database rejected goes back to the model as text; a
/// database that cannot be reached ends the turn.
fn database_failure(error: DbError) -> Result<ToolOutput, AiError> {
    if error.is_connection() {
        warn!("database unreachable: {error}");
        Err(AiError::Database(error))
    } else {
        warn!("query failed: {error}");
        Ok(ToolOutput::text(format!("Error: {error}")))
    }
}

/// Runs one tool call against `database`. Bad arguments and failing SQL are
/// reported in the output text so the model can correct itself.
pub async fn run(
    call: &ToolCallInfo,
    database: &dyn Database,
    result_limit: usize,
) -> Result<ToolOutput, AiError> {
    debug!(tool = %call.name, arguments = %call.arguments, "executing tool");

    let arguments: Value = match serde_json::from_str(call.arguments.trim()) {
        Ok(arguments) => arguments,
        Err(_) if call.arguments.trim().is_empty() => json!({}),
        Err(e) => return Ok(ToolOutput::text(format!("Error: invalid arguments: {e}"))),
    };

    match call.name.as_str() {
        LIST_TABLES => match database.list_tables().await {
            Ok(tables) => Ok(ToolOutput::text(tables.join(", "))),
            Err(e) => database_failure(e),
        },
        DESCRIBE_TABLES => {
            let tables = table_names(&arguments);
            if tables.is_empty() {
                return Ok(ToolOutput::text("Error: no table names given"));
            }
            match database.get_schema().await {
                Ok(schema) => Ok(ToolOutput::text(schema.describe(&tables))),
                Err(e) => database_failure(e),
            }
        }
        QUERY_DATABASE => {
            let Some(query) = arguments["query"].as_str().filter(|q| !q.trim().is_empty()) else {
                return Ok(ToolOutput::text("Error: missing `query` argument"));
            };
            match database.get_results(query).await {
                Ok(result) => {
                    let mut output = result.to_json_rows(result_limit).to_string();
                    if result.rows.len() > result_limit {
                        output.push_str(&format!(
                            "\n({} of {} rows shown)",
                            result_limit,
                            result.rows.len()
                        ));
                    }
                    Ok(ToolOutput {
                        output,
                        rows: Some(result),
                    })
                }
                Err(e) => database_failure(e),
            }
        }
        other => Ok(ToolOutput::text(format!(
            "Error: unknown tool `{other}`, use one of {LIST_TABLES}, {DESCRIBE_TABLES}, {QUERY_DATABASE}"
        ))),
    }
}
