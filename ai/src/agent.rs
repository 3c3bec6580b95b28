use async_trait::async_trait;
use config::{AIConfig, Credential};
use db::Database;
use tracing::{debug, info};

use crate::client::{ChatClient, GroqClient};
use crate::tools::{self, sql_tools};
use crate::{Agent, AgentEvent, AiError, ChatMessage, Tool};

fn system_prompt(dialect: &str, result_limit: usize) -> String {
    format!(
        r#"You are an agent designed to interact with a SQL database.
Given an input question, create a syntactically correct {dialect} query to run, then look at the
results of the query and return the answer. Unless the user specifies a specific number of examples
they wish to obtain, always limit your query to at most {result_limit} results.
Never query for all the columns from a specific table, only ask for the relevant columns.
Always look at the tables in the database first, then describe the relevant tables before querying.
If a query fails, rewrite it and try again.
Do NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.
If the question does not seem related to the database, just return "I don't know" as the answer.
When you have the answer, reply with it in plain text without calling any tool."#
    )
}

/// Answers questions by letting the model list, describe and query tables
/// until it replies without a tool call.
#[derive(Debug)]
pub struct SqlAgent<C = GroqClient> {
    client: C,
    tools: Vec<Tool>,
    max_rounds: u32,
    result_limit: usize,
}

impl SqlAgent<GroqClient> {
    pub fn groq(credential: Credential, config: &AIConfig) -> Result<Self, AiError> {
        let client = GroqClient::new(credential, config)?;
        Ok(Self::new(client)
            .with_max_rounds(config.max_rounds)
            .with_result_limit(config.result_limit))
    }
}

impl<C: ChatClient> SqlAgent<C> {
    pub fn new(client: C) -> Self {
        let defaults = AIConfig::default();
        Self {
            client,
            tools: sql_tools(),
            max_rounds: defaults.max_rounds,
            result_limit: defaults.result_limit,
        }
    }

    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }
}

#[async_trait]
impl<C: ChatClient> Agent for SqlAgent<C> {
    async fn answer(
        &self,
        query: &str,
        database: &dyn Database,
        observer: &mut (dyn FnMut(AgentEvent) + Send),
    ) -> Result<String, AiError> {
        let mut messages = vec![
            ChatMessage::system(system_prompt(database.dialect(), self.result_limit)),
            ChatMessage::user(query),
        ];
        let mut rounds = 0;

        loop {
            let completion = self.client.complete(&messages, &self.tools).await?;

            if completion.tool_calls.is_empty() {
                info!(rounds, "agent finished");
                return Ok(completion.content.unwrap_or_default());
            }

            rounds += 1;
            if rounds > self.max_rounds {
                return Err(AiError::MaxRounds(self.max_rounds));
            }

            if let Some(thought) = completion.content.as_deref().map(str::trim)
                && !thought.is_empty()
            {
                observer(AgentEvent::Thought(thought.to_string()));
            }

            messages.push(ChatMessage::assistant(
                completion.content.clone(),
                completion.tool_calls.clone(),
            ));

            for call in completion.tool_calls {
                observer(AgentEvent::ToolCall(call.clone()));
                let result = tools::run(&call, database, self.result_limit).await?;
                debug!(tool = %call.name, bytes = result.output.len(), "tool finished");
                messages.push(ChatMessage::tool(call.id.clone(), result.output.clone()));
                observer(AgentEvent::ToolResult {
                    name: call.name,
                    output: result.output,
                    rows: result.rows,
                });
            }
        }
    }
}
