use std::fmt;

use ai::Agent;
use db::DatabaseHandle;
use tracing::info;

use crate::conversation::{Conversation, Renderer};
use crate::message::{Message, Transcript};

/// Everything one user session holds: the conversation, the database handle
/// answers are drawn from and the agent that produces them.
pub struct ChatSession<R> {
    conversation: Conversation<R>,
    database: DatabaseHandle,
    agent: Box<dyn Agent>,
}

impl<R> fmt::Debug for ChatSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("conversation", &self.conversation)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> ChatSession<R> {
    pub fn new(renderer: R, database: DatabaseHandle, agent: Box<dyn Agent>) -> Self {
        Self {
            conversation: Conversation::new(renderer),
            database,
            agent,
        }
    }

    pub async fn ask(&mut self, query: &str) -> Option<&Message> {
        self.conversation
            .submit(query, self.agent.as_ref(), self.database.as_ref())
            .await
    }

    pub fn reset(&mut self) {
        self.conversation.reset();
    }

    /// Swaps in a handle and agent built from new settings. The transcript
    /// is kept.
    pub fn replace_backend(&mut self, database: DatabaseHandle, agent: Box<dyn Agent>) {
        info!(dialect = database.dialect(), "switching database");
        self.database = database;
        self.agent = agent;
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        self.conversation.transcript()
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseHandle {
        &self.database
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FALLBACK_ANSWER, GREETING};
    use ai::tools::QUERY_DATABASE;
    use ai::{AgentEvent, AiError, ChatClient, ChatMessage, Completion, SqlAgent, Tool, ToolCallInfo};
    use async_trait::async_trait;
    use config::{DataSource, NetworkedParams};
    use db::mysql::MySqlDatabase;
    use db::sqlite::SqliteDatabase;
    use db::{Database, HandleCache};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Silent;

    impl Renderer for Silent {
        fn render_message(&mut self, _message: &Message) {}
    }

    struct FixedAgent(&'static str);

    #[async_trait]
    impl Agent for FixedAgent {
        async fn answer(
            &self,
            _query: &str,
            _database: &dyn Database,
            _observer: &mut (dyn FnMut(AgentEvent) + Send),
        ) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }
    }

    /// Model stand-in that replays fixed completions.
    #[derive(Debug)]
    struct Scripted(Mutex<VecDeque<Completion>>);

    #[async_trait]
    impl ChatClient for Scripted {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tools: &[Tool],
        ) -> Result<Completion, AiError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AiError::Api("script exhausted".to_string()))
        }
    }

    async fn employee_db(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("Employee.db");
        let db = SqliteDatabase::open_writable(&path).await.unwrap();
        db.execute("CREATE TABLE EMPLOYEE (NAME TEXT)").await.unwrap();
        db.close().await;
        path
    }

    #[tokio::test]
    async fn embedded_question_gets_the_agent_answer() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HandleCache::new(employee_db(&dir).await);
        let handle = cache.get_or_configure(&DataSource::Embedded).await.unwrap();
        let mut session = ChatSession::new(
            Silent,
            handle,
            Box::new(FixedAgent("There are 42 employees.")),
        );

        session.ask("How many employees are there?").await;

        assert_eq!(
            session.transcript().last(),
            Some(&Message::assistant("There are 42 employees."))
        );
    }

    #[tokio::test]
    async fn networked_connection_failure_falls_back() {
        let database = MySqlDatabase::connect_lazy_with_timeout(
            &NetworkedParams {
                host: "127.0.0.1:1".to_string(),
                user: "reporter".to_string(),
                password: "secret".to_string(),
                database: "hr".to_string(),
            },
            Duration::from_millis(500),
        );
        let model = Scripted(Mutex::new(VecDeque::from([
            Completion {
                content: None,
                tool_calls: vec![ToolCallInfo {
                    id: "call_1".to_string(),
                    name: QUERY_DATABASE.to_string(),
                    arguments: r#"{"query":"SELECT COUNT(*) FROM EMPLOYEE"}"#.to_string(),
                }],
            },
            Completion {
                content: Some("Sorry, I could not reach the database.".to_string()),
                tool_calls: vec![],
            },
        ])));
        let mut session = ChatSession::new(
            Silent,
            Arc::new(database),
            Box::new(SqlAgent::new(model)),
        );

        session.ask("How many employees are there?").await;

        assert_eq!(
            session.transcript().last(),
            Some(&Message::assistant(FALLBACK_ANSWER))
        );
    }

    #[tokio::test]
    async fn reset_mid_session_and_switch_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HandleCache::new(employee_db(&dir).await);
        let handle = cache.get_or_configure(&DataSource::Embedded).await.unwrap();
        let mut session = ChatSession::new(Silent, handle.clone(), Box::new(FixedAgent("first")));

        session.ask("q1").await;
        session.ask("q2").await;
        assert_eq!(session.transcript().len(), 5);

        session.reset();
        assert_eq!(session.transcript().messages(), &[Message::assistant(GREETING)]);

        session.replace_backend(handle, Box::new(FixedAgent("second")));
        session.ask("q3").await;
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript().last().map(Message::content), Some("second"));
        assert_eq!(session.database().dialect(), "sqlite");
    }
}
