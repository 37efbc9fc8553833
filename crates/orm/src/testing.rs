//! In-memory executor for tests
//!
//! [`MockExecutor`] records every statement it receives and answers from
//! scripted rules (first match on a SQL fragment wins) or from a handler
//! closure. Statements that match nothing return no rows.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::backends::{DatabaseValue, QueryExecutor};
use crate::error::{ModelError, OrmResult};
use crate::record::Record;

/// Which contract method received the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Execute,
}

/// A statement captured by [`MockExecutor`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
    pub kind: StatementKind,
}

type Handler = Arc<dyn Fn(&ExecutedStatement) -> Option<OrmResult<Vec<Record>>> + Send + Sync>;

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Record>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    fragment: String,
    reply: Reply,
    once: bool,
}

/// Scriptable [`QueryExecutor`] that keeps a statement log
#[derive(Clone, Default)]
pub struct MockExecutor {
    log: Arc<Mutex<Vec<ExecutedStatement>>>,
    rules: Arc<Mutex<Vec<Rule>>>,
    handler: Option<Handler>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `handler` for statements no rule matches; `None` means no rows
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExecutedStatement) -> Option<OrmResult<Vec<Record>>> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Answer statements containing `fragment` with `rows`
    pub fn when(&self, fragment: &str, rows: Vec<Record>) {
        self.push_rule(fragment, Reply::Rows(rows), false);
    }

    /// Like [`MockExecutor::when`], but only for the next matching statement
    pub fn when_once(&self, fragment: &str, rows: Vec<Record>) {
        self.push_rule(fragment, Reply::Rows(rows), true);
    }

    /// Fail statements containing `fragment` with a database error
    pub fn fail_when(&self, fragment: &str, message: &str) {
        self.push_rule(fragment, Reply::Fail(message.to_string()), false);
    }

    pub fn statements(&self) -> Vec<ExecutedStatement> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn statements_containing(&self, fragment: &str) -> Vec<ExecutedStatement> {
        self.statements()
            .into_iter()
            .filter(|s| s.sql.contains(fragment))
            .collect()
    }

    pub fn sql_log(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }

    /// Statements sent through `execute`, plus INSERT/UPDATE/DELETE/ALTER sent through `query`
    pub fn writes(&self) -> Vec<ExecutedStatement> {
        self.statements()
            .into_iter()
            .filter(|s| {
                s.kind == StatementKind::Execute
                    || ["INSERT", "UPDATE", "DELETE", "ALTER"]
                        .iter()
                        .any(|verb| s.sql.starts_with(verb))
            })
            .collect()
    }

    /// Forget captured statements; rules stay in place
    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn push_rule(&self, fragment: &str, reply: Reply, once: bool) {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Rule {
                fragment: fragment.to_string(),
                reply,
                once,
            });
    }

    fn respond(&self, sql: &str, params: &[DatabaseValue], kind: StatementKind) -> OrmResult<Vec<Record>> {
        let statement = ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
            kind,
        };
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(statement.clone());

        let reply = {
            let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
            match rules.iter().position(|rule| sql.contains(&rule.fragment)) {
                Some(index) if rules[index].once => Some(rules.remove(index).reply),
                Some(index) => Some(rules[index].reply.clone()),
                None => None,
            }
        };

        match reply {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(ModelError::Database(message)),
            None => match &self.handler {
                Some(handler) => handler(&statement).unwrap_or_else(|| Ok(Vec::new())),
                None => Ok(Vec::new()),
            },
        }
    }
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor")
            .field("statements", &self.statements().len())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Record>> {
        self.respond(sql, params, StatementKind::Query)
    }

    /// Rows affected is the number of scripted rows
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        Ok(self.respond(sql, params, StatementKind::Execute)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_and_log() {
        let mock = MockExecutor::new();
        mock.when("FROM users", vec![Record::new().with("id", 1i64)]);
        mock.fail_when("DROP", "not allowed");

        let rows = mock.query("SELECT * FROM users", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(mock.execute("DROP TABLE users", &[]).await.is_err());
        assert!(mock.query("SELECT 1", &[]).await.unwrap().is_empty());

        assert_eq!(mock.statements().len(), 3);
        assert_eq!(mock.writes().len(), 1);
        mock.clear();
        assert!(mock.statements().is_empty());
    }

    #[tokio::test]
    async fn test_once_rule_is_consumed() {
        let mock = MockExecutor::new();
        mock.when_once("users", vec![Record::new().with("id", 1i64)]);

        assert_eq!(mock.query("SELECT * FROM users", &[]).await.unwrap().len(), 1);
        assert!(mock.query("SELECT * FROM users", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_sees_params() {
        let mock = MockExecutor::new().with_handler(|statement| {
            statement
                .params
                .first()
                .map(|p| Ok(vec![Record::new().with("echo", p.clone())]))
        });

        let rows = mock.query("SELECT $1", &[DatabaseValue::from(42i64)]).await.unwrap();
        assert_eq!(rows[0].get("echo"), Some(&DatabaseValue::Int64(42)));
        assert!(mock.query("SELECT 1", &[]).await.unwrap().is_empty());
    }
}
