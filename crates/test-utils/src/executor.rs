//! A scripted [`QueryExecutor`] that records what it was asked to run.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use sql_edr::{ProviderError, ProviderResult, QueryExecutor, Row, Statement};

/// Returns the same scripted rows for every statement and counts calls.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    rows: Vec<Row>,
    failure: Option<String>,
    calls: AtomicUsize,
    statements: Mutex<Vec<Statement>>,
}

impl RecordingExecutor {
    /// An executor that returns no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An executor that returns `rows` for every statement.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// An executor whose every call fails like a database error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of statements executed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every statement executed so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last_statement(&self) -> Option<Statement> {
        self.statements().pop()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn fetch_all(&self, statement: &Statement) -> ProviderResult<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(statement.clone());

        match &self.failure {
            Some(message) => Err(ProviderError::QueryExecution(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement() -> Statement {
        Statement {
            sql: "SELECT 1".to_string(),
            params: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_counts_and_records() {
        let executor = RecordingExecutor::with_rows(vec![Row::new().with("a", 1i64)]);
        assert_eq!(executor.calls(), 0);

        let rows = executor.fetch_all(&statement()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(executor.calls(), 1);
        assert_eq!(executor.last_statement(), Some(statement()));
    }

    #[tokio::test]
    async fn test_failing_executor() {
        let executor = RecordingExecutor::failing("connection refused");
        let err = executor.fetch_all(&statement()).await.unwrap_err();
        assert!(err.is_query_execution());
        assert_eq!(executor.calls(), 1);
    }
}
