//! City history passages by semantic similarity

use super::{mismatch, QueryExecutor, Records, ToolFailed, ToolResult};
use crate::catalog::{ToolInvocation, ToolName};
use crate::config::QueryConfig;
use crate::llm::{EmbeddingService, EMBEDDING_DIMENSIONS};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::PgPool;
use std::fmt::Write;
use std::sync::Arc;

/// Best of the passage-text and sample-question similarities
const SEARCH_SQL: &str = r"
    SELECT id, text, similarity FROM (
        SELECT id, text,
               GREATEST(1 - (text_embedding <=> $1::vector),
                        1 - (questions_embedding <=> $1::vector)) AS similarity
        FROM thessaloniki_history
        WHERE text_embedding IS NOT NULL AND questions_embedding IS NOT NULL
    ) scored
    WHERE similarity > $2
    ORDER BY similarity DESC, id
    LIMIT $3
";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Passage {
    pub id: i32,
    pub text: Option<String>,
    pub similarity: f64,
}

pub(crate) fn render(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return "No documented history matches the question.".to_string();
    }
    let mut out = String::from("Relevant passages on the city's history:");
    for (i, p) in passages.iter().enumerate() {
        let _ = write!(
            out,
            "\n\n[{}] (relevance {:.2})\n{}",
            i + 1,
            p.similarity,
            p.text.as_deref().unwrap_or("").trim()
        );
    }
    out
}

pub struct HistoryExecutor {
    pool: PgPool,
    embeddings: Arc<dyn EmbeddingService>,
    config: QueryConfig,
}

impl HistoryExecutor {
    pub fn new(pool: PgPool, embeddings: Arc<dyn EmbeddingService>, config: QueryConfig) -> Self {
        Self {
            pool,
            embeddings,
            config,
        }
    }

    async fn embed(&self, query: &str) -> Result<Vector, ToolFailed> {
        let embedding =
            match tokio::time::timeout(self.config.embedding_timeout, self.embeddings.embed(query)).await {
                Ok(Ok(v)) => v,
                Ok(Err(e)) => return Err(ToolFailed::new(self.tool(), format!("embedding failed: {e}"))),
                Err(_) => {
                    return Err(ToolFailed::new(
                        self.tool(),
                        format!(
                            "embedding timed out after {}s",
                            self.config.embedding_timeout.as_secs()
                        ),
                    ))
                }
            };
        if embedding.len() != EMBEDDING_DIMENSIONS {
            return Err(ToolFailed::new(
                self.tool(),
                format!(
                    "embedding has {} dimensions, expected {EMBEDDING_DIMENSIONS}",
                    embedding.len()
                ),
            ));
        }
        Ok(Vector::from(embedding))
    }
}

#[async_trait]
impl QueryExecutor for HistoryExecutor {
    fn tool(&self) -> ToolName {
        ToolName::History
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        let ToolInvocation::History(params) = invocation else {
            return Err(mismatch(self.tool(), invocation));
        };
        let vector = self.embed(&params.search_query).await?;
        let limit = i64::try_from(self.config.result_limit).unwrap_or(i64::MAX);

        let query = sqlx::query_as::<_, Passage>(SEARCH_SQL)
            .bind(vector)
            .bind(self.config.similarity_threshold)
            .bind(limit)
            .fetch_all(&self.pool);

        let passages = match tokio::time::timeout(self.config.db_timeout, query).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => return Err(ToolFailed::new(self.tool(), e.to_string())),
            Err(_) => {
                return Err(ToolFailed::new(
                    self.tool(),
                    format!("query timed out after {}s", self.config.db_timeout.as_secs()),
                ))
            }
        };
        tracing::debug!(
            matches = passages.len(),
            best = passages.first().map(|p| p.similarity),
            "History search complete"
        );
        Ok(ToolResult::new(
            self.tool(),
            Records::History(passages),
            self.config.result_limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    struct FixedEmbedding(Result<Vec<f32>, LlmError>);

    #[async_trait]
    impl EmbeddingService for FixedEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            self.0.clone()
        }
    }

    fn executor(embedding: Result<Vec<f32>, LlmError>) -> HistoryExecutor {
        // Lazy pool: never connects unless a query is issued
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(50))
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        HistoryExecutor::new(pool, Arc::new(FixedEmbedding(embedding)), QueryConfig::default())
    }

    #[tokio::test]
    async fn test_embedding_failure_is_tool_failure() {
        let exec = executor(Err(LlmError::network("connection refused")));
        let err = exec.embed("Ροτόντα").await.unwrap_err();
        assert_eq!(err.tool, ToolName::History);
        assert!(err.reason.contains("embedding failed"));
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let exec = executor(Ok(vec![0.1; 3]));
        let err = exec.embed("Ροτόντα").await.unwrap_err();
        assert!(err.reason.contains("3 dimensions"));
    }

    #[test]
    fn test_search_orders_by_similarity_then_id() {
        assert!(SEARCH_SQL.contains("ORDER BY similarity DESC, id"));
        assert!(SEARCH_SQL.contains("WHERE similarity > $2"));
    }

    #[test]
    fn test_render_passages() {
        let text = render(&[Passage {
            id: 7,
            text: Some(" Η Ροτόντα χτίστηκε το 306 μ.Χ. ".to_string()),
            similarity: 0.8123,
        }]);
        assert!(text.contains("[1] (relevance 0.81)\nΗ Ροτόντα χτίστηκε το 306 μ.Χ."));
        assert!(render(&[]).starts_with("No documented history"));
    }
}
