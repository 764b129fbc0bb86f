//! Outbound persistence hand-off for finalized voting results
//!
//! The coordinator broadcasts a result exactly once, then hands it to a
//! `ResultSink`. The hand-off is fire-and-forget: failures are logged and
//! never retried here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::protocol::VotingResult;

/// Destination for finalized voting results
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn store_result(&self, result: &VotingResult) -> Result<()>;
}

/// Sink that only logs, for deployments where a downstream consumer reads the
/// result broadcast instead
pub struct NoopResultSink;

#[async_trait]
impl ResultSink for NoopResultSink {
    async fn store_result(&self, result: &VotingResult) -> Result<()> {
        tracing::debug!(
            "Dropping result for room {} (no sink configured): winner {}",
            result.room_id,
            result.winner.movie_id
        );
        Ok(())
    }
}

/// PostgreSQL-backed result sink
pub struct PostgresResultSink {
    pool: PgPool,
}

impl PostgresResultSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultSink for PostgresResultSink {
    async fn store_result(&self, result: &VotingResult) -> Result<()> {
        let winner = serde_json::to_value(&result.winner).context("serialize winner")?;
        let all_scores = serde_json::to_value(&result.all_scores).context("serialize scores")?;

        sqlx::query(
            r#"
            INSERT INTO voting_results
                (room_id, winner_movie_id, winner, score, all_scores, total_participants, decided_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&result.room_id)
        .bind(&result.winner.movie_id)
        .bind(winner)
        .bind(result.score)
        .bind(all_scores)
        .bind(result.total_participants as i32)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .context("insert voting result")?;

        tracing::info!(
            "Stored voting result for room {}: winner {}",
            result.room_id,
            result.winner.movie_id
        );

        Ok(())
    }
}
