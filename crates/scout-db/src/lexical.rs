//! Relational full-text fallback for the lexical channel.
//!
//! Ranks experiences with `ts_rank` over two generated tsvectors: an English
//! one built from the canonical title and content, and a `simple` one over the
//! original-language columns. The higher of the two ranks is the raw score.
//! Title classes are assigned in Rust so both lexical backends classify the
//! same way, then scores are banded per class.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use scout_core::{
    normalize_tiered, LexicalBackend, Result, StructuredQuery, TitleMatchClass, ExperienceMatch,
};

use crate::escape_like;
use crate::rows::{experience_from_row, today, EXPERIENCE_COLUMNS};

/// PostgreSQL full-text search over candidate experiences.
#[derive(Clone)]
pub struct PgLexicalSearch {
    pool: PgPool,
}

impl PgLexicalSearch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LexicalBackend for PgLexicalSearch {
    fn name(&self) -> &'static str {
        "postgres_fts"
    }

    async fn search(
        &self,
        query: &StructuredQuery,
        limit_ceiling: usize,
    ) -> Result<Vec<ExperienceMatch>> {
        let start = Instant::now();
        let text = query.lexical_text();
        if text.trim().is_empty() || limit_ceiling == 0 {
            return Ok(Vec::new());
        }

        // Exact canonical-title hits sort first so the limit never drops them.
        let sql = format!(
            r#"
            WITH q AS (
                SELECT plainto_tsquery('english', $1) AS en,
                       plainto_tsquery('simple', $1) AS mn
            )
            SELECT {EXPERIENCE_COLUMNS},
                   GREATEST(ts_rank(ce.fts_vector_en, q.en), ts_rank(ce.fts_vector_mn, q.mn))::real AS rank
            FROM candidate_experience ce, q
            WHERE ce.fts_vector_en @@ q.en
               OR ce.fts_vector_mn @@ q.mn
               OR lower(ce.position_title_en) = lower($2)
            ORDER BY (lower(ce.position_title_en) = lower($2)) DESC NULLS LAST,
                     rank DESC,
                     ce.id ASC
            LIMIT $3
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(text)
            .bind(query.position.trim())
            .bind(limit_ceiling as i64)
            .fetch_all(&self.pool)
            .await?;

        let today = today();
        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut m = experience_from_row(row, today)?;
            let rank: f32 = row.try_get("rank")?;
            m.raw_lexical_score = Some(rank);
            m.title_class = TitleMatchClass::classify(&query.position, m.canonical_title());
            matches.push(m);
        }
        normalize_tiered(&mut matches);

        debug!(
            subsystem = "db",
            component = "lexical",
            op = "search",
            backend = self.name(),
            result_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "FTS search completed"
        );
        Ok(matches)
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let prefix = prefix.trim();
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = format!("{}%", escape_like(prefix));
        let rows = sqlx::query(
            r#"
            SELECT position_title_en, COUNT(*) AS n
            FROM candidate_experience
            WHERE position_title_en ILIKE $1 ESCAPE '\'
            GROUP BY position_title_en
            ORDER BY n DESC, position_title_en ASC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("position_title_en").map_err(Into::into))
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
