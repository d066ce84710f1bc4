//! Nearest-neighbour search over projected experience embeddings.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use scout_core::{normalize_cosine_distance, ExperienceMatch, QueryEmbedding, Result, VectorBackend};

use crate::rows::{experience_from_row, today, EXPERIENCE_COLUMNS};

/// pgvector cosine search over `candidate_experience.embedding`.
#[derive(Clone)]
pub struct PgVectorSearch {
    pool: PgPool,
}

impl PgVectorSearch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorBackend for PgVectorSearch {
    async fn search(
        &self,
        embedding: &QueryEmbedding,
        limit_ceiling: usize,
    ) -> Result<Vec<ExperienceMatch>> {
        let start = Instant::now();
        if limit_ceiling == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {EXPERIENCE_COLUMNS},
                   (ce.embedding <=> $1::vector)::float8 AS distance
            FROM candidate_experience ce
            JOIN candidates c ON ce.candidate_id = c.id
            WHERE ce.embedding IS NOT NULL
              AND ce.position_title_en IS NOT NULL
              AND ce.position_title_en <> ''
            ORDER BY distance ASC, ce.id ASC
            LIMIT $2
            "#
        );

        let query: pgvector::Vector = embedding.to_vector();
        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(limit_ceiling as i64)
            .fetch_all(&self.pool)
            .await?;

        let today = today();
        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut m = experience_from_row(row, today)?;
            let distance: f64 = row.try_get("distance")?;
            m.cosine_similarity = Some(normalize_cosine_distance(distance));
            matches.push(m);
        }

        debug!(
            subsystem = "db",
            component = "vector",
            op = "search",
            result_count = matches.len(),
            dimension = embedding.dimension(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector search completed"
        );
        Ok(matches)
    }
}
