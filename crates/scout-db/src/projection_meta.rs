//! Projection version recorded alongside stored embeddings.

use sqlx::{PgPool, Row};

use scout_core::Result;

/// Metadata row written when the stored embeddings were built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionMetadata {
    pub version: String,
    pub input_dim: i32,
    pub output_dim: i32,
}

#[derive(Clone)]
pub struct PgProjectionMetadata {
    pool: PgPool,
}

impl PgProjectionMetadata {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current metadata, or `None` if the index was never stamped.
    pub async fn current(&self) -> Result<Option<ProjectionMetadata>> {
        let row = sqlx::query(
            "SELECT version, input_dim, output_dim FROM projection_metadata WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| -> Result<ProjectionMetadata> {
            Ok(ProjectionMetadata {
                version: row.try_get("version")?,
                input_dim: row.try_get("input_dim")?,
                output_dim: row.try_get("output_dim")?,
            })
        })
        .transpose()
    }

    /// Stamp the version after a full re-embed.
    pub async fn record(&self, meta: &ProjectionMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projection_metadata (id, version, input_dim, output_dim, updated_at)
            VALUES (1, $1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE
            SET version = EXCLUDED.version,
                input_dim = EXCLUDED.input_dim,
                output_dim = EXCLUDED.output_dim,
                updated_at = now()
            "#,
        )
        .bind(&meta.version)
        .bind(meta.input_dim)
        .bind(meta.output_dim)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
