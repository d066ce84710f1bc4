//! Keyset-paged reads of experience records for reindexing.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use scout_core::{experience_years, ExperienceRecord, ExperienceSource, Result};

use crate::rows::today;

#[derive(Clone)]
pub struct PgExperienceSource {
    pool: PgPool,
}

impl PgExperienceSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExperienceSource for PgExperienceSource {
    async fn experiences_after(&self, after_id: i64, batch: usize) -> Result<Vec<ExperienceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, candidate_id, position_title, position_title_en, company_name,
                   structured_content_en, start_date, end_date
            FROM candidate_experience
            WHERE id > $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(after_id)
        .bind(batch as i64)
        .fetch_all(&self.pool)
        .await?;

        let today = today();
        rows.iter()
            .map(|row| -> Result<ExperienceRecord> {
                let start_date: Option<NaiveDate> = row.try_get("start_date")?;
                let end_date: Option<NaiveDate> = row.try_get("end_date")?;
                Ok(ExperienceRecord {
                    id: row.try_get("id")?,
                    candidate_id: row.try_get("candidate_id")?,
                    position_title: row.try_get("position_title")?,
                    position_title_en: row.try_get("position_title_en")?,
                    company_name: row.try_get("company_name")?,
                    structured_content_en: row.try_get("structured_content_en")?,
                    start_date,
                    end_date,
                    years_experience: start_date
                        .map(|_| experience_years(start_date, end_date, today)),
                })
            })
            .collect()
    }
}
