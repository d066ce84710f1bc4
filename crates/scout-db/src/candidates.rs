//! Candidate directory: profiles, education and facet counts.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use scout_core::{CandidateDirectory, CandidateProfile, Education, FacetCount, Facets, Result};

/// Reads candidate records that sit outside the ranking path.
#[derive(Clone)]
pub struct PgCandidateDirectory {
    pool: PgPool,
}

impl PgCandidateDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn facet(&self, column: &str, limit: usize) -> Result<Vec<FacetCount>> {
        let sql = format!(
            r#"
            SELECT {column} AS value, COUNT(*) AS n
            FROM candidate_experience
            WHERE {column} IS NOT NULL AND {column} <> ''
            GROUP BY {column}
            ORDER BY n DESC, {column} ASC
            LIMIT $1
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<FacetCount> {
                Ok(FacetCount {
                    value: row.try_get("value")?,
                    count: row.try_get("n")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CandidateDirectory for PgCandidateDirectory {
    async fn profiles(&self, candidate_ids: &[i64]) -> Result<HashMap<i64, CandidateProfile>> {
        if candidate_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone, gender, registration_number,
                   birthdate, profile_pic, resume, pst_score, pst_date
            FROM candidates
            WHERE id = ANY($1)
            "#,
        )
        .bind(candidate_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut profiles = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            profiles.insert(
                id,
                CandidateProfile {
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    email: row.try_get("email")?,
                    phone: row.try_get("phone")?,
                    gender: row.try_get("gender")?,
                    registration_number: row.try_get("registration_number")?,
                    birthdate: row.try_get("birthdate")?,
                    profile_pic: row.try_get("profile_pic")?,
                    resume: row.try_get("resume")?,
                    pst_score: row.try_get("pst_score")?,
                    pst_date: row.try_get("pst_date")?,
                },
            );
        }
        Ok(profiles)
    }

    async fn education(&self, candidate_ids: &[i64]) -> Result<HashMap<i64, Vec<Education>>> {
        if candidate_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT candidate_id, institution, degree_name, field_of_study, gpa,
                   start_year, end_year
            FROM candidate_education
            WHERE candidate_id = ANY($1)
            ORDER BY candidate_id, end_year DESC NULLS LAST, id ASC
            "#,
        )
        .bind(candidate_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut education: HashMap<i64, Vec<Education>> = HashMap::new();
        for row in rows {
            let candidate_id: i64 = row.try_get("candidate_id")?;
            education.entry(candidate_id).or_default().push(Education {
                institution: row.try_get("institution")?,
                degree_name: row.try_get("degree_name")?,
                field_of_study: row.try_get("field_of_study")?,
                gpa: row.try_get("gpa")?,
                start_year: row.try_get("start_year")?,
                end_year: row.try_get("end_year")?,
            });
        }
        Ok(education)
    }

    async fn facets(&self, limit: usize) -> Result<Facets> {
        Ok(Facets {
            positions: self.facet("position_title_en", limit).await?,
            companies: self.facet("company_name", limit).await?,
        })
    }
}
