//! Shared row mapping for experience queries.

use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;

use scout_core::{experience_years, ExperienceMatch, Result};

/// Columns every experience query selects, prefixed with the `ce` alias.
pub(crate) const EXPERIENCE_COLUMNS: &str = "ce.id, ce.candidate_id, ce.position_title, \
     ce.position_title_en, ce.company_name, ce.structured_content_en, \
     ce.structured_content_mn, ce.start_date, ce.end_date";

pub(crate) fn experience_from_row(row: &PgRow, today: NaiveDate) -> Result<ExperienceMatch> {
    let mut m = ExperienceMatch::new(row.try_get("candidate_id")?, row.try_get("id")?);
    let start: Option<NaiveDate> = row.try_get("start_date")?;
    let end: Option<NaiveDate> = row.try_get("end_date")?;
    m.years = experience_years(start, end, today);
    m.position_title = row
        .try_get::<Option<String>, _>("position_title")?
        .unwrap_or_default();
    m.position_title_en = row.try_get("position_title_en")?;
    m.company_name = row
        .try_get::<Option<String>, _>("company_name")?
        .unwrap_or_default();
    m.content = row
        .try_get::<Option<String>, _>("structured_content_en")?
        .unwrap_or_default();
    m.content_mn = row
        .try_get::<Option<String>, _>("structured_content_mn")?
        .unwrap_or_default();
    Ok(m)
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
