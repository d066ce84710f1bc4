//! Domain models for candidate search.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::degradation::Degradation;
use crate::error::{Error, Result};

pub use pgvector::Vector;

// =============================================================================
// REQUEST
// =============================================================================

/// Retrieval channels a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Primary search index plus vector channel.
    #[default]
    Elasticsearch,
    /// Lexical plus vector channel.
    Hybrid,
    /// Vector channel only.
    Semantic,
    /// Lexical channel only.
    Bm25,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Elasticsearch => "elasticsearch",
            SearchMethod::Hybrid => "hybrid",
            SearchMethod::Semantic => "semantic",
            SearchMethod::Bm25 => "bm25",
        }
    }

    pub fn uses_lexical(&self) -> bool {
        !matches!(self, SearchMethod::Semantic)
    }

    pub fn uses_vector(&self) -> bool {
        !matches!(self, SearchMethod::Bm25)
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" => Ok(SearchMethod::Elasticsearch),
            "hybrid" => Ok(SearchMethod::Hybrid),
            "semantic" => Ok(SearchMethod::Semantic),
            "bm25" => Ok(SearchMethod::Bm25),
            other => Err(Error::MalformedRequest(format!(
                "unknown search_method '{}'",
                other
            ))),
        }
    }
}

/// Per-channel fusion weights. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelWeights {
    pub keyword: f32,
    pub semantic: f32,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            keyword: defaults::KEYWORD_WEIGHT,
            semantic: defaults::SEMANTIC_WEIGHT,
        }
    }
}

impl ChannelWeights {
    pub fn new(keyword: f32, semantic: f32) -> Self {
        Self { keyword, semantic }
    }

    /// Same weights with the semantic channel switched off.
    pub fn lexical_only(self) -> Self {
        Self {
            keyword: self.keyword,
            semantic: 0.0,
        }
    }

    /// Same weights with the lexical channel switched off.
    pub fn semantic_only(self) -> Self {
        Self {
            keyword: 0.0,
            semantic: self.semantic,
        }
    }

    pub fn total(&self) -> f32 {
        self.keyword + self.semantic
    }
}

/// Structured filters a caller may supply explicitly.
///
/// A `Some` field always wins over the value extracted from the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default, alias = "jobDescription")]
    pub job_description: Option<String>,
    #[serde(default, deserialize_with = "skill_list")]
    pub skills: Option<Vec<String>>,
    #[serde(default, alias = "yearsOfExperience")]
    pub years_of_experience: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
}

/// Skills arrive either as a list or as one `,`/`;` separated string.
fn skill_list<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Skills {
        List(Vec<String>),
        Text(String),
    }

    let skills = match Option::<Skills>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Skills::List(list)) => list,
        Some(Skills::Text(text)) => text.split([',', ';']).map(str::to_string).collect(),
    };
    let skills: Vec<String> = skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(Some(skills))
}

/// An explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn es_weight_or_default<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(defaults::KEYWORD_WEIGHT))
}

fn semantic_weight_or_default<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(defaults::SEMANTIC_WEIGHT))
}

fn default_limit() -> i64 {
    defaults::SEARCH_LIMIT
}

fn default_threshold() -> f32 {
    defaults::SCORE_THRESHOLD
}

fn default_es_weight() -> f32 {
    defaults::KEYWORD_WEIGHT
}

fn default_semantic_weight() -> f32 {
    defaults::SEMANTIC_WEIGHT
}

/// Search request as received at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub position: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_threshold")]
    pub score_threshold: f32,
    #[serde(default)]
    pub search_method: SearchMethod,
    #[serde(default = "default_es_weight", deserialize_with = "es_weight_or_default")]
    pub es_weight: f32,
    #[serde(
        default = "default_semantic_weight",
        deserialize_with = "semantic_weight_or_default"
    )]
    pub semantic_weight: f32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: QueryFilters,
    #[serde(default)]
    pub fetch_education: bool,
}

impl SearchRequest {
    pub fn new(position: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            description: String::new(),
            limit: defaults::SEARCH_LIMIT,
            score_threshold: defaults::SCORE_THRESHOLD,
            search_method: SearchMethod::default(),
            es_weight: defaults::KEYWORD_WEIGHT,
            semantic_weight: defaults::SEMANTIC_WEIGHT,
            filters: QueryFilters::default(),
            fetch_education: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.search_method = method;
        self
    }

    pub fn with_weights(mut self, keyword: f32, semantic: f32) -> Self {
        self.es_weight = keyword;
        self.semantic_weight = semantic;
        self
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_education(mut self, fetch: bool) -> Self {
        self.fetch_education = fetch;
        self
    }

    pub fn weights(&self) -> ChannelWeights {
        ChannelWeights::new(self.es_weight, self.semantic_weight)
    }

    /// Reject requests that cannot be served. Never retried.
    pub fn validate(&self) -> Result<()> {
        if self.position.trim().is_empty() {
            return Err(Error::MalformedRequest(
                "position must not be empty".to_string(),
            ));
        }
        if self.limit <= 0 {
            return Err(Error::MalformedRequest(format!(
                "limit must be positive, got {}",
                self.limit
            )));
        }
        if !self.score_threshold.is_finite() || !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(Error::MalformedRequest(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }
        for (name, weight) in [
            ("es_weight", self.es_weight),
            ("semantic_weight", self.semantic_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::MalformedRequest(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }

    /// Effective limit after applying the server-side cap.
    pub fn bounded_limit(&self) -> usize {
        self.limit.clamp(1, defaults::SEARCH_LIMIT_MAX) as usize
    }
}

// =============================================================================
// STRUCTURED QUERY
// =============================================================================

/// Experience range extracted from "N", "N+", or "N-M".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearsRange {
    pub min: f32,
    pub max: Option<f32>,
}

impl YearsRange {
    pub fn contains(&self, years: f32) -> bool {
        years >= self.min && self.max.map_or(true, |max| years <= max)
    }
}

/// Canonical-language query produced by the structurer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Canonical position text as typed by the caller, trimmed.
    pub position: String,
    /// Canonical job description.
    pub description: String,
    pub skills: Vec<String>,
    pub experience: Option<YearsRange>,
    pub industry: Option<String>,
    pub education: Option<String>,
    /// Domain terms picked out of the description.
    pub key_terms: Vec<String>,
    /// Cleaned text sent to lexical backends.
    pub search_text: String,
}

impl StructuredQuery {
    /// Text sent to the embedding model.
    pub fn embedding_text(&self) -> String {
        let mut description = self.description.clone();
        if !self.skills.is_empty() {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(&self.skills.join(", "));
        }
        format!("Position: {}\nDescription: {}", self.position, description)
    }

    /// Lexical query text, falling back to the raw position.
    pub fn lexical_text(&self) -> &str {
        if self.search_text.is_empty() {
            &self.position
        } else {
            &self.search_text
        }
    }
}

/// Projected query vector. Construction rejects zero and non-finite vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEmbedding {
    values: Vec<f32>,
    projection_version: String,
}

impl QueryEmbedding {
    /// Returns `None` when the vector has no usable direction.
    pub fn new(values: Vec<f32>, projection_version: impl Into<String>) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return None;
        }
        Some(Self {
            values,
            projection_version: projection_version.into(),
        })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn projection_version(&self) -> &str {
        &self.projection_version
    }

    pub fn to_vector(&self) -> Vector {
        Vector::from(self.values.clone())
    }
}

// =============================================================================
// MATCHES
// =============================================================================

/// How well an experience's position title matches the query position.
///
/// Variants are declared low to high so `Ord` follows boost order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleMatchClass {
    #[default]
    None,
    Partial,
    Synonym,
    Exact,
}

impl TitleMatchClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleMatchClass::None => "none",
            TitleMatchClass::Partial => "partial",
            TitleMatchClass::Synonym => "synonym",
            TitleMatchClass::Exact => "exact",
        }
    }

    /// Search-index tier name for this class.
    pub fn tier(&self) -> &'static str {
        match self {
            TitleMatchClass::Exact => "exact",
            TitleMatchClass::Synonym => "relevant",
            TitleMatchClass::Partial => "similar",
            TitleMatchClass::None => "semantic_only",
        }
    }

    /// Classify a stored title against the query position.
    ///
    /// Exact means equal after normalization. Synonym means one contains the
    /// other as a phrase. Partial means at least one shared word.
    pub fn classify(query_position: &str, title: &str) -> Self {
        let query = normalize_title(query_position);
        let title = normalize_title(title);
        if query.is_empty() || title.is_empty() {
            return TitleMatchClass::None;
        }
        if query == title {
            return TitleMatchClass::Exact;
        }
        if contains_phrase(&title, &query) || contains_phrase(&query, &title) {
            return TitleMatchClass::Synonym;
        }
        let title_words: Vec<&str> = title.split(' ').collect();
        if query
            .split(' ')
            .filter(|w| w.chars().count() > 1)
            .any(|w| title_words.contains(&w))
        {
            return TitleMatchClass::Partial;
        }
        TitleMatchClass::None
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_title(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

/// One candidate-experience record returned by a retrieval channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceMatch {
    pub candidate_id: i64,
    pub experience_id: i64,
    /// Lexical score normalized to [0, 1]. Zero when the lexical channel missed.
    pub lexical_score: f32,
    /// Backend-native lexical score before normalization.
    pub raw_lexical_score: Option<f32>,
    /// Cosine similarity normalized to [0, 1]. `None` when the vector channel missed.
    pub cosine_similarity: Option<f32>,
    pub years: f32,
    pub title_class: TitleMatchClass,
    pub position_title: String,
    pub position_title_en: Option<String>,
    pub company_name: String,
    pub content: String,
    pub content_mn: String,
}

impl ExperienceMatch {
    pub fn new(candidate_id: i64, experience_id: i64) -> Self {
        Self {
            candidate_id,
            experience_id,
            lexical_score: 0.0,
            raw_lexical_score: None,
            cosine_similarity: None,
            years: 0.0,
            title_class: TitleMatchClass::None,
            position_title: String::new(),
            position_title_en: None,
            company_name: String::new(),
            content: String::new(),
            content_mn: String::new(),
        }
    }

    /// Fusion key.
    pub fn key(&self) -> (i64, i64) {
        (self.candidate_id, self.experience_id)
    }

    /// Title used for classification: the canonical title when present.
    pub fn canonical_title(&self) -> &str {
        self.position_title_en
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.position_title)
    }
}

/// Experience after fusion, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExperience {
    pub experience_id: i64,
    pub content: String,
    pub structured_content_mn: String,
    pub company_name: String,
    pub position_title: String,
    pub years: f32,
    pub combined_score: f32,
    pub match_tier: String,
    pub title_match: TitleMatchClass,
    pub lexical_score: Option<f32>,
    pub semantic_score: Option<f32>,
    pub elasticsearch_score: Option<f32>,
}

// =============================================================================
// CANDIDATES
// =============================================================================

/// Contact and profile fields supplied by the candidate directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub registration_number: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub profile_pic: Option<String>,
    pub resume: Option<String>,
    pub pst_score: Option<i32>,
    pub pst_date: Option<NaiveDate>,
}

/// Education record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: Option<String>,
    pub degree_name: Option<String>,
    pub field_of_study: Option<String>,
    pub gpa: Option<f64>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: i64,
    pub final_score: f32,
    pub rank: usize,
    pub experiences: Vec<ScoredExperience>,
    #[serde(flatten)]
    pub profile: CandidateProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<Education>>,
}

/// Echo of the query in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryEcho {
    pub position: String,
    pub description: String,
    pub results_count: usize,
}

/// Search response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub search_id: Uuid,
    pub candidates: Vec<CandidateResult>,
    pub search_query: SearchQueryEcho,
    pub degradation: Degradation,
    pub degraded: bool,
}

// =============================================================================
// INDEX RECORDS
// =============================================================================

/// Experience row as read from the relational store for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub id: i64,
    pub candidate_id: i64,
    pub position_title: Option<String>,
    pub position_title_en: Option<String>,
    pub company_name: Option<String>,
    pub structured_content_en: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub years_experience: Option<f32>,
}

/// One facet value with its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: i64,
}

/// Facet listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub positions: Vec<FacetCount>,
    pub companies: Vec<FacetCount>,
}

// =============================================================================
// HEALTH
// =============================================================================

/// Primary lexical backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Available,
    Degraded,
    Unavailable,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Available => "available",
            HealthState::Degraded => "degraded",
            HealthState::Unavailable => "unavailable",
        }
    }
}

/// Snapshot of the primary lexical backend health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub last_checked: DateTime<Utc>,
    pub consecutive_failures: u32,
}
