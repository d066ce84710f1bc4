//! Elasticsearch primary lexical backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use scout_core::{
    defaults, experience_years, normalize_tiered, Error, ExperienceMatch, ExperienceRecord,
    LexicalBackend, LexicalIndex, Result, StructuredQuery, TitleMatchClass,
};

use super::query::{index_definition, suggest_body, tier_body, TierText};
use super::types::{BulkResponse, CountResponse, SearchResponse};

/// Tiers in query order. Each maps onto the title class its hits carry.
const TIERS: [TitleMatchClass; 3] = [
    TitleMatchClass::Exact,
    TitleMatchClass::Synonym,
    TitleMatchClass::Partial,
];

/// Configuration for the Elasticsearch backend.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
    /// Per-request HTTP timeout. The retriever applies its own bound on top.
    pub timeout_ms: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: defaults::ES_URL.to_string(),
            index: defaults::ES_INDEX.to_string(),
            timeout_ms: defaults::LEXICAL_TIMEOUT_MS,
        }
    }
}

impl ElasticsearchConfig {
    /// Read `ES_URL`, `ES_INDEX`, `LEXICAL_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            url: std::env::var("ES_URL").unwrap_or(base.url),
            index: std::env::var("ES_INDEX").unwrap_or(base.index),
            timeout_ms: std::env::var("LEXICAL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.timeout_ms),
        }
    }
}

/// Tiered full-text search over an Elasticsearch index.
pub struct ElasticsearchBackend {
    client: Client,
    config: ElasticsearchConfig,
}

impl ElasticsearchBackend {
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "search",
            component = "elasticsearch",
            url = %config.url,
            index = %config.index,
            "Initializing Elasticsearch backend"
        );

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ElasticsearchConfig::from_env())
    }

    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn index_url(&self, suffix: &str) -> String {
        self.url(&format!("{}{}", self.config.index, suffix))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LexicalBackendUnavailable(format!(
                "elasticsearch returned {}: {}",
                status,
                truncate(&body, 200)
            )));
        }
        response.json::<T>().await.map_err(|e| self.transport_error(e))
    }

    async fn run_search(&self, body: &Value) -> Result<SearchResponse> {
        self.send_json(self.client.post(self.index_url("/_search")).json(body))
            .await
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::LexicalBackendTimeout {
                backend: "elasticsearch".to_string(),
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            Error::LexicalBackendUnavailable(format!("elasticsearch request failed: {}", e))
        }
    }

    fn to_match(record: ExperienceRecord, raw: f32, class: TitleMatchClass) -> ExperienceMatch {
        let today = Utc::now().date_naive();
        let mut m = ExperienceMatch::new(record.candidate_id, record.id);
        m.years = record
            .years_experience
            .filter(|y| y.is_finite() && *y >= 0.0)
            .unwrap_or_else(|| experience_years(record.start_date, record.end_date, today));
        m.raw_lexical_score = Some(raw);
        m.title_class = class;
        m.position_title = record.position_title.unwrap_or_default();
        m.position_title_en = record.position_title_en;
        m.company_name = record.company_name.unwrap_or_default();
        m.content = record.structured_content_en.unwrap_or_default();
        m
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl LexicalBackend for ElasticsearchBackend {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn search(
        &self,
        query: &StructuredQuery,
        limit_ceiling: usize,
    ) -> Result<Vec<ExperienceMatch>> {
        let start = Instant::now();
        let text = TierText::new(&query.position, query.lexical_text());
        if text.position.is_empty() || limit_ceiling == 0 {
            return Ok(Vec::new());
        }

        let mut matches: Vec<ExperienceMatch> = Vec::new();
        let mut seen: Vec<i64> = Vec::new();
        for class in TIERS {
            let remaining = limit_ceiling.saturating_sub(matches.len());
            if remaining == 0 {
                break;
            }
            let (size, keep) = match class {
                TitleMatchClass::Exact => (
                    defaults::EXACT_TIER_SIZE,
                    defaults::EXACT_TIER_KEEP.min(remaining),
                ),
                _ => (remaining, remaining),
            };

            let response = self.run_search(&tier_body(class, &text, size, &seen)).await?;
            let before = matches.len();
            for hit in response.hits.hits {
                if matches.len() - before >= keep {
                    break;
                }
                if seen.contains(&hit.source.id) {
                    continue;
                }
                seen.push(hit.source.id);
                matches.push(Self::to_match(hit.source, hit.score.unwrap_or(0.0), class));
            }
            debug!(
                subsystem = "search",
                component = "elasticsearch",
                op = "tier",
                tier = class.tier(),
                result_count = matches.len() - before,
                "Tier complete"
            );
        }
        normalize_tiered(&mut matches);

        debug!(
            subsystem = "search",
            component = "elasticsearch",
            op = "search",
            result_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tiered search completed"
        );
        Ok(matches)
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        if prefix.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let response = self.run_search(&suggest_body(prefix, limit)).await?;
        Ok(response
            .aggregations
            .map(|aggs| aggs.titles.buckets.into_iter().map(|b| b.key).collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url(""))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::LexicalBackendUnavailable(format!(
                "elasticsearch ping returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl LexicalIndex for ElasticsearchBackend {
    async fn ensure_index(&self) -> Result<()> {
        let exists = self
            .client
            .head(self.index_url(""))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        match exists.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let _: Value = self
                    .send_json(self.client.put(self.index_url("")).json(&index_definition()))
                    .await?;
                info!(
                    subsystem = "search",
                    component = "elasticsearch",
                    op = "create_index",
                    index = %self.config.index,
                    "Created experience index"
                );
                Ok(())
            }
            status => Err(Error::LexicalBackendUnavailable(format!(
                "elasticsearch index check returned {}",
                status
            ))),
        }
    }

    async fn bulk_index(&self, records: &[ExperienceRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut body = String::new();
        for record in records {
            let action = serde_json::json!({
                "index": { "_index": self.config.index, "_id": record.id.to_string() }
            });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        let response: BulkResponse = self
            .send_json(
                self.client
                    .post(self.url("_bulk"))
                    .header("Content-Type", "application/x-ndjson")
                    .body(body),
            )
            .await?;

        let accepted = response.items.iter().filter(|i| i.index.is_success()).count();
        if response.errors {
            let failed: Vec<&str> = response
                .items
                .iter()
                .filter(|i| !i.index.is_success())
                .filter_map(|i| i.index.id.as_deref())
                .take(10)
                .collect();
            warn!(
                subsystem = "search",
                component = "elasticsearch",
                op = "bulk_index",
                accepted,
                rejected = records.len() - accepted,
                sample_ids = ?failed,
                "Bulk request had rejected documents"
            );
        }
        Ok(accepted)
    }

    async fn document_count(&self) -> Result<u64> {
        let response: CountResponse = self
            .send_json(self.client.get(self.index_url("/_count")))
            .await?;
        Ok(response.count)
    }
}
