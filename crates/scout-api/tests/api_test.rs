//! HTTP endpoint tests driving the router with tower's `oneshot`.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use governor::{Quota, RateLimiter};
use tower::ServiceExt;

use scout_api::{router, AppState, ReindexTarget};
use scout_core::{
    CandidateDirectory, CandidateProfile, Education, Error, ExperienceMatch, ExperienceRecord,
    ExperienceSource, FacetCount, Facets, LexicalBackend, LexicalIndex, QueryEmbedding, Result,
    StructuredQuery, TitleMatchClass, VectorBackend,
};
use scout_inference::mock::MockInferenceBackend;
use scout_inference::{Embedder, Projection, QueryTranslator, RetryPolicy};
use scout_search::{
    CacheConfig, HealthMonitor, LexicalRetriever, SearchEngine, SuggestionService,
    VectorRetriever,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct Index {
    name: &'static str,
    fail: AtomicBool,
    indexed: AtomicUsize,
}

impl Index {
    fn named(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: AtomicBool::new(false),
            indexed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LexicalBackend for Index {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _: &StructuredQuery, _: usize) -> Result<Vec<ExperienceMatch>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::LexicalBackendUnavailable("connection refused 10.1.2.3:9200".into()));
        }
        let mut exact = ExperienceMatch::new(1, 11);
        exact.position_title = "Data Engineer".to_string();
        exact.title_class = TitleMatchClass::Exact;
        exact.lexical_score = 1.0;
        exact.years = 6.0;
        let mut partial = ExperienceMatch::new(2, 21);
        partial.position_title = "Data Analyst".to_string();
        partial.title_class = TitleMatchClass::Partial;
        partial.lexical_score = 0.39;
        partial.years = 2.0;
        Ok(vec![exact, partial])
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        Ok(["Data Analyst", "Data Engineer", "Database Administrator"]
            .into_iter()
            .filter(|t| t.to_lowercase().starts_with(prefix))
            .take(limit)
            .map(str::to_string)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::LexicalBackendUnavailable("down".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LexicalIndex for Index {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn bulk_index(&self, records: &[ExperienceRecord]) -> Result<usize> {
        self.indexed.fetch_add(records.len(), Ordering::SeqCst);
        Ok(records.len())
    }

    async fn document_count(&self) -> Result<u64> {
        Ok(self.indexed.load(Ordering::SeqCst) as u64)
    }
}

struct Rows(usize);

#[async_trait]
impl ExperienceSource for Rows {
    async fn experiences_after(&self, after_id: i64, batch: usize) -> Result<Vec<ExperienceRecord>> {
        Ok((1..=self.0 as i64)
            .filter(|id| *id > after_id)
            .take(batch)
            .map(|id| ExperienceRecord {
                id,
                candidate_id: id,
                position_title: None,
                position_title_en: Some("Data Engineer".to_string()),
                company_name: None,
                structured_content_en: None,
                start_date: None,
                end_date: None,
                years_experience: Some(2.0),
            })
            .collect())
    }
}

struct NoVectors;

#[async_trait]
impl VectorBackend for NoVectors {
    async fn search(&self, _: &QueryEmbedding, _: usize) -> Result<Vec<ExperienceMatch>> {
        Ok(Vec::new())
    }
}

struct Directory;

#[async_trait]
impl CandidateDirectory for Directory {
    async fn profiles(&self, ids: &[i64]) -> Result<HashMap<i64, CandidateProfile>> {
        Ok(ids
            .iter()
            .map(|id| {
                (
                    *id,
                    CandidateProfile {
                        first_name: Some(format!("Candidate{}", id)),
                        ..CandidateProfile::default()
                    },
                )
            })
            .collect())
    }

    async fn education(&self, _: &[i64]) -> Result<HashMap<i64, Vec<Education>>> {
        Ok(HashMap::new())
    }

    async fn facets(&self, limit: usize) -> Result<Facets> {
        Ok(Facets {
            positions: vec![FacetCount {
                value: "Data Engineer".to_string(),
                count: 12,
            }]
            .into_iter()
            .take(limit)
            .collect(),
            companies: vec![FacetCount {
                value: "Khan Bank".to_string(),
                count: 4,
            }],
        })
    }
}

struct Fixture {
    state: AppState,
    primary: Arc<Index>,
    fallback: Arc<Index>,
}

fn fixture() -> Fixture {
    let primary = Index::named("elasticsearch");
    let fallback = Index::named("postgres_fts");
    let retry = RetryPolicy::no_retry(Duration::from_secs(1));
    let backend = MockInferenceBackend::new().with_dimension(8);

    let health = Arc::new(HealthMonitor::new(
        primary.clone(),
        Duration::from_secs(30),
        Duration::from_millis(200),
    ));
    let lexical = Arc::new(LexicalRetriever::with_primary(
        health,
        fallback.clone(),
        Duration::from_secs(1),
    ));
    let engine = SearchEngine::new(
        Arc::new(QueryTranslator::new(Arc::new(backend.clone()), retry)),
        Arc::new(Embedder::new(
            Arc::new(backend),
            Arc::new(Projection::identity(8, "test-v1")),
            retry,
        )),
        lexical.clone(),
        Arc::new(VectorRetriever::new(Arc::new(NoVectors), Duration::from_secs(1))),
        Arc::new(Directory),
    )
    .with_result_cache(CacheConfig::new(Duration::from_secs(60)));
    let suggestions = SuggestionService::new(lexical, CacheConfig::new(Duration::from_secs(60)));

    let state = AppState::new(Arc::new(engine), Arc::new(suggestions))
        .with_reindex(ReindexTarget::new(primary.clone(), Arc::new(Rows(5)), 2));
    Fixture {
        state,
        primary,
        fallback,
    }
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_endpoint() {
    let f = fixture();
    let (status, json) = send(&f.state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let f = fixture();
    let response = router(f.state).oneshot(get("/health")).await.unwrap();
    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(uuid::Uuid::parse_str(id).unwrap().get_version_num(), 7);
}

#[tokio::test]
async fn test_search_returns_ranked_candidates() {
    let f = fixture();
    let (status, json) = send(
        &f.state,
        post_json(
            "/search",
            serde_json::json!({
                "position": "Data Engineer",
                "description": "Skills: Python, SQL",
                "limit": 5,
                "score_threshold": 0.1,
                "search_method": "hybrid"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let candidates = json["candidates"].as_array().unwrap();
    assert!(!candidates.is_empty() && candidates.len() <= 5);
    assert_eq!(candidates[0]["candidate_id"], 1);
    assert_eq!(candidates[0]["rank"], 1);
    assert_eq!(candidates[0]["first_name"], "Candidate1");
    assert_eq!(json["search_query"]["position"], "Data Engineer");
    assert!(json["search_id"].is_string());
}

#[tokio::test]
async fn test_search_accepts_skills_as_text() {
    let f = fixture();
    let (status, json) = send(
        &f.state,
        post_json(
            "/search",
            serde_json::json!({
                "position": "Data Engineer",
                "description": "",
                "filters": { "skills": "Python, SQL", "industry": "Banking" },
                "activeFilters": { "skills": true }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["candidates"][0]["candidate_id"], 1);
}

#[tokio::test]
async fn test_search_treats_null_weights_as_defaults() {
    let f = fixture();
    let (status, json) = send(
        &f.state,
        post_json(
            "/search",
            serde_json::json!({
                "position": "Data Engineer",
                "description": "Skills: Python, SQL",
                "es_weight": null,
                "semantic_weight": null,
                "filters": null
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!json["candidates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_missing_position_is_bad_request() {
    let f = fixture();
    let (status, json) = send(
        &f.state,
        post_json("/search", serde_json::json!({ "limit": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_search_threshold_out_of_range_is_bad_request() {
    let f = fixture();
    let (status, _) = send(
        &f.state,
        post_json(
            "/search",
            serde_json::json!({ "position": "Data Engineer", "score_threshold": 1.5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_total_failure_is_generic_503() {
    let f = fixture();
    f.primary.fail.store(true, Ordering::SeqCst);
    f.fallback.fail.store(true, Ordering::SeqCst);
    let (status, json) = send(
        &f.state,
        post_json(
            "/search",
            serde_json::json!({ "position": "Data Engineer", "search_method": "bm25" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "search temporarily unavailable, retry");
    assert!(!json.to_string().contains("10.1.2.3"));
}

#[tokio::test]
async fn test_primary_outage_still_answers_with_degradation_flag() {
    let f = fixture();
    f.primary.fail.store(true, Ordering::SeqCst);
    let (status, json) = send(
        &f.state,
        post_json("/search", serde_json::json!({ "position": "Data Engineer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["degraded"], true);
    assert_eq!(json["degradation"]["lexical_fallback"], true);

    let (_, health) = send(&f.state, get("/lexical/health")).await;
    assert_eq!(health["status"], "unavailable");
    assert_eq!(health["fallback"], "postgres_fts");
}

#[tokio::test]
async fn test_suggestions() {
    let f = fixture();
    let (status, json) = send(&f.state, get("/suggestions?query=Data%20E&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["suggestions"], serde_json::json!(["Data Engineer"]));
}

#[tokio::test]
async fn test_suggestions_bad_limit_is_bad_request() {
    let f = fixture();
    let (status, _) = send(&f.state, get("/suggestions?query=data&limit=many")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_facets() {
    let f = fixture();
    let (status, json) = send(&f.state, get("/facets?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["positions"][0]["value"], "Data Engineer");
    assert_eq!(json["companies"][0]["count"], 4);
}

#[tokio::test]
async fn test_reindex_then_health_reports_count() {
    let f = fixture();
    let (status, report) = send(&f.state, post_json("/lexical/reindex", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["read"], 5);
    assert_eq!(report["indexed"], 5);
    assert_eq!(report["batches"], 3);

    let (status, health) = send(&f.state, get("/lexical/health?refresh=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["backend"], "elasticsearch");
    assert_eq!(health["status"], "available");
    assert_eq!(health["index_count"], 5);
    assert!(health["last_checked"].is_string());
}

#[tokio::test]
async fn test_reindex_without_primary_is_not_found() {
    let mut f = fixture();
    f.state.reindex = None;
    let (status, _) = send(&f.state, post_json("/lexical/reindex", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tier_breakdown() {
    let f = fixture();
    let (status, json) = send(&f.state, get("/search/test/Data%20Engineer")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["backend"], "elasticsearch");
    assert_eq!(json["total"], 2);
    assert_eq!(json["tiers"][0]["tier"], "exact");
    assert_eq!(json["tiers"][1]["tier"], "similar");
}

#[tokio::test]
async fn test_cache_stats_lists_every_cache() {
    let f = fixture();
    let request = serde_json::json!({ "position": "Data Engineer" });
    send(&f.state, post_json("/search", request.clone())).await;
    send(&f.state, post_json("/search", request)).await;

    let (status, json) = send(&f.state, get("/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let caches = json["caches"].as_array().unwrap();
    let names: Vec<&str> = caches.iter().filter_map(|c| c["name"].as_str()).collect();
    for name in ["results", "translations", "facets", "suggestions"] {
        assert!(names.contains(&name), "missing cache {}", name);
    }
    let results = caches.iter().find(|c| c["name"] == "results").unwrap();
    assert_eq!(results["hits"], 1);
    assert_eq!(results["misses"], 1);
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let f = fixture();
    let quota = Quota::with_period(Duration::from_secs(60))
        .unwrap()
        .allow_burst(NonZeroU32::new(1).unwrap());
    let state = f.state.with_rate_limiter(Arc::new(RateLimiter::direct(quota)));

    let (first, _) = send(&state, get("/health")).await;
    let (second, json) = send(&state, get("/health")).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "rate_limit_exceeded");
}
