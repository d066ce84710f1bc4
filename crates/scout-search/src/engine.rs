//! Search orchestration: translate, structure, embed, retrieve, fuse, rank.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use scout_core::{
    CandidateDirectory, CandidateResult, Degradation, Error, ExperienceMatch, Facets, Outcome,
    QueryFilters, Result, ScoringConfig, SearchMethod, SearchQueryEcho, SearchRequest,
    SearchResponse, StructuredQuery, TitleMatchClass,
};
use scout_inference::translator::normalize_whitespace;
use scout_inference::{Embedder, QueryTranslator};

use crate::aggregate::aggregate;
use crate::cache::{cache_key, CacheConfig, CacheStats, SingleFlightCache};
use crate::fusion::fuse;
use crate::lexical::LexicalRetriever;
use crate::plan::SearchPlan;
use crate::structurer::QueryStructurer;
use crate::vector::VectorRetriever;

/// Fields that decide a search result. Everything else is presentation.
#[derive(Serialize)]
struct Fingerprint<'a> {
    position: String,
    description: String,
    method: SearchMethod,
    keyword_weight: f32,
    semantic_weight: f32,
    threshold: f32,
    limit: usize,
    filters: &'a QueryFilters,
    fetch_education: bool,
}

/// Primary lexical results grouped by tier, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct TierBreakdown {
    pub backend: &'static str,
    pub query: String,
    pub total: usize,
    pub tiers: Vec<TierGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierGroup {
    pub tier: &'static str,
    pub count: usize,
    pub hits: Vec<TierHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierHit {
    pub candidate_id: i64,
    pub experience_id: i64,
    pub position_title: String,
    pub lexical_score: f32,
    pub raw_score: Option<f32>,
}

/// The hybrid candidate search engine.
///
/// Holds no per-request state. All mutable state lives in the caches and the
/// lexical health monitor, both safe for concurrent use.
pub struct SearchEngine {
    translator: Arc<QueryTranslator>,
    structurer: QueryStructurer,
    embedder: Arc<Embedder>,
    lexical: Arc<LexicalRetriever>,
    vector: Arc<VectorRetriever>,
    directory: Arc<dyn CandidateDirectory>,
    scoring: ScoringConfig,
    results: Arc<SingleFlightCache<SearchResponse>>,
    translations: Arc<SingleFlightCache<String>>,
    facets: Arc<SingleFlightCache<Facets>>,
}

impl SearchEngine {
    /// Build an engine with cache and scoring settings read from the environment.
    pub fn new(
        translator: Arc<QueryTranslator>,
        embedder: Arc<Embedder>,
        lexical: Arc<LexicalRetriever>,
        vector: Arc<VectorRetriever>,
        directory: Arc<dyn CandidateDirectory>,
    ) -> Self {
        Self {
            translator,
            structurer: QueryStructurer::new(),
            embedder,
            lexical,
            vector,
            directory,
            scoring: ScoringConfig::from_env(),
            results: Arc::new(SingleFlightCache::new(
                "results",
                CacheConfig::results_from_env(),
            )),
            translations: Arc::new(SingleFlightCache::new(
                "translations",
                CacheConfig::translations_from_env(),
            )),
            facets: Arc::new(SingleFlightCache::new(
                "facets",
                CacheConfig::suggestions_from_env(),
            )),
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_result_cache(mut self, config: CacheConfig) -> Self {
        self.results = Arc::new(SingleFlightCache::new("results", config));
        self
    }

    pub fn with_translation_cache(mut self, config: CacheConfig) -> Self {
        self.translations = Arc::new(SingleFlightCache::new("translations", config));
        self
    }

    pub fn lexical(&self) -> &Arc<LexicalRetriever> {
        &self.lexical
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Run a search. Identical concurrent requests share one computation.
    #[instrument(skip(self, request), fields(
        subsystem = "search",
        component = "engine",
        op = "search",
        search_method = %request.search_method,
        limit = request.limit,
    ))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let plan = SearchPlan::from_request(request)?;
        let key = self.fingerprint(request, &plan)?;
        let start = Instant::now();

        let cached = self
            .results
            .get_or_compute(&key, || self.run(request, plan))
            .await?;

        info!(
            search_id = %cached.value.search_id,
            result_count = cached.value.candidates.len(),
            cache_hit = cached.is_hit(),
            degraded = cached.degradation.is_degraded(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(cached.value.as_ref().clone())
    }

    async fn run(&self, request: &SearchRequest, plan: SearchPlan) -> Result<Outcome<SearchResponse>> {
        let start = Instant::now();

        let (position, description) = tokio::join!(
            self.translate(&request.position),
            self.translate(&request.description),
        );
        let mut degradation = position.degradation.merge(description.degradation);
        let query = self
            .structurer
            .structure(&position.value, &description.value, &request.filters);
        debug!(
            search_text = %query.search_text,
            key_terms = query.key_terms.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query structured"
        );

        // Lexical retrieval overlaps with embedding and vector retrieval.
        let retrieval_start = Instant::now();
        let (lexical, vector) = tokio::join!(
            async {
                if plan.uses_lexical() {
                    self.lexical.search(&query, plan.limit_ceiling).await
                } else {
                    Outcome::clean(Vec::new())
                }
            },
            async {
                if !plan.uses_vector() {
                    return Outcome::clean(Vec::new());
                }
                let (embedding, embed_degradation) = self.embedder.embed_query(&query).await.into_parts();
                let vector = self
                    .vector
                    .search(embedding.as_ref(), plan.limit_ceiling)
                    .await;
                Outcome::degraded(vector.value, vector.degradation.merge(embed_degradation))
            },
        );
        degradation = degradation
            .merge(lexical.degradation)
            .merge(vector.degradation);
        debug!(
            lexical_hits = lexical.value.len(),
            vector_hits = vector.value.len(),
            duration_ms = retrieval_start.elapsed().as_millis() as u64,
            "Retrieval complete"
        );

        self.ensure_some_channel(&plan, &degradation)?;

        let weights = plan.effective_weights(&degradation);
        let fused = fuse(
            lexical.value,
            vector.value,
            weights,
            &query.position,
            &self.scoring,
        );
        let mut candidates = aggregate(
            fused,
            plan.threshold,
            plan.limit,
            self.scoring.experiences_per_candidate,
        );

        if !candidates.is_empty() {
            degradation = degradation.merge(self.enrich(&mut candidates, plan.fetch_education).await);
        }

        let response = SearchResponse {
            search_id: Uuid::now_v7(),
            search_query: SearchQueryEcho {
                position: request.position.clone(),
                description: request.description.clone(),
                results_count: candidates.len(),
            },
            candidates,
            degradation,
            degraded: degradation.is_degraded(),
        };
        debug!(
            search_id = %response.search_id,
            keyword_weight = weights.keyword,
            semantic_weight = weights.semantic,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search pipeline complete"
        );
        Ok(Outcome::degraded(response, degradation))
    }

    /// Fail only when every channel the method needs is gone.
    fn ensure_some_channel(&self, plan: &SearchPlan, degradation: &Degradation) -> Result<()> {
        let lexical_dead = !plan.uses_lexical() || degradation.lexical_unavailable;
        let vector_dead = !plan.uses_vector()
            || degradation.vector_unavailable
            || degradation.embedding_failed;
        if !(lexical_dead && vector_dead) {
            return Ok(());
        }
        error!(
            search_method = %plan.method,
            ?degradation,
            "No retrieval channel available"
        );
        if plan.uses_lexical() {
            Err(Error::LexicalBackendUnavailable(
                "no retrieval channel answered".to_string(),
            ))
        } else {
            Err(Error::VectorBackendUnavailable(
                "no retrieval channel answered".to_string(),
            ))
        }
    }

    /// Translate through the translation cache. Passthrough results are not stored.
    async fn translate(&self, text: &str) -> Outcome<String> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            return Outcome::clean(normalized);
        }
        let key = cache_key("translation:", &[normalized.as_bytes()]);
        let cached = self
            .translations
            .get_or_compute(&key, || async {
                Ok(self.translator.translate(&normalized).await)
            })
            .await;
        match cached {
            Ok(cached) => Outcome::degraded(cached.value.as_ref().clone(), cached.degradation),
            Err(e) => {
                warn!(error = %e, "Translation cache failed, using original text");
                Outcome::degraded(
                    normalized,
                    Degradation {
                        translation_failed: true,
                        ..Degradation::default()
                    },
                )
            }
        }
    }

    /// Attach profile and education data. Failures leave fields empty.
    async fn enrich(&self, candidates: &mut [CandidateResult], fetch_education: bool) -> Degradation {
        let ids: Vec<i64> = candidates.iter().map(|c| c.candidate_id).collect();
        let start = Instant::now();
        let mut degradation = Degradation::none();

        let (profiles, education) = tokio::join!(self.directory.profiles(&ids), async {
            if fetch_education {
                self.directory.education(&ids).await.map(Some)
            } else {
                Ok(None)
            }
        });

        match profiles {
            Ok(mut profiles) => {
                for candidate in candidates.iter_mut() {
                    if let Some(profile) = profiles.remove(&candidate.candidate_id) {
                        candidate.profile = profile;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Profile enrichment failed, returning bare candidates");
                degradation.enrichment_failed = true;
            }
        }

        match education {
            Ok(Some(mut education)) => {
                for candidate in candidates.iter_mut() {
                    candidate.education =
                        Some(education.remove(&candidate.candidate_id).unwrap_or_default());
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Education enrichment failed");
                degradation.enrichment_failed = true;
            }
        }

        debug!(
            result_count = ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Enrichment complete"
        );
        degradation
    }

    fn fingerprint(&self, request: &SearchRequest, plan: &SearchPlan) -> Result<String> {
        let fingerprint = Fingerprint {
            position: normalize_whitespace(&request.position),
            description: normalize_whitespace(&request.description),
            method: plan.method,
            keyword_weight: plan.weights.keyword,
            semantic_weight: plan.weights.semantic,
            threshold: plan.threshold,
            limit: plan.limit,
            filters: &request.filters,
            fetch_education: plan.fetch_education,
        };
        let bytes = serde_json::to_vec(&fingerprint)?;
        Ok(cache_key("search:", &[&bytes]))
    }

    /// Top position titles and companies.
    pub async fn facets(&self, limit: usize) -> Result<Facets> {
        let key = format!("facets:{}", limit);
        let cached = self
            .facets
            .get_or_compute(&key, || async {
                self.directory.facets(limit).await.map(Outcome::clean)
            })
            .await?;
        Ok(cached.value.as_ref().clone())
    }

    /// Run the position through the primary lexical backend and group hits by tier.
    #[instrument(skip(self), fields(subsystem = "search", component = "engine", op = "lexical_tiers"))]
    pub async fn lexical_tiers(&self, position: &str) -> Result<TierBreakdown> {
        let translated = self.translate(position).await;
        let query: StructuredQuery =
            self.structurer
                .structure(&translated.value, "", &QueryFilters::default());
        let (backend, matches) = self
            .lexical
            .search_primary(&query, scout_core::defaults::CHANNEL_LIMIT_CEILING)
            .await?;
        Ok(group_tiers(backend, query.search_text, matches))
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.results.stats(),
            self.translations.stats(),
            self.facets.stats(),
        ]
    }

    /// Start background eviction for every cache the engine owns.
    pub fn spawn_cache_reclaim(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.results.clone().spawn_reclaim(every),
            self.translations.clone().spawn_reclaim(every),
            self.facets.clone().spawn_reclaim(every),
        ]
    }
}

fn group_tiers(backend: &'static str, query: String, matches: Vec<ExperienceMatch>) -> TierBreakdown {
    let total = matches.len();
    let mut groups: HashMap<TitleMatchClass, Vec<TierHit>> = HashMap::new();
    for m in matches {
        groups.entry(m.title_class).or_default().push(TierHit {
            candidate_id: m.candidate_id,
            experience_id: m.experience_id,
            position_title: m.canonical_title().to_string(),
            lexical_score: m.lexical_score,
            raw_score: m.raw_lexical_score,
        });
    }
    let tiers = [
        TitleMatchClass::Exact,
        TitleMatchClass::Synonym,
        TitleMatchClass::Partial,
        TitleMatchClass::None,
    ]
    .into_iter()
    .filter_map(|class| {
        groups.remove(&class).map(|hits| TierGroup {
            tier: class.tier(),
            count: hits.len(),
            hits,
        })
    })
    .collect();
    TierBreakdown {
        backend,
        query,
        total,
        tiers,
    }
}
