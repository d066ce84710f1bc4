//! Score fusion across the lexical and vector channels.
//!
//! Matches from both channels are merged on `(candidate_id, experience_id)`.
//! Each merged experience gets
//!
//! ```text
//! base     = (kw_w * lexical + sem_w * cosine) / (kw_w + sem_w)
//! combined = clamp(base * title_boost * recency / boost_ceiling, 0, 1)
//! ```
//!
//! where a channel that did not return the experience contributes zero.

use std::collections::HashMap;

use scout_core::{ChannelWeights, ExperienceMatch, ScoredExperience, ScoringConfig, TitleMatchClass};

/// One fused experience, still keyed by candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedExperience {
    pub candidate_id: i64,
    pub experience: ScoredExperience,
}

/// Merge both channels and score every experience.
///
/// Output order follows first appearance: lexical matches first, then
/// vector-only matches, so fusion is deterministic for identical inputs.
pub fn fuse(
    lexical: Vec<ExperienceMatch>,
    vector: Vec<ExperienceMatch>,
    weights: ChannelWeights,
    query_position: &str,
    scoring: &ScoringConfig,
) -> Vec<FusedExperience> {
    let mut merged: Vec<(ExperienceMatch, bool)> = Vec::with_capacity(lexical.len() + vector.len());
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();

    for m in lexical {
        match index.get(&m.key()) {
            // Same experience twice from one channel: keep the stronger hit.
            Some(&i) => {
                if m.lexical_score > merged[i].0.lexical_score {
                    merged[i].0 = m;
                }
            }
            None => {
                index.insert(m.key(), merged.len());
                merged.push((m, true));
            }
        }
    }

    for m in vector {
        match index.get(&m.key()) {
            Some(&i) => {
                let (existing, _) = &mut merged[i];
                existing.cosine_similarity = max_option(existing.cosine_similarity, m.cosine_similarity);
                if existing.content_mn.is_empty() {
                    existing.content_mn = m.content_mn;
                }
                if existing.content.is_empty() {
                    existing.content = m.content;
                }
                if existing.position_title_en.is_none() {
                    existing.position_title_en = m.position_title_en;
                }
            }
            None => {
                index.insert(m.key(), merged.len());
                merged.push((m, false));
            }
        }
    }

    let ceiling = scoring.boost_ceiling();
    merged
        .into_iter()
        .map(|(m, from_lexical)| score(m, from_lexical, weights, query_position, scoring, ceiling))
        .collect()
}

/// Weighted channel average before boosts.
pub fn base_score(lexical: f32, cosine: f32, weights: ChannelWeights) -> f32 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    (weights.keyword * lexical + weights.semantic * cosine) / total
}

fn score(
    m: ExperienceMatch,
    from_lexical: bool,
    weights: ChannelWeights,
    query_position: &str,
    scoring: &ScoringConfig,
    ceiling: f32,
) -> FusedExperience {
    let lexical = if from_lexical { m.lexical_score } else { 0.0 };
    let cosine = m.cosine_similarity.unwrap_or(0.0);
    let class = m
        .title_class
        .max(TitleMatchClass::classify(query_position, m.canonical_title()));

    let base = base_score(lexical, cosine, weights);
    let boosted = base * scoring.title_boosts.for_class(class) * scoring.recency.multiplier(m.years);
    let combined = if ceiling > 0.0 {
        (boosted / ceiling).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let match_tier = if from_lexical {
        class.tier().to_string()
    } else {
        TitleMatchClass::None.tier().to_string()
    };
    let position_title = if m.position_title.trim().is_empty() {
        m.canonical_title().to_string()
    } else {
        m.position_title.clone()
    };

    FusedExperience {
        candidate_id: m.candidate_id,
        experience: ScoredExperience {
            experience_id: m.experience_id,
            content: m.content,
            structured_content_mn: m.content_mn,
            company_name: m.company_name,
            position_title,
            years: m.years,
            combined_score: combined,
            match_tier,
            title_match: class,
            lexical_score: from_lexical.then_some(m.lexical_score),
            semantic_score: m.cosine_similarity,
            elasticsearch_score: if from_lexical { m.raw_lexical_score } else { None },
        },
    }
}

fn max_option(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
