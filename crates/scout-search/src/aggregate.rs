//! Per-candidate aggregation and ranking.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use scout_core::{passes_threshold, CandidateProfile, CandidateResult, ScoredExperience};

use crate::fusion::FusedExperience;

/// Group fused experiences by candidate and rank the candidates.
///
/// A candidate's score is the best combined score among its experiences.
/// Ties break on how many experiences cleared the threshold, then on the
/// lower candidate id. Only experiences above the threshold are attached,
/// best first, at most `per_candidate` of them.
pub fn aggregate(
    fused: Vec<FusedExperience>,
    threshold: f32,
    limit: usize,
    per_candidate: usize,
) -> Vec<CandidateResult> {
    let mut groups: BTreeMap<i64, Vec<ScoredExperience>> = BTreeMap::new();
    for f in fused {
        groups.entry(f.candidate_id).or_default().push(f.experience);
    }

    let mut ranked: Vec<(i64, f32, usize, Vec<ScoredExperience>)> = groups
        .into_iter()
        .filter_map(|(candidate_id, experiences)| {
            let best = experiences
                .iter()
                .map(|e| e.combined_score)
                .fold(0.0f32, f32::max);
            if !passes_threshold(best, threshold) {
                return None;
            }
            let mut passing: Vec<ScoredExperience> = experiences
                .into_iter()
                .filter(|e| passes_threshold(e.combined_score, threshold))
                .collect();
            let passing_count = passing.len();
            passing.sort_by(|a, b| {
                b.combined_score
                    .total_cmp(&a.combined_score)
                    .then(a.experience_id.cmp(&b.experience_id))
            });
            passing.truncate(per_candidate);
            Some((candidate_id, best, passing_count, passing))
        })
        .collect();

    ranked.sort_by(|a, b| rank_order((a.0, a.1, a.2), (b.0, b.1, b.2)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (candidate_id, final_score, _, experiences))| CandidateResult {
            candidate_id,
            final_score,
            rank: i + 1,
            experiences,
            profile: CandidateProfile::default(),
            education: None,
        })
        .collect()
}

fn rank_order(a: (i64, f32, usize), b: (i64, f32, usize)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then(b.2.cmp(&a.2))
        .then(a.0.cmp(&b.0))
}
