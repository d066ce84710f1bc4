//! Scoring primitives shared by retrieval backends and fusion.
//!
//! ## Lexical score bands
//!
//! Lexical backends disagree on absolute score scale, so each one maps its
//! raw scores into a band keyed on the title match class. Within a band the
//! score is the raw score relative to the best raw score in that band.
//!
//! | Class    | Band        |
//! |----------|-------------|
//! | exact    | 0.70 - 1.00 |
//! | synonym  | 0.40 - 0.69 |
//! | partial  | 0.10 - 0.39 |
//! | none     | 0.00 - 0.09 |

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::models::{ExperienceMatch, TitleMatchClass};

/// Multiplier per title match class. Higher classes must not boost less.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TitleBoosts {
    pub exact: f32,
    pub synonym: f32,
    pub partial: f32,
    pub none: f32,
}

impl Default for TitleBoosts {
    fn default() -> Self {
        Self {
            exact: defaults::TITLE_BOOST_EXACT,
            synonym: defaults::TITLE_BOOST_SYNONYM,
            partial: defaults::TITLE_BOOST_PARTIAL,
            none: defaults::TITLE_BOOST_NONE,
        }
    }
}

impl TitleBoosts {
    pub fn for_class(&self, class: TitleMatchClass) -> f32 {
        match class {
            TitleMatchClass::Exact => self.exact,
            TitleMatchClass::Synonym => self.synonym,
            TitleMatchClass::Partial => self.partial,
            TitleMatchClass::None => self.none,
        }
    }

    pub fn max(&self) -> f32 {
        self.exact.max(self.synonym).max(self.partial).max(self.none)
    }

    /// Boosts are positive and non-decreasing with class.
    pub fn is_ordered(&self) -> bool {
        self.none > 0.0
            && self.partial >= self.none
            && self.synonym >= self.partial
            && self.exact >= self.synonym
    }
}

/// Step table mapping years of experience to a multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyTable {
    /// (max years inclusive, multiplier), ascending by years.
    pub steps: Vec<(f32, f32)>,
    /// Multiplier past the last step.
    pub beyond: f32,
}

impl Default for RecencyTable {
    fn default() -> Self {
        Self {
            steps: defaults::RECENCY_STEPS.to_vec(),
            beyond: defaults::RECENCY_MAX,
        }
    }
}

impl RecencyTable {
    pub fn multiplier(&self, years: f32) -> f32 {
        let years = if years.is_finite() { years.max(0.0) } else { 0.0 };
        self.steps
            .iter()
            .find(|(max_years, _)| years <= *max_years)
            .map(|(_, m)| *m)
            .unwrap_or(self.beyond)
    }

    pub fn max(&self) -> f32 {
        self.steps
            .iter()
            .map(|(_, m)| *m)
            .fold(self.beyond, f32::max)
    }

    /// Parse `years:multiplier` pairs separated by commas. `None` on any
    /// malformed pair or an empty list.
    pub fn parse_steps(raw: &str) -> Option<Vec<(f32, f32)>> {
        let steps = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|pair| {
                let (years, multiplier) = pair.split_once(':')?;
                Some((
                    years.trim().parse::<f32>().ok()?,
                    multiplier.trim().parse::<f32>().ok()?,
                ))
            })
            .collect::<Option<Vec<_>>>()?;
        (!steps.is_empty()).then_some(steps)
    }

    /// Years strictly ascend, multipliers are positive and never decrease,
    /// and `beyond` is at least the last step.
    pub fn is_ordered(&self) -> bool {
        let finite = |v: f32| v.is_finite() && v > 0.0;
        if self.steps.is_empty() || !finite(self.beyond) {
            return false;
        }
        let steps_ok = self
            .steps
            .iter()
            .all(|(years, m)| years.is_finite() && *years >= 0.0 && finite(*m))
            && self
                .steps
                .windows(2)
                .all(|w| w[1].0 > w[0].0 && w[1].1 >= w[0].1);
        steps_ok && self.steps.last().is_some_and(|(_, m)| self.beyond >= *m)
    }
}

/// Tunable constants for fusion and aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub title_boosts: TitleBoosts,
    pub recency: RecencyTable,
    pub experiences_per_candidate: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            title_boosts: TitleBoosts::default(),
            recency: RecencyTable::default(),
            experiences_per_candidate: defaults::EXPERIENCES_PER_CANDIDATE,
        }
    }
}

impl ScoringConfig {
    /// Load tunables from the environment, keeping defaults for anything
    /// unset, unparseable, or out of order.
    ///
    /// - `TITLE_BOOST_EXACT` / `_SYNONYM` / `_PARTIAL` / `_NONE`
    /// - `RECENCY_STEPS`: `years:multiplier` pairs, e.g. `1:1.0,2:1.1,5:1.4`
    /// - `RECENCY_MAX`: multiplier past the last step
    /// - `EXPERIENCES_PER_CANDIDATE`
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |key: &str, default: f32| {
            var(key)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default)
        };

        let defaults = TitleBoosts::default();
        let title_boosts = TitleBoosts {
            exact: positive("TITLE_BOOST_EXACT", defaults.exact),
            synonym: positive("TITLE_BOOST_SYNONYM", defaults.synonym),
            partial: positive("TITLE_BOOST_PARTIAL", defaults.partial),
            none: positive("TITLE_BOOST_NONE", defaults.none),
        };
        let title_boosts = if title_boosts.is_ordered() {
            title_boosts
        } else {
            tracing::warn!(
                subsystem = "core",
                component = "scoring",
                "TITLE_BOOST_* values are not ordered exact >= synonym >= partial >= none, using defaults"
            );
            defaults
        };

        let default_recency = RecencyTable::default();
        let recency = RecencyTable {
            steps: var("RECENCY_STEPS")
                .map(|raw| RecencyTable::parse_steps(&raw))
                .unwrap_or_else(|| Some(default_recency.steps.clone()))
                .unwrap_or_default(),
            beyond: positive("RECENCY_MAX", default_recency.beyond),
        };
        let recency = if recency.is_ordered() {
            recency
        } else {
            tracing::warn!(
                subsystem = "core",
                component = "scoring",
                "RECENCY_STEPS/RECENCY_MAX must ascend in years and not decrease in multiplier, using defaults"
            );
            default_recency
        };

        let experiences_per_candidate = var("EXPERIENCES_PER_CANDIDATE")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults::EXPERIENCES_PER_CANDIDATE);

        Self {
            title_boosts,
            recency,
            experiences_per_candidate,
        }
    }

    /// Largest product of multipliers. Combined scores are divided by this.
    pub fn boost_ceiling(&self) -> f32 {
        self.title_boosts.max() * self.recency.max()
    }
}

/// Threshold predicate: strictly above, except a zero threshold admits all.
///
/// A score equal to the threshold is dropped. Since combined scores never
/// exceed 1, a threshold of 1 always yields an empty result rather than only
/// perfect matches.
pub fn passes_threshold(score: f32, threshold: f32) -> bool {
    threshold <= 0.0 || score > threshold
}

/// Band (floor, width) for a class.
fn band(class: TitleMatchClass) -> (f32, f32) {
    match class {
        TitleMatchClass::Exact => (0.70, 0.30),
        TitleMatchClass::Synonym => (0.40, 0.29),
        TitleMatchClass::Partial => (0.10, 0.29),
        TitleMatchClass::None => (0.00, 0.09),
    }
}

/// Set `lexical_score` on each match from its raw score and title class.
pub fn normalize_tiered(matches: &mut [ExperienceMatch]) {
    let mut best: HashMap<TitleMatchClass, f32> = HashMap::new();
    for m in matches.iter() {
        let raw = m.raw_lexical_score.unwrap_or(0.0).max(0.0);
        let entry = best.entry(m.title_class).or_insert(0.0);
        if raw > *entry {
            *entry = raw;
        }
    }
    for m in matches.iter_mut() {
        let (floor, width) = band(m.title_class);
        let raw = m.raw_lexical_score.unwrap_or(0.0).max(0.0);
        let max = best.get(&m.title_class).copied().unwrap_or(0.0);
        let ratio = if max > 0.0 { (raw / max).min(1.0) } else { 0.0 };
        m.lexical_score = floor + width * ratio;
    }
}

/// Map a pgvector cosine distance into a [0, 1] similarity.
pub fn normalize_cosine_distance(distance: f64) -> f32 {
    let sim = (1.0 - distance + 1.0) / 2.0;
    sim.clamp(0.0, 1.0) as f32
}

/// Years between start and end (or `today`), floored at zero.
pub fn experience_years(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> f32 {
    match start {
        Some(start) => {
            let end = end.unwrap_or(today);
            let days = (end - start).num_days() as f64;
            (days / defaults::DAYS_PER_YEAR).max(0.0) as f32
        }
        None => 0.0,
    }
}
