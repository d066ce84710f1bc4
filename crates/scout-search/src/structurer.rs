//! Query structuring: labeled description lines, explicit filters, key terms.
//!
//! Descriptions may carry `"<Label>: <value>"` lines. Recognized labels are
//! matched case-insensitively. Unlabeled lines stay in the free description.
//! An explicit filter field always wins over the extracted one.

use std::sync::LazyLock;

use regex::Regex;

use scout_core::{QueryFilters, StructuredQuery, YearsRange};

/// Cap on key terms kept per query.
const MAX_KEY_TERMS: usize = 5;

/// Key terms appended to the lexical text.
const SEARCH_TEXT_KEY_TERMS: usize = 3;

const NOISE_WORDS: &[&str] = &["position", "role", "job", "title", "as", "a", "an", "the"];

/// Domain vocabulary scanned for in descriptions, in priority order.
const VOCABULARY: &[&str] = &[
    // Technical skills
    "python", "java", "javascript", "sql", "machine learning", "ai", "data science",
    "analytics", "statistics", "cloud", "aws", "azure", "kubernetes", "docker", "react",
    "node.js", "api", "database",
    // Seniority
    "senior", "junior", "lead", "principal", "manager", "director", "entry level",
    "mid level", "experienced",
    // Industries
    "finance", "banking", "healthcare", "technology", "startup", "enterprise",
    "consulting", "government",
    // Functions
    "development", "engineering", "analysis", "management", "design", "research",
    "operations", "strategy", "product",
];

static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z ]*?)\s*:\s*(.*)$").expect("static label pattern")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("static quote pattern"));

static YEARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:(\+)|(?:-|–|to)\s*(\d+(?:\.\d+)?))?")
        .expect("static years pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Description,
    Skills,
    Experience,
    Industry,
    Education,
}

impl Label {
    fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "jobdescription" | "description" => Some(Label::Description),
            "skills" | "skill" => Some(Label::Skills),
            "yearsofexperience" | "experience" => Some(Label::Experience),
            "industry" => Some(Label::Industry),
            "education" => Some(Label::Education),
            _ => None,
        }
    }
}

/// Fields pulled out of a labeled description.
#[derive(Debug, Default, Clone, PartialEq)]
struct Extracted {
    description: Vec<String>,
    skills: Vec<String>,
    experience: Option<String>,
    industry: Option<String>,
    education: Option<String>,
}

/// Turns canonical position and description text into a [`StructuredQuery`].
///
/// Stateless and deterministic: identical input yields an identical query.
#[derive(Debug, Clone, Default)]
pub struct QueryStructurer;

impl QueryStructurer {
    pub fn new() -> Self {
        Self
    }

    pub fn structure(
        &self,
        position: &str,
        description: &str,
        filters: &QueryFilters,
    ) -> StructuredQuery {
        let extracted = extract_labels(description);

        let description = filters
            .job_description
            .as_deref()
            .map(str::trim)
            .map(str::to_string)
            .unwrap_or_else(|| extracted.description.join(" "));

        let skills = match &filters.skills {
            Some(skills) => skills
                .iter()
                .flat_map(|s| split_list(s))
                .collect::<Vec<_>>(),
            None => extracted.skills,
        };

        let experience = filters
            .years_of_experience
            .as_deref()
            .or(extracted.experience.as_deref())
            .and_then(parse_years);

        let industry = non_empty(filters.industry.clone()).or(extracted.industry);
        let education = non_empty(filters.education.clone()).or(extracted.education);

        let position = position.trim().to_string();
        let key_terms = key_terms_with_skills(&description, &skills);
        let search_text = optimized_search_text(&position, &key_terms);

        StructuredQuery {
            position,
            description,
            skills,
            experience,
            industry,
            education,
            key_terms,
            search_text,
        }
    }
}

fn extract_labels(description: &str) -> Extracted {
    let mut out = Extracted::default();
    for line in description.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let labeled = LABEL_LINE
            .captures(line)
            .and_then(|caps| Some((Label::parse(caps.get(1)?.as_str())?, caps.get(2)?.as_str())));
        match labeled {
            Some((label, value)) => {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match label {
                    Label::Description => out.description.push(value.to_string()),
                    Label::Skills => out.skills.extend(split_list(value)),
                    Label::Experience => out.experience = Some(value.to_string()),
                    Label::Industry => out.industry = Some(value.to_string()),
                    Label::Education => out.education = Some(value.to_string()),
                }
            }
            None => out.description.push(line.to_string()),
        }
    }
    out
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse `N`, `N+`, or `N-M` years. A bare `N` reads as a minimum.
/// Anything else is no filter.
pub fn parse_years(text: &str) -> Option<YearsRange> {
    let caps = YEARS.captures(text)?;
    let min: f32 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        return Some(YearsRange { min, max: None });
    }
    match caps.get(3).and_then(|m| m.as_str().parse::<f32>().ok()) {
        Some(max) if max >= min => Some(YearsRange {
            min,
            max: Some(max),
        }),
        Some(_) => None,
        None => Some(YearsRange { min, max: None }),
    }
}

/// Lowercase the position, strip punctuation and noise words.
pub fn clean_position(position: &str) -> String {
    position
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 1 && !NOISE_WORDS.contains(&w.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Vocabulary hits (whole words only) then quoted phrases, deduplicated.
pub fn extract_key_terms(description: &str) -> Vec<String> {
    if description.trim().is_empty() {
        return Vec::new();
    }
    let haystack = format!(" {} ", tokenize(description));
    let mut terms: Vec<String> = Vec::new();
    for term in VOCABULARY {
        if haystack.contains(&format!(" {} ", tokenize(term))) {
            push_unique(&mut terms, term.to_string());
        }
    }
    for caps in QUOTED.captures_iter(description) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            let phrase = m.as_str().trim().to_lowercase();
            if !phrase.is_empty() {
                push_unique(&mut terms, phrase);
            }
        }
    }
    terms.truncate(MAX_KEY_TERMS);
    terms
}

/// Key terms over the free description and the skill list together.
/// Skills outside the vocabulary are kept verbatim after the description's
/// terms.
fn key_terms_with_skills(description: &str, skills: &[String]) -> Vec<String> {
    let mut source = description.to_string();
    for skill in skills {
        source.push_str(", ");
        source.push_str(skill);
    }
    let mut terms = extract_key_terms(&source);
    for skill in skills {
        push_unique(&mut terms, tokenize(skill));
    }
    terms.retain(|t| !t.is_empty());
    terms.truncate(MAX_KEY_TERMS);
    terms
}

fn tokenize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|w| w.trim_matches('.'))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_unique(terms: &mut Vec<String>, term: String) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}

fn optimized_search_text(position: &str, key_terms: &[String]) -> String {
    let mut parts = Vec::new();
    let cleaned = clean_position(position);
    if !cleaned.is_empty() {
        parts.push(cleaned);
    }
    parts.extend(key_terms.iter().take(SEARCH_TEXT_KEY_TERMS).cloned());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_description_is_parsed() {
        let q = QueryStructurer::new().structure(
            "Data Engineer",
            "Skills: Python, SQL; Spark\nYears of Experience: 3-5\nIndustry: Banking\nBuild ETL",
            &QueryFilters::default(),
        );
        assert_eq!(q.skills, vec!["Python", "SQL", "Spark"]);
        assert_eq!(q.experience, Some(YearsRange { min: 3.0, max: Some(5.0) }));
        assert_eq!(q.industry.as_deref(), Some("Banking"));
        assert_eq!(q.description, "Build ETL");
    }

    #[test]
    fn test_explicit_filters_take_precedence() {
        let filters = QueryFilters {
            skills: Some(vec!["Rust".to_string()]),
            industry: Some("Mining".to_string()),
            ..QueryFilters::default()
        };
        let q = QueryStructurer::new().structure(
            "Engineer",
            "skills: Python\nindustry: Banking\neducation: BSc",
            &filters,
        );
        assert_eq!(q.skills, vec!["Rust"]);
        assert_eq!(q.industry.as_deref(), Some("Mining"));
        assert_eq!(q.education.as_deref(), Some("BSc"));
    }

    #[test]
    fn test_unparseable_fields_are_empty() {
        let q = QueryStructurer::new().structure(
            "Accountant",
            "Experience: plenty",
            &QueryFilters::default(),
        );
        assert!(q.experience.is_none());
        assert!(q.skills.is_empty());
        assert!(q.description.is_empty());
    }

    #[test]
    fn test_years_forms() {
        assert_eq!(parse_years("5+ years"), Some(YearsRange { min: 5.0, max: None }));
        assert_eq!(parse_years("2"), Some(YearsRange { min: 2.0, max: None }));
        assert_eq!(parse_years("2 to 4"), Some(YearsRange { min: 2.0, max: Some(4.0) }));
        assert_eq!(parse_years("7-3"), None);
        assert_eq!(parse_years("none"), None);
    }

    #[test]
    fn test_key_terms_match_whole_words() {
        let terms = extract_key_terms("Maintain SQL pipelines for a \"risk platform\" in banking");
        assert_eq!(terms, vec!["sql", "banking", "risk platform"]);
        assert!(!terms.contains(&"ai".to_string()));
    }

    #[test]
    fn test_search_text_combines_position_and_terms() {
        let q = QueryStructurer::new().structure(
            "The Senior Data Engineer!",
            "python, sql, aws and docker",
            &QueryFilters::default(),
        );
        assert_eq!(q.search_text, "senior data engineer python sql aws");
    }

    #[test]
    fn test_labeled_skills_reach_search_text() {
        let q = QueryStructurer::new().structure(
            "Data Engineer",
            "Skills: Python, SQL",
            &QueryFilters::default(),
        );
        assert!(q.description.is_empty());
        assert_eq!(q.key_terms, vec!["python", "sql"]);
        assert_eq!(q.search_text, "data engineer python sql");
    }

    #[test]
    fn test_skills_outside_vocabulary_are_key_terms() {
        let q = QueryStructurer::new().structure(
            "Data Engineer",
            "Skills: Spark; Airflow\nBuild batch pipelines",
            &QueryFilters::default(),
        );
        assert_eq!(q.key_terms, vec!["spark", "airflow"]);
        assert_eq!(q.search_text, "data engineer spark airflow");
    }

    #[test]
    fn test_deterministic() {
        let s = QueryStructurer::new();
        let f = QueryFilters::default();
        assert_eq!(
            s.structure("Analyst", "Skills: Excel", &f),
            s.structure("Analyst", "Skills: Excel", &f)
        );
    }
}
