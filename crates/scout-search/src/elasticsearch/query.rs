//! Request bodies for the tiered search and the index definition.

use serde_json::{json, Value};

use scout_core::TitleMatchClass;

/// Fields returned for every hit.
const SOURCE_FIELDS: &[&str] = &[
    "id",
    "candidate_id",
    "position_title",
    "position_title_en",
    "company_name",
    "structured_content_en",
    "start_date",
    "end_date",
    "years_experience",
];

/// Query text for one search, in the forms each tier needs.
#[derive(Debug, Clone)]
pub struct TierText {
    /// Lowercased canonical position, used against title fields.
    pub position: String,
    /// Optimized lexical text, used against content fields.
    pub text: String,
}

impl TierText {
    pub fn new(position: &str, text: &str) -> Self {
        Self {
            position: position.trim().to_lowercase(),
            text: text.trim().to_lowercase(),
        }
    }
}

/// Title-case every word: "data engineer" -> "Data Engineer".
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn should_clauses(class: TitleMatchClass, q: &TierText) -> Vec<Value> {
    match class {
        TitleMatchClass::Exact => vec![
            json!({ "term": { "position_title_en.exact": { "value": q.position, "boost": 100.0 } } }),
            json!({ "term": { "position_title_en.exact": { "value": title_case(&q.position), "boost": 100.0 } } }),
            json!({ "term": { "position_title_en.exact": { "value": q.position.to_uppercase(), "boost": 100.0 } } }),
            json!({ "match": { "position_title_en": {
                "query": q.position, "fuzziness": "AUTO", "boost": 80.0,
                "operator": "and", "prefix_length": 1
            } } }),
            json!({ "match_phrase": { "position_title_en": { "query": q.position, "boost": 90.0 } } }),
        ],
        TitleMatchClass::Synonym => vec![
            json!({ "match": { "position_title_en": {
                "query": q.position, "boost": 2000.0, "operator": "and"
            } } }),
            json!({ "match": { "position_title_en": {
                "query": q.position, "boost": 1000.0, "operator": "or",
                "minimum_should_match": "75%"
            } } }),
            json!({ "match": { "position_title": {
                "query": q.position, "boost": 500.0, "operator": "and"
            } } }),
            json!({ "match": { "structured_content_en": { "query": q.text, "boost": 100.0 } } }),
        ],
        TitleMatchClass::Partial | TitleMatchClass::None => vec![
            json!({ "match": { "structured_content_en": { "query": q.text, "boost": 100.0 } } }),
            json!({ "match": { "position_title_en": {
                "query": q.position, "boost": 50.0, "minimum_should_match": "50%"
            } } }),
            json!({ "match": { "position_title": {
                "query": q.position, "boost": 25.0, "minimum_should_match": "50%"
            } } }),
        ],
    }
}

/// Search body for one tier, excluding ids returned by earlier tiers.
pub fn tier_body(class: TitleMatchClass, q: &TierText, size: usize, exclude_ids: &[i64]) -> Value {
    let must_not: Vec<Value> = if exclude_ids.is_empty() {
        Vec::new()
    } else {
        vec![json!({ "terms": { "id": exclude_ids } })]
    };
    json!({
        "size": size,
        "track_scores": true,
        "query": {
            "bool": {
                "should": should_clauses(class, q),
                "must_not": must_not,
                "minimum_should_match": 1
            }
        },
        "sort": [
            { "_score": { "order": "desc" } },
            { "years_experience": { "order": "desc", "missing": "_last" } }
        ],
        "_source": SOURCE_FIELDS
    })
}

/// Most frequent canonical titles starting with `prefix`.
pub fn suggest_body(prefix: &str, limit: usize) -> Value {
    json!({
        "size": 0,
        "query": { "prefix": { "position_title_en.exact": { "value": prefix.trim().to_lowercase() } } },
        "aggs": {
            "titles": { "terms": { "field": "position_title_en.raw", "size": limit } }
        }
    })
}

/// Index settings and mappings for candidate experiences.
pub fn index_definition() -> Value {
    let title_field = json!({
        "type": "text",
        "analyzer": "position_analyzer",
        "fields": {
            "exact": { "type": "keyword", "normalizer": "position_normalizer" },
            "raw": { "type": "keyword" }
        }
    });
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": {
                "normalizer": {
                    "position_normalizer": {
                        "type": "custom",
                        "filter": ["lowercase", "asciifolding", "trim"]
                    }
                },
                "analyzer": {
                    "position_analyzer": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "asciifolding", "word_delimiter_graph"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "id": { "type": "long" },
                "candidate_id": { "type": "long" },
                "position_title": title_field.clone(),
                "position_title_en": title_field,
                "company_name": { "type": "text", "fields": { "keyword": { "type": "keyword" } } },
                "structured_content_en": { "type": "text", "analyzer": "english" },
                "start_date": { "type": "date" },
                "end_date": { "type": "date" },
                "years_experience": { "type": "float" }
            }
        }
    })
}
