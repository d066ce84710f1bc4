//! Query translation into the canonical working language (English).
//!
//! Text that is already canonical passes through untouched. When the
//! upstream model fails or returns something implausible, the original text
//! is used and the outcome is flagged with `translation_failed`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};
use unicode_script::{Script, UnicodeScript};

use scout_core::{defaults, Degradation, Error, GenerationBackend, Outcome};

use crate::retry::RetryPolicy;

const SYSTEM_PROMPT: &str = "You are a professional translator for recruiting. \
Translate the user's text into English. Keep job titles, company names, technologies \
and numbers accurate. Reply with the translation only, without quotes or commentary.";

/// Accepted length ratio between translation and source.
const MIN_LENGTH_RATIO: f32 = 0.3;
const MAX_LENGTH_RATIO: f32 = 3.0;

/// Translates free text into the canonical working language.
pub struct QueryTranslator {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
}

impl QueryTranslator {
    pub fn new(backend: Arc<dyn GenerationBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Translate `text`. Never fails; failures degrade to passthrough.
    pub async fn translate(&self, text: &str) -> Outcome<String> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() || is_canonical(&normalized) {
            return Outcome::clean(normalized);
        }

        let source: String = normalized
            .chars()
            .take(defaults::TRANSLATION_MAX_CHARS)
            .collect();
        let start = Instant::now();
        let backend = self.backend.clone();

        let result = self
            .retry
            .run("translate", || {
                let backend = backend.clone();
                let source = source.clone();
                async move { backend.generate_with_system(SYSTEM_PROMPT, &source).await }
            })
            .await
            .and_then(|raw| accept_translation(&source, &raw));

        match result {
            Ok(translated) => {
                debug!(
                    subsystem = "inference",
                    component = "translator",
                    op = "translate",
                    model = self.backend.model_name(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Query translated"
                );
                Outcome::clean(translated)
            }
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "translator",
                    op = "translate",
                    error = %e,
                    "Translation failed, passing original text through"
                );
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
}

/// Collapse runs of whitespace and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether text is already in the canonical language.
///
/// Letters are classified by Unicode script. Any Cyrillic letter makes the
/// text non-canonical. Otherwise the Latin share must exceed the configured
/// ratio. Text without letters is treated as canonical.
pub fn is_canonical(text: &str) -> bool {
    let mut letters = 0usize;
    let mut latin = 0usize;
    for ch in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        match ch.script() {
            Script::Cyrillic => return false,
            Script::Latin => latin += 1,
            _ => {}
        }
    }
    if letters == 0 {
        return true;
    }
    latin as f32 / letters as f32 > defaults::CANONICAL_SCRIPT_RATIO
}

fn accept_translation(source: &str, raw: &str) -> scout_core::Result<String> {
    let translated = raw.trim().trim_matches('"').trim().to_string();
    if translated.is_empty() {
        return Err(Error::TranslationFailure("empty translation".to_string()));
    }
    if translated == source {
        return Err(Error::TranslationFailure(
            "translation identical to source".to_string(),
        ));
    }
    let ratio = translated.chars().count() as f32 / source.chars().count().max(1) as f32;
    if !(MIN_LENGTH_RATIO..=MAX_LENGTH_RATIO).contains(&ratio) {
        return Err(Error::TranslationFailure(format!(
            "implausible length ratio {:.2}",
            ratio
        )));
    }
    Ok(translated)
}
