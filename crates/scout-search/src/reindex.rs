//! Rebuild the primary lexical index from the relational store.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument};

use scout_core::{ExperienceSource, LexicalIndex, Result};

/// Totals for one reindex run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub read: usize,
    pub indexed: usize,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Stream every experience in id order into `index`, `batch_size` at a time.
///
/// Rejected documents are counted, not fatal. A transport failure stops the
/// run and is returned.
#[instrument(skip(source, index), fields(subsystem = "search", component = "reindex", op = "reindex"))]
pub async fn reindex(
    source: &dyn ExperienceSource,
    index: &dyn LexicalIndex,
    batch_size: usize,
) -> Result<ReindexReport> {
    let start = Instant::now();
    let batch_size = batch_size.max(1);
    index.ensure_index().await?;

    let mut report = ReindexReport::default();
    let mut after_id = 0i64;
    loop {
        let batch = source.experiences_after(after_id, batch_size).await?;
        let Some(last) = batch.last() else {
            break;
        };
        after_id = last.id;
        report.read += batch.len();
        report.indexed += index.bulk_index(&batch).await?;
        report.batches += 1;
        if report.batches % 10 == 0 {
            info!(read = report.read, indexed = report.indexed, "Reindex progress");
        }
        if batch.len() < batch_size {
            break;
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        read = report.read,
        indexed = report.indexed,
        batches = report.batches,
        duration_ms = report.duration_ms,
        "Reindex complete"
    );
    Ok(report)
}
