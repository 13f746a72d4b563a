use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::models::{BatchStatus, CanonicalRecord, RawBatch};

use super::{ConsolidationReport, ConsolidationStore};

/// JSON file-based store.
///
/// Directory structure:
/// ```text
/// data/
///   raw/
///     {batch_id}.json
///   canonical/
///     {business_id}.json
/// ```
///
/// Upsert is file replacement: the canonical file for a business id is
/// overwritten whole, never merged field by field.
pub struct JsonFileStore {
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl JsonFileStore {
    pub fn new(base_path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            clock,
        }
    }

    fn raw_dir(&self) -> PathBuf {
        self.base_path.join("raw")
    }

    fn canonical_dir(&self) -> PathBuf {
        self.base_path.join("canonical")
    }

    fn raw_file(&self, batch: &RawBatch) -> PathBuf {
        self.raw_dir().join(format!("{}.json", batch.id))
    }

    fn canonical_file(&self, business_id: &str) -> PathBuf {
        self.canonical_dir().join(format!("{business_id}.json"))
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    async fn read_dir_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        dir: &Path,
    ) -> Result<Vec<T>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", dir)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to list directory")? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut values = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            let value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
            values.push(value);
        }
        Ok(values)
    }
}

#[async_trait]
impl ConsolidationStore for JsonFileStore {
    async fn append_raw(&self, batch: &RawBatch) -> Result<()> {
        let path = self.raw_file(batch);
        self.write_json(&path, batch).await?;
        debug!(batch = %batch.id, records = batch.payload.len(), "raw batch appended");
        Ok(())
    }

    async fn raw_batches(&self) -> Result<Vec<RawBatch>> {
        let mut batches: Vec<RawBatch> = self.read_dir_json(&self.raw_dir()).await?;
        batches.sort_by_key(|b| b.captured_at);
        Ok(batches)
    }

    async fn canonical_records(&self) -> Result<Vec<CanonicalRecord>> {
        self.read_dir_json(&self.canonical_dir()).await
    }

    async fn consolidate(&self) -> Result<ConsolidationReport> {
        let mut report = ConsolidationReport::default();

        for mut batch in self.raw_batches().await? {
            if batch.status == BatchStatus::Consolidated {
                continue;
            }

            let mut failed = 0;
            for record in &batch.payload {
                let business_id = record.business_id(batch.source);
                let canonical = CanonicalRecord {
                    business_id: business_id.clone(),
                    source: batch.source,
                    record: record.clone(),
                    updated_at: self.clock.now(),
                };
                let path = self.canonical_file(&business_id);
                match self.write_json(&path, &canonical).await {
                    Ok(()) => report.upserted += 1,
                    Err(e) => {
                        // One bad record must not poison the batch; the raw
                        // payload keeps it replayable.
                        warn!(%business_id, error = %e, "skipping unconsolidatable record");
                        failed += 1;
                    }
                }
            }
            report.skipped += failed;

            batch.status = BatchStatus::Consolidated;
            let path = self.raw_file(&batch);
            self.write_json(&path, &batch).await?;
            report.batches += 1;
            debug!(batch = %batch.id, failed, "batch consolidated");
        }

        Ok(report)
    }
}
