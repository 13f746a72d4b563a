pub mod parse;

use tracing::warn;

use crate::driver::UiDriver;
use crate::error::ExtractionFailure;
use crate::locator::{Locator, LocatorTemplate};
use crate::models::ProcurementRecord;

/// How a partition's status column is filled.
///
/// Some partitions carry their status implicitly (everything under the
/// "rejected" tab is rejected); others show it per row.
#[derive(Debug, Clone)]
pub enum StatusRule {
    Fixed(String),
    /// Relative XPath from the row element to the status cell.
    FromField(String),
}

/// How the status-type column is filled.
#[derive(Debug, Clone)]
pub enum StatusTypeRule {
    Fixed(String),
    /// Copy whatever the status rule produced.
    MirrorStatus,
}

/// Relative XPaths from a row element to each field cell.
#[derive(Debug, Clone)]
pub struct FieldMap {
    pub contract_id: String,
    pub description: String,
    pub category: String,
    pub value: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: StatusRule,
    pub status_type: StatusTypeRule,
}

/// Turns DOM rows of one partition into validated records.
///
/// Each row is extracted independently: a malformed row produces an
/// [`ExtractionFailure`] and is skipped, never aborting the partition.
pub struct PartitionExtractor<'a> {
    driver: &'a dyn UiDriver,
    partition: String,
    row_template: LocatorTemplate,
    fields: FieldMap,
}

/// What came out of one partition.
#[derive(Debug)]
pub struct PartitionYield {
    pub records: Vec<ProcurementRecord>,
    pub attempted: usize,
    pub skipped: usize,
}

impl<'a> PartitionExtractor<'a> {
    pub fn new(
        driver: &'a dyn UiDriver,
        partition: impl Into<String>,
        row_template: LocatorTemplate,
        fields: FieldMap,
    ) -> Self {
        Self {
            driver,
            partition: partition.into(),
            row_template,
            fields,
        }
    }

    /// Extract every currently materialized row, 1-based indices.
    pub async fn extract_all(&self, row_count: usize) -> PartitionYield {
        let mut records = Vec::with_capacity(row_count);
        let mut skipped = 0;
        for index in 1..=row_count {
            match self.extract_row(index).await {
                Ok(record) => records.push(record),
                Err(failure) => {
                    warn!(%failure, "skipping unextractable row");
                    skipped += 1;
                }
            }
        }
        PartitionYield {
            records,
            attempted: row_count,
            skipped,
        }
    }

    /// Extract and validate a single row.
    pub async fn extract_row(&self, index: usize) -> Result<ProcurementRecord, ExtractionFailure> {
        // Focus can drift to another tab mid-partition; re-bind before the
        // row's reads so they do not land on an unrelated page.
        self.driver
            .reset_context()
            .await
            .map_err(|e| self.failure(index, format!("context rebind: {e}")))?;

        let row = self.row_template.at(index);

        let contract_id = self.required(&row, &self.fields.contract_id, index, "contract id").await?;
        let description = self.required(&row, &self.fields.description, index, "description").await?;
        let category = self.optional(&row, &self.fields.category, index).await?;

        let raw_value = self.optional(&row, &self.fields.value, index).await?;
        let value = parse::parse_currency(&raw_value).ok_or_else(|| self.failure(
            index,
            format!("unparseable currency value {raw_value:?}"),
        ))?;

        let start_date = match &self.fields.start_date {
            Some(suffix) => parse::parse_date_br(&self.optional(&row, suffix, index).await?),
            None => None,
        };
        let end_date = match &self.fields.end_date {
            Some(suffix) => parse::parse_date_br(&self.optional(&row, suffix, index).await?),
            None => None,
        };

        let status = match &self.fields.status {
            StatusRule::Fixed(status) => status.clone(),
            StatusRule::FromField(suffix) => {
                self.required(&row, suffix, index, "status").await?
            }
        };
        let status_type = match &self.fields.status_type {
            StatusTypeRule::Fixed(status_type) => status_type.clone(),
            StatusTypeRule::MirrorStatus => status.clone(),
        };

        let document_ref = parse::derive_document_ref(&description);

        Ok(ProcurementRecord {
            contract_id,
            description,
            category,
            value,
            start_date,
            end_date,
            status,
            status_type,
            document_ref,
        })
    }

    async fn read(&self, row: &Locator, suffix: &str, index: usize) -> Result<Option<String>, ExtractionFailure> {
        self.driver
            .read_text(&row.join(suffix))
            .await
            .map_err(|e| self.failure(index, format!("field {suffix}: {e}")))
    }

    async fn required(
        &self,
        row: &Locator,
        suffix: &str,
        index: usize,
        what: &str,
    ) -> Result<String, ExtractionFailure> {
        match self.read(row, suffix, index).await? {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(self.failure(index, format!("missing {what}"))),
        }
    }

    async fn optional(
        &self,
        row: &Locator,
        suffix: &str,
        index: usize,
    ) -> Result<String, ExtractionFailure> {
        Ok(self
            .read(row, suffix, index)
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default())
    }

    fn failure(&self, row: usize, reason: String) -> ExtractionFailure {
        ExtractionFailure {
            partition: self.partition.clone(),
            row,
            reason,
        }
    }
}
