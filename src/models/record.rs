use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which portal a record was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Pgc,
    Pncp,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Pgc => "PGC",
            Source::Pncp => "PNCP",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One procurement demand as extracted from a portal listing.
///
/// `document_ref` is derived from `description` by a fixed rule (first seven
/// digits formatted `NNN/NNNN`), never entered free-text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementRecord {
    pub contract_id: String,
    pub description: String,
    pub category: String,
    pub value: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub status_type: String,
    pub document_ref: String,
}

impl ProcurementRecord {
    /// Stable upsert key derived from record content.
    ///
    /// UI row position is never part of the key: virtualized lists reorder
    /// and re-render rows between runs.
    pub fn business_id(&self, source: Source) -> String {
        let mut id = format!(
            "{}-{}-{}",
            source.as_str().to_lowercase(),
            self.document_ref,
            self.contract_id
        );
        id = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        id
    }
}

/// A canonical record as stored after consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub business_id: String,
    pub source: Source,
    #[serde(flatten)]
    pub record: ProcurementRecord,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProcurementRecord {
        ProcurementRecord {
            contract_id: "12345/2025".to_string(),
            description: "Aquisição de material 1572025".to_string(),
            category: "Bens".to_string(),
            value: Decimal::new(150050, 2),
            start_date: None,
            end_date: None,
            status: "APROVADA".to_string(),
            status_type: "APROVADA".to_string(),
            document_ref: "157/2025".to_string(),
        }
    }

    #[test]
    fn business_id_is_content_derived_and_path_safe() {
        let id = sample().business_id(Source::Pncp);
        assert_eq!(id, "pncp-157-2025-12345-2025");
        assert!(!id.contains('/'));
    }

    #[test]
    fn same_content_same_id() {
        assert_eq!(
            sample().business_id(Source::Pncp),
            sample().business_id(Source::Pncp)
        );
        assert_ne!(
            sample().business_id(Source::Pncp),
            sample().business_id(Source::Pgc)
        );
    }
}
