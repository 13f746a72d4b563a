use serde::{Deserialize, Serialize};

/// An independently paginated sub-listing inside a portal (for the PNCP
/// listing: rejected / approved / pending tabs).
///
/// The reported total is read from an on-screen counter, never assumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPartition {
    pub id: String,
    pub reported_total_count: Option<usize>,
}

impl CategoryPartition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reported_total_count: None,
        }
    }
}
