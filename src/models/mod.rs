mod batch;
mod partition;
mod record;

pub use batch::{BatchStatus, RawBatch};
pub use partition::CategoryPartition;
pub use record::{CanonicalRecord, ProcurementRecord, Source};
