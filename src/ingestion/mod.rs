pub mod municipal;
pub mod regional;
pub mod scheduler;
pub mod source;

use serde::Serialize;

pub use municipal::{aggregate_municipal_rows, run_municipal_job};
pub use regional::{aggregate_regional_rows, run_regional_job};
pub use scheduler::spawn_ingestion_tasks;
pub use source::OpenDataClient;

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IngestionReport {
    pub fetched_rows: usize,
    pub stored: usize,
    pub skipped_existing: usize,
    pub undefined_forecasts: usize,
    pub elapsed_ms: u64,
}
