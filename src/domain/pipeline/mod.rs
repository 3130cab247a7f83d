pub mod error;
pub mod gate;
pub mod in_flight;
pub mod model;
pub mod orchestrator;
pub mod pool;
pub mod report;

pub use error::PipelineError;
pub use gate::{ConfirmationGate, DelayedConfirmation};
pub use in_flight::InFlightHashes;
pub use model::{CheckedItem, ItemError, ItemResult, ItemState, StageSpan, StoreUpload};
pub use orchestrator::{PipelineOrchestrator, RunOptions, RunOutcome};
pub use pool::{StagePools, WorkerPool};
pub use report::{CheckResults, CheckSummary, MissingItem, RunReport, StoreBreakdown};
