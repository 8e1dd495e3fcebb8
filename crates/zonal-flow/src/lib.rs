#![deny(missing_docs)]
#![doc = "Execution path control for real/implementation divergence: decisions, exploration regions and the save/merge protocol."]

mod controller;
pub mod conversion;
mod decision;
mod diagnosis;
mod explorer;
mod memory;
mod session;
mod trace;

pub use controller::{BranchCounter, ExecutionPath, PathState, PathStats, UnstableSite};
pub use conversion::{conversion_branch, conversion_number, ConversionOutcome, OutcomeKind};
pub use decision::{BranchRequest, BranchResolution, Comparison, ResolutionKind, Tristate};
pub use diagnosis::{DiagnosisLog, DiagnosisRecord, OriginContribution};
pub use explorer::{DecisionPoint, PathExplorer, RegionKind};
pub use memory::{Contribution, MergeMemory, MergeValue, SaveMemory};
pub use session::{FlowReport, Session};
pub use trace::{SyncTrace, TraceEntry};
