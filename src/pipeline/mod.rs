//! Single-record and batch import pipelines.

mod options;
mod orchestrator;
mod references;
mod result;
mod veto;

pub use options::ImportOptions;
pub use orchestrator::Orchestrator;
pub use references::{references, Reference};
pub use result::{OrchestratorResult, RunMeta, Stage};
pub use veto::{veto_reason, COSMETIC_TYPE_IDS};
