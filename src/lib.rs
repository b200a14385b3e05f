pub mod characteristic;
pub mod cli;
pub mod collect;
pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod fit;
pub mod formatter;
pub mod formula;
pub mod logging;
pub mod pipeline;
pub mod relations;
pub mod rules;
pub mod store;
pub mod validate;

pub use cli::{Cli, Commands};
pub use entity::{EntityKind, Group};
pub use error::{ImportError, ImportResult};
pub use pipeline::{ImportOptions, Orchestrator, OrchestratorResult};
