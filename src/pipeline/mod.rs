//! Request orchestration: extraction, layer fan-out, aggregation.
//!
//! A text request moves through `received → extracting → running_layers →
//! aggregating → complete`. Extraction is the only step that can fail a run;
//! every layer problem is folded into that layer's [`LayerResult`] instead.
//!
//! [`LayerResult`]: crate::layers::LayerResult

pub mod config;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod run;

#[cfg(test)]
mod tests;

pub use config::PipelineConfig;
pub use error::VerifyError;
pub use options::VerifyOptions;
pub use orchestrator::{Backends, DISABLED_EVIDENCE, Verifier};
pub use run::{RunMetadata, RunState, RunSummary, VerificationRun, document_confidence};
