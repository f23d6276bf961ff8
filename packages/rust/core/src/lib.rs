//! Research orchestration for deepresearch.
//!
//! Stages run strictly in sequence (links → summaries → outline → sections →
//! report → document); the summarize and draft stages fan out behind a
//! concurrency gate. [`Researcher`] drives one run, [`RunRegistry`] tracks
//! runs in the background.

pub mod assembler;
pub mod context;
pub mod draft;
pub mod gate;
pub mod links;
pub mod outline;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod queries;
pub mod registry;
pub mod summarize;

#[cfg(test)]
mod testing;

pub use assembler::assemble;
pub use context::StageContext;
pub use outline::Outline;
pub use pipeline::{Researcher, Services};
pub use progress::{ProgressReporter, ProgressTracker, RecordingProgress, SilentProgress};
pub use queries::QueryOutcome;
pub use registry::{RunOutcome, RunRegistry};
