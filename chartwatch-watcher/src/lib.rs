//! Watch loop: path watching, the render/filter/emit pipeline, and output framing.

mod error;
pub mod emitter;
pub mod pipeline;
mod runtime;
pub mod watch;

pub use emitter::{EmitSummary, Emitter, MatchedDocument, CYCLE_DELIMITER};
pub use error::WatcherError;
pub use pipeline::{CycleOutcome, CycleReport, Pipeline, PipelineState, RunSummary, TriggerGate};
pub use runtime::{
    init_tracing, render_once, render_once_blocking, run, start_blocking, WatchOptions,
};
pub use watch::{ChangeEvent, ChangeKind, ChangeSender, ChangeStream, WatchSet};
