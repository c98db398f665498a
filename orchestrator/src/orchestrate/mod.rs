//! The S0-S6 orchestration state machine (spec.md §4.9), one module per
//! stage, tied together by `engine`.

pub mod classify;
pub mod context;
pub mod decide;
pub mod engine;
pub mod execute;
pub mod retrieve;
pub mod synthesize;
pub mod types;

pub use engine::{run, run_streaming, OrchestrationEvent};
pub use types::{SmartQueryRequest, SmartQueryResponse};
