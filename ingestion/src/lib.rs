//! Document Resolver (C11), Ingestion Pipeline (C12), Monitor Scheduler
//! (C13) — spec.md §4.11-§4.13.

pub mod monitor;
pub mod pipeline;
pub mod resolver;

pub use monitor::MonitorScheduler;
pub use pipeline::{IngestPayload, IngestionPipeline};
pub use resolver::{CandidateDocument, DocumentResolver, ResolutionResult};
