//! C10 Personalization Service (spec.md §4.10).

pub mod context;
pub mod memory;
pub mod service;

pub use context::PersonalizedContext;
pub use memory::MemoryExtractor;
pub use service::PersonalizationService;
