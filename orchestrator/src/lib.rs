//! C9 Orchestrator: the composition root and HTTP surface tying every
//! other crate in the workspace together (spec.md §4.9).

pub mod adapters;
pub mod error;
pub mod http;
pub mod orchestrate;
pub mod state;

pub use error::ApiError;
pub use state::AppState;
