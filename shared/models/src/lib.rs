pub mod chunk;
pub mod document;
pub mod error;
pub mod ingestion;
pub mod orchestration;
pub mod profile;
pub mod search_log;
