//! Default in-process adapters for the ports that have no dedicated crate:
//! LLM, web crawler, web search, cache. SPEC_FULL.md's composition-root
//! section calls these "local lexicon/HTTP stubs for LLM and search so the
//! workspace is runnable standalone" — thin, not full SDK wrappers.

pub mod http_crawler;
pub mod http_search;
pub mod openai_embedding;
pub mod openai_llm;
pub mod redis_cache;

pub use http_crawler::HttpCrawler;
pub use http_search::HttpWebSearch;
pub use openai_embedding::OpenAiEmbeddingProvider;
pub use openai_llm::OpenAiLlm;
pub use redis_cache::RedisCache;
