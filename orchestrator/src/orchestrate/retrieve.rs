//! S3 Retrieve (spec.md §4.9): embeds the query via C2 and calls C3,
//! producing the VectorReference summary S4 branches on.

use conhub_models::orchestration::VectorReference;
use conhub_ports::PortResult;
use rag::{RagEngine, SearchConfig, SearchResultItem};

pub struct RetrievalOutcome {
    pub results: Vec<SearchResultItem>,
    pub reference: VectorReference,
}

impl RetrievalOutcome {
    fn empty(threshold: f32) -> Self {
        Self {
            results: Vec::new(),
            reference: VectorReference {
                top_score: 0.0,
                avg_score: 0.0,
                chunk_count: 0,
                has_high_confidence: false,
                threshold,
                sample_chunks: Vec::new(),
            },
        }
    }
}

/// High-confidence threshold per §4.9 S3's `has_high_confidence = top_score ≥ 0.7`.
const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.7;

pub async fn retrieve(
    rag_engine: &RagEngine,
    query: &str,
    enable_rag: bool,
    collection: &str,
    top_k: usize,
    score_threshold: f32,
) -> PortResult<RetrievalOutcome> {
    if !enable_rag {
        return Ok(RetrievalOutcome::empty(score_threshold));
    }

    let config = SearchConfig {
        collection: collection.to_string(),
        top_k,
        score_threshold,
        metadata_filter: None,
        deduplicate: true,
        mmr: false,
    };
    let results = rag_engine.search(query, &config).await?;

    if results.is_empty() {
        return Ok(RetrievalOutcome::empty(score_threshold));
    }

    let top_score = results[0].score;
    let avg_score = results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32;
    let sample_chunks = results.iter().take(3).map(|r| r.content.clone()).collect();

    Ok(RetrievalOutcome {
        reference: VectorReference {
            top_score,
            avg_score,
            chunk_count: results.len(),
            has_high_confidence: top_score >= HIGH_CONFIDENCE_THRESHOLD,
            threshold: score_threshold,
            sample_chunks,
        },
        results,
    })
}
