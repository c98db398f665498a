//! The composition of S0-S6 into the two entry points the HTTP layer calls:
//! `run` (non-streaming) and `run_streaming` (§4.9b SSE ordering).
//!
//! Neither ever returns an `Err` to its caller. Per spec.md §7, the whole
//! request only fails when classification/retrieval itself fails or every
//! selected tool failed; in that case both entry points produce the
//! fallback answer with `intent = general_answer` and `metadata.error_kind`
//! set, rather than propagating.

use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use base64::{engine::general_purpose, Engine as _};
use conhub_ports::PortError;
use futures::Stream;
use intent::IntentLabel;
use tracing::warn;

use crate::state::AppState;

use super::classify;
use super::context;
use super::decide::{self, DecisionInput};
use super::execute;
use super::retrieve;
use super::synthesize;
use super::types::{ArtifactDto, ResponseMetadata, SmartQueryRequest, SmartQueryResponse, SourceDto};

const WEB_FALLBACK_TOGGLE: &str = "web_fallback";

#[derive(Debug, Clone)]
pub enum OrchestrationEvent {
    Sources(Vec<SourceDto>),
    Artifacts(Vec<ArtifactDto>),
    Content(String),
    Done,
    Error(String),
}

struct PipelineOutput {
    content: String,
    intent: IntentLabel,
    sources: Vec<SourceDto>,
    artifacts: Vec<ArtifactDto>,
    tokens_used: u32,
}

/// Non-streaming S0-S6 run (spec.md §4.9).
pub async fn run(state: &AppState, request: &SmartQueryRequest) -> SmartQueryResponse {
    let start = Instant::now();
    match run_pipeline(state, request).await {
        Ok(out) => finish(out, start.elapsed().as_millis() as u64, &state.config.llm_qa_model, None),
        Err(e) => fallback(e, start.elapsed().as_millis() as u64, &state.config.llm_qa_model),
    }
}

/// Streaming S0-S6 run (spec.md §4.9b): `sources` and `artifacts` are each
/// emitted exactly once before any `content` chunk; `done` is terminal
/// unless replaced by `error`.
pub fn run_streaming(
    state: Arc<AppState>,
    request: SmartQueryRequest,
) -> impl Stream<Item = OrchestrationEvent> + 'static {
    stream! {
        match run_pipeline(&state, &request).await {
            Ok(out) => {
                yield OrchestrationEvent::Sources(out.sources);
                yield OrchestrationEvent::Artifacts(out.artifacts);
                for chunk in chunk_content(&out.content) {
                    yield OrchestrationEvent::Content(chunk);
                }
                yield OrchestrationEvent::Done;
            }
            Err(e) => {
                yield OrchestrationEvent::Sources(Vec::new());
                yield OrchestrationEvent::Artifacts(Vec::new());
                yield OrchestrationEvent::Error(e.message);
            }
        }
    }
}

/// Splits the synthesized answer into word-bounded chunks for the SSE
/// `content` stream; arbitrary but keeps events small and ordered.
fn chunk_content(content: &str) -> Vec<String> {
    const WORDS_PER_CHUNK: usize = 12;
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return vec![content.to_string()];
    }
    words.chunks(WORDS_PER_CHUNK).map(|c| c.join(" ")).collect()
}

async fn run_pipeline(state: &AppState, request: &SmartQueryRequest) -> Result<PipelineOutput, PortError> {
    let has_image = request.attached_image.is_some();
    let user_id = request.user_id();

    // S1: pulled for personalization/logging context; not threaded into
    // tool calls (same scope decision as personalization's prompt_additions).
    let _conversation_context = context::build_context(&state.conversation_context, request.session_id.as_deref()).await;

    // S2
    let intent_result = classify::classify(&state.intent_classifier, &request.query, has_image);

    // S3 — a retrieval failure (e.g. vector index unreachable) fails the
    // whole request per §7's DependencyUnavailable propagation rule.
    let retrieval = retrieve::retrieve(
        &state.rag_engine,
        &request.query,
        request.enable_rag,
        &request.collection,
        request.top_k,
        request.similarity_threshold,
    )
    .await?;

    let documents = execute::load_source_documents(state.document_store.as_ref(), &retrieval.results).await;
    let top_is_form_template = execute::top_is_form_template(&documents, &retrieval.results);
    let any_source_has_artifacts = execute::any_source_has_artifacts(&documents, &retrieval.results);
    let web_fallback_allowed = state.config.feature_toggles.is_enabled_or(WEB_FALLBACK_TOGGLE, true);

    // S4
    let decision = decide::decide(&DecisionInput {
        has_image,
        intent: intent_result.label,
        top_score: retrieval.reference.top_score,
        has_high_confidence: retrieval.reference.has_high_confidence,
        top_is_form_template,
        any_source_has_artifacts,
        web_fallback_allowed,
    });

    // S5
    let image_bytes = request
        .attached_image
        .as_ref()
        .map(|img| general_purpose::STANDARD.decode(&img.data_base64).unwrap_or_default());
    let image_tuple = request.attached_image.as_ref().map(|img| {
        (image_bytes.as_deref().unwrap_or(&[][..]), img.format.as_str(), img.question.as_deref())
    });

    let calls = execute::run_tools(
        &state.tool_registry,
        decision.primary,
        decision.sequential_followup,
        &request.query,
        &request.collection,
        decision.confidence.as_str(),
        user_id.as_deref(),
        &retrieval.results,
        image_tuple,
    )
    .await;

    let artifacts =
        execute::attach_artifacts(state.object_store.as_ref(), &retrieval.results, &documents, intent_result.wants_fillable_form).await;

    // §7: the whole request fails only when every selected tool failed.
    if calls.iter().all(|c| c.output.is_none()) {
        let message = calls
            .iter()
            .find_map(|c| c.error.clone())
            .unwrap_or_else(|| "all selected tools failed".to_string());
        return Err(PortError::dependency_unavailable(message));
    }

    // S6
    let model_primary = execute::to_model_tool_type(decision.primary);
    let content = synthesize::synthesize_content(&calls, model_primary);
    let sources = if request.include_sources {
        match decision.primary {
            tools::ToolType::SearchWeb => synthesize::web_sources(&calls),
            tools::ToolType::AnswerDirectly => synthesize::direct_knowledge_source(&calls),
            tools::ToolType::ClarifyQuestion => Vec::new(),
            tools::ToolType::FillForm | tools::ToolType::UseRagContext | tools::ToolType::AnalyzeImage => {
                synthesize::rag_sources(&retrieval.results, &documents)
            }
        }
    } else {
        Vec::new()
    };

    // Best-effort side effect: never fail the response on its account.
    if let Some(user_id) = user_id.as_deref() {
        if let Err(e) = state
            .personalization
            .record(user_id, model_interaction_type(decision.primary), Some(request.query.clone()), serde_json::json!({}))
            .await
        {
            warn!(error = %e, "personalization record failed");
        }
    }

    let search_results = retrieval
        .results
        .iter()
        .map(|r| conhub_models::search_log::SearchResultEntry { document_id: r.source_id, chunk_id: r.chunk_id, title: documents.get(&r.source_id).map(|d| d.title.clone()), score: r.score })
        .collect();
    if let Err(e) = state
        .search_logger
        .log(request.query.clone(), request.collection.clone(), search_results, decision.primary == tools::ToolType::SearchWeb, 0, user_id.clone(), request.session_id.clone())
        .await
    {
        warn!(error = %e, "search log write failed");
    }

    let tokens_used = calls
        .iter()
        .filter_map(|c| c.output.as_ref())
        .filter_map(|o| o.get("tokens_used").and_then(|v| v.as_u64()))
        .sum::<u64>() as u32;

    Ok(PipelineOutput { content, intent: intent_result.label, sources, artifacts, tokens_used })
}

fn model_interaction_type(tool_type: tools::ToolType) -> conhub_models::profile::InteractionType {
    match tool_type {
        tools::ToolType::FillForm => conhub_models::profile::InteractionType::FormFill,
        _ => conhub_models::profile::InteractionType::Question,
    }
}

fn finish(out: PipelineOutput, elapsed_ms: u64, model_used: &str, error_kind: Option<&'static str>) -> SmartQueryResponse {
    let artifacts_count = out.artifacts.len();
    let sources_count = out.sources.len();
    let has_fillable_form = out.artifacts.iter().any(|a| a.is_fillable);
    SmartQueryResponse {
        content: out.content,
        intent: out.intent,
        artifacts: out.artifacts,
        sources: out.sources,
        metadata: ResponseMetadata {
            model_used: model_used.to_string(),
            processing_time_ms: elapsed_ms,
            tokens_used: out.tokens_used,
            sources_count,
            artifacts_count,
            has_fillable_form,
            error_kind,
        },
        created_at: chrono::Utc::now(),
    }
}

/// §7 total-failure fallback: fixed Vietnamese apology, `general_answer`
/// intent, no sources/artifacts, `metadata.error_kind` set.
fn fallback(error: PortError, elapsed_ms: u64, model_used: &str) -> SmartQueryResponse {
    warn!(error = %error.message, kind = ?error.kind, "orchestration pipeline failed, returning fallback answer");
    finish(
        PipelineOutput {
            content: synthesize::FALLBACK_ANSWER.to_string(),
            intent: IntentLabel::GeneralAnswer,
            sources: Vec::new(),
            artifacts: Vec::new(),
            tokens_used: 0,
        },
        elapsed_ms,
        model_used,
        Some(error.kind.as_str()),
    )
}
