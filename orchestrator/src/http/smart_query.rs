//! `POST /smart-query` and `POST /smart-query/stream` (spec.md §6),
//! grounded on `chunker/src/main.rs`'s handler idiom.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use futures::StreamExt;

use crate::error::ApiError;
use crate::orchestrate::{self, OrchestrationEvent, SmartQueryRequest};
use crate::state::AppState;

pub async fn smart_query(state: web::Data<Arc<AppState>>, body: web::Json<SmartQueryRequest>) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate().map_err(ApiError::invalid)?;

    let response = orchestrate::run(&state, &request).await;
    Ok(HttpResponse::Ok().json(response))
}

fn sse_event(event: &str, data: &serde_json::Value) -> web::Bytes {
    web::Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

pub async fn smart_query_stream(
    state: web::Data<Arc<AppState>>,
    body: web::Json<SmartQueryRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate().map_err(ApiError::invalid)?;

    let state = state.get_ref().clone();
    let events = orchestrate::run_streaming(state, request);
    let body = events.map(|event| -> Result<web::Bytes, actix_web::Error> {
        Ok(match event {
            OrchestrationEvent::Sources(sources) => sse_event("sources", &serde_json::json!(sources)),
            OrchestrationEvent::Artifacts(artifacts) => sse_event("artifacts", &serde_json::json!(artifacts)),
            OrchestrationEvent::Content(chunk) => sse_event("content", &serde_json::json!({"text": chunk})),
            OrchestrationEvent::Done => sse_event("done", &serde_json::json!({})),
            OrchestrationEvent::Error(message) => sse_event("error", &serde_json::json!({"message": message})),
        })
    });

    Ok(HttpResponse::Ok().content_type("text/event-stream").streaming(body))
}
