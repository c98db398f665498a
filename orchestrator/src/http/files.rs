//! Artifact download/preview endpoints (spec.md §6, §4.9a).

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const ARTIFACT_URL_TTL_SECONDS: u64 = 3600;

#[derive(Serialize)]
struct DownloadResponse {
    download_url: String,
    file_name: String,
    mime_type: String,
    size_bytes: u64,
}

#[derive(Serialize)]
struct PreviewResponse {
    preview_url: String,
    file_name: String,
    mime_type: String,
    size_bytes: u64,
}

/// `artifact_id` must equal `{document_id}_artifact_{index}`; returns the
/// matching artifact or a not-found error on mismatch or bad index.
async fn resolve_artifact(
    state: &AppState,
    document_id: Uuid,
    artifact_id: &str,
) -> Result<conhub_models::document::Artifact, ApiError> {
    let expected_prefix = format!("{document_id}_artifact_");
    let index: usize = artifact_id
        .strip_prefix(&expected_prefix)
        .and_then(|suffix| suffix.parse().ok())
        .ok_or_else(|| ApiError::not_found("artifact_id does not match document_id"))?;

    let document = state
        .document_store
        .get_by_id(document_id)
        .await?
        .ok_or_else(|| ApiError::not_found("document not found"))?;

    document.artifacts.get(index).cloned().ok_or_else(|| ApiError::not_found("artifact not found"))
}

pub async fn download(state: web::Data<Arc<AppState>>, path: web::Path<(Uuid, String)>) -> Result<HttpResponse, ApiError> {
    let (document_id, artifact_id) = path.into_inner();
    let artifact = resolve_artifact(&state, document_id, &artifact_id).await?;

    let download_url = state.object_store.presign(&artifact.storage_key, ARTIFACT_URL_TTL_SECONDS).await?;

    Ok(HttpResponse::Ok().json(DownloadResponse {
        download_url,
        file_name: artifact.file_name,
        mime_type: artifact.mime_type,
        size_bytes: artifact.size_bytes,
    }))
}

pub async fn preview(state: web::Data<Arc<AppState>>, path: web::Path<(Uuid, String)>) -> Result<HttpResponse, ApiError> {
    let (document_id, artifact_id) = path.into_inner();
    let artifact = resolve_artifact(&state, document_id, &artifact_id).await?;

    if !artifact.is_previewable() {
        return Err(ApiError::invalid("artifact is not previewable"));
    }

    let preview_url = state.object_store.presign(&artifact.storage_key, ARTIFACT_URL_TTL_SECONDS).await?;

    Ok(HttpResponse::Ok().json(PreviewResponse {
        preview_url,
        file_name: artifact.file_name,
        mime_type: artifact.mime_type,
        size_bytes: artifact.size_bytes,
    }))
}
