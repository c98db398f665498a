//! HTTP surface (spec.md §6): smart-query (plain and SSE) plus the two
//! artifact endpoints.

pub mod files;
pub mod smart_query;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/smart-query", web::post().to(smart_query::smart_query))
        .route("/smart-query/stream", web::post().to(smart_query::smart_query_stream))
        .route("/files/{document_id}/download/{artifact_id}", web::get().to(files::download))
        .route("/files/{document_id}/preview/{artifact_id}", web::get().to(files::preview));
}

async fn health() -> actix_web::HttpResponse {
    actix_web::HttpResponse::Ok().json(serde_json::json!({"status": "healthy", "service": "orchestrator"}))
}
