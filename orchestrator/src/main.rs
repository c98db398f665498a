use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer};
use conhub_config::AppConfig;
use conhub_observability::{init_tracing, observability, TracingConfig};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use orchestrator::adapters::{HttpCrawler, HttpWebSearch, OpenAiEmbeddingProvider, OpenAiLlm, RedisCache};
use orchestrator::http;
use orchestrator::state::AppState;

use docstore::{
    LocalObjectStore, PgChatHistoryStore, PgDocumentStore, PgKnowledgeGapStore, PgMonitorTargetStore,
    PgPendingUpdateStore, PgProfileStore, PgSearchLogStore,
};
use embedding::{EmbeddingGateway, QdrantVectorIndex};
use ingestion::{DocumentResolver, IngestionPipeline, MonitorScheduler};
use intent::IntentClassifier;
use personalization::{MemoryExtractor, PersonalizationService};
use rag::{ConversationContext, RagEngine};
use searchlog::{GapDetector, SearchLogger};
use tools::handlers::{
    AnalyzeImageHandler, AnswerDirectlyHandler, ClarifyQuestionHandler, FillFormHandler, SearchWebHandler,
    UseRagContextHandler,
};
use tools::ToolRegistry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing(TracingConfig::for_service("orchestrator"));
    dotenv::dotenv().ok();

    let config = AppConfig::from_env();
    info!(host = %config.server_host, port = config.server_port, "starting orchestrator");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let document_store = Arc::new(PgDocumentStore::new(pool.clone()));
    let object_store = Arc::new(LocalObjectStore::new(
        config.object_store_root.clone(),
        config.object_store_sign_secret.clone(),
        config.object_store_base_url.clone(),
    ));
    let profile_store = Arc::new(PgProfileStore::new(pool.clone()));
    profile_store.ensure_schema().await.expect("failed to ensure profile schema");
    let pending_update_store = Arc::new(PgPendingUpdateStore::new(pool.clone()));
    pending_update_store.ensure_schema().await.expect("failed to ensure pending update schema");
    let monitor_target_store = Arc::new(PgMonitorTargetStore::new(pool.clone()));
    monitor_target_store.ensure_schema().await.expect("failed to ensure monitor target schema");
    let search_log_store = Arc::new(PgSearchLogStore::new(pool.clone()));
    search_log_store.ensure_schema().await.expect("failed to ensure search log schema");
    let knowledge_gap_store = Arc::new(PgKnowledgeGapStore::new(pool.clone()));
    knowledge_gap_store.ensure_schema().await.expect("failed to ensure knowledge gap schema");
    let chat_history_store = Arc::new(PgChatHistoryStore::new(pool.clone()));
    chat_history_store.ensure_schema().await.expect("failed to ensure chat history schema");

    let cache = Arc::new(RedisCache::connect(&config.redis_url).await.expect("failed to connect to redis"));

    let embedding_provider = Arc::new(OpenAiEmbeddingProvider::new(
        &config.openai_api_key,
        &config.openai_base_url,
        config.embedding_model.clone(),
        config.embedding_dim,
    ));
    let cache_port: Arc<dyn conhub_ports::cache::CachePort> = cache.clone();
    let embedding_gateway: Arc<dyn conhub_ports::embedding::EmbeddingModelPort> = Arc::new(EmbeddingGateway::new(
        embedding_provider,
        config.embedding_model.clone(),
        Some(cache_port),
        config.embedding_gateway_concurrency,
    ));

    let vector_index: Arc<dyn conhub_ports::vector_index::VectorIndexPort> =
        Arc::new(QdrantVectorIndex::connect(&config.qdrant_url).await.expect("failed to connect to qdrant"));

    let llm: Arc<dyn conhub_ports::llm::LlmPort> = Arc::new(OpenAiLlm::new(
        &config.openai_api_key,
        &config.openai_base_url,
        config.llm_qa_model.clone(),
        config.llm_reasoning_model.clone(),
    ));

    let web_search: Arc<dyn conhub_ports::search::WebSearchPort> =
        Arc::new(HttpWebSearch::new(config.http_client.clone(), config.firecrawl_base_url.clone(), config.firecrawl_api_key.clone()));
    let web_crawler: Arc<dyn conhub_ports::crawler::WebCrawlerPort> = Arc::new(HttpCrawler::new(config.http_client.clone()));

    let rag_engine = Arc::new(RagEngine::new(embedding_gateway.clone(), vector_index.clone()));
    let chat_history_port: Arc<dyn conhub_ports::chat_history::ChatHistoryPort> = chat_history_store;
    let conversation_context = Arc::new(ConversationContext::new(chat_history_port));
    let intent_classifier = Arc::new(IntentClassifier::new());

    let mut registry = ToolRegistry::new().with_timeout(std::time::Duration::from_millis(config.tool_timeout_ms));
    registry.register(Arc::new(UseRagContextHandler::new(rag_engine.clone(), vector_index.clone(), llm.clone())));
    registry.register(Arc::new(SearchWebHandler::new(web_search.clone())));
    registry.register(Arc::new(FillFormHandler::new(profile_store.clone())));
    registry.register(Arc::new(AnswerDirectlyHandler::new(llm.clone())));
    registry.register(Arc::new(ClarifyQuestionHandler::new()));
    registry.register(Arc::new(AnalyzeImageHandler::new(llm.clone(), rag_engine.clone())));
    let tool_registry = Arc::new(registry);

    let personalization = Arc::new(
        PersonalizationService::new(profile_store.clone()).with_memory_extractor(MemoryExtractor::new(llm.clone())),
    );

    let resolver = Arc::new(DocumentResolver::new(embedding_gateway.clone(), vector_index.clone(), llm.clone()));
    let ingestion_pipeline = Arc::new(IngestionPipeline::new(pending_update_store.clone(), document_store.clone(), resolver));
    let monitor_scheduler = Arc::new(MonitorScheduler::new(monitor_target_store.clone(), web_crawler.clone(), ingestion_pipeline.clone()));

    let search_logger = Arc::new(SearchLogger::new(search_log_store.clone()));
    let gap_detector = Arc::new(GapDetector::new(search_log_store.clone(), knowledge_gap_store.clone()));

    let state = Arc::new(AppState {
        config: config.clone(),
        document_store,
        object_store,
        rag_engine,
        conversation_context,
        intent_classifier,
        tool_registry,
        personalization,
        profile_store,
        pending_update_store,
        knowledge_gap_store,
        ingestion_pipeline,
        monitor_scheduler,
        search_logger,
        gap_detector,
    });

    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    HttpServer::new(move || {
        App::new()
            .wrap(observability("orchestrator"))
            .wrap(Cors::permissive())
            .app_data(actix_web::web::Data::new(state.clone()))
            .app_data(actix_web::web::JsonConfig::default().limit(16 * 1024 * 1024))
            .configure(http::configure)
    })
    .bind((server_host.as_str(), server_port))?
    .run()
    .await
}
