//! Postgres adapters for the remaining persistence singletons named in §5:
//! profile store, pending-update queue, monitor targets, search logs,
//! knowledge gaps. Same `FromRow`-backed idiom as `postgres_store.rs`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use conhub_models::ingestion::{DetectionType, MonitorTarget, PendingStatus, PendingUpdate};
use conhub_models::profile::StudentProfile;
use conhub_models::search_log::{GapStatus, KnowledgeGap, ResultQuality, SearchLog};
use conhub_ports::store::{
    KnowledgeGapStorePort, MonitorTargetStorePort, PendingUpdateQuery, PendingUpdateStorePort, ProfileStorePort,
    SearchLogStorePort,
};
use conhub_ports::{PortError, PortResult};

fn to_dep_unavailable(e: sqlx::Error) -> PortError {
    PortError::dependency_unavailable(e.to_string())
}

fn to_internal(e: serde_json::Error) -> PortError {
    PortError::internal(e.to_string())
}

// ---------------------------------------------------------------------
// Profile store (C10)
// ---------------------------------------------------------------------

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_profiles (
                user_id TEXT PRIMARY KEY,
                profile JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStorePort for PgProfileStore {
    async fn get(&self, user_id: &str) -> PortResult<Option<StudentProfile>> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT profile FROM student_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_dep_unavailable)?;

        row.map(|(v,)| serde_json::from_value(v).map_err(to_internal)).transpose()
    }

    async fn put(&self, profile: StudentProfile) -> PortResult<()> {
        let value = serde_json::to_value(&profile).map_err(to_internal)?;
        sqlx::query(
            r#"
            INSERT INTO student_profiles (user_id, profile, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET profile = EXCLUDED.profile, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(value)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Pending update store (C12)
// ---------------------------------------------------------------------

pub struct PgPendingUpdateStore {
    pool: PgPool,
}

impl PgPendingUpdateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_updates (
                id UUID PRIMARY KEY,
                source_id TEXT NOT NULL,
                title TEXT NOT NULL,
                raw_content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                source_url TEXT,
                category TEXT,
                detection_type TEXT NOT NULL,
                similarity_score REAL NOT NULL,
                matched_doc_id UUID,
                candidate_doc_ids UUID[] NOT NULL DEFAULT '{}',
                llm_summary TEXT,
                llm_reason TEXT,
                status TEXT NOT NULL,
                priority SMALLINT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS pending_updates_content_hash_idx ON pending_updates (content_hash)")
            .execute(&self.pool)
            .await
            .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PendingUpdateRow {
    id: Uuid,
    source_id: String,
    title: String,
    raw_content: String,
    content_hash: String,
    source_url: Option<String>,
    category: Option<String>,
    detection_type: String,
    similarity_score: f32,
    matched_doc_id: Option<Uuid>,
    candidate_doc_ids: Vec<Uuid>,
    llm_summary: Option<String>,
    llm_reason: Option<String>,
    status: String,
    priority: i16,
    metadata: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<PendingUpdateRow> for PendingUpdate {
    type Error = PortError;

    fn try_from(row: PendingUpdateRow) -> Result<Self, Self::Error> {
        let metadata: HashMap<String, Value> = serde_json::from_value(row.metadata).map_err(to_internal)?;
        Ok(PendingUpdate {
            id: row.id,
            source_id: row.source_id,
            title: row.title,
            raw_content: row.raw_content,
            content_hash: row.content_hash,
            source_url: row.source_url,
            category: row.category,
            detection_type: parse_detection_type(&row.detection_type),
            similarity_score: row.similarity_score,
            matched_doc_id: row.matched_doc_id,
            candidate_doc_ids: row.candidate_doc_ids,
            llm_summary: row.llm_summary,
            llm_reason: row.llm_reason,
            status: parse_pending_status(&row.status),
            priority: row.priority as u8,
            metadata,
            created_at: row.created_at,
        })
    }
}

fn detection_type_str(t: DetectionType) -> &'static str {
    match t {
        DetectionType::New => "new",
        DetectionType::Update => "update",
        DetectionType::Unrelated => "unrelated",
        DetectionType::Duplicate => "duplicate",
    }
}

fn parse_detection_type(s: &str) -> DetectionType {
    match s {
        "update" => DetectionType::Update,
        "unrelated" => DetectionType::Unrelated,
        "duplicate" => DetectionType::Duplicate,
        _ => DetectionType::New,
    }
}

fn pending_status_str(s: PendingStatus) -> &'static str {
    match s {
        PendingStatus::Pending => "pending",
        PendingStatus::Approved => "approved",
        PendingStatus::Rejected => "rejected",
    }
}

fn parse_pending_status(s: &str) -> PendingStatus {
    match s {
        "approved" => PendingStatus::Approved,
        "rejected" => PendingStatus::Rejected,
        _ => PendingStatus::Pending,
    }
}

#[async_trait]
impl PendingUpdateStorePort for PgPendingUpdateStore {
    async fn insert(&self, update: PendingUpdate) -> PortResult<PendingUpdate> {
        let metadata = serde_json::to_value(&update.metadata).map_err(to_internal)?;

        sqlx::query(
            r#"
            INSERT INTO pending_updates (
                id, source_id, title, raw_content, content_hash, source_url, category,
                detection_type, similarity_score, matched_doc_id, candidate_doc_ids,
                llm_summary, llm_reason, status, priority, metadata, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(update.id)
        .bind(&update.source_id)
        .bind(&update.title)
        .bind(&update.raw_content)
        .bind(&update.content_hash)
        .bind(&update.source_url)
        .bind(&update.category)
        .bind(detection_type_str(update.detection_type))
        .bind(update.similarity_score)
        .bind(update.matched_doc_id)
        .bind(&update.candidate_doc_ids)
        .bind(&update.llm_summary)
        .bind(&update.llm_reason)
        .bind(pending_status_str(update.status))
        .bind(update.priority as i16)
        .bind(metadata)
        .bind(update.created_at)
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;

        info!(pending_id = %update.id, detection_type = ?update.detection_type, "inserted pending update");
        Ok(update)
    }

    async fn find_by_content_hash(&self, content_hash: &str) -> PortResult<Vec<PendingUpdate>> {
        let rows: Vec<PendingUpdateRow> =
            sqlx::query_as("SELECT * FROM pending_updates WHERE content_hash = $1")
                .bind(content_hash)
                .fetch_all(&self.pool)
                .await
                .map_err(to_dep_unavailable)?;
        rows.into_iter().map(PendingUpdate::try_from).collect()
    }

    async fn list(&self, query: PendingUpdateQuery) -> PortResult<Vec<PendingUpdate>> {
        let status = query.status.map(pending_status_str);
        let rows: Vec<PendingUpdateRow> = sqlx::query_as(
            r#"
            SELECT * FROM pending_updates
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        rows.into_iter().map(PendingUpdate::try_from).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PendingUpdate>> {
        let row: Option<PendingUpdateRow> = sqlx::query_as("SELECT * FROM pending_updates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_dep_unavailable)?;
        row.map(PendingUpdate::try_from).transpose()
    }

    async fn update_status(&self, id: Uuid, status: PendingStatus) -> PortResult<()> {
        let result = sqlx::query("UPDATE pending_updates SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(pending_status_str(status))
            .execute(&self.pool)
            .await
            .map_err(to_dep_unavailable)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found(format!("pending update {id} not found")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Monitor target store (C13)
// ---------------------------------------------------------------------

pub struct PgMonitorTargetStore {
    pool: PgPool,
}

impl PgMonitorTargetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS monitor_targets (
                id UUID PRIMARY KEY,
                url TEXT NOT NULL,
                collection TEXT NOT NULL,
                category TEXT,
                interval_hours INTEGER NOT NULL,
                is_active BOOLEAN NOT NULL,
                last_checked_at TIMESTAMPTZ,
                last_success_at TIMESTAMPTZ,
                consecutive_failures INTEGER NOT NULL,
                max_failures INTEGER NOT NULL,
                last_content_hash TEXT,
                last_error TEXT,
                selector TEXT,
                metadata JSONB NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct MonitorTargetRow {
    id: Uuid,
    url: String,
    collection: String,
    category: Option<String>,
    interval_hours: i32,
    is_active: bool,
    last_checked_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    consecutive_failures: i32,
    max_failures: i32,
    last_content_hash: Option<String>,
    last_error: Option<String>,
    selector: Option<String>,
    metadata: Value,
}

impl TryFrom<MonitorTargetRow> for MonitorTarget {
    type Error = PortError;

    fn try_from(row: MonitorTargetRow) -> Result<Self, Self::Error> {
        let metadata: HashMap<String, Value> = serde_json::from_value(row.metadata).map_err(to_internal)?;
        Ok(MonitorTarget {
            id: row.id,
            url: row.url,
            collection: row.collection,
            category: row.category,
            interval_hours: row.interval_hours as u32,
            is_active: row.is_active,
            last_checked_at: row.last_checked_at,
            last_success_at: row.last_success_at,
            consecutive_failures: row.consecutive_failures as u32,
            max_failures: row.max_failures as u32,
            last_content_hash: row.last_content_hash,
            last_error: row.last_error,
            selector: row.selector,
            metadata,
        })
    }
}

#[async_trait]
impl MonitorTargetStorePort for PgMonitorTargetStore {
    async fn list_active(&self) -> PortResult<Vec<MonitorTarget>> {
        let rows: Vec<MonitorTargetRow> =
            sqlx::query_as("SELECT * FROM monitor_targets WHERE is_active = true")
                .fetch_all(&self.pool)
                .await
                .map_err(to_dep_unavailable)?;
        rows.into_iter().map(MonitorTarget::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> PortResult<Option<MonitorTarget>> {
        let row: Option<MonitorTargetRow> = sqlx::query_as("SELECT * FROM monitor_targets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_dep_unavailable)?;
        row.map(MonitorTarget::try_from).transpose()
    }

    async fn save(&self, target: MonitorTarget) -> PortResult<()> {
        let metadata = serde_json::to_value(&target.metadata).map_err(to_internal)?;
        sqlx::query(
            r#"
            INSERT INTO monitor_targets (
                id, url, collection, category, interval_hours, is_active,
                last_checked_at, last_success_at, consecutive_failures, max_failures,
                last_content_hash, last_error, selector, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                url = EXCLUDED.url, collection = EXCLUDED.collection, category = EXCLUDED.category,
                interval_hours = EXCLUDED.interval_hours, is_active = EXCLUDED.is_active,
                last_checked_at = EXCLUDED.last_checked_at, last_success_at = EXCLUDED.last_success_at,
                consecutive_failures = EXCLUDED.consecutive_failures, max_failures = EXCLUDED.max_failures,
                last_content_hash = EXCLUDED.last_content_hash, last_error = EXCLUDED.last_error,
                selector = EXCLUDED.selector, metadata = EXCLUDED.metadata
            "#,
        )
        .bind(target.id)
        .bind(&target.url)
        .bind(&target.collection)
        .bind(&target.category)
        .bind(target.interval_hours as i32)
        .bind(target.is_active)
        .bind(target.last_checked_at)
        .bind(target.last_success_at)
        .bind(target.consecutive_failures as i32)
        .bind(target.max_failures as i32)
        .bind(&target.last_content_hash)
        .bind(&target.last_error)
        .bind(&target.selector)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Search log + knowledge gap store (C15)
// ---------------------------------------------------------------------

pub struct PgSearchLogStore {
    pool: PgPool,
}

impl PgSearchLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_logs (
                id UUID PRIMARY KEY,
                query TEXT NOT NULL,
                user_id TEXT,
                session_id TEXT,
                results JSONB NOT NULL,
                top_score REAL NOT NULL,
                result_count INTEGER NOT NULL,
                result_quality TEXT NOT NULL,
                used_web_fallback BOOLEAN NOT NULL,
                collection TEXT NOT NULL,
                search_latency_ms BIGINT NOT NULL,
                "timestamp" TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

fn result_quality_str(q: ResultQuality) -> &'static str {
    match q {
        ResultQuality::High => "high",
        ResultQuality::Medium => "medium",
        ResultQuality::Low => "low",
        ResultQuality::None => "none",
    }
}

fn parse_result_quality(s: &str) -> ResultQuality {
    match s {
        "high" => ResultQuality::High,
        "medium" => ResultQuality::Medium,
        "low" => ResultQuality::Low,
        _ => ResultQuality::None,
    }
}

#[derive(sqlx::FromRow)]
struct SearchLogRow {
    id: Uuid,
    query: String,
    user_id: Option<String>,
    session_id: Option<String>,
    results: Value,
    top_score: f32,
    result_count: i32,
    result_quality: String,
    used_web_fallback: bool,
    collection: String,
    search_latency_ms: i64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<SearchLogRow> for SearchLog {
    type Error = PortError;

    fn try_from(row: SearchLogRow) -> Result<Self, Self::Error> {
        let results = serde_json::from_value(row.results).map_err(to_internal)?;
        Ok(SearchLog {
            id: row.id,
            query: row.query,
            user_id: row.user_id,
            session_id: row.session_id,
            results,
            top_score: row.top_score,
            result_count: row.result_count as usize,
            result_quality: parse_result_quality(&row.result_quality),
            used_web_fallback: row.used_web_fallback,
            collection: row.collection,
            search_latency_ms: row.search_latency_ms as u64,
            timestamp: row.timestamp,
        })
    }
}

#[async_trait]
impl SearchLogStorePort for PgSearchLogStore {
    async fn insert(&self, log: SearchLog) -> PortResult<()> {
        let results = serde_json::to_value(&log.results).map_err(to_internal)?;
        sqlx::query(
            r#"
            INSERT INTO search_logs (
                id, query, user_id, session_id, results, top_score, result_count,
                result_quality, used_web_fallback, collection, search_latency_ms, "timestamp"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(log.id)
        .bind(&log.query)
        .bind(&log.user_id)
        .bind(&log.session_id)
        .bind(results)
        .bind(log.top_score)
        .bind(log.result_count as i32)
        .bind(result_quality_str(log.result_quality))
        .bind(log.used_web_fallback)
        .bind(&log.collection)
        .bind(log.search_latency_ms as i64)
        .bind(log.timestamp)
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }

    async fn recent(&self, window_days: i64) -> PortResult<Vec<SearchLog>> {
        let rows: Vec<SearchLogRow> = sqlx::query_as(
            r#"SELECT * FROM search_logs WHERE "timestamp" >= now() - ($1 || ' days')::interval"#,
        )
        .bind(window_days.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        rows.into_iter().map(SearchLog::try_from).collect()
    }
}

pub struct PgKnowledgeGapStore {
    pool: PgPool,
}

impl PgKnowledgeGapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_gaps (
                id UUID PRIMARY KEY,
                topic TEXT NOT NULL UNIQUE,
                sample_queries TEXT[] NOT NULL,
                query_count BIGINT NOT NULL,
                avg_score REAL NOT NULL,
                status TEXT NOT NULL,
                priority SMALLINT NOT NULL,
                first_detected_at TIMESTAMPTZ NOT NULL,
                last_query_at TIMESTAMPTZ NOT NULL,
                resolution_notes TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

fn gap_status_str(s: GapStatus) -> &'static str {
    match s {
        GapStatus::Detected => "detected",
        GapStatus::Todo => "todo",
        GapStatus::InProgress => "in_progress",
        GapStatus::Resolved => "resolved",
        GapStatus::Dismissed => "dismissed",
    }
}

fn parse_gap_status(s: &str) -> GapStatus {
    match s {
        "todo" => GapStatus::Todo,
        "in_progress" => GapStatus::InProgress,
        "resolved" => GapStatus::Resolved,
        "dismissed" => GapStatus::Dismissed,
        _ => GapStatus::Detected,
    }
}

#[derive(sqlx::FromRow)]
struct KnowledgeGapRow {
    id: Uuid,
    topic: String,
    sample_queries: Vec<String>,
    query_count: i64,
    avg_score: f32,
    status: String,
    priority: i16,
    first_detected_at: DateTime<Utc>,
    last_query_at: DateTime<Utc>,
    resolution_notes: Option<String>,
}

impl From<KnowledgeGapRow> for KnowledgeGap {
    fn from(row: KnowledgeGapRow) -> Self {
        KnowledgeGap {
            id: row.id,
            topic: row.topic,
            sample_queries: row.sample_queries,
            query_count: row.query_count as u64,
            avg_score: row.avg_score,
            status: parse_gap_status(&row.status),
            priority: row.priority as u8,
            first_detected_at: row.first_detected_at,
            last_query_at: row.last_query_at,
            resolution_notes: row.resolution_notes,
        }
    }
}

#[async_trait]
impl KnowledgeGapStorePort for PgKnowledgeGapStore {
    async fn find_by_topic(&self, topic: &str) -> PortResult<Option<KnowledgeGap>> {
        let row: Option<KnowledgeGapRow> = sqlx::query_as("SELECT * FROM knowledge_gaps WHERE topic = $1")
            .bind(topic)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_dep_unavailable)?;
        Ok(row.map(KnowledgeGap::from))
    }

    async fn upsert(&self, gap: KnowledgeGap) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_gaps (
                id, topic, sample_queries, query_count, avg_score, status, priority,
                first_detected_at, last_query_at, resolution_notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (topic) DO UPDATE SET
                sample_queries = EXCLUDED.sample_queries, query_count = EXCLUDED.query_count,
                avg_score = EXCLUDED.avg_score, status = EXCLUDED.status, priority = EXCLUDED.priority,
                last_query_at = EXCLUDED.last_query_at, resolution_notes = EXCLUDED.resolution_notes
            "#,
        )
        .bind(gap.id)
        .bind(&gap.topic)
        .bind(&gap.sample_queries)
        .bind(gap.query_count as i64)
        .bind(gap.avg_score)
        .bind(gap_status_str(gap.status))
        .bind(gap.priority as i16)
        .bind(gap.first_detected_at)
        .bind(gap.last_query_at)
        .bind(&gap.resolution_notes)
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}
