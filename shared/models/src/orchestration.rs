//! Tool Call and Orchestration Result (§3 Data Model).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    UseRagContext,
    SearchWeb,
    AnswerDirectly,
    FillForm,
    ClarifyQuestion,
    AnalyzeImage,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UseRagContext => "use_rag_context",
            Self::SearchWeb => "search_web",
            Self::AnswerDirectly => "answer_directly",
            Self::FillForm => "fill_form",
            Self::ClarifyQuestion => "clarify_question",
            Self::AnalyzeImage => "analyze_image",
        }
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_type: ToolType,
    pub arguments: HashMap<String, serde_json::Value>,
    pub execution_status: ExecutionStatus,
    pub result: HashMap<String, serde_json::Value>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ToolCall {
    pub fn new(tool_type: ToolType, arguments: HashMap<String, serde_json::Value>) -> Self {
        Self {
            tool_type,
            arguments,
            execution_status: ExecutionStatus::Pending,
            result: HashMap::new(),
            error: None,
            execution_time_ms: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn succeed(&mut self, result: HashMap<String, serde_json::Value>, execution_time_ms: u64) {
        self.execution_status = ExecutionStatus::Succeeded;
        self.result = result;
        self.execution_time_ms = execution_time_ms;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>, execution_time_ms: u64) {
        self.execution_status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.execution_time_ms = execution_time_ms;
        self.completed_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorReference {
    pub top_score: f32,
    pub avg_score: f32,
    pub chunk_count: usize,
    pub has_high_confidence: bool,
    pub threshold: f32,
    pub sample_chunks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationMetrics {
    pub decision_time_ms: u64,
    pub tool_execution_time_ms: u64,
    pub synthesis_time_ms: u64,
    pub total_time_ms: u64,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub id: Uuid,
    pub query: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub primary_tool: Option<ToolType>,
    pub final_answer: String,
    pub success: bool,
    pub error: Option<String>,
    pub vector_reference: Option<VectorReference>,
    pub metrics: OrchestrationMetrics,
    pub created_at: DateTime<Utc>,
}
