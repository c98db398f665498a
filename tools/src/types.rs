//! Shared argument/result shapes for the tool handler registry (§4.8).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type ToolArgs = HashMap<String, serde_json::Value>;
pub type ToolOutput = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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
            ToolType::UseRagContext => "use_rag_context",
            ToolType::SearchWeb => "search_web",
            ToolType::AnswerDirectly => "answer_directly",
            ToolType::FillForm => "fill_form",
            ToolType::ClarifyQuestion => "clarify_question",
            ToolType::AnalyzeImage => "analyze_image",
        }
    }
}

pub(crate) fn get_str<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

pub(crate) fn get_str_owned(args: &ToolArgs, key: &str) -> Option<String> {
    get_str(args, key).map(|s| s.to_string())
}
