//! Memory extraction from a dialogue turn (§4.10), grounded on
//! `profile_memory_helpers.py`: schema prompt, outermost-JSON-object
//! extraction, confidence-gated field application, format validation.

use std::sync::Arc;

use conhub_models::profile::{DetailLevel, StudentProfile};
use conhub_ports::llm::{GenerationConfig, LlmMode, LlmPort};
use conhub_ports::PortResult;
use regex::Regex;
use serde_json::Value;

pub const MIN_CONFIDENCE: f32 = 0.7;
pub const MIN_INFERRED_CONFIDENCE: f32 = 0.8;
pub const OVERWRITE_CONFIDENCE: f32 = 0.85;

const SCHEMA_JSON: &str = r#"{
  "personal_info": {"name": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "student_id": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "email": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "phone": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "gender": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "major": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "faculty": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false}},
  "preferences": {"detail_level": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "language": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false}},
  "interests": [{"topic": "", "confidence": 0.0, "evidence": "", "inferred": false}],
  "personality": {"summary": {"value": "", "confidence": 0.0, "evidence": "", "inferred": false},
    "traits": [{"value": "", "confidence": 0.0, "evidence": "", "inferred": false}]}
}"#;

pub fn build_prompt(
    profile: &StudentProfile,
    allow_inference: bool,
    recent_context: &str,
    user_message: &str,
    assistant_message: &str,
) -> String {
    let allow_text = if allow_inference { "có" } else { "không" };
    let snapshot = serde_json::json!({
        "student_id": profile.identity.student_id,
        "name": profile.identity.name,
        "email": profile.identity.email,
        "major": profile.academic.major,
        "top_interests": profile.topics_of_interest.iter().map(|t| &t.topic).collect::<Vec<_>>(),
    });

    format!(
        "Bạn là hệ thống trích xuất hồ sơ sinh viên từ hội thoại.\n\
         Yêu cầu:\n\
         - Chỉ trả về JSON hợp lệ.\n\
         - Nếu không chắc chắn thì để rỗng (không đoán bừa).\n\
         - Cho phép suy đoán ngữ cảnh: {allow_text} (chỉ khi rất chắc chắn).\n\
         - Mỗi mục đều có confidence 0-1 và inferred true/false.\n\n\
         Schema JSON:\n{SCHEMA_JSON}\n\n\
         Hồ sơ hiện tại: {snapshot}\n\
         Ngữ cảnh gần đây:\n{recent_context}\n\n\
         Lượt mới nhất:\n\
         User: {user_message}\n\
         Assistant: {assistant_message}\n\
         JSON:"
    )
}

/// Tolerates surrounding prose by extracting the outermost `{...}` block.
pub fn parse_outermost_json(raw: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return value;
    }
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&raw[start..=end]) {
                return value;
            }
        }
    }
    Value::Object(Default::default())
}

struct ParsedField {
    value: Option<String>,
    confidence: f32,
    inferred: bool,
}

fn parse_field(value: &Value) -> ParsedField {
    match value {
        Value::Object(map) => ParsedField {
            value: map.get("value").and_then(|v| v.as_str()).map(normalize_text).flatten(),
            confidence: map.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
            inferred: map.get("inferred").and_then(|v| v.as_bool()).unwrap_or(false),
        },
        Value::String(s) => ParsedField { value: normalize_text(s), confidence: 0.5, inferred: true },
        _ => ParsedField { value: None, confidence: 0.0, inferred: false },
    }
}

fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn should_apply(current: Option<&str>, field: &ParsedField) -> bool {
    let Some(value) = &field.value else { return false };
    let min_conf = if field.inferred { MIN_INFERRED_CONFIDENCE } else { MIN_CONFIDENCE };
    if field.confidence < min_conf {
        return false;
    }
    match current {
        Some(existing) if existing != value => field.confidence >= OVERWRITE_CONFIDENCE,
        _ => true,
    }
}

/// Like `should_apply` but for fields with no stable string representation
/// to compare against (e.g. enums) — `already_set` replaces the equality
/// check with a flat "existing values need the overwrite threshold" rule.
fn meets_confidence(already_set: bool, field: &ParsedField) -> bool {
    if field.value.is_none() {
        return false;
    }
    let min_conf = if field.inferred { MIN_INFERRED_CONFIDENCE } else { MIN_CONFIDENCE };
    if field.confidence < min_conf {
        return false;
    }
    !already_set || field.confidence >= OVERWRITE_CONFIDENCE
}

fn validate_field(field_name: &str, value: &str) -> bool {
    match field_name {
        "student_id" => Regex::new(r"^[A-Za-z]\d{2}[A-Z]{4}\d{3}$").unwrap().is_match(value),
        "email" => Regex::new(r"^[\w.+-]+@[\w.-]+\.\w+$").unwrap().is_match(value),
        "phone" => Regex::new(r"^0\d{9,10}$").unwrap().is_match(value),
        "gender" => {
            let v = value.to_lowercase();
            matches!(v.as_str(), "nam" | "male" | "m" | "nữ" | "nu" | "female" | "f" | "khác" | "khac" | "other")
        }
        _ => true,
    }
}

fn normalize_detail_level(value: &str) -> Option<DetailLevel> {
    match value.trim().to_lowercase().as_str() {
        "brief" | "ngắn gọn" | "ngan gon" | "short" => Some(DetailLevel::Brief),
        "medium" | "vừa đủ" | "vua du" => Some(DetailLevel::Medium),
        "detailed" | "chi tiết" | "chi tiet" => Some(DetailLevel::Detailed),
        _ => None,
    }
}

fn normalize_language(value: &str) -> Option<String> {
    match value.trim().to_lowercase().as_str() {
        "vi" | "vi-vn" | "vietnamese" | "viet" | "việt" => Some("vi".to_string()),
        "en" | "english" => Some("en".to_string()),
        _ => None,
    }
}

/// Applies confidence-gated, format-validated field updates parsed from
/// `raw_json` onto `profile`, clamping interests/traits to their caps.
pub fn apply_extraction(profile: &mut StudentProfile, raw_json: &Value) {
    if let Some(personal) = raw_json.get("personal_info").and_then(|v| v.as_object()) {
        apply_identity_field(&mut profile.identity.name, personal.get("name"), "name");
        apply_identity_field(&mut profile.identity.student_id, personal.get("student_id"), "student_id");
        apply_identity_field(&mut profile.identity.email, personal.get("email"), "email");
        apply_identity_field(&mut profile.identity.phone, personal.get("phone"), "phone");
        apply_identity_field(&mut profile.identity.gender, personal.get("gender"), "gender");
        apply_identity_field(&mut profile.academic.major, personal.get("major"), "major");
        apply_identity_field(&mut profile.academic.faculty, personal.get("faculty"), "faculty");
    }

    if let Some(preferences) = raw_json.get("preferences").and_then(|v| v.as_object()) {
        if let Some(field) = preferences.get("detail_level").map(parse_field) {
            if meets_confidence(profile.preferences.detail_level.is_some(), &field) {
                if let Some(value) = field.value.as_deref().and_then(normalize_detail_level) {
                    profile.preferences.detail_level = Some(value);
                }
            }
        }
        if let Some(field) = preferences.get("language").map(parse_field) {
            if should_apply(profile.preferences.language.as_deref(), &field) {
                if let Some(value) = field.value.as_deref().and_then(normalize_language) {
                    profile.preferences.language = Some(value);
                }
            }
        }
    }

    if let Some(interests) = raw_json.get("interests").and_then(|v| v.as_array()) {
        for item in interests {
            let Some(topic) = item.get("topic").and_then(|v| v.as_str()).and_then(normalize_text) else {
                continue;
            };
            let confidence = item.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
            let inferred = item.get("inferred").and_then(|v| v.as_bool()).unwrap_or(false);
            let min_conf = if inferred { MIN_INFERRED_CONFIDENCE } else { MIN_CONFIDENCE };
            if confidence < min_conf {
                continue;
            }
            let now = chrono::Utc::now();
            if let Some(existing) =
                profile.topics_of_interest.iter_mut().find(|i| i.topic == topic)
            {
                existing.score = (existing.score + confidence * 0.2).min(1.0);
                existing.interaction_count += 1;
                existing.last_accessed = now;
            } else {
                profile.topics_of_interest.push(conhub_models::profile::TopicInterest {
                    topic,
                    score: confidence * 0.3,
                    interaction_count: 1,
                    last_accessed: now,
                    source: "memory_extraction".to_string(),
                });
            }
        }
        profile
            .topics_of_interest
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        profile.topics_of_interest.truncate(conhub_models::profile::MAX_INTERESTS);
    }

    if let Some(personality) = raw_json.get("personality").and_then(|v| v.as_object()) {
        if let Some(summary_value) = personality.get("summary") {
            let field = parse_field(summary_value);
            if should_apply(profile.personality_summary.as_deref(), &field) {
                if let Some(value) = field.value {
                    profile.personality_summary = Some(value);
                }
            }
        }
        if let Some(traits) = personality.get("traits").and_then(|v| v.as_array()) {
            for item in traits {
                let field = parse_field(item);
                if field.confidence >= MIN_CONFIDENCE {
                    if let Some(value) = field.value {
                        profile.push_trait(value);
                    }
                }
            }
        }
    }

    profile.updated_at = chrono::Utc::now();
}

fn apply_identity_field(target: &mut Option<String>, raw: Option<&Value>, field_name: &str) {
    let Some(raw) = raw else { return };
    let field = parse_field(raw);
    if !should_apply(target.as_deref(), &field) {
        return;
    }
    if let Some(value) = &field.value {
        if validate_field(field_name, value) || field_name == "name" {
            *target = Some(value.clone());
        }
    }
}

pub struct MemoryExtractor {
    llm: Arc<dyn LlmPort>,
}

impl MemoryExtractor {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn extract_and_apply(
        &self,
        profile: &mut StudentProfile,
        user_message: &str,
        assistant_message: &str,
        recent_context: &str,
        allow_inference: bool,
    ) -> PortResult<()> {
        let prompt = build_prompt(profile, allow_inference, recent_context, user_message, assistant_message);
        let raw = self.llm.generate(LlmMode::Reasoning, &prompt, &GenerationConfig::default()).await?;
        let parsed = parse_outermost_json(&raw);
        apply_extraction(profile, &parsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_wrapped_in_prose() {
        let raw = "Here is the result:\n{\"personal_info\": {}}\nThanks.";
        let parsed = parse_outermost_json(raw);
        assert!(parsed.get("personal_info").is_some());
    }

    #[test]
    fn low_confidence_field_is_not_applied() {
        let field = ParsedField { value: Some("x".to_string()), confidence: 0.3, inferred: false };
        assert!(!should_apply(None, &field));
    }

    #[test]
    fn overwrite_requires_high_confidence_and_different_value() {
        let field = ParsedField { value: Some("new".to_string()), confidence: 0.8, inferred: false };
        assert!(!should_apply(Some("old"), &field));
        let field2 = ParsedField { value: Some("new".to_string()), confidence: 0.9, inferred: false };
        assert!(should_apply(Some("old"), &field2));
    }

    #[test]
    fn invalid_student_id_is_rejected() {
        assert!(!validate_field("student_id", "not-an-id"));
        assert!(validate_field("student_id", "A20CNTT001"));
    }
}
