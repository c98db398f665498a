//! Personalized context for prompt injection (§4.10), grounded on
//! `personalization_service.py`'s `_build_greeting`/`_build_prompt_additions`/
//! `_suggest_related_topics`.

use conhub_models::profile::{AcademicLevel, DetailLevel, StudentProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizedContext {
    pub greeting: String,
    pub detail_level: DetailLevel,
    pub topic_hints: Vec<String>,
    pub prompt_additions: String,
    pub suggested_related_topics: Vec<String>,
}

fn level_instruction(level: AcademicLevel) -> &'static str {
    match level {
        AcademicLevel::Freshman => "Giải thích chi tiết các khái niệm cơ bản, sử dụng ngôn ngữ đơn giản.",
        AcademicLevel::Sophomore => "Giải thích rõ ràng, có thể dùng một số thuật ngữ chuyên ngành.",
        AcademicLevel::Junior => "Trả lời chuyên sâu, sử dụng thuật ngữ chuyên ngành.",
        AcademicLevel::Senior => "Trả lời ngắn gọn, chuyên sâu, tập trung vào thực hành.",
        AcademicLevel::Graduate => "Trả lời học thuật, chuyên sâu, có thể đề cập nghiên cứu.",
        AcademicLevel::Alumni => "Trả lời thực tiễn, hướng nghề nghiệp.",
    }
}

fn detail_instruction(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Brief => "Trả lời ngắn gọn, đi thẳng vào vấn đề.",
        DetailLevel::Medium => "Trả lời đầy đủ nhưng súc tích.",
        DetailLevel::Detailed => "Trả lời chi tiết, có ví dụ minh họa.",
    }
}

/// Simple topic -> related-topics mapping carried over from the original
/// service's `_suggest_related_topics`.
const RELATED_TOPICS: &[(&str, &[&str])] = &[
    ("đăng ký học", &["lịch học", "học phí", "thời khóa biểu"]),
    ("học phí", &["học bổng", "miễn giảm", "thanh toán"]),
    ("thủ tục", &["mẫu đơn", "phòng đào tạo", "giấy tờ"]),
    ("mẫu đơn", &["thủ tục", "phòng đào tạo"]),
    ("điểm", &["học bổng", "cảnh báo học vụ", "bảng điểm"]),
    ("tốt nghiệp", &["bằng", "đồ án", "thực tập"]),
];

pub fn build_greeting(profile: &StudentProfile) -> String {
    match &profile.identity.name {
        Some(name) => format!("Chào {name}"),
        None => "Chào bạn".to_string(),
    }
}

pub fn build_prompt_additions(profile: &StudentProfile, detail_level: DetailLevel) -> String {
    let mut parts = Vec::new();

    if let Some(level) = profile.academic.level {
        parts.push(level_instruction(level).to_string());
    }
    parts.push(detail_instruction(detail_level).to_string());

    if let Some(major) = &profile.academic.major {
        parts.push(format!("Sinh viên ngành {major}."));
    }

    if let Some(summary) = &profile.personality_summary {
        parts.push(format!("Tính cách: {summary}."));
    } else if !profile.personality_traits.is_empty() {
        let traits = profile.personality_traits.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
        parts.push(format!("Tính cách: {traits}."));
    }

    parts.join(" ")
}

pub fn suggest_related_topics(top_interests: &[String]) -> Vec<String> {
    let mut suggestions = Vec::new();
    for topic in top_interests {
        let topic_lower = topic.to_lowercase();
        for (key, related) in RELATED_TOPICS {
            if topic_lower.contains(key) {
                for r in *related {
                    if !suggestions.contains(&r.to_string()) {
                        suggestions.push(r.to_string());
                    }
                }
            }
        }
    }
    suggestions.truncate(5);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_falls_back_when_name_absent() {
        let profile = StudentProfile::new("u1");
        assert_eq!(build_greeting(&profile), "Chào bạn");
    }

    #[test]
    fn related_topics_match_by_substring() {
        let suggestions = suggest_related_topics(&["thủ tục nhập học".to_string()]);
        assert!(suggestions.contains(&"mẫu đơn".to_string()));
    }
}
