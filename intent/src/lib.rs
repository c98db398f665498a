//! C7 Intent Classifier (spec.md §4.7). Keyword/phrase matching against a
//! Vietnamese-dominant lexicon, following the scored-keyword idiom of
//! `decision_engine/src/services/query_analysis.rs::QueryAnalyzer`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    GeneralAnswer,
    FileRequest,
    FormRequest,
    ProcedureGuide,
    ContactInfo,
    Navigation,
    ImageQuery,
    ClarificationNeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub label: IntentLabel,
    pub confidence: f32,
    pub wants_fillable_form: bool,
}

/// Form/file keywords that route to `FormRequest` rather than the generic
/// `FileRequest` bucket.
const FORM_KEYWORDS: &[&str] = &["mẫu đơn", "form", "đơn xin", "biểu mẫu", "mẫu biểu"];

const ARTIFACT_KEYWORDS: &[&str] = &[
    "mẫu đơn", "mẫu biểu", "tải mẫu", "xin mẫu", "cho mẫu", "form", "đơn xin",
    "biểu mẫu", "file mẫu", "template", "tải file", "download", "tải về",
    "xin file", "cho file", "lấy file", "tải xuống", "file", "tài liệu",
];

const PROCEDURE_KEYWORDS: &[&str] = &["cách", "hướng dẫn", "quy trình", "thủ tục"];

const CONTACT_KEYWORDS: &[&str] = &["liên hệ", "số điện thoại", "email", "địa chỉ"];

const NAVIGATION_KEYWORDS: &[&str] = &["đường đi", "chỉ đường", "ở đâu", "vị trí"];

const FILLABLE_KEYWORDS: &[&str] = &["điền", "điền sẵn", "điền giúp", "điền thông tin", "fill", "tự động điền", "điền form"];

/// Minimum gap between the top two category scores before the match is
/// considered unambiguous.
const AMBIGUITY_MARGIN: f32 = 0.15;
/// Queries at or below this word count are treated as underspecified when
/// ambiguous.
const UNDERSPECIFIED_WORD_COUNT: usize = 4;

pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, query: &str, has_image_attachment: bool) -> IntentResult {
        let wants_fillable_form = self.wants_fillable_form(query);

        if has_image_attachment {
            return IntentResult { label: IntentLabel::ImageQuery, confidence: 1.0, wants_fillable_form };
        }

        let query_lower = query.to_lowercase();
        let scores = self.score_categories(&query_lower);

        let mut ranked: Vec<(IntentLabel, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let word_count = query.split_whitespace().count();
        debug!(query_len = word_count, ?ranked, "intent classification scores");

        let label = match ranked.as_slice() {
            [] => IntentLabel::GeneralAnswer,
            [(only, score)] => {
                if *score > 0.0 {
                    *only
                } else {
                    IntentLabel::GeneralAnswer
                }
            }
            [(top, top_score), (_, second_score), ..] => {
                let ambiguous = (*top_score - *second_score).abs() < AMBIGUITY_MARGIN;
                if ambiguous && word_count <= UNDERSPECIFIED_WORD_COUNT {
                    IntentLabel::ClarificationNeeded
                } else if *top_score > 0.0 {
                    *top
                } else {
                    IntentLabel::GeneralAnswer
                }
            }
        };

        let confidence = ranked
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, s)| s.min(0.95))
            .unwrap_or(0.3);

        IntentResult { label, confidence, wants_fillable_form }
    }

    fn wants_fillable_form(&self, query: &str) -> bool {
        let query_lower = query.to_lowercase();
        FILLABLE_KEYWORDS.iter().any(|kw| query_lower.contains(kw))
    }

    fn score_categories(&self, query_lower: &str) -> HashMap<IntentLabel, f32> {
        let mut scores: HashMap<IntentLabel, f32> = HashMap::new();

        for keyword in ARTIFACT_KEYWORDS {
            if query_lower.contains(keyword) {
                let is_form = FORM_KEYWORDS.iter().any(|k| query_lower.contains(k));
                let label = if is_form { IntentLabel::FormRequest } else { IntentLabel::FileRequest };
                *scores.entry(label).or_insert(0.0) += 0.3;
            }
        }
        for keyword in PROCEDURE_KEYWORDS {
            if query_lower.contains(keyword) {
                *scores.entry(IntentLabel::ProcedureGuide).or_insert(0.0) += 0.3;
            }
        }
        for keyword in CONTACT_KEYWORDS {
            if query_lower.contains(keyword) {
                *scores.entry(IntentLabel::ContactInfo).or_insert(0.0) += 0.3;
            }
        }
        for keyword in NAVIGATION_KEYWORDS {
            if query_lower.contains(keyword) {
                *scores.entry(IntentLabel::Navigation).or_insert(0.0) += 0.3;
            }
        }

        scores
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_keyword_beats_generic_file_keyword() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("cho tôi xin mẫu đơn nghỉ phép", false);
        assert_eq!(result.label, IntentLabel::FormRequest);
    }

    #[test]
    fn image_attachment_forces_image_query() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("đây là cái gì", true);
        assert_eq!(result.label, IntentLabel::ImageQuery);
    }

    #[test]
    fn fillable_verb_sets_sub_signal() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("điền giúp tôi mẫu đơn này", false);
        assert!(result.wants_fillable_form);
        assert_eq!(result.label, IntentLabel::FormRequest);
    }

    #[test]
    fn procedure_phrase_classifies_as_guide() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("hướng dẫn đăng ký tạm trú", false);
        assert_eq!(result.label, IntentLabel::ProcedureGuide);
    }

    #[test]
    fn no_keyword_match_defaults_to_general_answer() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("thời tiết hôm nay thế nào", false);
        assert_eq!(result.label, IntentLabel::GeneralAnswer);
    }

    #[test]
    fn short_ambiguous_query_asks_for_clarification() {
        let classifier = IntentClassifier::new();
        // "file" (FileRequest) and "hướng dẫn" (ProcedureGuide) both match,
        // comparable strength, and the query is short.
        let result = classifier.classify("file hướng dẫn", false);
        assert_eq!(result.label, IntentLabel::ClarificationNeeded);
    }
}
