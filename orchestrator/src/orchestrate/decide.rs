//! S4 Decide (spec.md §4.9): the first-match-wins policy table choosing
//! which tool(s) S5 runs.

use intent::IntentLabel;
use tools::ToolType;

/// Score band below which `search_web` is considered for the fallback row.
const WEB_FALLBACK_UPPER_BOUND: f32 = 0.5;

pub struct DecisionInput {
    pub has_image: bool,
    pub intent: IntentLabel,
    pub top_score: f32,
    pub has_high_confidence: bool,
    /// True when the top retrieved chunk's document carries a `Form` artifact.
    pub top_is_form_template: bool,
    /// True when any retrieved source's document has at least one artifact.
    pub any_source_has_artifacts: bool,
    /// Domain-allowlist gate for the `search_web` fallback row (§4.9 S4);
    /// open by default, see DESIGN.md's Open Question decisions.
    pub web_fallback_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

pub struct Decision {
    pub primary: ToolType,
    /// The vision follow-up row (image → analyze_image → use_rag_context)
    /// is the only sequential dependency in the table.
    pub sequential_followup: Option<ToolType>,
    pub confidence: Confidence,
}

pub fn decide(input: &DecisionInput) -> Decision {
    if input.has_image {
        return Decision {
            primary: ToolType::AnalyzeImage,
            sequential_followup: Some(ToolType::UseRagContext),
            confidence: Confidence::Medium,
        };
    }

    let form_template_hit = input.top_is_form_template && input.top_score >= 0.85;
    if input.intent == IntentLabel::FormRequest || form_template_hit {
        return Decision { primary: ToolType::FillForm, sequential_followup: None, confidence: Confidence::High };
    }

    if input.intent == IntentLabel::FileRequest && input.any_source_has_artifacts {
        return Decision {
            primary: ToolType::UseRagContext,
            sequential_followup: None,
            confidence: Confidence::High,
        };
    }

    if input.intent == IntentLabel::ClarificationNeeded {
        return Decision {
            primary: ToolType::ClarifyQuestion,
            sequential_followup: None,
            confidence: Confidence::Low,
        };
    }

    if input.has_high_confidence {
        return Decision {
            primary: ToolType::UseRagContext,
            sequential_followup: None,
            confidence: Confidence::High,
        };
    }

    if input.top_score > 0.0 && input.top_score < WEB_FALLBACK_UPPER_BOUND && input.web_fallback_allowed {
        return Decision { primary: ToolType::SearchWeb, sequential_followup: None, confidence: Confidence::Low };
    }

    if input.top_score == 0.0 {
        return Decision {
            primary: ToolType::AnswerDirectly,
            sequential_followup: None,
            confidence: Confidence::Low,
        };
    }

    Decision { primary: ToolType::UseRagContext, sequential_followup: None, confidence: Confidence::Low }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DecisionInput {
        DecisionInput {
            has_image: false,
            intent: IntentLabel::GeneralAnswer,
            top_score: 0.0,
            has_high_confidence: false,
            top_is_form_template: false,
            any_source_has_artifacts: false,
            web_fallback_allowed: true,
        }
    }

    #[test]
    fn image_always_wins_first() {
        let input = DecisionInput { has_image: true, intent: IntentLabel::FormRequest, ..base() };
        let decision = decide(&input);
        assert_eq!(decision.primary, ToolType::AnalyzeImage);
        assert_eq!(decision.sequential_followup, Some(ToolType::UseRagContext));
    }

    #[test]
    fn form_intent_wins_over_high_confidence() {
        let input = DecisionInput {
            intent: IntentLabel::FormRequest,
            top_score: 0.9,
            has_high_confidence: true,
            ..base()
        };
        assert_eq!(decide(&input).primary, ToolType::FillForm);
    }

    #[test]
    fn mid_band_score_falls_to_web_search() {
        let input = DecisionInput { top_score: 0.3, ..base() };
        assert_eq!(decide(&input).primary, ToolType::SearchWeb);
    }

    #[test]
    fn zero_score_falls_to_answer_directly() {
        let input = DecisionInput { top_score: 0.0, ..base() };
        assert_eq!(decide(&input).primary, ToolType::AnswerDirectly);
    }

    #[test]
    fn clarification_needed_overrides_score() {
        let input = DecisionInput { intent: IntentLabel::ClarificationNeeded, top_score: 0.9, ..base() };
        assert_eq!(decide(&input).primary, ToolType::ClarifyQuestion);
    }

    #[test]
    fn ambiguous_band_defaults_to_low_confidence_rag() {
        let input = DecisionInput { top_score: 0.6, has_high_confidence: false, ..base() };
        let decision = decide(&input);
        assert_eq!(decision.primary, ToolType::UseRagContext);
        assert_eq!(decision.confidence, Confidence::Low);
    }
}
