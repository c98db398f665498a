//! Student Profile (§3 Data Model, §4.10 Personalization Service).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_INTERESTS: usize = 5;
pub const MAX_TRAITS: usize = 6;
pub const MAX_HISTORY: usize = 50;
pub const INTEREST_FLOOR: f32 = 0.05;
/// Half-life for interest decay, in days (Open Question resolved in §9).
pub const INTEREST_HALF_LIFE_DAYS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicLevel {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    Graduate,
    Alumni,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Brief,
    Medium,
    Detailed,
}

impl Default for DetailLevel {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Question,
    FileDownload,
    FormFill,
    TopicClick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicInterest {
    pub topic: String,
    pub score: f32,
    pub interaction_count: u32,
    pub last_accessed: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub interaction_type: InteractionType,
    pub topic: Option<String>,
    pub metadata: serde_json::Value,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Option<String>,
    pub detail_level: Option<DetailLevel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityFields {
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicFields {
    pub level: Option<AcademicLevel>,
    pub major: Option<String>,
    pub faculty: Option<String>,
    pub class: Option<String>,
    pub year: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub questions: u64,
    pub file_downloads: u64,
    pub form_fills: u64,
    pub topic_clicks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: String,
    pub identity: IdentityFields,
    pub academic: AcademicFields,
    pub preferences: Preferences,
    pub personality_summary: Option<String>,
    pub personality_traits: Vec<String>,
    pub topics_of_interest: Vec<TopicInterest>,
    pub interaction_history: VecDeque<InteractionEvent>,
    pub counters: Counters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            identity: IdentityFields::default(),
            academic: AcademicFields::default(),
            preferences: Preferences::default(),
            personality_summary: None,
            personality_traits: Vec::new(),
            topics_of_interest: Vec::new(),
            interaction_history: VecDeque::new(),
            counters: Counters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies exponential decay to every interest score as of `now`, prunes
    /// anything under the floor, and returns interests sorted descending —
    /// matching the "decayed and sorted on read" invariant in §3/§4.10.
    pub fn decayed_interests(&self, now: DateTime<Utc>) -> Vec<TopicInterest> {
        let mut decayed: Vec<TopicInterest> = self
            .topics_of_interest
            .iter()
            .map(|interest| {
                let elapsed_days = (now - interest.last_accessed).num_seconds() as f64 / 86400.0;
                let decay = 2f64.powf(-(elapsed_days.max(0.0)) / INTEREST_HALF_LIFE_DAYS);
                let mut decayed = interest.clone();
                decayed.score = (interest.score as f64 * decay) as f32;
                decayed
            })
            .filter(|i| i.score >= INTEREST_FLOOR)
            .collect();
        decayed.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        decayed
    }

    /// Records an interaction, bumping the matching interest score (bounded
    /// at 1.0) and the relevant counter.
    pub fn record_interaction(
        &mut self,
        interaction_type: InteractionType,
        topic: Option<String>,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        if self.interaction_history.len() >= MAX_HISTORY {
            self.interaction_history.pop_front();
        }
        self.interaction_history.push_back(InteractionEvent {
            interaction_type,
            topic: topic.clone(),
            metadata,
            at: now,
        });

        match interaction_type {
            InteractionType::Question => self.counters.questions += 1,
            InteractionType::FileDownload => self.counters.file_downloads += 1,
            InteractionType::FormFill => self.counters.form_fills += 1,
            InteractionType::TopicClick => self.counters.topic_clicks += 1,
        }

        if let Some(topic) = topic {
            if let Some(existing) = self.topics_of_interest.iter_mut().find(|i| i.topic == topic) {
                existing.score = (existing.score + 0.1).min(1.0);
                existing.interaction_count += 1;
                existing.last_accessed = now;
            } else {
                self.topics_of_interest.push(TopicInterest {
                    topic,
                    score: 0.1,
                    interaction_count: 1,
                    last_accessed: now,
                    source: format!("{:?}", interaction_type),
                });
            }
        }
        self.topics_of_interest
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        self.topics_of_interest.truncate(MAX_INTERESTS);
        self.updated_at = now;
    }

    pub fn push_trait(&mut self, trait_summary: String) {
        if !self.personality_traits.contains(&trait_summary) {
            self.personality_traits.push(trait_summary);
        }
        self.personality_traits.truncate(MAX_TRAITS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn interests_decay_and_sort_descending() {
        let mut profile = StudentProfile::new("u1");
        let now = Utc::now();
        profile.topics_of_interest.push(TopicInterest {
            topic: "old".into(),
            score: 0.9,
            interaction_count: 1,
            last_accessed: now - Duration::days(60),
            source: "test".into(),
        });
        profile.topics_of_interest.push(TopicInterest {
            topic: "new".into(),
            score: 0.3,
            interaction_count: 1,
            last_accessed: now,
            source: "test".into(),
        });
        let decayed = profile.decayed_interests(now);
        assert_eq!(decayed[0].topic, "new");
    }

    #[test]
    fn traits_capped_at_six() {
        let mut profile = StudentProfile::new("u1");
        for i in 0..10 {
            profile.push_trait(format!("trait-{i}"));
        }
        assert_eq!(profile.personality_traits.len(), MAX_TRAITS);
    }
}
