//! Search Log and Knowledge Gap (§3 Data Model, §4.15).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultQuality {
    High,
    Medium,
    Low,
    None,
}

impl ResultQuality {
    /// high >= 0.75, medium >= 0.5, low > 0, none = 0 (§3).
    pub fn from_top_score(top_score: f32) -> Self {
        if top_score >= 0.75 {
            Self::High
        } else if top_score >= 0.5 {
            Self::Medium
        } else if top_score > 0.0 {
            Self::Low
        } else {
            Self::None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultEntry {
    pub document_id: Uuid,
    pub chunk_id: Uuid,
    pub title: Option<String>,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLog {
    pub id: Uuid,
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub results: Vec<SearchResultEntry>,
    pub top_score: f32,
    pub result_count: usize,
    pub result_quality: ResultQuality,
    pub used_web_fallback: bool,
    pub collection: String,
    pub search_latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl SearchLog {
    pub fn new(
        query: impl Into<String>,
        collection: impl Into<String>,
        results: Vec<SearchResultEntry>,
        used_web_fallback: bool,
        search_latency_ms: u64,
    ) -> Self {
        let top_score = results.iter().map(|r| r.score).fold(0.0_f32, f32::max);
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            user_id: None,
            session_id: None,
            result_count: results.len(),
            result_quality: ResultQuality::from_top_score(top_score),
            top_score,
            results,
            used_web_fallback,
            collection: collection.into(),
            search_latency_ms,
            timestamp: Utc::now(),
        }
    }

    /// Normalized query pattern used for gap aggregation: case-folded,
    /// whitespace-collapsed, first 100 chars (§4.15).
    pub fn query_pattern(&self) -> String {
        normalize_query_pattern(&self.query)
    }
}

pub fn normalize_query_pattern(query: &str) -> String {
    let collapsed: String = query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.chars().take(100).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    Detected,
    Todo,
    InProgress,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGap {
    pub id: Uuid,
    pub topic: String,
    pub sample_queries: Vec<String>,
    pub query_count: u64,
    pub avg_score: f32,
    pub status: GapStatus,
    pub priority: u8,
    pub first_detected_at: DateTime<Utc>,
    pub last_query_at: DateTime<Utc>,
    pub resolution_notes: Option<String>,
}

pub const MAX_SAMPLE_QUERIES: usize = 5;

impl KnowledgeGap {
    pub fn new(topic: impl Into<String>, sample_query: String, avg_score: f32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            sample_queries: vec![sample_query],
            query_count: 1,
            avg_score,
            status: GapStatus::Detected,
            priority: priority_from(1, avg_score),
            first_detected_at: now,
            last_query_at: now,
            resolution_notes: None,
        }
    }

    pub fn extend(&mut self, query: String, score: f32, now: DateTime<Utc>) {
        if !self.sample_queries.contains(&query) && self.sample_queries.len() < MAX_SAMPLE_QUERIES {
            self.sample_queries.push(query);
        }
        let total_score = self.avg_score as f64 * self.query_count as f64 + score as f64;
        self.query_count += 1;
        self.avg_score = (total_score / self.query_count as f64) as f32;
        self.last_query_at = now;
        self.priority = priority_from(self.query_count, self.avg_score);
    }
}

/// priority = f(query_count, 1 - avg_score); clamped to [0, 10] (§3).
fn priority_from(query_count: u64, avg_score: f32) -> u8 {
    let raw = (query_count as f32).ln_1p() * (1.0 - avg_score) * 4.0;
    raw.round().clamp(0.0, 10.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_quality_thresholds() {
        assert_eq!(ResultQuality::from_top_score(0.8), ResultQuality::High);
        assert_eq!(ResultQuality::from_top_score(0.6), ResultQuality::Medium);
        assert_eq!(ResultQuality::from_top_score(0.1), ResultQuality::Low);
        assert_eq!(ResultQuality::from_top_score(0.0), ResultQuality::None);
    }

    #[test]
    fn gap_extend_dedups_and_caps_sample_queries() {
        let mut gap = KnowledgeGap::new("topic", "q1".into(), 0.2);
        for i in 0..10 {
            gap.extend(format!("q{i}"), 0.3, Utc::now());
        }
        assert!(gap.sample_queries.len() <= MAX_SAMPLE_QUERIES);
    }
}
