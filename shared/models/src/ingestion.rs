//! Pending Update and Monitor Target (§3 Data Model).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    New,
    Update,
    Unrelated,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub id: Uuid,
    pub source_id: String,
    pub title: String,
    pub raw_content: String,
    pub content_hash: String,
    pub source_url: Option<String>,
    pub category: Option<String>,
    pub detection_type: DetectionType,
    pub similarity_score: f32,
    pub matched_doc_id: Option<Uuid>,
    pub candidate_doc_ids: Vec<Uuid>,
    pub llm_summary: Option<String>,
    pub llm_reason: Option<String>,
    pub status: PendingStatus,
    pub priority: u8,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl PendingUpdate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        raw_content: impl Into<String>,
        content_hash: impl Into<String>,
        detection_type: DetectionType,
        similarity_score: f32,
        matched_doc_id: Option<Uuid>,
    ) -> Self {
        // detection_type=duplicate implies status=rejected at creation (§3).
        let status = if detection_type == DetectionType::Duplicate || detection_type == DetectionType::Unrelated {
            PendingStatus::Rejected
        } else {
            PendingStatus::Pending
        };
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.into(),
            title: title.into(),
            raw_content: raw_content.into(),
            content_hash: content_hash.into(),
            source_url: None,
            category: None,
            detection_type,
            similarity_score: similarity_score.clamp(0.0, 1.0),
            matched_doc_id,
            candidate_doc_ids: Vec::new(),
            llm_summary: None,
            llm_reason: None,
            status,
            priority: 5,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorTarget {
    pub id: Uuid,
    pub url: String,
    pub collection: String,
    pub category: Option<String>,
    pub interval_hours: u32,
    pub is_active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub max_failures: u32,
    pub last_content_hash: Option<String>,
    pub last_error: Option<String>,
    pub selector: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MonitorTarget {
    pub fn new(url: impl Into<String>, collection: impl Into<String>, interval_hours: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            collection: collection.into(),
            category: None,
            interval_hours: interval_hours.max(1),
            is_active: true,
            last_checked_at: None,
            last_success_at: None,
            consecutive_failures: 0,
            max_failures: 5,
            last_content_hash: None,
            last_error: None,
            selector: None,
            metadata: HashMap::new(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked_at {
            None => true,
            Some(last) => {
                let elapsed_hours = (now - last).num_seconds() as f64 / 3600.0;
                elapsed_hours >= self.interval_hours as f64
            }
        }
    }

    pub fn record_success(&mut self, now: DateTime<Utc>, content_hash: String) {
        self.last_checked_at = Some(now);
        self.last_success_at = Some(now);
        self.last_content_hash = Some(content_hash);
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>, error: impl Into<String>) {
        self.last_checked_at = Some(now);
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
        if self.consecutive_failures >= self.max_failures {
            self.is_active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_pending_update_is_rejected_at_creation() {
        let p = PendingUpdate::new("s", "t", "c", "hash", DetectionType::Duplicate, 1.0, None);
        assert_eq!(p.status, PendingStatus::Rejected);
    }

    #[test]
    fn monitor_target_due_when_never_checked() {
        let t = MonitorTarget::new("http://x", "default", 6);
        assert!(t.is_due(Utc::now()));
    }

    #[test]
    fn monitor_target_deactivates_after_max_failures() {
        let mut t = MonitorTarget::new("http://x", "default", 6);
        t.max_failures = 2;
        t.record_failure(Utc::now(), "timeout");
        assert!(t.is_active);
        t.record_failure(Utc::now(), "timeout");
        assert!(!t.is_active);
    }
}
