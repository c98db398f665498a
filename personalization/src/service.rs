//! C10 Personalization Service (§4.10): owns `StudentProfile` reads/writes
//! through `ProfileStorePort`, applies interest decay on read, and builds
//! the `PersonalizedContext` injected into prompts.

use std::sync::Arc;

use conhub_models::profile::{InteractionType, StudentProfile};
use conhub_ports::store::ProfileStorePort;
use conhub_ports::PortResult;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::context::{build_greeting, build_prompt_additions, suggest_related_topics, PersonalizedContext};
use crate::memory::MemoryExtractor;

/// Serializes concurrent profile updates per user (§5) — the store adapter
/// may be backed by a database without row-level locking, so the service
/// takes responsibility here instead.
pub struct PersonalizationService {
    store: Arc<dyn ProfileStorePort>,
    memory: Option<MemoryExtractor>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PersonalizationService {
    pub fn new(store: Arc<dyn ProfileStorePort>) -> Self {
        Self { store, memory: None, locks: DashMap::new() }
    }

    pub fn with_memory_extractor(mut self, extractor: MemoryExtractor) -> Self {
        self.memory = Some(extractor);
        self
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(user_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn get_or_create(&self, user_id: &str) -> PortResult<StudentProfile> {
        match self.store.get(user_id).await? {
            Some(profile) => Ok(profile),
            None => {
                let profile = StudentProfile::new(user_id);
                self.store.put(profile.clone()).await?;
                Ok(profile)
            }
        }
    }

    pub async fn record(
        &self,
        user_id: &str,
        interaction_type: InteractionType,
        topic: Option<String>,
        metadata: serde_json::Value,
    ) -> PortResult<()> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let mut profile = self.get_or_create(user_id).await?;
        profile.record_interaction(interaction_type, topic, metadata, chrono::Utc::now());
        self.store.put(profile).await
    }

    /// Runs memory extraction over a completed dialogue turn and applies any
    /// confidence-gated field updates, under the same per-user lock as
    /// `record` so reads/writes never interleave.
    pub async fn extract_memory(
        &self,
        user_id: &str,
        user_message: &str,
        assistant_message: &str,
        recent_context: &str,
        allow_inference: bool,
    ) -> PortResult<()> {
        let Some(extractor) = &self.memory else { return Ok(()) };

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let mut profile = self.get_or_create(user_id).await?;
        extractor
            .extract_and_apply(&mut profile, user_message, assistant_message, recent_context, allow_inference)
            .await?;
        self.store.put(profile).await?;
        info!(user_id, "applied memory extraction");
        Ok(())
    }

    pub async fn personalized_context(&self, user_id: &str) -> PortResult<PersonalizedContext> {
        let profile = self.get_or_create(user_id).await?;
        let now = chrono::Utc::now();
        let decayed = profile.decayed_interests(now);
        let top_topics: Vec<String> = decayed.iter().take(5).map(|i| i.topic.clone()).collect();
        let detail_level = profile.preferences.detail_level.unwrap_or_default();

        Ok(PersonalizedContext {
            greeting: build_greeting(&profile),
            detail_level,
            topic_hints: top_topics.clone(),
            prompt_additions: build_prompt_additions(&profile, detail_level),
            suggested_related_topics: suggest_related_topics(&top_topics),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct InMemoryProfileStore {
        profiles: StdMutex<std::collections::HashMap<String, StudentProfile>>,
    }

    impl InMemoryProfileStore {
        fn new() -> Self {
            Self { profiles: StdMutex::new(std::collections::HashMap::new()) }
        }
    }

    #[async_trait]
    impl ProfileStorePort for InMemoryProfileStore {
        async fn get(&self, user_id: &str) -> PortResult<Option<StudentProfile>> {
            Ok(self.profiles.lock().unwrap().get(user_id).cloned())
        }

        async fn put(&self, profile: StudentProfile) -> PortResult<()> {
            self.profiles.lock().unwrap().insert(profile.user_id.clone(), profile);
            Ok(())
        }
    }

    #[tokio::test]
    async fn get_or_create_persists_a_new_profile() {
        let service = PersonalizationService::new(Arc::new(InMemoryProfileStore::new()));
        let profile = service.get_or_create("u1").await.unwrap();
        assert_eq!(profile.user_id, "u1");
        let again = service.get_or_create("u1").await.unwrap();
        assert_eq!(again.created_at, profile.created_at);
    }

    #[tokio::test]
    async fn record_bumps_counters() {
        let service = PersonalizationService::new(Arc::new(InMemoryProfileStore::new()));
        service
            .record("u1", InteractionType::Question, Some("học phí".to_string()), serde_json::json!({}))
            .await
            .unwrap();
        let profile = service.get_or_create("u1").await.unwrap();
        assert_eq!(profile.counters.questions, 1);
        assert_eq!(profile.topics_of_interest.len(), 1);
    }
}
