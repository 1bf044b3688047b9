//! Judge result caching.
//!
//! Keys combine a hash of the rule's identity and prompt with a hash of
//! the content, so editing a rule's prompt invalidates its entries
//! without flushing the rest.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;
use warden_core::{JudgeResult, Rule};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    rule_hash: u64,
    content_hash: u64,
}

impl CacheKey {
    fn new(rule: &Rule, content: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        rule.id.hash(&mut hasher);
        rule.judge_prompt.hash(&mut hasher);
        rule.description.hash(&mut hasher);
        let rule_hash = hasher.finish();

        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        let content_hash = hasher.finish();

        Self {
            rule_hash,
            content_hash,
        }
    }
}

/// TTL cache of judge results.
#[derive(Debug)]
pub struct JudgeCache {
    inner: Cache<CacheKey, JudgeResult>,
}

impl JudgeCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, rule: &Rule, content: &str) -> Option<JudgeResult> {
        self.inner.get(&CacheKey::new(rule, content)).await
    }

    pub async fn insert(&self, rule: &Rule, content: &str, result: JudgeResult) {
        self.inner.insert(CacheKey::new(rule, content), result).await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{Action, Verdict};

    fn rule(id: &str, prompt: &str) -> Rule {
        Rule {
            id: id.to_string(),
            description: None,
            judge_prompt: prompt.to_string(),
            on_fail: Action::Block,
            weight: 1.0,
        }
    }

    fn result() -> JudgeResult {
        JudgeResult::new(Verdict::Pass, 0.9, "cached")
    }

    #[tokio::test]
    async fn hit_after_insert() {
        let cache = JudgeCache::new(100, Duration::from_secs(60));
        let rule = rule("r1", "prompt");

        assert!(cache.get(&rule, "content").await.is_none());
        cache.insert(&rule, "content", result()).await;

        let hit = cache.get(&rule, "content").await.unwrap();
        assert_eq!(hit.verdict, Verdict::Pass);
        assert_eq!(hit.reasoning, "cached");
    }

    #[tokio::test]
    async fn different_content_misses() {
        let cache = JudgeCache::new(100, Duration::from_secs(60));
        let rule = rule("r1", "prompt");
        cache.insert(&rule, "content a", result()).await;
        assert!(cache.get(&rule, "content b").await.is_none());
    }

    #[tokio::test]
    async fn changed_prompt_misses() {
        let cache = JudgeCache::new(100, Duration::from_secs(60));
        cache.insert(&rule("r1", "old prompt"), "content", result()).await;
        assert!(cache.get(&rule("r1", "new prompt"), "content").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_all_clears() {
        let cache = JudgeCache::new(100, Duration::from_secs(60));
        let rule = rule("r1", "prompt");
        cache.insert(&rule, "content", result()).await;
        cache.invalidate_all();
        assert!(cache.get(&rule, "content").await.is_none());
    }
}
